//! Application settings loaded from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use super::constants::{
    DEFAULT_DATABASE_MAX_CONNECTIONS, DEFAULT_DATABASE_URL, DEFAULT_KAFKA_BROKERS,
    DEFAULT_KAFKA_TOPIC, DEFAULT_MAX_MESSAGE_BYTES, DEFAULT_PUBLISH_TIMEOUT_MS,
    DEFAULT_RELAY_BATCH_SIZE, DEFAULT_RELAY_MAX_ATTEMPTS, DEFAULT_RELAY_POLL_INTERVAL_MS,
    DEFAULT_RELAY_RETRY_BASE_MS, DEFAULT_RELAY_RETRY_MAX_MS, DEFAULT_SERVER_HOST,
    DEFAULT_SERVER_PORT,
};

/// How an accepted message reaches the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Insert, then publish in the request path. No atomicity between the two.
    Direct,
    /// Insert the message and a pending outbox entry in one transaction;
    /// the relay publishes asynchronously.
    #[default]
    Outbox,
}

impl FromStr for DeliveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(DeliveryMode::Direct),
            "outbox" => Ok(DeliveryMode::Outbox),
            other => Err(format!(
                "unknown delivery mode '{}', expected 'direct' or 'outbox'",
                other
            )),
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryMode::Direct => write!(f, "direct"),
            DeliveryMode::Outbox => write!(f, "outbox"),
        }
    }
}

/// Outbox relay tuning.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub batch_size: u64,
    pub poll_interval: Duration,
    pub max_attempts: i32,
    pub retry_base: Duration,
    pub retry_max: Duration,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_RELAY_BATCH_SIZE,
            poll_interval: Duration::from_millis(DEFAULT_RELAY_POLL_INTERVAL_MS),
            max_attempts: DEFAULT_RELAY_MAX_ATTEMPTS,
            retry_base: Duration::from_millis(DEFAULT_RELAY_RETRY_BASE_MS),
            retry_max: Duration::from_millis(DEFAULT_RELAY_RETRY_MAX_MS),
        }
    }
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub kafka_brokers: Vec<String>,
    pub kafka_topic: String,
    pub publish_timeout: Duration,
    pub server_host: String,
    pub server_port: u16,
    pub delivery_mode: DeliveryMode,
    pub max_message_bytes: usize,
    pub relay: RelaySettings,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("database_max_connections", &self.database_max_connections)
            .field("kafka_brokers", &self.kafka_brokers)
            .field("kafka_topic", &self.kafka_topic)
            .field("publish_timeout", &self.publish_timeout)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("delivery_mode", &self.delivery_mode)
            .field("max_message_bytes", &self.max_message_bytes)
            .field("relay", &self.relay)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            database_max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            kafka_brokers: parse_brokers(DEFAULT_KAFKA_BROKERS),
            kafka_topic: DEFAULT_KAFKA_TOPIC.to_string(),
            publish_timeout: Duration::from_millis(DEFAULT_PUBLISH_TIMEOUT_MS),
            server_host: DEFAULT_SERVER_HOST.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            delivery_mode: DeliveryMode::default(),
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            relay: RelaySettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable values fall back to the defaults in
    /// [`crate::config`] constants.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let delivery_mode = match env::var("DELIVERY_MODE") {
            Ok(raw) => raw.parse().unwrap_or_else(|e: String| {
                tracing::warn!("{}, falling back to '{}'", e, DeliveryMode::default());
                DeliveryMode::default()
            }),
            Err(_) => DeliveryMode::default(),
        };

        let kafka_brokers = env::var("KAFKA_BROKERS")
            .map(|v| parse_brokers(&v))
            .ok()
            .filter(|brokers| !brokers.is_empty())
            .unwrap_or_else(|| parse_brokers(DEFAULT_KAFKA_BROKERS));

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            database_max_connections: env_parse(
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_DATABASE_MAX_CONNECTIONS,
            ),
            kafka_brokers,
            kafka_topic: env::var("KAFKA_TOPIC")
                .unwrap_or_else(|_| DEFAULT_KAFKA_TOPIC.to_string()),
            publish_timeout: Duration::from_millis(env_parse(
                "KAFKA_PUBLISH_TIMEOUT_MS",
                DEFAULT_PUBLISH_TIMEOUT_MS,
            )),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
            server_port: env_parse("SERVER_PORT", DEFAULT_SERVER_PORT),
            delivery_mode,
            max_message_bytes: env_parse("MAX_MESSAGE_BYTES", DEFAULT_MAX_MESSAGE_BYTES),
            relay: RelaySettings {
                batch_size: env_parse("RELAY_BATCH_SIZE", DEFAULT_RELAY_BATCH_SIZE).max(1),
                poll_interval: Duration::from_millis(env_parse(
                    "RELAY_POLL_INTERVAL_MS",
                    DEFAULT_RELAY_POLL_INTERVAL_MS,
                )),
                max_attempts: env_parse("RELAY_MAX_ATTEMPTS", DEFAULT_RELAY_MAX_ATTEMPTS).max(1),
                retry_base: Duration::from_millis(env_parse(
                    "RELAY_RETRY_BASE_MS",
                    DEFAULT_RELAY_RETRY_BASE_MS,
                )),
                retry_max: Duration::from_millis(env_parse(
                    "RELAY_RETRY_MAX_MS",
                    DEFAULT_RELAY_RETRY_MAX_MS,
                )),
            },
        }
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// Read and parse an environment variable, falling back to `default`.
fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Split a comma-separated broker list, dropping blanks.
pub(crate) fn parse_brokers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
