//! Relay command - Runs the outbox relay as its own process.
//!
//! Several relay processes may run against the same database; claimed
//! rows are locked with `SKIP LOCKED` so each entry goes to one relay.

use std::sync::Arc;

use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::{Database, KafkaPublisher, Persistence};
use crate::jobs::OutboxRelay;

/// Execute the relay command
pub async fn execute(config: Config) -> AppResult<()> {
    tracing::info!("Connecting to database for outbox relay...");

    let db = Database::connect(&config)
        .await
        .map_err(|e| AppError::internal(format!("Failed to connect to database: {}", e)))?;

    let relay = OutboxRelay::from_config(
        Arc::new(Persistence::new(db.get_connection())),
        Arc::new(KafkaPublisher::new(&config)),
        &config,
    );

    tracing::info!(topic = %config.kafka_topic, "Outbox relay running. Press Ctrl+C to stop.");
    relay.run(super::shutdown_signal()).await;

    Ok(())
}
