//! Outbox entries: the recorded intent to publish a message.
//!
//! An entry is written in the same transaction as its message and
//! drained later by the relay. Status moves `pending -> published`, or
//! `pending -> dead` once the retry budget is spent.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Message;
use crate::config::{
    OUTBOX_STATUS_DEAD, OUTBOX_STATUS_PENDING, OUTBOX_STATUS_PUBLISHED, RelaySettings,
};

/// Delivery state of an outbox entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboxStatus {
    Pending,
    Published,
    Dead,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => OUTBOX_STATUS_PENDING,
            OutboxStatus::Published => OUTBOX_STATUS_PUBLISHED,
            OutboxStatus::Dead => OUTBOX_STATUS_DEAD,
        }
    }
}

impl FromStr for OutboxStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            OUTBOX_STATUS_PENDING => Ok(OutboxStatus::Pending),
            OUTBOX_STATUS_PUBLISHED => Ok(OutboxStatus::Published),
            OUTBOX_STATUS_DEAD => Ok(OutboxStatus::Dead),
            other => Err(format!("invalid outbox status: {}", other)),
        }
    }
}

impl fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pending-publish record co-committed with a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: Uuid,
    pub message_id: Uuid,
    pub topic: String,
    pub payload: String,
    pub status: OutboxStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    /// Earliest publish time, unix epoch milliseconds
    pub next_attempt_at: i64,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl OutboxEntry {
    /// Create a pending entry for `message`, due immediately
    pub fn pending_for(message: &Message, topic: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            message_id: message.id,
            topic: topic.into(),
            payload: message.content.clone(),
            status: OutboxStatus::Pending,
            attempts: 0,
            last_error: None,
            next_attempt_at: message.created_at.timestamp_millis(),
            created_at: message.created_at,
            published_at: None,
        }
    }
}

/// What to do with an entry after a failed publish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again at the given time (unix epoch milliseconds)
    RetryAt(i64),
    /// Give up; the entry becomes `dead`
    DeadLetter,
}

/// Bounded exponential backoff for relay publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: i32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: i32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Delay before the next try once `attempts` publishes have failed.
    pub fn delay_for(&self, attempts: i32) -> Duration {
        let exponent = attempts.saturating_sub(1).clamp(0, 31) as u32;
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Decide the fate of an entry whose publish just failed for the
    /// `attempts`-th time.
    pub fn after_failure(&self, attempts: i32, now: DateTime<Utc>) -> RetryDecision {
        if attempts >= self.max_attempts {
            return RetryDecision::DeadLetter;
        }
        let delay = i64::try_from(self.delay_for(attempts).as_millis()).unwrap_or(i64::MAX);
        RetryDecision::RetryAt(now.timestamp_millis().saturating_add(delay))
    }
}

impl From<&RelaySettings> for RetryPolicy {
    fn from(settings: &RelaySettings) -> Self {
        Self::new(settings.max_attempts, settings.retry_base, settings.retry_max)
    }
}
