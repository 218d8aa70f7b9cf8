//! Message broker integration.
//!
//! [`MessagePublisher`] is the seam between the application and Kafka;
//! [`KafkaPublisher`] is the production implementation.

mod balancer;
mod kafka;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use crate::config::{HEADER_MESSAGE_ID, HEADER_OUTBOX_ID};
use crate::domain::{Message, OutboxEntry};

pub use balancer::LeastBytes;
pub use kafka::KafkaPublisher;

/// Broker failure, classified so callers can tell retryable outages apart.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// Broker or topic could not be reached
    #[error("broker unavailable: {0}")]
    Unavailable(String),

    /// The publish did not complete in time
    #[error("publish timed out after {0:?}")]
    Timeout(Duration),

    /// The broker refused the record; retrying the same record will not help
    #[error("record rejected: {0}")]
    Rejected(String),
}

impl PublishError {
    /// Whether a later retry of the same record can succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, PublishError::Unavailable(_) | PublishError::Timeout(_))
    }
}

/// A record ready to be written to the configured topic.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutboundRecord {
    pub key: Option<Vec<u8>>,
    pub payload: Vec<u8>,
    pub headers: BTreeMap<String, Vec<u8>>,
}

impl OutboundRecord {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Record for a message published in the request path
    pub fn for_message(message: &Message) -> Self {
        Self::new(message.payload()).with_header(HEADER_MESSAGE_ID, message.id.to_string())
    }

    /// Record for an outbox entry drained by the relay.
    ///
    /// Carries the same `message-id` header as [`Self::for_message`], so
    /// consumers can drop redeliveries.
    pub fn for_outbox_entry(entry: &OutboxEntry) -> Self {
        Self::new(entry.payload.as_bytes().to_vec())
            .with_header(HEADER_MESSAGE_ID, entry.message_id.to_string())
            .with_header(HEADER_OUTBOX_ID, entry.id.to_string())
    }
}

/// Where a record landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub partition: i32,
    pub offset: i64,
}

/// Publisher trait for dependency injection.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Write one record to the topic
    async fn publish(&self, record: OutboundRecord) -> Result<Delivery, PublishError>;

    /// Check that the broker is reachable
    async fn ping(&self) -> Result<(), PublishError>;
}
