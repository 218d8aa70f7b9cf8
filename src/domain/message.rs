//! Message domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message accepted through the HTTP intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Time-ordered (v7) identifier
    pub id: Uuid,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a new message stamped with the current time
    pub fn new(content: impl Into<String>, idempotency_key: Option<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            content: content.into(),
            idempotency_key,
            created_at: Utc::now(),
        }
    }

    /// Bytes published to the broker: the raw content, nothing else.
    pub fn payload(&self) -> Vec<u8> {
        self.content.as_bytes().to_vec()
    }
}

/// Input to the intake use case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub content: String,
    pub idempotency_key: Option<String>,
}

impl Submission {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Outcome of a successful intake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub message_id: Uuid,
    /// True when an earlier submission with the same idempotency key was found
    pub duplicate: bool,
}
