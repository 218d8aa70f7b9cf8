//! Domain layer - Core business entities and logic
//!
//! This module contains the core domain models that represent
//! business concepts independent of infrastructure concerns.
//!
//! Contains: the accepted message and its outbox entry with retry policy.

pub mod message;
pub mod outbox;

pub use message::{Accepted, Message, Submission};
pub use outbox::{OutboxEntry, OutboxStatus, RetryDecision, RetryPolicy};
