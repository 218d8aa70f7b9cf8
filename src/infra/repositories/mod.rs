//! Repository layer - Data access abstraction
//!
//! Repositories provide an abstraction over data persistence,
//! following the Repository pattern for clean separation of concerns.

pub(crate) mod entities;
mod message_repository;
mod outbox_repository;

pub use message_repository::{MessageRepository, MessageStore};
pub use outbox_repository::{OutboxRepository, OutboxStore};
