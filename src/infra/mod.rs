//! Infrastructure layer - External systems integration
//!
//! This module handles all external system concerns:
//! - Database connections, migrations and repositories
//! - The Kafka publisher
//! - Unit of Work for transaction management

pub mod broker;
pub mod db;
pub mod repositories;
pub mod unit_of_work;

pub use broker::{Delivery, KafkaPublisher, LeastBytes, MessagePublisher, OutboundRecord, PublishError};
pub use db::{Database, Migrator};
pub use repositories::{MessageRepository, MessageStore, OutboxRepository, OutboxStore};
pub use unit_of_work::{
    Persistence, TransactionContext, TxMessageRepository, TxOutboxRepository, UnitOfWork,
};

#[cfg(test)]
pub use broker::MockMessagePublisher;
