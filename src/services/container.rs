//! Service Container - Centralized service access.
//!
//! Builds the intake service for the configured delivery mode and hands
//! out trait objects so handlers never see the concrete strategy.

use std::sync::Arc;

use super::{DirectDelivery, MessageService, OutboxDelivery};
use crate::config::{Config, DeliveryMode};
use crate::infra::{MessagePublisher, Persistence};

#[cfg(test)]
use mockall::automock;

/// Service container trait for dependency injection.
#[cfg_attr(test, automock)]
pub trait ServiceContainer: Send + Sync {
    /// Get the message intake service
    fn messages(&self) -> Arc<dyn MessageService>;
}

/// Concrete implementation of ServiceContainer
pub struct Services {
    message_service: Arc<dyn MessageService>,
}

impl Services {
    /// Create service container from database connection and config.
    ///
    /// The publisher is only used in direct mode; in outbox mode the relay
    /// owns publishing.
    pub fn from_connection(
        db: sea_orm::DatabaseConnection,
        publisher: Arc<dyn MessagePublisher>,
        config: &Config,
    ) -> Self {
        let uow = Arc::new(Persistence::new(db));

        let message_service: Arc<dyn MessageService> = match config.delivery_mode {
            DeliveryMode::Direct => Arc::new(DirectDelivery::new(uow, publisher)),
            DeliveryMode::Outbox => Arc::new(OutboxDelivery::new(uow, config.kafka_topic.clone())),
        };

        tracing::info!(mode = %config.delivery_mode, "Message service initialized");

        Self { message_service }
    }
}

impl ServiceContainer for Services {
    fn messages(&self) -> Arc<dyn MessageService> {
        self.message_service.clone()
    }
}
