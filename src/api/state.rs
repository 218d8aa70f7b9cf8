//! Application state - Dependency injection container.
//!
//! Provides centralized access to the intake service and the
//! infrastructure the health check pings.

use std::sync::Arc;

use crate::config::Config;
use crate::infra::{Database, MessagePublisher};
use crate::services::{MessageService, ServiceContainer, Services};

/// Application state shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Message intake service for the configured delivery mode
    pub message_service: Arc<dyn MessageService>,
    /// Database connection
    pub database: Arc<Database>,
    /// Kafka publisher
    pub publisher: Arc<dyn MessagePublisher>,
    /// Largest accepted message, in bytes
    pub max_message_bytes: usize,
}

impl AppState {
    /// Create application state from database, publisher and config.
    ///
    /// The service implementation is chosen by `config.delivery_mode`.
    pub fn from_config(
        database: Arc<Database>,
        publisher: Arc<dyn MessagePublisher>,
        config: &Config,
    ) -> Self {
        let container = Services::from_connection(
            database.get_connection(),
            Arc::clone(&publisher),
            config,
        );

        Self {
            message_service: container.messages(),
            database,
            publisher,
            max_message_bytes: config.max_message_bytes,
        }
    }
}
