//! Message Service - HTTP message intake with delivery to Kafka
//!
//! Accepts `POST /message`, stores the message in PostgreSQL and gets it
//! onto a Kafka topic, either through a transactional outbox drained by a
//! background relay (default) or by publishing in the request path.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **domain**: Messages, outbox entries and retry policy
//! - **services**: Message intake use case
//! - **jobs**: Outbox relay
//! - **infra**: Database, repositories, unit of work, Kafka publisher
//! - **api**: HTTP handlers and routes
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! # Start the server (relay included in outbox mode)
//! cargo run -- serve
//!
//! # Run migrations
//! cargo run -- migrate up
//!
//! # Run a standalone relay
//! cargo run -- relay
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod jobs;
pub mod services;

// Re-export commonly used types at crate root
pub use api::AppState;
pub use config::{Config, DeliveryMode};
pub use domain::{Message, OutboxEntry};
pub use errors::{AppError, AppResult};
