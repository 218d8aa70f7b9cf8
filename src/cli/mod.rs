//! CLI module - Command-line interface for the application.
//!
//! Provides commands for:
//! - `serve` - Start the HTTP server (and, in outbox mode, the relay)
//! - `relay` - Run the outbox relay on its own
//! - `migrate` - Database migrations
//! - `outbox` - Outbox inspection and maintenance

pub mod args;

pub use args::{Cli, Commands};
