//! Background jobs.
//!
//! - `outbox_relay`: publishes pending outbox entries to Kafka

mod outbox_relay;

pub use outbox_relay::{OutboxRelay, RelayReport};
