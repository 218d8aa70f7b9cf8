//! HTTP request handlers.

pub mod message_handler;

pub use message_handler::message_routes;
