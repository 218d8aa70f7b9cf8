//! Shared helpers for integration tests.
//!
//! Databases are single-connection in-memory SQLite with the real
//! migrations applied; the broker is a recording fake.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use sea_orm::{ConnectOptions, Database as SeaDatabase};
use serde_json::Value;
use tower::ServiceExt;

use message_service::api::{create_router, AppState};
use message_service::config::{Config, DeliveryMode};
use message_service::domain::RetryPolicy;
use message_service::infra::{
    Database, Delivery, MessagePublisher, OutboundRecord, Persistence, PublishError,
};
use message_service::jobs::OutboxRelay;

// =============================================================================
// Database
// =============================================================================

pub async fn database(migrate: bool) -> Database {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::from_connection(SeaDatabase::connect(options).await.unwrap());
    if migrate {
        db.run_migrations().await.unwrap();
    }
    db
}

// =============================================================================
// Fake broker
// =============================================================================

/// Publisher that records what it is given and can be switched into an
/// outage.
#[derive(Default)]
pub struct RecordingPublisher {
    records: Mutex<Vec<OutboundRecord>>,
    attempts: Mutex<usize>,
    down: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn unavailable() -> Arc<Self> {
        let publisher = Self::new();
        publisher.set_down(true);
        publisher
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Records that reached the topic
    pub fn published(&self) -> Vec<OutboundRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Publish calls, successful or not
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl MessagePublisher for RecordingPublisher {
    async fn publish(&self, record: OutboundRecord) -> Result<Delivery, PublishError> {
        *self.attempts.lock().unwrap() += 1;
        if self.down.load(Ordering::SeqCst) {
            return Err(PublishError::Unavailable("connection refused".into()));
        }

        let mut records = self.records.lock().unwrap();
        records.push(record);
        Ok(Delivery {
            partition: 0,
            offset: records.len() as i64 - 1,
        })
    }

    async fn ping(&self) -> Result<(), PublishError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(PublishError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

// =============================================================================
// Application
// =============================================================================

pub struct TestApp {
    pub router: Router,
    pub db: Database,
    pub publisher: Arc<RecordingPublisher>,
}

impl TestApp {
    pub async fn new(mode: DeliveryMode, publisher: Arc<RecordingPublisher>) -> Self {
        Self::with_database(mode, publisher, database(true).await)
    }

    pub fn with_database(mode: DeliveryMode, publisher: Arc<RecordingPublisher>, db: Database) -> Self {
        let config = Config {
            delivery_mode: mode,
            ..Config::default()
        };
        Self::with_config(&config, publisher, db)
    }

    pub fn with_config(config: &Config, publisher: Arc<RecordingPublisher>, db: Database) -> Self {
        let state = AppState::from_config(
            Arc::new(db.clone()),
            publisher.clone() as Arc<dyn MessagePublisher>,
            config,
        );
        Self {
            router: create_router(state),
            db,
            publisher,
        }
    }

    /// Relay that retries immediately
    pub fn relay(&self, max_attempts: i32) -> OutboxRelay<Persistence> {
        OutboxRelay::new(
            Arc::new(Persistence::new(self.db.get_connection())),
            self.publisher.clone(),
            RetryPolicy::new(max_attempts, Duration::ZERO, Duration::ZERO),
            10,
        )
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn post_message(&self, body: &str) -> (StatusCode, Value) {
        self.send(json_request(body)).await
    }
}

pub fn json_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/message")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
