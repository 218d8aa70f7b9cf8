//! Integration tests for the HTTP surface.
//!
//! Requests go through the full router against an in-memory database and
//! a recording broker.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tokio_test::assert_ok;

use common::{database, json_request, RecordingPublisher, TestApp};
use message_service::config::{Config, DeliveryMode};
use message_service::infra::{MessageRepository, MessageStore};

async fn stored_messages(app: &TestApp) -> u64 {
    assert_ok!(MessageStore::new(app.db.get_connection()).count().await)
}

// =============================================================================
// Success
// =============================================================================

#[tokio::test]
async fn test_direct_mode_stores_and_publishes() {
    let app = TestApp::new(DeliveryMode::Direct, RecordingPublisher::new()).await;

    let (status, body) = app.post_message(r#"{"message":"hello"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "message received"}));
    assert_eq!(stored_messages(&app).await, 1);

    let published = app.publisher.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].payload, b"hello");
    assert!(published[0].headers.contains_key("message-id"));
}

#[tokio::test]
async fn test_outbox_mode_defers_publish_to_relay() {
    let app = TestApp::new(DeliveryMode::Outbox, RecordingPublisher::new()).await;

    let (status, body) = app.post_message(r#"{"message":"hello"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "message received"}));
    assert_eq!(stored_messages(&app).await, 1);
    assert_eq!(app.publisher.attempts(), 0);

    let report = assert_ok!(app.relay(5).run_once().await);
    assert_eq!(report.published, 1);

    let published = app.publisher.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].payload, b"hello");
}

#[tokio::test]
async fn test_empty_message_is_accepted() {
    let app = TestApp::new(DeliveryMode::Direct, RecordingPublisher::new()).await;

    let (status, _) = app.post_message(r#"{"message":""}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.publisher.published()[0].payload, b"");
}

#[tokio::test]
async fn test_unknown_fields_are_ignored() {
    let app = TestApp::new(DeliveryMode::Direct, RecordingPublisher::new()).await;

    let (status, _) = app.post_message(r#"{"message":"hi","extra":1}"#).await;

    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Client errors
// =============================================================================

#[tokio::test]
async fn test_malformed_bodies_are_rejected_without_side_effects() {
    for body in [
        r#"{}"#,
        r#"{"message": 42}"#,
        r#"{"message": null}"#,
        r#"{"message": "unterminated"#,
        r#"not json"#,
    ] {
        let app = TestApp::new(DeliveryMode::Direct, RecordingPublisher::new()).await;

        let (status, response) = app.post_message(body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
        assert!(
            response["error"].as_str().is_some_and(|e| !e.is_empty()),
            "body: {}",
            body
        );
        assert_eq!(stored_messages(&app).await, 0);
        assert_eq!(app.publisher.attempts(), 0);
    }
}

#[tokio::test]
async fn test_missing_content_type_is_bad_request() {
    let app = TestApp::new(DeliveryMode::Direct, RecordingPublisher::new()).await;
    let request = Request::builder()
        .method("POST")
        .uri("/message")
        .body(Body::from(r#"{"message":"hello"}"#))
        .unwrap();

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_oversized_message_is_rejected() {
    let config = Config {
        delivery_mode: DeliveryMode::Direct,
        max_message_bytes: 4,
        ..Config::default()
    };
    let app = TestApp::with_config(&config, RecordingPublisher::new(), database(true).await);

    let (status, _) = app.post_message(r#"{"message":"hello"}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(stored_messages(&app).await, 0);
    assert_eq!(app.publisher.attempts(), 0);
}

// =============================================================================
// Server errors
// =============================================================================

#[tokio::test]
async fn test_store_failure_skips_publish() {
    for mode in [DeliveryMode::Direct, DeliveryMode::Outbox] {
        // No tables: every insert fails
        let app = TestApp::with_database(mode, RecordingPublisher::new(), database(false).await);

        let (status, body) = app.post_message(r#"{"message":"hello"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Failed to save message"}));
        assert_eq!(app.publisher.attempts(), 0);
    }
}

#[tokio::test]
async fn test_direct_mode_broker_failure_leaves_row_committed() {
    let app = TestApp::new(DeliveryMode::Direct, RecordingPublisher::unavailable()).await;

    let (status, body) = app.post_message(r#"{"message":"hello"}"#).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to send message to Kafka"}));
    // Stored but never published: the gap the outbox mode closes
    assert_eq!(stored_messages(&app).await, 1);
    assert!(app.publisher.published().is_empty());
}

#[tokio::test]
async fn test_outbox_mode_accepts_during_broker_outage() {
    let app = TestApp::new(DeliveryMode::Outbox, RecordingPublisher::unavailable()).await;

    let (status, _) = app.post_message(r#"{"message":"hello"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.publisher.attempts(), 0);
}

// =============================================================================
// Idempotency
// =============================================================================

#[tokio::test]
async fn test_repeated_idempotency_key_stores_once() {
    let app = TestApp::new(DeliveryMode::Outbox, RecordingPublisher::new()).await;

    for _ in 0..2 {
        let mut request = json_request(r#"{"message":"hello"}"#);
        request
            .headers_mut()
            .insert("idempotency-key", "order-17".parse().unwrap());

        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "message received"}));
    }

    assert_eq!(stored_messages(&app).await, 1);
    assert_eq!(assert_ok!(app.relay(5).run_once().await).published, 1);
    assert_eq!(app.publisher.published().len(), 1);
}

#[tokio::test]
async fn test_blank_idempotency_key_is_rejected() {
    let app = TestApp::new(DeliveryMode::Outbox, RecordingPublisher::new()).await;
    let mut request = json_request(r#"{"message":"hello"}"#);
    request
        .headers_mut()
        .insert("idempotency-key", "  ".parse().unwrap());

    let (status, _) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(stored_messages(&app).await, 0);
}

#[tokio::test]
async fn test_direct_mode_ignores_idempotency_key() {
    let app = TestApp::new(DeliveryMode::Direct, RecordingPublisher::new()).await;
    let long = "k".repeat(300);

    for key in ["", "  ", "order-17", "order-17", long.as_str()] {
        let mut request = json_request(r#"{"message":"hello"}"#);
        request
            .headers_mut()
            .insert("idempotency-key", key.parse().unwrap());

        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::OK, "key: {:?}", key);
        assert_eq!(body, json!({"status": "message received"}));
    }

    let mut request = json_request(r#"{"message":"hello"}"#);
    request.headers_mut().insert(
        "idempotency-key",
        axum::http::HeaderValue::from_bytes("café".as_bytes()).unwrap(),
    );
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);

    // Every request is stored and published, repeated keys included
    assert_eq!(stored_messages(&app).await, 6);
    assert_eq!(app.publisher.published().len(), 6);
}

// =============================================================================
// Operational endpoints
// =============================================================================

#[tokio::test]
async fn test_root_endpoint() {
    let app = TestApp::new(DeliveryMode::Outbox, RecordingPublisher::new()).await;
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let (status, _) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_reports_each_dependency() {
    let app = TestApp::new(DeliveryMode::Outbox, RecordingPublisher::new()).await;
    let health = || Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = app.send(health()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["mode"], "outbox");

    app.publisher.set_down(true);
    let (status, body) = app.send(health()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["services"]["database"]["status"], "healthy");
    assert_eq!(body["services"]["broker"]["status"], "unhealthy");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = TestApp::new(DeliveryMode::Outbox, RecordingPublisher::new()).await;
    let request = Request::builder()
        .uri("/api-docs/openapi.json")
        .body(Body::empty())
        .unwrap();

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/message"]["post"].is_object());
}
