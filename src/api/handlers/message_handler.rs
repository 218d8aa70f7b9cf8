//! Message intake handlers.

use axum::{
    extract::State,
    http::HeaderMap,
    response::Json,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::extractors::JsonBody;
use crate::api::AppState;
use crate::config::{
    DeliveryMode, IDEMPOTENCY_KEY_HEADER, MAX_IDEMPOTENCY_KEY_LENGTH, STATUS_MESSAGE_RECEIVED,
};
use crate::domain::Submission;
use crate::errors::{AppError, AppResult, ErrorResponse};

/// Message submission
#[derive(Debug, Deserialize, ToSchema)]
pub struct MessageRequest {
    /// Text stored and published as the record value
    #[schema(example = "hello")]
    pub message: String,
}

/// Acknowledgement returned on success
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    #[schema(example = "message received")]
    pub status: String,
}

/// Create message routes
pub fn message_routes() -> Router<AppState> {
    Router::new().route("/message", post(receive_message))
}

/// Store a message and hand it to Kafka
#[utoipa::path(
    post,
    path = "/message",
    tag = "Messages",
    request_body = MessageRequest,
    params(
        ("Idempotency-Key" = Option<String>, Header, description = "Repeat-safe submission key; ignored in direct mode")
    ),
    responses(
        (status = 200, description = "Message accepted", body = StatusResponse),
        (status = 400, description = "Malformed body or oversized message", body = ErrorResponse),
        (status = 500, description = "Store or broker failure", body = ErrorResponse)
    )
)]
pub async fn receive_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(payload): JsonBody<MessageRequest>,
) -> AppResult<Json<StatusResponse>> {
    if payload.message.len() > state.max_message_bytes {
        return Err(AppError::validation(format!(
            "message exceeds the maximum size of {} bytes",
            state.max_message_bytes
        )));
    }

    let mut submission = Submission::new(payload.message);
    // Direct mode keeps the legacy contract: the header is not even parsed
    if state.message_service.mode() == DeliveryMode::Outbox {
        if let Some(key) = idempotency_key(&headers)? {
            submission = submission.with_idempotency_key(key);
        }
    }

    let accepted = state.message_service.accept(submission).await?;
    tracing::debug!(
        message_id = %accepted.message_id,
        duplicate = accepted.duplicate,
        "Message accepted"
    );

    Ok(Json(StatusResponse {
        status: STATUS_MESSAGE_RECEIVED.to_string(),
    }))
}

fn idempotency_key(headers: &HeaderMap) -> AppResult<Option<String>> {
    let Some(value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };

    let key = value
        .to_str()
        .map_err(|_| AppError::bad_request("Idempotency-Key must be visible ASCII"))?
        .trim();

    if key.is_empty() || key.len() > MAX_IDEMPOTENCY_KEY_LENGTH {
        return Err(AppError::bad_request(format!(
            "Idempotency-Key must be 1 to {} characters",
            MAX_IDEMPOTENCY_KEY_LENGTH
        )));
    }

    Ok(Some(key.to_string()))
}
