//! JSON body extractor with uniform rejections.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::errors::AppError;

/// JSON extractor whose rejection is an [`AppError::BadRequest`].
///
/// The error text is axum's own description of what went wrong (missing
/// field, wrong type, malformed JSON, wrong content type), so clients get
/// `400 {"error": "..."}` like every other failure.
///
/// ```rust,ignore
/// async fn receive(JsonBody(payload): JsonBody<MessageRequest>) {
///     // payload parsed, shape already checked
/// }
/// ```
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::bad_request(e.body_text()))?;

        Ok(JsonBody(value))
    }
}
