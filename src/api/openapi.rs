//! OpenAPI documentation configuration.
//!
//! Provides Swagger UI for API exploration and testing.

use utoipa::OpenApi;

use crate::api::handlers::message_handler;
use crate::errors::ErrorResponse;

/// OpenAPI documentation for the message service
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Message Service",
        version = "0.1.0",
        description = "Accepts messages over HTTP, stores them and delivers them to Kafka",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        message_handler::receive_message,
    ),
    components(
        schemas(
            message_handler::MessageRequest,
            message_handler::StatusResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Messages", description = "Message intake")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_message_endpoint() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/message"));
    }
}
