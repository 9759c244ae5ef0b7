//! Error types for the HTTP server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use trellis_builder::{BuilderError, ValidationErrors};
use trellis_render::ComposeError;
use trellis_store::StoreError;

use crate::envelope::Envelope;

/// Admin API error. Rendered as the JSON envelope with `success: false`.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Builder(#[from] BuilderError),

    /// Request body is not valid JSON for the endpoint.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Path parameters could not be parsed.
    #[error("Not found: {0}")]
    InvalidPath(String),

    /// Query parameters could not be parsed.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Mutating call without a matching `X-CSRF-Token` header.
    #[error("Missing or invalid CSRF token")]
    Csrf,
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        Self::Builder(e.into())
    }
}

impl From<ComposeError> for ServerError {
    fn from(e: ComposeError) -> Self {
        Self::Builder(e.into())
    }
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Builder(e) => StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::InvalidBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidPath(_) => StatusCode::NOT_FOUND,
            Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Self::Csrf => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = match &self {
            Self::Builder(BuilderError::Validation(errors)) => {
                Envelope::failure("Validation failed").with_errors(errors.clone())
            }
            Self::InvalidBody(message) => Envelope::failure("Validation failed")
                .with_errors(ValidationErrors::single("body", message.clone())),
            // Internal details stay in the log.
            _ if status.is_server_error() => Envelope::failure("Internal server error"),
            other => Envelope::failure(other.to_string()),
        };

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use trellis_store::Entity;

    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found = ServerError::from(StoreError::not_found(Entity::Page, 3));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(ServerError::Csrf.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ServerError::InvalidBody("expected value".to_owned()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
