//! JSON response envelope shared by every admin API response.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use trellis_builder::ValidationErrors;

/// `{ "success": bool, "data"?: ..., "errors"?: {field: [msg]}, "message"?: str }`
#[derive(Debug, Serialize)]
pub(crate) struct Envelope<T = ()> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<ValidationErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub(crate) fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            errors: None,
            message: None,
        }
    }

    pub(crate) fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl Envelope {
    pub(crate) fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            errors: None,
            message: Some(message.into()),
        }
    }

    pub(crate) fn with_errors(mut self, errors: ValidationErrors) -> Self {
        self.errors = Some(errors);
        self
    }
}

/// Successful envelope with status 200.
pub(crate) fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope::success(data))
}

/// Successful envelope with status 201.
pub(crate) fn created<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(Envelope::success(data))).into_response()
}

/// Successful envelope for a delete, carrying the deleted entity.
pub(crate) fn deleted<T: Serialize>(data: T, what: &str) -> Json<Envelope<T>> {
    Json(Envelope::success(data).with_message(format!("{what} deleted")))
}
