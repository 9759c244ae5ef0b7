//! CSRF protection for the admin API.
//!
//! Mutating requests (POST, PUT, PATCH, DELETE) must carry an
//! `X-CSRF-Token` header equal to the server token. Safe methods pass.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ServerError;
use crate::state::AppState;

/// Header carrying the token.
pub(crate) const CSRF_HEADER: &str = "x-csrf-token";

fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Reject mutating requests without a matching token with 403.
pub(crate) async fn require_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if is_mutating(request.method()) {
        let valid = request
            .headers()
            .get(CSRF_HEADER)
            .is_some_and(|value| value.as_bytes() == state.csrf_token.as_bytes());
        if !valid {
            tracing::warn!(
                method = %request.method(),
                path = %request.uri().path(),
                "Rejected request without valid CSRF token"
            );
            return ServerError::Csrf.into_response();
        }
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutating_methods() {
        assert!(is_mutating(&Method::POST));
        assert!(is_mutating(&Method::DELETE));
        assert!(!is_mutating(&Method::GET));
        assert!(!is_mutating(&Method::HEAD));
    }
}
