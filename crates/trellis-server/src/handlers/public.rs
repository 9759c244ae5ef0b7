//! Public site.
//!
//! Serves composed pages as HTML. Responses carry an `ETag` derived from the
//! application version and the markup, so unchanged pages answer
//! `If-None-Match` with 304.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use md5::{Digest, Md5};

use crate::state::AppState;

/// GET /
pub(crate) async fn root_page(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    render(&state, None, &headers)
}

/// GET /{slug}
pub(crate) async fn page(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Response {
    render(&state, Some(&slug), &headers)
}

fn render(state: &AppState, slug: Option<&str>, headers: &HeaderMap) -> Response {
    let page = match state.composer.render_public(slug) {
        Ok(page) => page,
        Err(e) => {
            if e.status_code() >= 500 {
                tracing::error!(slug = ?slug, kind = e.kind(), error = %e, "Page unavailable");
            } else {
                tracing::debug!(slug = ?slug, kind = e.kind(), "Page not found");
            }
            let error_page = state.composer.error_page(&e);
            let status = StatusCode::from_u16(error_page.status)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (status, Html(error_page.html)).into_response();
        }
    };

    if state.verbose {
        for warning in &page.warnings {
            tracing::warn!(page = %page.context.page.slug, "{warning}");
        }
    }

    let etag = compute_etag(&state.version, &page.html);
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && if_none_match.as_bytes() == etag.as_bytes()
    {
        return StatusCode::NOT_MODIFIED.into_response();
    }

    ([(header::ETAG, etag)], Html(page.html)).into_response()
}

/// Compute `ETag` from version and content.
///
/// Uses first 16 hex chars of MD5 hash for brevity.
fn compute_etag(version: &str, content: &str) -> String {
    let hash = Md5::digest(format!("{version}:{content}").as_bytes());
    format!("\"{}\"", &hex::encode(hash)[..16])
}
