//! Page endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use trellis_store::Id;

use crate::envelope::{Envelope, ok};
use crate::extract::ApiPath;
use crate::handlers::{ApiResult, HybridPage};
use crate::state::AppState;

/// GET /admin/api/pages/{id}/render
///
/// Drafts are composed too: the editor previews unpublished pages.
pub(crate) async fn rendered_page(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<Json<Envelope<HybridPage>>> {
    let page = state.builder.rendered_page(id)?;
    Ok(ok(page.into()))
}
