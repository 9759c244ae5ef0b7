//! Section endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::Response;
use trellis_builder::{PositionPayload, SectionPayload};
use trellis_render::SectionPreview;
use trellis_store::{Id, Section};

use crate::envelope::{Envelope, created, deleted, ok};
use crate::extract::{ApiJson, ApiPath};
use crate::handlers::ApiResult;
use crate::state::AppState;

/// GET /admin/api/pages/{id}/sections
pub(crate) async fn list_sections(
    State(state): State<Arc<AppState>>,
    ApiPath(page_id): ApiPath<Id>,
) -> ApiResult<Json<Envelope<Vec<Section>>>> {
    Ok(ok(state.builder.list_sections(page_id)?))
}

/// POST /admin/api/pages/{id}/sections
pub(crate) async fn create_section(
    State(state): State<Arc<AppState>>,
    ApiPath(page_id): ApiPath<Id>,
    ApiJson(payload): ApiJson<SectionPayload>,
) -> ApiResult<Response> {
    Ok(created(state.builder.create_section(page_id, &payload)?))
}

/// GET /admin/api/sections/{id}
pub(crate) async fn get_section(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<Json<Envelope<Section>>> {
    Ok(ok(state.builder.get_section(id)?))
}

/// PUT /admin/api/sections/{id}
pub(crate) async fn update_section(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Id>,
    ApiJson(payload): ApiJson<SectionPayload>,
) -> ApiResult<Json<Envelope<Section>>> {
    Ok(ok(state.builder.update_section(id, &payload)?))
}

/// PATCH /admin/api/sections/{id}/position
pub(crate) async fn update_section_position(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Id>,
    ApiJson(payload): ApiJson<PositionPayload>,
) -> ApiResult<Json<Envelope<Section>>> {
    Ok(ok(state.builder.update_section_position(id, &payload)?))
}

/// DELETE /admin/api/sections/{id}
///
/// Widgets of the section are deleted with it.
pub(crate) async fn delete_section(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<Json<Envelope<Section>>> {
    Ok(deleted(state.builder.delete_section(id)?, "Section"))
}

/// GET /admin/api/sections/{id}/render
pub(crate) async fn rendered_section(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<Json<Envelope<SectionPreview>>> {
    Ok(ok(state.builder.rendered_section(id)?))
}
