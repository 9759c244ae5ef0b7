//! Widget endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::Response;
use trellis_builder::{LayoutPayload, PositionPayload, WidgetPayload, WidgetRecord};
use trellis_render::WidgetPreview;
use trellis_store::Id;

use crate::envelope::{Envelope, created, deleted, ok};
use crate::extract::{ApiJson, ApiPath};
use crate::handlers::ApiResult;
use crate::state::AppState;

/// GET /admin/api/sections/{id}/widgets
pub(crate) async fn list_widgets(
    State(state): State<Arc<AppState>>,
    ApiPath(section_id): ApiPath<Id>,
) -> ApiResult<Json<Envelope<Vec<WidgetRecord>>>> {
    Ok(ok(state.builder.list_widgets(section_id)?))
}

/// POST /admin/api/sections/{id}/widgets
pub(crate) async fn create_widget(
    State(state): State<Arc<AppState>>,
    ApiPath(section_id): ApiPath<Id>,
    ApiJson(payload): ApiJson<WidgetPayload>,
) -> ApiResult<Response> {
    Ok(created(state.builder.create_widget(section_id, &payload)?))
}

/// PATCH /admin/api/sections/{id}/widgets/layout
pub(crate) async fn sync_widget_layout(
    State(state): State<Arc<AppState>>,
    ApiPath(section_id): ApiPath<Id>,
    ApiJson(payload): ApiJson<LayoutPayload>,
) -> ApiResult<Json<Envelope<Vec<WidgetRecord>>>> {
    Ok(ok(state.builder.sync_widget_layout(section_id, &payload)?))
}

/// GET /admin/api/widgets/{id}
pub(crate) async fn get_widget(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<Json<Envelope<WidgetRecord>>> {
    Ok(ok(state.builder.get_widget(id)?))
}

/// PUT /admin/api/widgets/{id}
pub(crate) async fn update_widget(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Id>,
    ApiJson(payload): ApiJson<WidgetPayload>,
) -> ApiResult<Json<Envelope<WidgetRecord>>> {
    Ok(ok(state.builder.update_widget(id, &payload)?))
}

/// PATCH /admin/api/widgets/{id}/position
pub(crate) async fn update_widget_position(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Id>,
    ApiJson(payload): ApiJson<PositionPayload>,
) -> ApiResult<Json<Envelope<WidgetRecord>>> {
    Ok(ok(state.builder.update_widget_position(id, &payload)?))
}

/// DELETE /admin/api/widgets/{id}
pub(crate) async fn delete_widget(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<Json<Envelope<WidgetRecord>>> {
    Ok(deleted(state.builder.delete_widget(id)?, "Widget"))
}

/// GET /admin/api/widgets/{id}/render
pub(crate) async fn rendered_widget(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<Json<Envelope<WidgetPreview>>> {
    Ok(ok(state.builder.rendered_widget(id)?))
}
