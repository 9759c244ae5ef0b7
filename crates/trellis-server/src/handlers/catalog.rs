//! Catalog endpoints: what the editor needs besides page content.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use trellis_builder::WidgetCatalogEntry;
use trellis_render::{MenuQuery, MenuTree, ResolvedAssets};
use trellis_store::{Id, TemplateSection};

use crate::envelope::{Envelope, ok};
use crate::extract::{ApiPath, ApiQuery};
use crate::handlers::ApiResult;
use crate::state::AppState;

/// Response for GET /admin/api/csrf.
#[derive(Serialize)]
pub(crate) struct CsrfResponse {
    token: String,
    header: &'static str,
}

/// GET /admin/api/csrf
pub(crate) async fn csrf_token(State(state): State<Arc<AppState>>) -> Json<Envelope<CsrfResponse>> {
    ok(CsrfResponse {
        token: state.csrf_token.clone(),
        header: "X-CSRF-Token",
    })
}

/// GET /admin/api/widgets/available
pub(crate) async fn available_widgets(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Envelope<Vec<WidgetCatalogEntry>>>> {
    Ok(ok(state.builder.available_widgets()?))
}

/// GET /admin/api/theme/assets
pub(crate) async fn theme_assets(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Envelope<ResolvedAssets>>> {
    Ok(ok(state.builder.theme_assets()?))
}

#[derive(Deserialize)]
pub(crate) struct TemplateFilter {
    template_id: Option<Id>,
}

/// GET /admin/api/section-templates
pub(crate) async fn section_templates(
    State(state): State<Arc<AppState>>,
    ApiQuery(filter): ApiQuery<TemplateFilter>,
) -> ApiResult<Json<Envelope<Vec<TemplateSection>>>> {
    Ok(ok(state.builder.section_templates(filter.template_id)?))
}

/// Query of GET /admin/api/menus/{location}.
#[derive(Deserialize)]
pub(crate) struct MenuParams {
    page_id: Option<Id>,
    template_id: Option<Id>,
    #[serde(default)]
    one_page: bool,
    cache: Option<bool>,
}

/// Processed menu with its markup.
#[derive(Serialize)]
pub(crate) struct MenuResponse {
    #[serde(flatten)]
    menu: MenuTree,
    html: String,
}

/// GET /admin/api/menus/{location}
pub(crate) async fn processed_menu(
    State(state): State<Arc<AppState>>,
    ApiPath(location): ApiPath<String>,
    ApiQuery(params): ApiQuery<MenuParams>,
) -> ApiResult<Json<Envelope<MenuResponse>>> {
    let query = MenuQuery {
        location,
        page_id: params.page_id,
        template_id: params.template_id,
        one_page: params.one_page,
        use_cache: params.cache.unwrap_or(true),
    };
    let menu = state.builder.processed_menu(&query)?;
    let html = menu.to_html("nav");
    Ok(ok(MenuResponse { menu, html }))
}

/// Fallback for unknown admin API paths.
pub(crate) async fn unknown_endpoint() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(Envelope::failure("Unknown endpoint")),
    )
        .into_response()
}
