//! Router configuration.
//!
//! Creates the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, patch};
use tower_http::trace::TraceLayer;

use crate::handlers::{catalog, pages, public, sections, widgets};
use crate::middleware::{csrf, security};
use crate::state::AppState;

/// Create the application router.
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/csrf", get(catalog::csrf_token))
        .route(
            "/pages/{id}/sections",
            get(sections::list_sections).post(sections::create_section),
        )
        .route("/pages/{id}/render", get(pages::rendered_page))
        .route(
            "/sections/{id}",
            get(sections::get_section)
                .put(sections::update_section)
                .delete(sections::delete_section),
        )
        .route(
            "/sections/{id}/position",
            patch(sections::update_section_position),
        )
        .route(
            "/sections/{id}/widgets",
            get(widgets::list_widgets).post(widgets::create_widget),
        )
        .route(
            "/sections/{id}/widgets/layout",
            patch(widgets::sync_widget_layout),
        )
        .route("/sections/{id}/render", get(sections::rendered_section))
        .route("/widgets/available", get(catalog::available_widgets))
        .route(
            "/widgets/{id}",
            get(widgets::get_widget)
                .put(widgets::update_widget)
                .delete(widgets::delete_widget),
        )
        .route(
            "/widgets/{id}/position",
            patch(widgets::update_widget_position),
        )
        .route("/widgets/{id}/render", get(widgets::rendered_widget))
        .route("/theme/assets", get(catalog::theme_assets))
        .route("/section-templates", get(catalog::section_templates))
        .route("/menus/{location}", get(catalog::processed_menu))
        .fallback(catalog::unknown_endpoint)
        .layer(from_fn_with_state(Arc::clone(&state), csrf::require_token));

    let mut router = Router::new()
        .nest("/admin/api", api)
        .route("/", get(public::root_page))
        .route("/{slug}", get(public::page));
    for layer in security::header_layers() {
        router = router.layer(layer);
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
