//! Application state.
//!
//! Shared state for all request handlers.

use std::sync::Arc;

use trellis_builder::PageBuilder;
use trellis_render::TemplateComposer;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Composer for the public site.
    pub(crate) composer: Arc<TemplateComposer>,
    /// Page builder operations for the admin API.
    pub(crate) builder: PageBuilder,
    /// Token mutating admin calls must echo in `X-CSRF-Token`.
    pub(crate) csrf_token: String,
    /// Application version, mixed into page `ETag`s.
    pub(crate) version: String,
    /// Log render warnings of public pages.
    pub(crate) verbose: bool,
}
