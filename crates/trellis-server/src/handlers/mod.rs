//! HTTP request handlers.

pub(crate) mod catalog;
pub(crate) mod pages;
pub(crate) mod public;
pub(crate) mod sections;
pub(crate) mod widgets;

use serde::Serialize;
use trellis_render::{ComposedPage, RenderableSection};

use crate::error::ServerError;

/// Hybrid render payload: markup plus the structure it was built from.
#[derive(Serialize)]
pub(crate) struct HybridPage {
    html: String,
    styles: Vec<String>,
    scripts: Vec<String>,
    warnings: Vec<String>,
    sections: Vec<RenderableSection>,
}

impl From<ComposedPage> for HybridPage {
    fn from(page: ComposedPage) -> Self {
        Self {
            html: page.html,
            styles: page.styles,
            scripts: page.scripts,
            warnings: page.warnings,
            sections: page.sections,
        }
    }
}

/// Result of an admin API handler.
pub(crate) type ApiResult<T> = Result<T, ServerError>;

