//! Page composition and rendering for Trellis.
//!
//! This crate provides:
//! - [`TemplateComposer`]: full page composition with theme assets and menus
//! - [`SectionResolver`]: section and widget resolution for previews
//! - [`WidgetRegistry`]: renderers keyed by widget type
//! - [`MenuProcessor`]: cached menu trees with current-page flags
//!
//! # Quick Start
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use trellis_cache::NullCache;
//! use trellis_render::{RenderOptions, TemplateComposer};
//! use trellis_store::{MemoryStore, Store, seed_demo};
//!
//! let store = Arc::new(MemoryStore::new());
//! seed_demo(&*store)?;
//! let composer = TemplateComposer::new(store, &NullCache, RenderOptions::default());
//!
//! let page = composer.render_public(None)?;
//! assert!(page.html.starts_with("<!DOCTYPE html>"));
//! # Ok(())
//! # }
//! ```

mod composer;
mod context;
mod fields;
mod html;
mod menu;
mod options;
mod section;
mod styles;
mod theme;
mod widget;

pub use composer::{
    ComposeError, ComposedPage, ErrorPage, SectionPreview, TemplateComposer, WidgetPreview,
};
pub use context::PageRenderContext;
pub use fields::{FieldContext, WidgetError, background_class};
pub use html::escape_html;
pub use menu::{MenuNode, MenuProcessor, MenuQuery, MenuTree};
pub use options::{Diagnostics, RenderOptions};
pub use section::{RenderableSection, SectionResolver, SectionState, sort_widgets};
pub use styles::StyleQueue;
pub use theme::{ResolvedAssets, asset_url, resolve_assets};
pub use widget::{
    RenderFn, RenderedWidget, UnknownWidgetKind, WidgetEnv, WidgetKind, WidgetOutcome,
    WidgetRegistry,
};
