//! Page builder backend for Trellis.
//!
//! [`PageBuilder`] implements the operations behind the grid editor: section
//! and widget CRUD, partial position updates, batch layout sync, hybrid
//! (HTML plus structure) previews and the catalogs the editor needs.
//!
//! Payloads are validated completely before anything is written. Problems are
//! reported per field in [`ValidationErrors`]; a rejected call never changes
//! stored state.
//!
//! # Example
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use trellis_builder::{PageBuilder, PositionPayload};
//! use trellis_cache::NullCache;
//! use trellis_render::{RenderOptions, TemplateComposer};
//! use trellis_store::{MemoryStore, Store, seed_demo};
//!
//! let store = Arc::new(MemoryStore::new());
//! seed_demo(&*store)?;
//! let home = store.page_by_slug("home")?.expect("seeded");
//! let composer = TemplateComposer::new(store, &NullCache, RenderOptions::default());
//! let builder = PageBuilder::new(Arc::new(composer));
//!
//! let section = builder.list_sections(home.id)?[0].clone();
//! let mut payload = PositionPayload::default();
//! payload.position.w = Some(20);
//! let err = builder.update_section_position(section.id, &payload).unwrap_err();
//! assert_eq!(err.status_code(), 422);
//! # Ok(())
//! # }
//! ```

mod builder;
mod error;
mod grid;
mod payload;

pub use builder::{PageBuilder, WidgetCatalogEntry, WidgetRecord};
pub use error::{BuilderError, ValidationErrors};
pub use grid::{LayoutItem, PositionPatch, check_locked_overlap, plan_layout, validate_rect};
pub use payload::{
    LayoutPayload, PositionPayload, SectionPayload, WidgetPayload, coerce_fields, parse_settings,
};
