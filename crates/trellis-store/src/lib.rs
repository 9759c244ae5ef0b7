//! Data model and persistence for Trellis sites.
//!
//! This crate provides a [`Store`] trait over the site entities (pages,
//! templates, sections, widgets, menus, themes, media, content). Rendering and
//! the page builder only talk to the trait, so tests can run against a fresh
//! in-memory store.
//!
//! # Architecture
//!
//! - [`model`]: entity types shared by every other crate
//! - [`Store`] trait with one atomic method per read or write
//! - [`MemoryStore`]: in-memory tables, optionally persisted as a JSON snapshot
//! - [`seed_demo`]: built-in widget types plus a small demo site
//!
//! # Example
//!
//! ```
//! use trellis_store::{seed_demo, MemoryStore, Store};
//!
//! let store = MemoryStore::new();
//! seed_demo(&store)?;
//! let home = store.page_by_slug("home")?.expect("seeded homepage");
//! assert!(home.is_homepage);
//! # Ok::<(), trellis_store::StoreError>(())
//! ```

mod memory;
pub mod model;
mod seed;
mod snapshot;
mod store;

pub use memory::{MemoryStore, is_valid_slug};
pub use model::{
    AssetEntry, AssetLayer, ContentItem, FieldDef, FieldKind, FieldMap, FieldValue, GridRect, Id,
    LinkTarget, Media, Menu, MenuItem, Page, PageStatus, Placeholder, PlaceholderSlot, Section,
    SectionKind, SectionSettings, Template, TemplateSection, Theme, Widget, WidgetType,
    fields_to_json,
};
pub use seed::{builtin_widget_types, seed_demo};
pub use store::{Entity, Store, StoreError};
