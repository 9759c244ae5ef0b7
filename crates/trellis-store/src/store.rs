//! Store trait and error types.
//!
//! Every method is one atomic operation: it either applies completely or
//! leaves the store unchanged. There are no transactions spanning calls.

use std::fmt;

use crate::model::{
    ContentItem, Id, Media, Menu, MenuItem, Page, Section, Template, TemplateSection, Theme,
    Widget, WidgetType,
};

/// Entity kinds, used for error context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entity {
    Page,
    Template,
    TemplateSection,
    Section,
    Widget,
    WidgetType,
    Menu,
    MenuItem,
    Theme,
    Media,
    Content,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Page => "page",
            Self::Template => "template",
            Self::TemplateSection => "template section",
            Self::Section => "section",
            Self::Widget => "widget",
            Self::WidgetType => "widget type",
            Self::Menu => "menu",
            Self::MenuItem => "menu item",
            Self::Theme => "theme",
            Self::Media => "media",
            Self::Content => "content item",
        })
    }
}

/// Store error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Referenced entity does not exist.
    #[error("{entity} {key} not found")]
    NotFound {
        /// Entity kind.
        entity: Entity,
        /// Id or slug that was looked up.
        key: String,
    },
    /// Optimistic concurrency check failed.
    #[error("{entity} {id} was modified concurrently (expected version {expected}, found {actual})")]
    Conflict {
        /// Entity kind.
        entity: Entity,
        /// Entity id.
        id: Id,
        /// Version the caller based its change on.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },
    /// Write would break a store invariant (duplicate slug, dangling reference).
    #[error("{0}")]
    Invalid(String),
    /// Snapshot file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Snapshot file could not be encoded or decoded.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl StoreError {
    /// Not-found error for an entity id.
    #[must_use]
    pub fn not_found(entity: Entity, key: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Persistence for site entities.
///
/// Insert methods ignore the incoming `id` and allocate a fresh one. Update
/// methods for builder entities take an optional expected version: `None`
/// is last-write-wins, `Some(v)` rejects the write with
/// [`StoreError::Conflict`] unless the stored version is `v`. Successful
/// updates bump the version and `updated_at`.
///
/// Listing methods return entities ordered by id.
pub trait Store: Send + Sync {
    /// Counter bumped by every successful write. Used as a cache etag.
    fn revision(&self) -> u64;

    fn pages(&self) -> Result<Vec<Page>, StoreError>;
    fn page(&self, id: Id) -> Result<Page, StoreError>;
    /// Insert a page. Setting `is_homepage` clears the flag on every other page.
    fn insert_page(&self, page: Page) -> Result<Page, StoreError>;
    fn update_page(&self, page: Page) -> Result<Page, StoreError>;
    /// Delete a page with its sections and their widgets.
    fn delete_page(&self, id: Id) -> Result<(), StoreError>;

    fn templates(&self) -> Result<Vec<Template>, StoreError>;
    fn template(&self, id: Id) -> Result<Template, StoreError>;
    fn insert_template(&self, template: Template) -> Result<Template, StoreError>;

    fn template_sections(&self) -> Result<Vec<TemplateSection>, StoreError>;
    fn template_section(&self, id: Id) -> Result<TemplateSection, StoreError>;
    fn insert_template_section(
        &self,
        section: TemplateSection,
    ) -> Result<TemplateSection, StoreError>;

    /// Sections of a page.
    fn sections(&self, page_id: Id) -> Result<Vec<Section>, StoreError>;
    fn section(&self, id: Id) -> Result<Section, StoreError>;
    fn insert_section(&self, section: Section) -> Result<Section, StoreError>;
    fn update_section(
        &self,
        section: Section,
        expected_version: Option<u64>,
    ) -> Result<Section, StoreError>;
    /// Delete a section with its widgets.
    fn delete_section(&self, id: Id) -> Result<(), StoreError>;

    /// Widgets of a section.
    fn widgets(&self, section_id: Id) -> Result<Vec<Widget>, StoreError>;
    fn widget(&self, id: Id) -> Result<Widget, StoreError>;
    fn insert_widget(&self, widget: Widget) -> Result<Widget, StoreError>;
    fn update_widget(
        &self,
        widget: Widget,
        expected_version: Option<u64>,
    ) -> Result<Widget, StoreError>;
    /// Update several widgets at once. Either all writes apply or none.
    fn update_widgets(
        &self,
        widgets: Vec<(Widget, Option<u64>)>,
    ) -> Result<Vec<Widget>, StoreError>;
    fn delete_widget(&self, id: Id) -> Result<(), StoreError>;

    fn widget_types(&self) -> Result<Vec<WidgetType>, StoreError>;
    fn widget_type(&self, slug: &str) -> Result<WidgetType, StoreError>;
    /// Insert or replace a widget type by slug.
    fn upsert_widget_type(&self, widget_type: WidgetType) -> Result<WidgetType, StoreError>;

    fn menus(&self) -> Result<Vec<Menu>, StoreError>;
    fn insert_menu(&self, menu: Menu) -> Result<Menu, StoreError>;
    /// Flat item rows of a menu.
    fn menu_items(&self, menu_id: Id) -> Result<Vec<MenuItem>, StoreError>;
    fn insert_menu_item(&self, item: MenuItem) -> Result<MenuItem, StoreError>;

    fn themes(&self) -> Result<Vec<Theme>, StoreError>;
    fn theme(&self, id: Id) -> Result<Theme, StoreError>;
    fn insert_theme(&self, theme: Theme) -> Result<Theme, StoreError>;
    /// Make `id` the only active theme.
    fn activate_theme(&self, id: Id) -> Result<Theme, StoreError>;

    fn media(&self, id: Id) -> Result<Media, StoreError>;
    fn insert_media(&self, media: Media) -> Result<Media, StoreError>;
    /// Delete media. Widget fields referencing it are left untouched.
    fn delete_media(&self, id: Id) -> Result<(), StoreError>;

    fn content(&self, id: Id) -> Result<ContentItem, StoreError>;
    fn insert_content(&self, item: ContentItem) -> Result<ContentItem, StoreError>;

    /// The active theme, if any.
    fn active_theme(&self) -> Result<Option<Theme>, StoreError> {
        Ok(self.themes()?.into_iter().find(|theme| theme.active))
    }

    /// Page by slug, regardless of status.
    fn page_by_slug(&self, slug: &str) -> Result<Option<Page>, StoreError> {
        Ok(self.pages()?.into_iter().find(|page| page.slug == slug))
    }
}
