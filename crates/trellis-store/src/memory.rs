//! In-memory store with optional JSON snapshot persistence.
//!
//! Writes clone the tables, apply the change to the clone, persist it (when a
//! snapshot file is configured) and only then swap it in. A rejected write
//! therefore never leaves partial state behind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::model::{
    ContentItem, Id, Media, Menu, MenuItem, Page, Section, Template, TemplateSection, Theme,
    Widget, WidgetType,
};
use crate::snapshot;
use crate::store::{Entity, Store, StoreError};

/// All persisted rows. This is also the snapshot file format.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Tables {
    pub(crate) revision: u64,
    next_id: Id,
    pages: BTreeMap<Id, Page>,
    templates: BTreeMap<Id, Template>,
    template_sections: BTreeMap<Id, TemplateSection>,
    sections: BTreeMap<Id, Section>,
    widgets: BTreeMap<Id, Widget>,
    widget_types: BTreeMap<String, WidgetType>,
    menus: BTreeMap<Id, Menu>,
    menu_items: BTreeMap<Id, MenuItem>,
    themes: BTreeMap<Id, Theme>,
    media: BTreeMap<Id, Media>,
    content: BTreeMap<Id, ContentItem>,
}

impl Tables {
    fn allocate_id(&mut self) -> Id {
        self.next_id += 1;
        self.next_id
    }

    fn ensure_valid_slug(&self, slug: &str, except: Option<Id>) -> Result<(), StoreError> {
        if !is_valid_slug(slug) {
            return Err(StoreError::Invalid(format!(
                "page slug '{slug}' must be lowercase letters, digits and '-'"
            )));
        }
        let taken = self
            .pages
            .values()
            .any(|page| page.slug == slug && Some(page.id) != except);
        if taken {
            return Err(StoreError::Invalid(format!("page slug '{slug}' is already in use")));
        }
        Ok(())
    }

    fn ensure_template_ref(&self, template_id: Option<Id>) -> Result<(), StoreError> {
        match template_id {
            Some(id) if !self.templates.contains_key(&id) => {
                Err(StoreError::not_found(Entity::Template, id))
            }
            _ => Ok(()),
        }
    }

    fn clear_other_homepages(&mut self, keep: Id) {
        for page in self.pages.values_mut() {
            if page.id != keep {
                page.is_homepage = false;
            }
        }
    }

    fn apply_widget_update(
        &mut self,
        mut widget: Widget,
        expected_version: Option<u64>,
    ) -> Result<Widget, StoreError> {
        let current = self
            .widgets
            .get(&widget.id)
            .ok_or_else(|| StoreError::not_found(Entity::Widget, widget.id))?;
        check_version(Entity::Widget, widget.id, current.version, expected_version)?;
        if !self.sections.contains_key(&widget.section_id) {
            return Err(StoreError::not_found(Entity::Section, widget.section_id));
        }
        widget.version = current.version + 1;
        widget.updated_at = Utc::now();
        self.widgets.insert(widget.id, widget.clone());
        Ok(widget)
    }
}

/// Whether `slug` is non-empty lowercase ASCII letters, digits and `-`.
#[must_use]
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

fn check_version(
    entity: Entity,
    id: Id,
    actual: u64,
    expected: Option<u64>,
) -> Result<(), StoreError> {
    match expected {
        Some(expected) if expected != actual => Err(StoreError::Conflict {
            entity,
            id,
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}

fn get_cloned<K, V>(map: &BTreeMap<K, V>, key: &K, entity: Entity) -> Result<V, StoreError>
where
    K: Ord + std::fmt::Display,
    V: Clone,
{
    map.get(key)
        .cloned()
        .ok_or_else(|| StoreError::not_found(entity, key))
}

/// Store keeping all rows in memory.
///
/// With [`MemoryStore::open`] every successful write is also written to a
/// JSON snapshot file, which is read back on the next open.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    snapshot: Option<PathBuf>,
}

impl MemoryStore {
    /// Create an empty, purely in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store persisted at `path`, loading the snapshot if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing snapshot cannot be read or decoded.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let tables = snapshot::load(&path)?.unwrap_or_default();
        tracing::info!(
            path = %path.display(),
            revision = tables.revision,
            "Opened site store"
        );
        Ok(Self {
            tables: RwLock::new(tables),
            snapshot: Some(path),
        })
    }

    /// Snapshot file, if the store is persisted.
    #[must_use]
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    /// Whether the store holds no pages and no themes.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let tables = self.tables.read().unwrap();
        tables.pages.is_empty() && tables.themes.is_empty()
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        f(&self.tables.read().unwrap())
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let mut tables = self.tables.write().unwrap();
        let mut next = tables.clone();
        let out = f(&mut next)?;
        next.revision += 1;
        if let Some(path) = &self.snapshot {
            snapshot::save(path, &next)?;
        }
        *tables = next;
        Ok(out)
    }
}

impl Store for MemoryStore {
    fn revision(&self) -> u64 {
        self.read(|t| t.revision)
    }

    fn pages(&self) -> Result<Vec<Page>, StoreError> {
        Ok(self.read(|t| t.pages.values().cloned().collect()))
    }

    fn page(&self, id: Id) -> Result<Page, StoreError> {
        self.read(|t| get_cloned(&t.pages, &id, Entity::Page))
    }

    fn insert_page(&self, mut page: Page) -> Result<Page, StoreError> {
        self.write(|t| {
            t.ensure_valid_slug(&page.slug, None)?;
            t.ensure_template_ref(page.template_id)?;
            page.id = t.allocate_id();
            page.updated_at = Utc::now();
            if page.is_homepage {
                t.clear_other_homepages(page.id);
            }
            t.pages.insert(page.id, page.clone());
            Ok(page)
        })
    }

    fn update_page(&self, mut page: Page) -> Result<Page, StoreError> {
        self.write(|t| {
            if !t.pages.contains_key(&page.id) {
                return Err(StoreError::not_found(Entity::Page, page.id));
            }
            t.ensure_valid_slug(&page.slug, Some(page.id))?;
            t.ensure_template_ref(page.template_id)?;
            page.updated_at = Utc::now();
            if page.is_homepage {
                t.clear_other_homepages(page.id);
            }
            t.pages.insert(page.id, page.clone());
            Ok(page)
        })
    }

    fn delete_page(&self, id: Id) -> Result<(), StoreError> {
        self.write(|t| {
            t.pages
                .remove(&id)
                .ok_or_else(|| StoreError::not_found(Entity::Page, id))?;
            let section_ids: Vec<Id> = t
                .sections
                .values()
                .filter(|s| s.page_id == id)
                .map(|s| s.id)
                .collect();
            t.sections.retain(|_, s| s.page_id != id);
            t.widgets.retain(|_, w| !section_ids.contains(&w.section_id));
            Ok(())
        })
    }

    fn templates(&self) -> Result<Vec<Template>, StoreError> {
        Ok(self.read(|t| t.templates.values().cloned().collect()))
    }

    fn template(&self, id: Id) -> Result<Template, StoreError> {
        self.read(|t| get_cloned(&t.templates, &id, Entity::Template))
    }

    fn insert_template(&self, mut template: Template) -> Result<Template, StoreError> {
        self.write(|t| {
            if !t.themes.contains_key(&template.theme_id) {
                return Err(StoreError::not_found(Entity::Theme, template.theme_id));
            }
            template.id = t.allocate_id();
            t.templates.insert(template.id, template.clone());
            Ok(template)
        })
    }

    fn template_sections(&self) -> Result<Vec<TemplateSection>, StoreError> {
        Ok(self.read(|t| t.template_sections.values().cloned().collect()))
    }

    fn template_section(&self, id: Id) -> Result<TemplateSection, StoreError> {
        self.read(|t| get_cloned(&t.template_sections, &id, Entity::TemplateSection))
    }

    fn insert_template_section(
        &self,
        mut section: TemplateSection,
    ) -> Result<TemplateSection, StoreError> {
        self.write(|t| {
            if !t.templates.contains_key(&section.template_id) {
                return Err(StoreError::not_found(Entity::Template, section.template_id));
            }
            section.id = t.allocate_id();
            t.template_sections.insert(section.id, section.clone());
            Ok(section)
        })
    }

    fn sections(&self, page_id: Id) -> Result<Vec<Section>, StoreError> {
        self.read(|t| {
            if !t.pages.contains_key(&page_id) {
                return Err(StoreError::not_found(Entity::Page, page_id));
            }
            Ok(t.sections
                .values()
                .filter(|s| s.page_id == page_id)
                .cloned()
                .collect())
        })
    }

    fn section(&self, id: Id) -> Result<Section, StoreError> {
        self.read(|t| get_cloned(&t.sections, &id, Entity::Section))
    }

    fn insert_section(&self, mut section: Section) -> Result<Section, StoreError> {
        self.write(|t| {
            if !t.pages.contains_key(&section.page_id) {
                return Err(StoreError::not_found(Entity::Page, section.page_id));
            }
            if !t.template_sections.contains_key(&section.template_section_id) {
                return Err(StoreError::not_found(
                    Entity::TemplateSection,
                    section.template_section_id,
                ));
            }
            section.id = t.allocate_id();
            section.version = 1;
            section.updated_at = Utc::now();
            t.sections.insert(section.id, section.clone());
            Ok(section)
        })
    }

    fn update_section(
        &self,
        mut section: Section,
        expected_version: Option<u64>,
    ) -> Result<Section, StoreError> {
        self.write(|t| {
            let current = t
                .sections
                .get(&section.id)
                .ok_or_else(|| StoreError::not_found(Entity::Section, section.id))?;
            check_version(Entity::Section, section.id, current.version, expected_version)?;
            if !t.template_sections.contains_key(&section.template_section_id) {
                return Err(StoreError::not_found(
                    Entity::TemplateSection,
                    section.template_section_id,
                ));
            }
            // Sections never move between pages
            section.page_id = current.page_id;
            section.version = current.version + 1;
            section.updated_at = Utc::now();
            t.sections.insert(section.id, section.clone());
            Ok(section)
        })
    }

    fn delete_section(&self, id: Id) -> Result<(), StoreError> {
        self.write(|t| {
            t.sections
                .remove(&id)
                .ok_or_else(|| StoreError::not_found(Entity::Section, id))?;
            t.widgets.retain(|_, w| w.section_id != id);
            Ok(())
        })
    }

    fn widgets(&self, section_id: Id) -> Result<Vec<Widget>, StoreError> {
        self.read(|t| {
            if !t.sections.contains_key(&section_id) {
                return Err(StoreError::not_found(Entity::Section, section_id));
            }
            Ok(t.widgets
                .values()
                .filter(|w| w.section_id == section_id)
                .cloned()
                .collect())
        })
    }

    fn widget(&self, id: Id) -> Result<Widget, StoreError> {
        self.read(|t| get_cloned(&t.widgets, &id, Entity::Widget))
    }

    fn insert_widget(&self, mut widget: Widget) -> Result<Widget, StoreError> {
        self.write(|t| {
            if !t.sections.contains_key(&widget.section_id) {
                return Err(StoreError::not_found(Entity::Section, widget.section_id));
            }
            widget.id = t.allocate_id();
            widget.version = 1;
            widget.updated_at = Utc::now();
            t.widgets.insert(widget.id, widget.clone());
            Ok(widget)
        })
    }

    fn update_widget(
        &self,
        widget: Widget,
        expected_version: Option<u64>,
    ) -> Result<Widget, StoreError> {
        self.write(|t| t.apply_widget_update(widget, expected_version))
    }

    fn update_widgets(
        &self,
        widgets: Vec<(Widget, Option<u64>)>,
    ) -> Result<Vec<Widget>, StoreError> {
        self.write(|t| {
            widgets
                .into_iter()
                .map(|(widget, expected)| t.apply_widget_update(widget, expected))
                .collect()
        })
    }

    fn delete_widget(&self, id: Id) -> Result<(), StoreError> {
        self.write(|t| {
            t.widgets
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| StoreError::not_found(Entity::Widget, id))
        })
    }

    fn widget_types(&self) -> Result<Vec<WidgetType>, StoreError> {
        Ok(self.read(|t| t.widget_types.values().cloned().collect()))
    }

    fn widget_type(&self, slug: &str) -> Result<WidgetType, StoreError> {
        self.read(|t| {
            t.widget_types
                .get(slug)
                .cloned()
                .ok_or_else(|| StoreError::not_found(Entity::WidgetType, slug))
        })
    }

    fn upsert_widget_type(&self, widget_type: WidgetType) -> Result<WidgetType, StoreError> {
        self.write(|t| {
            t.widget_types
                .insert(widget_type.slug.clone(), widget_type.clone());
            Ok(widget_type)
        })
    }

    fn menus(&self) -> Result<Vec<Menu>, StoreError> {
        Ok(self.read(|t| t.menus.values().cloned().collect()))
    }

    fn insert_menu(&self, mut menu: Menu) -> Result<Menu, StoreError> {
        self.write(|t| {
            t.ensure_template_ref(menu.template_id)?;
            menu.id = t.allocate_id();
            t.menus.insert(menu.id, menu.clone());
            Ok(menu)
        })
    }

    fn menu_items(&self, menu_id: Id) -> Result<Vec<MenuItem>, StoreError> {
        self.read(|t| {
            if !t.menus.contains_key(&menu_id) {
                return Err(StoreError::not_found(Entity::Menu, menu_id));
            }
            Ok(t.menu_items
                .values()
                .filter(|item| item.menu_id == menu_id)
                .cloned()
                .collect())
        })
    }

    fn insert_menu_item(&self, mut item: MenuItem) -> Result<MenuItem, StoreError> {
        self.write(|t| {
            if !t.menus.contains_key(&item.menu_id) {
                return Err(StoreError::not_found(Entity::Menu, item.menu_id));
            }
            if let Some(parent) = item.parent_id
                && t.menu_items.get(&parent).is_none_or(|p| p.menu_id != item.menu_id)
            {
                return Err(StoreError::Invalid(format!(
                    "menu item parent {parent} is not in menu {}",
                    item.menu_id
                )));
            }
            item.id = t.allocate_id();
            t.menu_items.insert(item.id, item.clone());
            Ok(item)
        })
    }

    fn themes(&self) -> Result<Vec<Theme>, StoreError> {
        Ok(self.read(|t| t.themes.values().cloned().collect()))
    }

    fn theme(&self, id: Id) -> Result<Theme, StoreError> {
        self.read(|t| get_cloned(&t.themes, &id, Entity::Theme))
    }

    fn insert_theme(&self, mut theme: Theme) -> Result<Theme, StoreError> {
        self.write(|t| {
            theme.id = t.allocate_id();
            if theme.active {
                for other in t.themes.values_mut() {
                    other.active = false;
                }
            }
            t.themes.insert(theme.id, theme.clone());
            Ok(theme)
        })
    }

    fn activate_theme(&self, id: Id) -> Result<Theme, StoreError> {
        self.write(|t| {
            if !t.themes.contains_key(&id) {
                return Err(StoreError::not_found(Entity::Theme, id));
            }
            for theme in t.themes.values_mut() {
                theme.active = theme.id == id;
            }
            get_cloned(&t.themes, &id, Entity::Theme)
        })
    }

    fn media(&self, id: Id) -> Result<Media, StoreError> {
        self.read(|t| get_cloned(&t.media, &id, Entity::Media))
    }

    fn insert_media(&self, mut media: Media) -> Result<Media, StoreError> {
        self.write(|t| {
            media.id = t.allocate_id();
            t.media.insert(media.id, media.clone());
            Ok(media)
        })
    }

    fn delete_media(&self, id: Id) -> Result<(), StoreError> {
        self.write(|t| {
            t.media
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| StoreError::not_found(Entity::Media, id))
        })
    }

    fn content(&self, id: Id) -> Result<ContentItem, StoreError> {
        self.read(|t| get_cloned(&t.content, &id, Entity::Content))
    }

    fn insert_content(&self, mut item: ContentItem) -> Result<ContentItem, StoreError> {
        self.write(|t| {
            item.id = t.allocate_id();
            t.content.insert(item.id, item.clone());
            Ok(item)
        })
    }
}
