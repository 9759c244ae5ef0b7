//! Page builder operations.
//!
//! Each mutating call validates its payload completely before touching the
//! store and then issues one atomic store write, so a rejected call leaves
//! stored state unchanged.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use trellis_render::{
    ComposedPage, MenuQuery, MenuTree, ResolvedAssets, SectionPreview, TemplateComposer,
    WidgetPreview, sort_widgets,
};
use trellis_store::{
    FieldMap, GridRect, Id, Placeholder, Section, SectionSettings, Store, StoreError,
    TemplateSection, Widget, WidgetType, fields_to_json,
};

use crate::error::{BuilderError, ValidationErrors};
use crate::grid::{PositionPatch, check_locked_overlap, next_row, plan_layout};
use crate::payload::{
    LayoutPayload, PositionPayload, SectionPayload, WidgetPayload, check_references,
    coerce_fields, parse_settings,
};

/// Widget as exposed by the builder API, with plain JSON field values.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WidgetRecord {
    pub id: Id,
    pub section_id: Id,
    pub widget_type: String,
    pub order: i32,
    pub position: Option<GridRect>,
    pub fields: Map<String, Value>,
    pub locked: bool,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl From<Widget> for WidgetRecord {
    fn from(widget: Widget) -> Self {
        Self {
            fields: fields_to_json(&widget.fields),
            id: widget.id,
            section_id: widget.section_id,
            widget_type: widget.widget_type,
            order: widget.order,
            position: widget.position,
            locked: widget.locked,
            version: widget.version,
            updated_at: widget.updated_at,
        }
    }
}

/// Entry of the widget catalog.
#[derive(Clone, Debug, Serialize)]
pub struct WidgetCatalogEntry {
    #[serde(flatten)]
    pub widget_type: WidgetType,
    /// Whether a dedicated renderer exists. Others render as a field dump.
    pub has_renderer: bool,
}

/// Section and widget editing plus preview rendering for one site.
pub struct PageBuilder {
    store: Arc<dyn Store>,
    composer: Arc<TemplateComposer>,
    columns: u16,
}

impl PageBuilder {
    /// Create a builder. The grid width comes from the composer's options.
    pub fn new(composer: Arc<TemplateComposer>) -> Self {
        Self {
            store: Arc::clone(composer.store()),
            columns: composer.options().grid_columns.max(1),
            composer,
        }
    }

    #[must_use]
    pub fn columns(&self) -> u16 {
        self.columns
    }

    // Sections

    /// Sections of a page in layout order `(y, x, id)`.
    pub fn list_sections(&self, page_id: Id) -> Result<Vec<Section>, BuilderError> {
        self.store.page(page_id)?;
        let mut sections = self.store.sections(page_id)?;
        sections.sort_by_key(|s| (s.position.y, s.position.x, s.id));
        Ok(sections)
    }

    pub fn get_section(&self, id: Id) -> Result<Section, BuilderError> {
        Ok(self.store.section(id)?)
    }

    /// Create a section on a page. Without a position it is appended as a
    /// full-width row below the existing sections.
    pub fn create_section(
        &self,
        page_id: Id,
        payload: &SectionPayload,
    ) -> Result<Section, BuilderError> {
        let page = self.store.page(page_id)?;
        let mut errors = ValidationErrors::new();

        let template_section = match payload.template_section_id {
            None => {
                errors.add("template_section_id", "is required");
                None
            }
            Some(id) => self.template_section_for(page.template_id, id, &mut errors)?,
        };
        let settings = self.settings(payload.settings.as_ref(), &mut errors);

        let siblings = match &template_section {
            Some(ts) => self.placeholder_siblings(page_id, ts.id)?,
            None => Vec::new(),
        };
        let base = GridRect::new(
            0,
            next_row(siblings.iter().map(|s| s.position)),
            self.columns,
            1,
        );
        let position = self.position(
            None,
            base,
            payload.position.as_ref(),
            section_siblings(&siblings),
            &mut errors,
        );

        errors.into_result()?;
        let (Some(template_section), Some(position)) = (template_section, position) else {
            return Err(ValidationErrors::single("payload", "is invalid").into());
        };

        let section = self.store.insert_section(Section {
            id: 0,
            page_id,
            template_section_id: template_section.id,
            settings: settings.unwrap_or_default(),
            position,
            locked: payload.locked.unwrap_or(false),
            version: 0,
            updated_at: Utc::now(),
        })?;
        tracing::info!(section_id = section.id, page_id, "Created section");
        Ok(section)
    }

    /// Update a section. Absent payload keys keep their stored values.
    pub fn update_section(
        &self,
        id: Id,
        payload: &SectionPayload,
    ) -> Result<Section, BuilderError> {
        let current = self.store.section(id)?;
        let page = self.store.page(current.page_id)?;
        let mut errors = ValidationErrors::new();
        let mut section = current.clone();

        if let Some(template_section_id) = payload.template_section_id
            && let Some(ts) =
                self.template_section_for(page.template_id, template_section_id, &mut errors)?
        {
            section.template_section_id = ts.id;
        }
        if let Some(settings) = self.settings(payload.settings.as_ref(), &mut errors) {
            section.settings = settings;
        }
        if payload.position.is_some() {
            let siblings =
                self.placeholder_siblings(current.page_id, section.template_section_id)?;
            if let Some(position) = self.position(
                Some(id),
                current.position,
                payload.position.as_ref(),
                section_siblings(&siblings),
                &mut errors,
            ) {
                section.position = position;
            }
        }
        if let Some(locked) = payload.locked {
            section.locked = locked;
        }

        errors.into_result()?;
        let section = self.store.update_section(section, payload.version)?;
        tracing::info!(section_id = id, version = section.version, "Updated section");
        Ok(section)
    }

    /// Move or resize a section.
    pub fn update_section_position(
        &self,
        id: Id,
        payload: &PositionPayload,
    ) -> Result<Section, BuilderError> {
        let mut section = self.store.section(id)?;
        require_coordinates(&payload.position)?;
        let siblings = self.placeholder_siblings(section.page_id, section.template_section_id)?;
        let mut errors = ValidationErrors::new();
        let position = self.position(
            Some(id),
            section.position,
            Some(&payload.position),
            section_siblings(&siblings),
            &mut errors,
        );
        errors.into_result()?;
        if let Some(position) = position {
            section.position = position;
        }
        let section = self.store.update_section(section, payload.version)?;
        tracing::debug!(section_id = id, position = ?section.position, "Moved section");
        Ok(section)
    }

    /// Delete a section and its widgets, returning the deleted section.
    pub fn delete_section(&self, id: Id) -> Result<Section, BuilderError> {
        let section = self.store.section(id)?;
        self.store.delete_section(id)?;
        tracing::info!(section_id = id, page_id = section.page_id, "Deleted section");
        Ok(section)
    }

    // Widgets

    /// Widgets of a section in render order.
    pub fn list_widgets(&self, section_id: Id) -> Result<Vec<WidgetRecord>, BuilderError> {
        self.store.section(section_id)?;
        let mut widgets = self.store.widgets(section_id)?;
        sort_widgets(&mut widgets);
        Ok(widgets.into_iter().map(WidgetRecord::from).collect())
    }

    pub fn get_widget(&self, id: Id) -> Result<WidgetRecord, BuilderError> {
        Ok(self.store.widget(id)?.into())
    }

    /// Create a widget at the end of a section.
    pub fn create_widget(
        &self,
        section_id: Id,
        payload: &WidgetPayload,
    ) -> Result<WidgetRecord, BuilderError> {
        self.store.section(section_id)?;
        let mut errors = ValidationErrors::new();

        let widget_type = match payload.widget_type.as_deref() {
            None | Some("") => {
                errors.add("widget_type", "is required");
                None
            }
            Some(slug) => self.widget_type(slug, &mut errors)?,
        };
        let fields = match &widget_type {
            Some(widget_type) => self.fields(
                widget_type,
                payload.fields.as_ref().unwrap_or(&Map::new()),
                &mut errors,
            )?,
            None => None,
        };

        let siblings = self.store.widgets(section_id)?;
        let position = match &payload.position {
            None => None,
            Some(patch) => {
                let base = first_placement(
                    patch,
                    next_row(siblings.iter().filter_map(|w| w.position)),
                    self.columns,
                );
                self.position(
                    None,
                    base,
                    Some(patch),
                    widget_siblings(&siblings),
                    &mut errors,
                )
            }
        };

        errors.into_result()?;
        let (Some(widget_type), Some(fields)) = (widget_type, fields) else {
            return Err(ValidationErrors::single("payload", "is invalid").into());
        };

        let order = payload.order.unwrap_or_else(|| {
            siblings
                .iter()
                .map(|w| w.order)
                .max()
                .map_or(0, |max| max.saturating_add(1))
        });
        let widget = self.store.insert_widget(Widget {
            id: 0,
            section_id,
            widget_type: widget_type.slug,
            order,
            position,
            fields,
            locked: payload.locked.unwrap_or(false),
            version: 0,
            updated_at: Utc::now(),
        })?;
        tracing::info!(
            widget_id = widget.id,
            section_id,
            widget_type = %widget.widget_type,
            "Created widget"
        );
        Ok(widget.into())
    }

    /// Update a widget. Absent payload keys keep their stored values; the
    /// widget type cannot change.
    pub fn update_widget(
        &self,
        id: Id,
        payload: &WidgetPayload,
    ) -> Result<WidgetRecord, BuilderError> {
        let current = self.store.widget(id)?;
        let mut errors = ValidationErrors::new();
        let mut widget = current.clone();

        if let Some(slug) = payload.widget_type.as_deref()
            && slug != current.widget_type
        {
            errors.add("widget_type", "cannot be changed");
        }
        if let Some(input) = &payload.fields
            && let Some(widget_type) = self.widget_type(&current.widget_type, &mut errors)?
            && let Some(fields) = self.fields(&widget_type, input, &mut errors)?
        {
            widget.fields = fields;
        }
        if let Some(order) = payload.order {
            widget.order = order;
        }
        if let Some(patch) = &payload.position {
            let siblings = self.store.widgets(current.section_id)?;
            let base = current
                .position
                .unwrap_or_else(|| first_placement(patch, 0, self.columns));
            widget.position = self.position(
                Some(id),
                base,
                Some(patch),
                widget_siblings(&siblings),
                &mut errors,
            );
        }
        if let Some(locked) = payload.locked {
            widget.locked = locked;
        }

        errors.into_result()?;
        let widget = self.store.update_widget(widget, payload.version)?;
        tracing::info!(widget_id = id, version = widget.version, "Updated widget");
        Ok(widget.into())
    }

    /// Move or resize a widget inside its section.
    pub fn update_widget_position(
        &self,
        id: Id,
        payload: &PositionPayload,
    ) -> Result<WidgetRecord, BuilderError> {
        let mut widget = self.store.widget(id)?;
        require_coordinates(&payload.position)?;
        let siblings = self.store.widgets(widget.section_id)?;
        let base = widget
            .position
            .unwrap_or_else(|| first_placement(&payload.position, 0, self.columns));
        let mut errors = ValidationErrors::new();
        let position = self.position(
            Some(id),
            base,
            Some(&payload.position),
            widget_siblings(&siblings),
            &mut errors,
        );
        errors.into_result()?;
        widget.position = position;
        let widget = self.store.update_widget(widget, payload.version)?;
        tracing::debug!(widget_id = id, position = ?widget.position, "Moved widget");
        Ok(widget.into())
    }

    /// Apply a batch of widget rectangles from the grid editor and renumber
    /// widget order to follow the grid. All writes apply or none do.
    pub fn sync_widget_layout(
        &self,
        section_id: Id,
        payload: &LayoutPayload,
    ) -> Result<Vec<WidgetRecord>, BuilderError> {
        self.store.section(section_id)?;
        let widgets = self.store.widgets(section_id)?;
        let writes = plan_layout(&widgets, &payload.items, self.columns)?;
        let changed = writes.len();
        if !writes.is_empty() {
            self.store.update_widgets(writes)?;
        }
        tracing::info!(
            section_id,
            items = payload.items.len(),
            changed,
            "Synced widget layout"
        );
        self.list_widgets(section_id)
    }

    /// Delete a widget, returning it.
    pub fn delete_widget(&self, id: Id) -> Result<WidgetRecord, BuilderError> {
        let widget = self.store.widget(id)?;
        self.store.delete_widget(id)?;
        tracing::info!(widget_id = id, section_id = widget.section_id, "Deleted widget");
        Ok(widget.into())
    }

    // Hybrid renders

    /// Compose a page for preview, drafts included.
    pub fn rendered_page(&self, page_id: Id) -> Result<ComposedPage, BuilderError> {
        let page = self.store.page(page_id)?;
        Ok(self.composer.compose_page(&page)?)
    }

    pub fn rendered_section(&self, section_id: Id) -> Result<SectionPreview, BuilderError> {
        Ok(self.composer.preview_section(section_id)?)
    }

    pub fn rendered_widget(&self, widget_id: Id) -> Result<WidgetPreview, BuilderError> {
        Ok(self.composer.preview_widget(widget_id)?)
    }

    // Catalogs

    /// Widget types ordered by slug.
    pub fn available_widgets(&self) -> Result<Vec<WidgetCatalogEntry>, BuilderError> {
        let mut types = self.store.widget_types()?;
        types.sort_by(|a, b| a.slug.cmp(&b.slug));
        let registry = self.composer.registry();
        Ok(types
            .into_iter()
            .map(|widget_type| WidgetCatalogEntry {
                has_renderer: registry.renderer_for(&widget_type.slug).is_some(),
                widget_type,
            })
            .collect())
    }

    /// Template sections, optionally of one template.
    pub fn section_templates(
        &self,
        template_id: Option<Id>,
    ) -> Result<Vec<TemplateSection>, BuilderError> {
        if let Some(id) = template_id {
            self.store.template(id)?;
        }
        Ok(self
            .store
            .template_sections()?
            .into_iter()
            .filter(|ts| template_id.is_none_or(|id| ts.template_id == id))
            .collect())
    }

    pub fn theme_assets(&self) -> Result<ResolvedAssets, BuilderError> {
        Ok(self.composer.theme_assets(None)?)
    }

    pub fn processed_menu(&self, query: &MenuQuery) -> Result<MenuTree, BuilderError> {
        Ok(self.composer.processed_menu(query)?)
    }

    /// Sections of `page_id` in the same placeholder as `template_section_id`.
    /// Each placeholder has its own grid, so only these can collide.
    fn placeholder_siblings(
        &self,
        page_id: Id,
        template_section_id: Id,
    ) -> Result<Vec<Section>, StoreError> {
        let placeholders: BTreeMap<Id, Placeholder> = self
            .store
            .template_sections()?
            .into_iter()
            .map(|ts| (ts.id, ts.placeholder))
            .collect();
        let Some(target) = placeholders.get(&template_section_id) else {
            return Ok(Vec::new());
        };
        Ok(self
            .store
            .sections(page_id)?
            .into_iter()
            .filter(|s| placeholders.get(&s.template_section_id) == Some(target))
            .collect())
    }

    // Validation helpers. Payload problems go to `errors`; store failures
    // other than not-found propagate.

    fn template_section_for(
        &self,
        page_template: Option<Id>,
        id: Id,
        errors: &mut ValidationErrors,
    ) -> Result<Option<TemplateSection>, StoreError> {
        match self.store.template_section(id) {
            Ok(ts) if page_template.is_some_and(|t| t != ts.template_id) => {
                errors.add(
                    "template_section_id",
                    format!("template section {id} does not belong to the page template"),
                );
                Ok(None)
            }
            Ok(ts) => Ok(Some(ts)),
            Err(e) if e.is_not_found() => {
                errors.add(
                    "template_section_id",
                    format!("template section {id} does not exist"),
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn widget_type(
        &self,
        slug: &str,
        errors: &mut ValidationErrors,
    ) -> Result<Option<WidgetType>, StoreError> {
        match self.store.widget_type(slug) {
            Ok(widget_type) => Ok(Some(widget_type)),
            Err(e) if e.is_not_found() => {
                errors.add("widget_type", format!("unknown widget type '{slug}'"));
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn fields(
        &self,
        widget_type: &WidgetType,
        input: &Map<String, Value>,
        errors: &mut ValidationErrors,
    ) -> Result<Option<FieldMap>, StoreError> {
        match coerce_fields(widget_type, input) {
            Ok(fields) => {
                let dangling = check_references(&fields, self.store.as_ref())?;
                if dangling.is_empty() {
                    Ok(Some(fields))
                } else {
                    errors.merge(dangling);
                    Ok(None)
                }
            }
            Err(e) => {
                errors.merge(e);
                Ok(None)
            }
        }
    }

    fn settings(
        &self,
        value: Option<&Value>,
        errors: &mut ValidationErrors,
    ) -> Option<SectionSettings> {
        match parse_settings(value?, self.columns) {
            Ok(settings) => Some(settings),
            Err(e) => {
                errors.merge(e);
                None
            }
        }
    }

    fn position(
        &self,
        id: Option<Id>,
        base: GridRect,
        patch: Option<&PositionPatch>,
        siblings: Vec<(Id, GridRect, bool)>,
        errors: &mut ValidationErrors,
    ) -> Option<GridRect> {
        let rect = match patch {
            Some(patch) => patch.apply(base, self.columns),
            None => PositionPatch::default().apply(base, self.columns),
        };
        let rect = match rect {
            Ok(rect) => rect,
            Err(e) => {
                errors.merge(e);
                return None;
            }
        };
        match check_locked_overlap(id, &rect, siblings) {
            Ok(()) => Some(rect),
            Err(e) => {
                errors.merge(e);
                None
            }
        }
    }
}

fn section_siblings(sections: &[Section]) -> Vec<(Id, GridRect, bool)> {
    sections
        .iter()
        .map(|s| (s.id, s.position, s.locked))
        .collect()
}

fn widget_siblings(widgets: &[Widget]) -> Vec<(Id, GridRect, bool)> {
    widgets
        .iter()
        .filter_map(|w| w.position.map(|rect| (w.id, rect, w.locked)))
        .collect()
}

/// Starting rectangle for a widget placed on the grid for the first time:
/// one row at `y`, spanning the columns right of the requested `x`.
fn first_placement(patch: &PositionPatch, y: u16, columns: u16) -> GridRect {
    let x = patch
        .x
        .and_then(|x| u16::try_from(x).ok())
        .filter(|&x| x < columns)
        .unwrap_or(0);
    GridRect::new(x, y, columns - x, 1)
}

fn require_coordinates(patch: &PositionPatch) -> Result<(), BuilderError> {
    if patch.is_empty() {
        return Err(
            ValidationErrors::single("position", "at least one of x, y, w, h is required").into(),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use static_assertions::assert_impl_all;
    use trellis_cache::NullCache;
    use trellis_render::RenderOptions;
    use trellis_store::{FieldDef, FieldKind, MemoryStore, Page, seed_demo};

    use super::*;
    use crate::grid::LayoutItem;

    assert_impl_all!(PageBuilder: Send, Sync);

    struct Site {
        store: Arc<MemoryStore>,
        builder: PageBuilder,
        home: Page,
    }

    impl Site {
        fn template_section(&self, slug: &str) -> TemplateSection {
            self.store
                .template_sections()
                .unwrap()
                .into_iter()
                .find(|ts| ts.slug == slug)
                .unwrap()
        }

        fn home_section(&self, slug: &str) -> Section {
            let ts = self.template_section(slug);
            self.store
                .sections(self.home.id)
                .unwrap()
                .into_iter()
                .find(|s| s.template_section_id == ts.id)
                .unwrap()
        }
    }

    fn site() -> Site {
        let store = Arc::new(MemoryStore::new());
        seed_demo(&*store).unwrap();
        let home = store.page_by_slug("home").unwrap().unwrap();
        let composer = TemplateComposer::new(
            Arc::clone(&store) as Arc<dyn Store>,
            &NullCache,
            RenderOptions::default(),
        );
        Site {
            builder: PageBuilder::new(Arc::new(composer)),
            store,
            home,
        }
    }

    fn position(x: i64, y: i64, w: i64, h: i64) -> PositionPayload {
        PositionPayload {
            position: PositionPatch {
                x: Some(x),
                y: Some(y),
                w: Some(w),
                h: Some(h),
            },
            version: None,
        }
    }

    fn section_payload(value: Value) -> SectionPayload {
        serde_json::from_value(value).unwrap()
    }

    fn widget_payload(value: Value) -> WidgetPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_list_sections_in_layout_order() {
        let site = site();
        let sections = site.builder.list_sections(site.home.id).unwrap();
        let positions: Vec<(u16, u16)> = sections
            .iter()
            .map(|s| (s.position.y, s.position.x))
            .collect();
        assert_eq!(positions, vec![(0, 0), (0, 0), (4, 0)]);
        assert_eq!(site.builder.list_sections(999).unwrap_err().status_code(), 404);
    }

    #[test]
    fn test_create_section_appends_row() {
        let site = site();
        let main = site.template_section("main");

        let section = site
            .builder
            .create_section(
                site.home.id,
                &section_payload(json!({
                    "template_section_id": main.id,
                    "settings": {"background_color": "#fff", "columns": 3}
                })),
            )
            .unwrap();

        assert_eq!(section.position, GridRect::new(0, 10, 12, 1));
        assert_eq!(section.settings.columns, Some(3));
        assert_eq!(section.version, 1);
    }

    #[test]
    fn test_create_section_rejects_bad_payload_without_writing() {
        let site = site();
        let revision = site.store.revision();

        let err = site
            .builder
            .create_section(
                site.home.id,
                &section_payload(json!({
                    "settings": {"background_color": "url(evil)"},
                    "position": {"w": 0}
                })),
            )
            .unwrap_err();

        let errors = err.validation_errors().unwrap();
        assert!(errors.get("template_section_id").is_some());
        assert!(errors.get("settings.background_color").is_some());
        assert!(errors.get("w").is_some());
        assert_eq!(site.store.revision(), revision);
    }

    #[test]
    fn test_create_section_unknown_template_section() {
        let site = site();
        let err = site
            .builder
            .create_section(site.home.id, &section_payload(json!({"template_section_id": 999})))
            .unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn test_out_of_grid_position_rejected_and_unchanged() {
        let site = site();
        let hero = site.home_section("hero");

        let err = site
            .builder
            .update_section_position(hero.id, &position(2, 0, 20, 4))
            .unwrap_err();

        assert_eq!(err.status_code(), 422);
        assert_eq!(site.builder.get_section(hero.id).unwrap(), hero);
    }

    #[test]
    fn test_zero_width_and_negative_x_rejected() {
        let site = site();
        let hero = site.home_section("hero");

        for payload in [position(0, 0, 0, 1), position(-1, 0, 4, 1)] {
            let err = site
                .builder
                .update_section_position(hero.id, &payload)
                .unwrap_err();
            assert_eq!(err.status_code(), 422);
        }
        assert_eq!(site.builder.get_section(hero.id).unwrap(), hero);
    }

    #[test]
    fn test_grid_bounds_hold_after_update_sequence() {
        let site = site();
        let main = site.home_section("main");
        let moves = [
            position(6, 2, 6, 2),
            position(7, 0, 6, 1),
            position(0, 3, 12, 3),
            position(11, 0, 1, 1),
            position(12, 0, 1, 1),
            position(-3, 1, 2, 2),
            position(3, 1, 9, 1),
        ];
        for payload in &moves {
            let _ = site.builder.update_section_position(main.id, payload);
            for section in site.store.sections(site.home.id).unwrap() {
                assert!(section.position.w >= 1 && section.position.h >= 1);
                assert!(section.position.right() <= 12);
            }
        }
        let main = site.builder.get_section(main.id).unwrap();
        assert_eq!(main.position, GridRect::new(3, 1, 9, 1));
    }

    #[test]
    fn test_partial_position_update() {
        let site = site();
        let main = site.home_section("main");
        let payload: PositionPayload = serde_json::from_value(json!({"y": 8})).unwrap();

        let moved = site.builder.update_section_position(main.id, &payload).unwrap();

        assert_eq!(moved.position, GridRect::new(0, 8, 12, 6));
        let empty = PositionPayload::default();
        assert!(site.builder.update_section_position(main.id, &empty).is_err());
    }

    #[test]
    fn test_locked_sibling_blocks_overlap() {
        let site = site();
        let hero = site.home_section("hero");
        let main = site.home_section("main");
        site.builder
            .update_section(hero.id, &section_payload(json!({"locked": true})))
            .unwrap();

        let err = site
            .builder
            .update_section_position(main.id, &position(0, 2, 12, 2))
            .unwrap_err();

        assert!(err.validation_errors().unwrap().get("position").is_some());
        assert_eq!(site.builder.get_section(main.id).unwrap().position, main.position);
    }

    #[test]
    fn test_locked_section_only_blocks_its_placeholder() {
        let site = site();
        let hero = site.home_section("hero");
        let aside = site.home_section("sidebar");
        site.builder
            .update_section(hero.id, &section_payload(json!({"locked": true})))
            .unwrap();
        assert!(aside.position.overlaps(&hero.position));

        let mut shrink = PositionPayload::default();
        shrink.position.h = Some(5);
        let moved = site
            .builder
            .update_section_position(aside.id, &shrink)
            .unwrap();
        assert_eq!(moved.position, GridRect::new(0, 0, 4, 5));

        let moved = site
            .builder
            .update_section_position(aside.id, &position(2, 1, 4, 3))
            .unwrap();
        assert_eq!(moved.position, GridRect::new(2, 1, 4, 3));
    }

    #[test]
    fn test_new_section_row_follows_its_placeholder() {
        let site = site();
        let sidebar = site.template_section("sidebar");

        let created = site
            .builder
            .create_section(
                site.home.id,
                &section_payload(json!({"template_section_id": sidebar.id})),
            )
            .unwrap();

        // The seeded aside ends at row 6; content sections end at row 10
        assert_eq!(created.position.y, 6);
    }

    #[test]
    fn test_version_conflict_and_last_write_wins() {
        let site = site();
        let main = site.home_section("main");

        let mut stale = position(0, 4, 6, 6);
        stale.version = Some(main.version + 5);
        let err = site
            .builder
            .update_section_position(main.id, &stale)
            .unwrap_err();
        assert_eq!(err.status_code(), 409);

        let first = site
            .builder
            .update_section_position(main.id, &position(0, 4, 6, 6))
            .unwrap();
        let second = site
            .builder
            .update_section_position(main.id, &position(6, 4, 6, 6))
            .unwrap();
        assert_eq!(second.version, first.version + 1);
        assert_eq!(second.position.x, 6);
    }

    #[test]
    fn test_widget_round_trip_with_coercion() {
        let site = site();
        let aside = site.home_section("sidebar");

        let created = site
            .builder
            .create_widget(
                aside.id,
                &widget_payload(json!({
                    "widget_type": "button",
                    "fields": {"label": "Join", "url": "/join", "new_tab": "on", "style": "secondary"}
                })),
            )
            .unwrap();
        let listed = site.builder.list_widgets(aside.id).unwrap();

        let fetched = listed.iter().find(|w| w.id == created.id).unwrap();
        assert_eq!(
            Value::Object(fetched.fields.clone()),
            json!({"label": "Join", "url": "/join", "new_tab": true, "style": "secondary"})
        );
        assert_eq!(fetched.order, 1);
        assert_eq!(fetched, &created);
    }

    #[test]
    fn test_create_widget_validation() {
        let site = site();
        let aside = site.home_section("sidebar");

        let err = site
            .builder
            .create_widget(aside.id, &widget_payload(json!({"widget_type": "carousel"})))
            .unwrap_err();
        assert!(err.validation_errors().unwrap().get("widget_type").is_some());

        let err = site
            .builder
            .create_widget(
                aside.id,
                &widget_payload(json!({"widget_type": "image", "fields": {"image": 404}})),
            )
            .unwrap_err();
        assert_eq!(
            err.validation_errors().unwrap().get("fields.image"),
            Some(&["media 404 does not exist".to_owned()][..])
        );

        let err = site
            .builder
            .create_widget(999, &widget_payload(json!({"widget_type": "spacer"})))
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_update_widget_fields_and_type_lock() {
        let site = site();
        let aside = site.home_section("sidebar");
        let button = site.builder.list_widgets(aside.id).unwrap()[0].clone();

        let updated = site
            .builder
            .update_widget(
                button.id,
                &widget_payload(json!({"fields": {"label": "Write to us", "url": "/contact"}, "version": button.version})),
            )
            .unwrap();
        assert_eq!(updated.fields["label"], "Write to us");
        assert_eq!(updated.version, button.version + 1);

        let err = site
            .builder
            .update_widget(button.id, &widget_payload(json!({"widget_type": "hero"})))
            .unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn test_widget_position_respects_locked_siblings() {
        let site = site();
        let main = site.home_section("main");
        let widgets = site.builder.list_widgets(main.id).unwrap();
        site.builder
            .update_widget(
                widgets[0].id,
                &widget_payload(json!({"position": {"x": 0, "y": 0, "w": 6, "h": 1}, "locked": true})),
            )
            .unwrap();

        let err = site
            .builder
            .update_widget_position(widgets[1].id, &position(3, 0, 6, 1))
            .unwrap_err();
        assert_eq!(err.status_code(), 422);

        let moved = site
            .builder
            .update_widget_position(widgets[1].id, &position(6, 0, 6, 1))
            .unwrap();
        assert_eq!(moved.position, Some(GridRect::new(6, 0, 6, 1)));
    }

    #[test]
    fn test_first_placement_accepts_lone_coordinate() {
        let site = site();
        let main = site.home_section("main");
        let widget = site.builder.list_widgets(main.id).unwrap()[0].clone();
        assert_eq!(widget.position, None);

        let mut patch = PositionPayload::default();
        patch.position.x = Some(2);
        let moved = site
            .builder
            .update_widget_position(widget.id, &patch)
            .unwrap();

        assert_eq!(moved.position, Some(GridRect::new(2, 0, 10, 1)));
    }

    #[test]
    fn test_sync_layout_reorders_widgets() {
        let site = site();
        let main = site.home_section("main");
        let ids: Vec<Id> = site
            .builder
            .list_widgets(main.id)
            .unwrap()
            .iter()
            .map(|w| w.id)
            .collect();
        let layout = LayoutPayload {
            items: vec![
                LayoutItem { id: ids[2], x: 0, y: 0, w: 12, h: 2, version: None },
                LayoutItem { id: ids[0], x: 0, y: 2, w: 6, h: 1, version: None },
                LayoutItem { id: ids[1], x: 6, y: 2, w: 6, h: 1, version: None },
            ],
        };

        let synced = site.builder.sync_widget_layout(main.id, &layout).unwrap();

        let order: Vec<Id> = synced.iter().map(|w| w.id).collect();
        assert_eq!(order, vec![ids[2], ids[0], ids[1]]);
        assert_eq!(synced[0].order, 0);
    }

    #[test]
    fn test_sync_layout_rejects_whole_batch() {
        let site = site();
        let main = site.home_section("main");
        let before = site.builder.list_widgets(main.id).unwrap();
        let layout = LayoutPayload {
            items: vec![
                LayoutItem { id: before[0].id, x: 0, y: 0, w: 6, h: 1, version: None },
                LayoutItem { id: before[1].id, x: 8, y: 0, w: 6, h: 1, version: None },
            ],
        };

        let err = site.builder.sync_widget_layout(main.id, &layout).unwrap_err();

        assert!(err.validation_errors().unwrap().get("items[1].w").is_some());
        assert_eq!(site.builder.list_widgets(main.id).unwrap(), before);
    }

    #[test]
    fn test_delete_section_cascades() {
        let site = site();
        let main = site.home_section("main");
        let widget_id = site.builder.list_widgets(main.id).unwrap()[0].id;

        let deleted = site.builder.delete_section(main.id).unwrap();

        assert_eq!(deleted.id, main.id);
        assert_eq!(site.builder.get_widget(widget_id).unwrap_err().status_code(), 404);
        assert_eq!(site.builder.delete_section(main.id).unwrap_err().status_code(), 404);
    }

    #[test]
    fn test_hybrid_renders() {
        let site = site();
        let roadmap = site.store.page_by_slug("roadmap").unwrap().unwrap();

        let page = site.builder.rendered_page(roadmap.id).unwrap();
        assert!(page.html.contains("trellis-content-empty"));

        let main = site.home_section("main");
        let section = site.builder.rendered_section(main.id).unwrap();
        assert_eq!(section.section.widgets.len(), 3);

        let widget_id = section.section.widgets[0].id;
        let widget = site.builder.rendered_widget(widget_id).unwrap();
        assert!(widget.widget.html.contains("Latest"));
    }

    #[test]
    fn test_catalogs() {
        let site = site();
        site.store
            .upsert_widget_type(WidgetType {
                slug: "quote".to_owned(),
                name: "Quote".to_owned(),
                description: String::new(),
                icon: String::new(),
                fields: vec![FieldDef::new("quote", "Quote", FieldKind::Textarea).required()],
            })
            .unwrap();

        let catalog = site.builder.available_widgets().unwrap();
        let quote = catalog.iter().find(|e| e.widget_type.slug == "quote").unwrap();
        assert!(!quote.has_renderer);
        assert_eq!(catalog.iter().filter(|e| e.has_renderer).count(), 9);

        let template_id = site.home.template_id.unwrap();
        assert_eq!(site.builder.section_templates(Some(template_id)).unwrap().len(), 3);
        assert_eq!(
            site.builder.section_templates(Some(999)).unwrap_err().status_code(),
            404
        );
        assert_eq!(site.builder.theme_assets().unwrap().theme, "aurora");
    }
}
