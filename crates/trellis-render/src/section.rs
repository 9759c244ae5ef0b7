//! Section resolution.

use std::collections::HashMap;
use std::fmt::Write;

use serde::Serialize;
use trellis_store::{
    GridRect, Id, Placeholder, Section, SectionKind, SectionSettings, Store, StoreError,
    TemplateSection, Widget, WidgetType,
};

use crate::html::escape_html;
use crate::options::{Diagnostics, RenderOptions};
use crate::styles::StyleQueue;
use crate::widget::{RenderedWidget, WidgetEnv, WidgetRegistry};

/// Outcome of resolving a section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionState {
    /// The section has no widgets.
    Empty,
    /// At least one widget rendered.
    Rendered,
    /// The section has widgets and every one of them failed.
    Failed,
}

impl SectionState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Rendered => "rendered",
            Self::Failed => "failed",
        }
    }
}

/// A section ready for placement in a template, with its structure for the
/// page builder.
#[derive(Clone, Debug, Serialize)]
pub struct RenderableSection {
    pub id: Id,
    pub page_id: Id,
    pub template_section_id: Id,
    pub name: String,
    pub slug: String,
    pub kind: SectionKind,
    pub placeholder: Placeholder,
    /// Instance settings merged over the template section defaults.
    pub settings: SectionSettings,
    pub position: GridRect,
    pub locked: bool,
    pub version: u64,
    /// Widgets in render order.
    pub widgets: Vec<RenderedWidget>,
    pub state: SectionState,
    pub html: String,
}

/// Order widgets by order index, ties by id.
pub fn sort_widgets(widgets: &mut [Widget]) {
    widgets.sort_by_key(|widget| (widget.order, widget.id));
}

/// Resolves sections into [`RenderableSection`]s.
pub struct SectionResolver<'a> {
    store: &'a dyn Store,
    registry: &'a WidgetRegistry,
    options: &'a RenderOptions,
    widget_types: HashMap<String, WidgetType>,
}

impl<'a> SectionResolver<'a> {
    /// Create a resolver, loading the widget type catalog once.
    pub fn new(
        store: &'a dyn Store,
        registry: &'a WidgetRegistry,
        options: &'a RenderOptions,
    ) -> Result<Self, StoreError> {
        let widget_types = store
            .widget_types()?
            .into_iter()
            .map(|widget_type| (widget_type.slug.clone(), widget_type))
            .collect();
        Ok(Self {
            store,
            registry,
            options,
            widget_types,
        })
    }

    /// Environment for rendering single widgets outside a section.
    pub fn widget_env<'b>(
        &'b self,
        styles: &'b mut StyleQueue,
        warnings: &'b mut Vec<String>,
    ) -> WidgetEnv<'b> {
        WidgetEnv::new(self.store, self.options, styles, warnings)
    }

    /// Render one widget with its type's defaults.
    pub fn render_widget(
        &self,
        widget: &Widget,
        styles: &mut StyleQueue,
        warnings: &mut Vec<String>,
    ) -> RenderedWidget {
        let widget_type = self.widget_types.get(&widget.widget_type);
        let mut env = self.widget_env(styles, warnings);
        self.registry.render(widget, widget_type, &mut env)
    }

    /// Resolve `section` with the template section it instantiates.
    pub fn resolve_section(
        &self,
        section: &Section,
        template_section: &TemplateSection,
        styles: &mut StyleQueue,
        warnings: &mut Vec<String>,
    ) -> Result<RenderableSection, StoreError> {
        let settings = section.settings.merged_over(&template_section.defaults);

        let mut widgets = self.store.widgets(section.id)?;
        sort_widgets(&mut widgets);

        let mut rendered = Vec::with_capacity(widgets.len());
        for widget in &widgets {
            rendered.push(self.render_widget(widget, styles, warnings));
        }

        let state = if rendered.is_empty() {
            SectionState::Empty
        } else if rendered.iter().all(RenderedWidget::is_failed) {
            SectionState::Failed
        } else {
            SectionState::Rendered
        };

        let html = self.markup(section, template_section, &settings, &rendered, state);

        Ok(RenderableSection {
            id: section.id,
            page_id: section.page_id,
            template_section_id: template_section.id,
            name: template_section.name.clone(),
            slug: template_section.slug.clone(),
            kind: template_section.kind,
            placeholder: template_section.placeholder,
            settings,
            position: section.position,
            locked: section.locked,
            version: section.version,
            widgets: rendered,
            state,
            html,
        })
    }

    fn column_class(&self, widget: &RenderedWidget, settings: &SectionSettings) -> String {
        let span = match widget.position {
            Some(rect) => rect.w,
            None => {
                let columns = settings.columns.unwrap_or(1).max(1);
                (self.options.grid_columns / columns).max(1)
            }
        };
        format!("col-{span}")
    }

    fn markup(
        &self,
        section: &Section,
        template_section: &TemplateSection,
        settings: &SectionSettings,
        widgets: &[RenderedWidget],
        state: SectionState,
    ) -> String {
        let mut classes = format!("trellis-section section--{}", template_section.kind.as_str());
        for class in settings.custom_classes.iter().flatten() {
            classes.push(' ');
            classes.push_str(&escape_html(class));
        }
        let style = settings
            .background_color
            .as_deref()
            .map(|color| format!(r#" style="background-color: {}""#, escape_html(color)))
            .unwrap_or_default();

        let mut out = format!(
            r#"<section class="{classes}" id="section-{id}" data-section-id="{id}" data-section-slug="{}" data-state="{}"{style}>"#,
            escape_html(&template_section.slug),
            state.as_str(),
            id = section.id,
        );

        let quiet = self.options.diagnostics == Diagnostics::Quiet;
        match state {
            SectionState::Empty if quiet => {
                write!(out, "<!-- section {} has no widgets -->", section.id).unwrap();
            }
            SectionState::Empty => {
                out.push_str(
                    r#"<div class="section-empty"><p>This section has no widgets yet.</p></div>"#,
                );
            }
            SectionState::Failed if quiet => {
                write!(out, "<!-- section {}: every widget failed -->", section.id).unwrap();
            }
            SectionState::Failed => {
                out.push_str(r#"<div class="section-failed"><p>None of the widgets in this section could be rendered.</p></div>"#);
            }
            SectionState::Rendered => {}
        }

        if !widgets.is_empty() {
            out.push_str(r#"<div class="row">"#);
            for widget in widgets {
                write!(
                    out,
                    r#"<div class="{}">{}</div>"#,
                    self.column_class(widget, settings),
                    widget.html
                )
                .unwrap();
            }
            out.push_str("</div>");
        }
        out.push_str("</section>");
        out
    }
}
