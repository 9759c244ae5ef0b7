//! Widget rendering.
//!
//! Widgets dispatch through a [`WidgetRegistry`] keyed by [`WidgetKind`].
//! Slugs that do not parse to a kind, or kinds without a registered renderer,
//! fall back to a key/value dump of the field context. A renderer error
//! degrades to a failed-widget block. Neither case aborts the page.

mod builtin;

use std::collections::HashMap;
use std::fmt::{self, Write};
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};
use trellis_store::{ContentItem, GridRect, Id, Media, Store, Widget, WidgetType};

use crate::fields::{FieldContext, WidgetError};
use crate::html::{comment_text, escape_html};
use crate::options::{Diagnostics, RenderOptions};
use crate::styles::StyleQueue;

/// Built-in widget kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    Heading,
    Text,
    Image,
    Hero,
    Button,
    Gallery,
    ContentCard,
    Spacer,
    Html,
}

impl WidgetKind {
    pub const ALL: [Self; 9] = [
        Self::Heading,
        Self::Text,
        Self::Image,
        Self::Hero,
        Self::Button,
        Self::Gallery,
        Self::ContentCard,
        Self::Spacer,
        Self::Html,
    ];

    /// Widget type slug of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Heading => "heading",
            Self::Text => "text",
            Self::Image => "image",
            Self::Hero => "hero",
            Self::Button => "button",
            Self::Gallery => "gallery",
            Self::ContentCard => "content-card",
            Self::Spacer => "spacer",
            Self::Html => "html",
        }
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slug that names no built-in kind.
#[derive(Debug, PartialEq, Eq)]
pub struct UnknownWidgetKind;

impl FromStr for WidgetKind {
    type Err = UnknownWidgetKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or(UnknownWidgetKind)
    }
}

/// Access to shared render state for widget renderers.
pub struct WidgetEnv<'a> {
    store: &'a dyn Store,
    options: &'a RenderOptions,
    styles: &'a mut StyleQueue,
    warnings: &'a mut Vec<String>,
}

impl<'a> WidgetEnv<'a> {
    pub fn new(
        store: &'a dyn Store,
        options: &'a RenderOptions,
        styles: &'a mut StyleQueue,
        warnings: &'a mut Vec<String>,
    ) -> Self {
        Self {
            store,
            options,
            styles,
            warnings,
        }
    }

    #[must_use]
    pub fn options(&self) -> &RenderOptions {
        self.options
    }

    /// Page-level style queue.
    pub fn styles(&mut self) -> &mut StyleQueue {
        self.styles
    }

    /// Record a non-fatal resolution problem.
    pub fn warn(&mut self, message: String) {
        tracing::warn!("{message}");
        self.warnings.push(message);
    }

    /// Media by id. A dangling reference is treated as absent and recorded.
    pub fn media(&mut self, id: Id) -> Option<Media> {
        match self.store.media(id) {
            Ok(media) => Some(media),
            Err(e) => {
                self.warn(format!("media {id} could not be resolved: {e}"));
                None
            }
        }
    }

    /// Public URL and alt text of a media reference.
    pub fn media_url(&mut self, id: Id) -> Option<(String, String)> {
        self.media(id)
            .map(|media| (self.options.media_url(&media.path), media.alt))
    }

    /// Content item by id. A dangling reference is treated as absent and recorded.
    pub fn content(&mut self, id: Id) -> Option<ContentItem> {
        match self.store.content(id) {
            Ok(item) => Some(item),
            Err(e) => {
                self.warn(format!("content {id} could not be resolved: {e}"));
                None
            }
        }
    }
}

/// Renders the inner markup of one widget kind.
pub type RenderFn = fn(&FieldContext, &mut WidgetEnv<'_>) -> Result<String, WidgetError>;

/// How a widget was rendered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WidgetOutcome {
    /// A registered renderer produced the markup.
    Rendered,
    /// No renderer for the type; the field dump was used.
    Fallback,
    /// The renderer failed.
    Failed { error: String },
}

/// A widget rendered for a page, with its structure for the page builder.
#[derive(Clone, Debug, Serialize)]
pub struct RenderedWidget {
    pub id: Id,
    pub widget_type: String,
    pub order: i32,
    pub position: Option<GridRect>,
    pub locked: bool,
    pub version: u64,
    /// Resolved field context, including computed values.
    pub fields: Map<String, Value>,
    pub html: String,
    pub outcome: WidgetOutcome,
}

impl RenderedWidget {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, WidgetOutcome::Failed { .. })
    }
}

/// Maps widget kinds to renderer functions.
#[derive(Clone)]
pub struct WidgetRegistry {
    renderers: HashMap<WidgetKind, RenderFn>,
}

impl Default for WidgetRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl WidgetRegistry {
    /// Registry without renderers. Every widget uses the field dump.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }

    /// Registry with every built-in kind registered.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for kind in WidgetKind::ALL {
            registry.register(kind, builtin::renderer(kind));
        }
        registry
    }

    /// Register or replace the renderer of `kind`.
    pub fn register(&mut self, kind: WidgetKind, render: RenderFn) {
        self.renderers.insert(kind, render);
    }

    /// Renderer for a widget type slug, if any.
    #[must_use]
    pub fn renderer_for(&self, slug: &str) -> Option<RenderFn> {
        let kind = slug.parse::<WidgetKind>().ok()?;
        self.renderers.get(&kind).copied()
    }

    /// Render `widget`.
    ///
    /// `widget_type` supplies field defaults. Never fails: problems degrade to
    /// the field dump or the failed-widget block.
    pub fn render(
        &self,
        widget: &Widget,
        widget_type: Option<&WidgetType>,
        env: &mut WidgetEnv<'_>,
    ) -> RenderedWidget {
        let cx = FieldContext::new(widget, widget_type);
        let diagnostics = env.options().diagnostics;

        let (html, outcome) = match self.renderer_for(&widget.widget_type) {
            Some(render) => match render(&cx, env) {
                Ok(inner) => (wrap(widget, &cx, "", &inner), WidgetOutcome::Rendered),
                Err(e) => {
                    tracing::warn!(
                        widget_id = widget.id,
                        widget_type = %widget.widget_type,
                        error = %e,
                        "Widget render failed"
                    );
                    (
                        failed_markup(widget, &cx, &e, diagnostics),
                        WidgetOutcome::Failed {
                            error: e.to_string(),
                        },
                    )
                }
            },
            None => {
                tracing::debug!(
                    widget_id = widget.id,
                    widget_type = %widget.widget_type,
                    "No renderer for widget type, using field dump"
                );
                (
                    wrap(
                        widget,
                        &cx,
                        " widget--fallback",
                        &field_dump(widget, &cx, diagnostics),
                    ),
                    WidgetOutcome::Fallback,
                )
            }
        };

        RenderedWidget {
            id: widget.id,
            widget_type: widget.widget_type.clone(),
            order: widget.order,
            position: widget.position,
            locked: widget.locked,
            version: widget.version,
            fields: cx.to_json(),
            html,
            outcome,
        }
    }
}

fn wrap(widget: &Widget, cx: &FieldContext, extra_class: &str, inner: &str) -> String {
    let slug = escape_html(&widget.widget_type);
    format!(
        r#"<div class="trellis-widget widget--{slug}{extra_class}" id="{}" data-widget-id="{}" data-widget-type="{slug}">{inner}</div>"#,
        cx.dom_id(),
        widget.id
    )
}

fn field_dump(widget: &Widget, cx: &FieldContext, diagnostics: Diagnostics) -> String {
    if diagnostics == Diagnostics::Quiet {
        return format!(
            "<!-- no renderer for widget type '{}' -->",
            comment_text(&widget.widget_type)
        );
    }
    let mut out = format!(
        r#"<p class="widget-dump-title">No renderer for widget type "{}"</p><dl class="widget-dump">"#,
        escape_html(&widget.widget_type)
    );
    for (name, value) in cx.to_json() {
        let shown = match value {
            Value::String(text) => text,
            other => other.to_string(),
        };
        write!(
            out,
            "<dt>{}</dt><dd>{}</dd>",
            escape_html(&name),
            escape_html(&shown)
        )
        .unwrap();
    }
    out.push_str("</dl>");
    out
}

fn failed_markup(
    widget: &Widget,
    cx: &FieldContext,
    error: &WidgetError,
    diagnostics: Diagnostics,
) -> String {
    match diagnostics {
        Diagnostics::Quiet => format!("<!-- widget {} failed to render -->", widget.id),
        Diagnostics::Verbose => format!(
            r#"<div class="trellis-widget widget--failed" id="{}" data-widget-id="{}" data-widget-type="{}"><p class="widget-error">Widget could not be rendered: {}</p></div>"#,
            cx.dom_id(),
            widget.id,
            escape_html(&widget.widget_type),
            escape_html(&error.to_string())
        ),
    }
}
