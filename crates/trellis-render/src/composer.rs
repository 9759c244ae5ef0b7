//! Page composition.
//!
//! [`TemplateComposer`] turns a page into a complete HTML document:
//!
//! 1. resolve the active theme and the page template,
//! 2. resolve the sections mapped to each placeholder the template declares,
//!    substituting fallback chrome for required placeholders without sections,
//! 3. assemble header, content/sidebar and footer in that fixed order,
//! 4. emit the document with theme assets and the queued per-widget styles.
//!
//! Configuration problems (no active theme, no homepage, invalid template)
//! become [`ComposeError`]s that map to dedicated error pages. A panic while
//! resolving sections is caught here, logged, and reported as a render failure.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use serde::Serialize;
use trellis_cache::Cache;
use trellis_store::{Id, Page, Placeholder, Section, SectionKind, Store, StoreError, TemplateSection};

use crate::context::PageRenderContext;
use crate::html::escape_html;
use crate::menu::{MenuProcessor, MenuQuery, MenuTree};
use crate::options::RenderOptions;
use crate::section::{RenderableSection, SectionResolver};
use crate::styles::StyleQueue;
use crate::theme::{ResolvedAssets, resolve_assets};
use crate::widget::{RenderedWidget, WidgetRegistry};

/// Menu locations resolved for every page.
const MENU_LOCATIONS: [&str; 2] = ["header", "footer"];

/// Terminal error states of page composition.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// Root request with no homepage and no published page.
    #[error("No homepage: no page is flagged as homepage and nothing is published")]
    NoHomepage,
    /// No published page with this slug.
    #[error("Page not found: {0}")]
    NotFound(String),
    #[error("No active theme")]
    NoActiveTheme,
    /// Page template missing or bound to an inactive theme.
    #[error("Invalid template for page {page_id}: {reason}")]
    InvalidTemplate { page_id: Id, reason: String },
    /// Panic while resolving sections or widgets.
    #[error("Render failure: {0}")]
    RenderFailure(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ComposeError {
    /// HTTP status of the error page.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NoHomepage | Self::NotFound(_) => 404,
            Self::Store(e) if e.is_not_found() => 404,
            Self::NoActiveTheme | Self::InvalidTemplate { .. } => 503,
            Self::RenderFailure(_) | Self::Store(_) => 500,
        }
    }

    /// Stable machine-readable name of the state.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoHomepage => "no-homepage",
            Self::NotFound(_) => "not-found",
            Self::NoActiveTheme => "no-active-theme",
            Self::InvalidTemplate { .. } => "invalid-template",
            Self::RenderFailure(_) => "render-failure",
            Self::Store(_) => "store-error",
        }
    }
}

/// A composed page plus the structure it was built from.
#[derive(Clone, Debug, Serialize)]
pub struct ComposedPage {
    pub html: String,
    /// Per-widget CSS rules, inlined in the document head.
    pub styles: Vec<String>,
    /// Script URLs in load order.
    pub scripts: Vec<String>,
    /// Non-fatal resolution problems (dangling references, stray sections).
    pub warnings: Vec<String>,
    /// Resolved sections in document order.
    pub sections: Vec<RenderableSection>,
    pub context: PageRenderContext,
}

/// A single resolved section with the styles it queued.
#[derive(Clone, Debug, Serialize)]
pub struct SectionPreview {
    pub section: RenderableSection,
    pub styles: Vec<String>,
    pub warnings: Vec<String>,
}

/// A single rendered widget with the styles it queued.
#[derive(Clone, Debug, Serialize)]
pub struct WidgetPreview {
    pub widget: RenderedWidget,
    pub styles: Vec<String>,
    pub warnings: Vec<String>,
}

/// Standalone error document.
#[derive(Clone, Debug)]
pub struct ErrorPage {
    pub status: u16,
    pub html: String,
}

/// Sections of a page grouped by placeholder, in layout order.
type PlacedSections = BTreeMap<Placeholder, Vec<(Section, TemplateSection)>>;

struct Body {
    html: String,
    sections: Vec<RenderableSection>,
}

/// Composes pages from the store.
pub struct TemplateComposer {
    store: Arc<dyn Store>,
    registry: WidgetRegistry,
    menus: MenuProcessor,
    options: RenderOptions,
}

impl TemplateComposer {
    pub fn new(store: Arc<dyn Store>, cache: &dyn Cache, options: RenderOptions) -> Self {
        Self {
            menus: MenuProcessor::new(Arc::clone(&store), cache),
            store,
            registry: WidgetRegistry::with_builtins(),
            options,
        }
    }

    /// Replace the widget registry.
    #[must_use]
    pub fn with_registry(mut self, registry: WidgetRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    #[must_use]
    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    /// Page served at `/`: the published homepage, else the published page
    /// with the smallest id.
    pub fn resolve_root(&self) -> Result<Page, ComposeError> {
        let published: Vec<Page> = self
            .store
            .pages()?
            .into_iter()
            .filter(Page::is_published)
            .collect();
        published
            .iter()
            .find(|page| page.is_homepage)
            .or_else(|| published.iter().min_by_key(|page| page.id))
            .cloned()
            .ok_or(ComposeError::NoHomepage)
    }

    /// Published page for a public path. `None` or an empty slug is the root.
    pub fn resolve_public(&self, slug: Option<&str>) -> Result<Page, ComposeError> {
        match slug.map(|s| s.trim_matches('/')).filter(|s| !s.is_empty()) {
            None => self.resolve_root(),
            Some(slug) => self
                .store
                .page_by_slug(slug)?
                .filter(Page::is_published)
                .ok_or_else(|| ComposeError::NotFound(slug.to_owned())),
        }
    }

    /// Compose the public page at `slug`.
    pub fn render_public(&self, slug: Option<&str>) -> Result<ComposedPage, ComposeError> {
        let page = self.resolve_public(slug)?;
        self.compose_page(&page)
    }

    /// Theme, template, assets and menus for `page`.
    pub fn render_context(&self, page: &Page) -> Result<PageRenderContext, ComposeError> {
        let theme = self
            .store
            .active_theme()?
            .ok_or(ComposeError::NoActiveTheme)?;

        let invalid = |reason: String| ComposeError::InvalidTemplate {
            page_id: page.id,
            reason,
        };
        let template_id = page
            .template_id
            .ok_or_else(|| invalid("page has no template".to_owned()))?;
        let template = match self.store.template(template_id) {
            Ok(template) => template,
            Err(e) if e.is_not_found() => {
                return Err(invalid(format!("template {template_id} does not exist")));
            }
            Err(e) => return Err(e.into()),
        };
        if template.theme_id != theme.id {
            return Err(invalid(format!(
                "template '{}' belongs to an inactive theme",
                template.slug
            )));
        }

        let mut menus = BTreeMap::new();
        for location in MENU_LOCATIONS {
            let tree = self.menus.processed_menu(&MenuQuery {
                location: location.to_owned(),
                page_id: Some(page.id),
                template_id: Some(template.id),
                one_page: false,
                use_cache: self.options.menu_cache,
            })?;
            menus.insert(location.to_owned(), tree);
        }

        Ok(PageRenderContext {
            assets: resolve_assets(&theme, Some(&template)),
            theme,
            menus,
            page: page.clone(),
            template,
        })
    }

    /// Compose `page` regardless of its status.
    pub fn compose_page(&self, page: &Page) -> Result<ComposedPage, ComposeError> {
        let context = self.render_context(page)?;

        let mut styles = StyleQueue::new();
        let mut warnings = Vec::new();
        let body = guarded(page.id, || {
            self.render_body(&context, &mut styles, &mut warnings)
        })??;

        let styles = styles.into_rules();
        let html = document(&context, &self.options, &styles, &body.html);
        tracing::debug!(
            page_id = page.id,
            sections = body.sections.len(),
            warnings = warnings.len(),
            "Composed page"
        );

        Ok(ComposedPage {
            html,
            styles,
            scripts: context.assets.js.clone(),
            warnings,
            sections: body.sections,
            context,
        })
    }

    /// Resolve one section on its own.
    pub fn preview_section(&self, section_id: Id) -> Result<SectionPreview, ComposeError> {
        let section = self.store.section(section_id)?;
        let template_section = self.store.template_section(section.template_section_id)?;
        let mut styles = StyleQueue::new();
        let mut warnings = Vec::new();
        let resolved = guarded(section.page_id, || {
            let resolver = SectionResolver::new(&*self.store, &self.registry, &self.options)?;
            resolver.resolve_section(&section, &template_section, &mut styles, &mut warnings)
        })??;
        Ok(SectionPreview {
            section: resolved,
            styles: styles.into_rules(),
            warnings,
        })
    }

    /// Render one widget on its own.
    pub fn preview_widget(&self, widget_id: Id) -> Result<WidgetPreview, ComposeError> {
        let widget = self.store.widget(widget_id)?;
        let mut styles = StyleQueue::new();
        let mut warnings = Vec::new();
        let rendered = guarded(widget.section_id, || {
            let resolver = SectionResolver::new(&*self.store, &self.registry, &self.options)?;
            Ok::<_, StoreError>(resolver.render_widget(&widget, &mut styles, &mut warnings))
        })??;
        Ok(WidgetPreview {
            widget: rendered,
            styles: styles.into_rules(),
            warnings,
        })
    }

    /// Assets of the active theme, merged with a template bundle if given.
    pub fn theme_assets(&self, template_id: Option<Id>) -> Result<ResolvedAssets, ComposeError> {
        let theme = self
            .store
            .active_theme()?
            .ok_or(ComposeError::NoActiveTheme)?;
        let template = template_id.map(|id| self.store.template(id)).transpose()?;
        Ok(resolve_assets(&theme, template.as_ref()))
    }

    /// Process a menu with the composer's cache.
    pub fn processed_menu(&self, query: &MenuQuery) -> Result<MenuTree, StoreError> {
        self.menus.processed_menu(query)
    }

    /// Error document for `error`. Never includes error details.
    #[must_use]
    pub fn error_page(&self, error: &ComposeError) -> ErrorPage {
        let status = error.status_code();
        let (title, message) = match status {
            404 => ("Page not found", "The page you requested does not exist."),
            503 => (
                "Site unavailable",
                "This site is not fully configured yet. Please try again later.",
            ),
            _ => (
                "Something went wrong",
                "The page could not be displayed. The problem has been logged.",
            ),
        };
        let site = escape_html(&self.options.site_name);
        let html = format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title} | {site}</title>\n</head>\n<body class=\"trellis-error error-{status}\">\n<main class=\"error-page\"><h1>{title}</h1><p>{message}</p><p><a href=\"/\">Back to {site}</a></p></main>\n</body>\n</html>\n"
        );
        ErrorPage { status, html }
    }

    fn place_sections(
        &self,
        context: &PageRenderContext,
        warnings: &mut Vec<String>,
    ) -> Result<PlacedSections, StoreError> {
        let mut placed = PlacedSections::new();
        for section in self.store.sections(context.page.id)? {
            let template_section = match self.store.template_section(section.template_section_id) {
                Ok(template_section) => template_section,
                Err(e) if e.is_not_found() => {
                    push_warning(
                        warnings,
                        format!(
                            "section {} references missing template section {}",
                            section.id, section.template_section_id
                        ),
                    );
                    continue;
                }
                Err(e) => return Err(e),
            };
            let placeholder = template_section.placeholder;
            if context.template.slot(placeholder).is_none() {
                push_warning(
                    warnings,
                    format!(
                        "section {} targets placeholder '{placeholder}' which template '{}' does not declare",
                        section.id, context.template.slug
                    ),
                );
                continue;
            }
            placed
                .entry(placeholder)
                .or_default()
                .push((section, template_section));
        }
        for sections in placed.values_mut() {
            sections.sort_by_key(|(s, _)| (s.position.y, s.position.x, s.id));
        }
        Ok(placed)
    }

    fn render_body(
        &self,
        context: &PageRenderContext,
        styles: &mut StyleQueue,
        warnings: &mut Vec<String>,
    ) -> Result<Body, StoreError> {
        let placed = self.place_sections(context, warnings)?;
        let resolver = SectionResolver::new(&*self.store, &self.registry, &self.options)?;

        let mut regions: BTreeMap<Placeholder, String> = BTreeMap::new();
        let mut resolved = Vec::new();
        let mut sidebar_left = false;

        for slot in Placeholder::ALL {
            let Some(declared) = context.template.slot(slot) else {
                continue;
            };
            match placed.get(&slot) {
                Some(sections) if !sections.is_empty() => {
                    if slot == Placeholder::Sidebar {
                        sidebar_left = sections[0].1.kind == SectionKind::SidebarLeft;
                    }
                    let mut inner = String::new();
                    for (section, template_section) in sections {
                        let section =
                            resolver.resolve_section(section, template_section, styles, warnings)?;
                        inner.push_str(&section.html);
                        resolved.push(section);
                    }
                    regions.insert(slot, region(slot, &inner));
                }
                _ if declared.optional => {}
                _ => {
                    regions.insert(slot, self.fallback(slot, context));
                }
            }
        }

        let mut html = String::new();
        if let Some(header) = regions.remove(&Placeholder::Header) {
            html.push_str(&header);
        }
        html.push_str(&main_region(
            regions.remove(&Placeholder::Content),
            regions.remove(&Placeholder::Sidebar),
            sidebar_left,
        ));
        if let Some(footer) = regions.remove(&Placeholder::Footer) {
            html.push_str(&footer);
        }

        Ok(Body {
            html,
            sections: resolved,
        })
    }

    /// Default chrome for a required placeholder without sections.
    fn fallback(&self, slot: Placeholder, context: &PageRenderContext) -> String {
        let site = escape_html(&self.options.site_name);
        let menu = |location: &str, class: &str| {
            context
                .menu(location)
                .map(|tree| tree.to_html(class))
                .unwrap_or_default()
        };
        match slot {
            Placeholder::Header => format!(
                r#"<header class="trellis-header site-header"><div class="container"><a class="site-brand" href="/">{site}</a><nav class="site-nav" aria-label="Main">{}</nav></div></header>"#,
                menu("header", "nav")
            ),
            Placeholder::Content => r#"<div class="trellis-content trellis-content-empty"><p>This page has no content yet.</p></div>"#.to_owned(),
            Placeholder::Sidebar => r#"<aside class="trellis-sidebar trellis-sidebar-empty"></aside>"#.to_owned(),
            Placeholder::Footer => format!(
                r#"<footer class="trellis-footer site-footer"><div class="container"><nav class="footer-nav" aria-label="Footer">{}</nav><p class="footer-title">{} | {site}</p></div></footer>"#,
                menu("footer", "nav footer-menu"),
                escape_html(&context.page.title)
            ),
        }
    }
}

/// Run `f`, converting a panic into [`ComposeError::RenderFailure`].
fn guarded<T>(page_id: Id, f: impl FnOnce() -> T) -> Result<T, ComposeError> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_owned());
        tracing::error!(page_id, panic = %message, "Page render panicked");
        ComposeError::RenderFailure(format!("rendering page {page_id} panicked"))
    })
}

fn push_warning(warnings: &mut Vec<String>, message: String) {
    tracing::warn!("{message}");
    warnings.push(message);
}

/// Wrap resolved sections in their placeholder element.
fn region(slot: Placeholder, inner: &str) -> String {
    match slot {
        Placeholder::Header => format!(r#"<header class="trellis-header">{inner}</header>"#),
        Placeholder::Content => format!(r#"<div class="trellis-content">{inner}</div>"#),
        Placeholder::Sidebar => format!(r#"<aside class="trellis-sidebar">{inner}</aside>"#),
        Placeholder::Footer => format!(r#"<footer class="trellis-footer">{inner}</footer>"#),
    }
}

fn main_region(content: Option<String>, sidebar: Option<String>, sidebar_left: bool) -> String {
    let content = content.unwrap_or_default();
    let Some(sidebar) = sidebar else {
        return format!(r#"<main class="trellis-main">{content}</main>"#);
    };
    let content_col = format!(r#"<div class="col-md-8">{content}</div>"#);
    let sidebar_col = format!(r#"<div class="col-md-4">{sidebar}</div>"#);
    let (first, second) = if sidebar_left {
        (sidebar_col, content_col)
    } else {
        (content_col, sidebar_col)
    };
    format!(
        r#"<main class="trellis-main"><div class="container"><div class="row">{first}{second}</div></div></main>"#
    )
}

fn document(
    context: &PageRenderContext,
    options: &RenderOptions,
    styles: &[String],
    body: &str,
) -> String {
    let mut out = String::from(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
    );
    writeln!(
        out,
        "<title>{} | {}</title>",
        escape_html(&context.page.title),
        escape_html(&options.site_name)
    )
    .unwrap();
    for href in &context.assets.css {
        writeln!(out, r#"<link rel="stylesheet" href="{}">"#, escape_html(href)).unwrap();
    }
    if !styles.is_empty() {
        writeln!(
            out,
            "<style id=\"trellis-styles\">\n{}\n</style>",
            styles.join("\n")
        )
        .unwrap();
    }
    writeln!(
        out,
        r#"</head>
<body class="page-{} template-{}" data-page-id="{}">"#,
        escape_html(&context.page.slug),
        escape_html(&context.template.slug),
        context.page.id
    )
    .unwrap();
    out.push_str(body);
    out.push('\n');
    for src in &context.assets.js {
        writeln!(out, r#"<script src="{}"></script>"#, escape_html(src)).unwrap();
    }
    out.push_str("</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use trellis_cache::{MemoryCache, NullCache};
    use trellis_store::{
        AssetEntry, AssetLayer, FieldMap, FieldValue, GridRect, LinkTarget, Menu, MenuItem,
        MemoryStore, PageStatus, PlaceholderSlot, SectionSettings, Template, Theme, Widget,
        builtin_widget_types, seed_demo,
    };

    use super::*;
    use crate::fields::{FieldContext, WidgetError};
    use crate::section::SectionState;
    use crate::widget::{WidgetEnv, WidgetKind};

    static_assertions::assert_impl_all!(TemplateComposer: Send, Sync);

    struct Site {
        store: Arc<MemoryStore>,
        theme: Id,
        template: Id,
        content_slot: Id,
        sidebar_left_slot: Id,
    }

    fn slot(placeholder: Placeholder, optional: bool) -> PlaceholderSlot {
        PlaceholderSlot {
            placeholder,
            optional,
        }
    }

    fn page(slug: &str, status: PageStatus, template_id: Option<Id>) -> Page {
        Page {
            id: 0,
            title: slug.to_uppercase(),
            slug: slug.to_owned(),
            status,
            is_homepage: false,
            template_id,
            updated_at: Default::default(),
        }
    }

    /// Theme plus a template declaring header, content and footer.
    fn site(placeholders: Vec<PlaceholderSlot>) -> Site {
        let store = Arc::new(MemoryStore::new());
        for widget_type in builtin_widget_types() {
            store.upsert_widget_type(widget_type).unwrap();
        }
        let theme = store
            .insert_theme(Theme {
                id: 0,
                slug: "base".to_owned(),
                name: "Base".to_owned(),
                active: true,
                base_path: "/themes/base".to_owned(),
                version: "3".to_owned(),
                css: vec![AssetEntry::new("css/theme.css", AssetLayer::Core)],
                js: vec![AssetEntry::new("js/theme.js", AssetLayer::Core)],
            })
            .unwrap();
        let template = store
            .insert_template(Template {
                id: 0,
                name: "Default".to_owned(),
                slug: "default".to_owned(),
                theme_id: theme.id,
                placeholders,
                css: Vec::new(),
                js: Vec::new(),
            })
            .unwrap();
        let content_slot = store
            .insert_template_section(TemplateSection {
                id: 0,
                template_id: template.id,
                name: "Main".to_owned(),
                slug: "main".to_owned(),
                kind: SectionKind::FullWidth,
                placeholder: Placeholder::Content,
                defaults: SectionSettings::default(),
            })
            .unwrap();
        let sidebar_left_slot = store
            .insert_template_section(TemplateSection {
                id: 0,
                template_id: template.id,
                name: "Aside".to_owned(),
                slug: "aside".to_owned(),
                kind: SectionKind::SidebarLeft,
                placeholder: Placeholder::Sidebar,
                defaults: SectionSettings::default(),
            })
            .unwrap();
        Site {
            store,
            theme: theme.id,
            template: template.id,
            content_slot: content_slot.id,
            sidebar_left_slot: sidebar_left_slot.id,
        }
    }

    fn standard_site() -> Site {
        site(vec![
            slot(Placeholder::Header, false),
            slot(Placeholder::Content, false),
            slot(Placeholder::Footer, false),
        ])
    }

    fn composer(site: &Site) -> TemplateComposer {
        TemplateComposer::new(
            Arc::clone(&site.store) as Arc<dyn Store>,
            &NullCache,
            RenderOptions::default(),
        )
    }

    fn add_section(site: &Site, page_id: Id, slot: Id, position: GridRect) -> Section {
        site.store
            .insert_section(Section {
                id: 0,
                page_id,
                template_section_id: slot,
                settings: SectionSettings::default(),
                position,
                locked: false,
                version: 0,
                updated_at: Default::default(),
            })
            .unwrap()
    }

    fn add_heading(site: &Site, section_id: Id, text: &str) -> Widget {
        let mut fields = FieldMap::new();
        fields.insert("text".to_owned(), FieldValue::Text(text.to_owned()));
        site.store
            .insert_widget(Widget {
                id: 0,
                section_id,
                widget_type: "heading".to_owned(),
                order: 0,
                position: None,
                fields,
                locked: false,
                version: 0,
                updated_at: Default::default(),
            })
            .unwrap()
    }

    fn published(site: &Site, slug: &str) -> Page {
        site.store
            .insert_page(page(slug, PageStatus::Published, Some(site.template)))
            .unwrap()
    }

    #[test]
    fn test_content_only_page_gets_default_header_and_footer() {
        let site = standard_site();
        let page = published(&site, "about");
        let section = add_section(&site, page.id, site.content_slot, GridRect::default());
        add_heading(&site, section.id, "About us");

        let composed = composer(&site).compose_page(&page).unwrap();

        assert!(composed.html.contains("site-header"));
        assert!(composed.html.contains("site-footer"));
        assert!(composed.html.contains(r#"<p class="footer-title">ABOUT | Trellis</p>"#));
        assert!(composed.html.contains("About us"));
        assert_eq!(composed.sections.len(), 1);
        assert_eq!(composed.sections[0].state, SectionState::Rendered);
    }

    #[test]
    fn test_fixed_structural_order() {
        let site = standard_site();
        let page = published(&site, "home");
        add_section(&site, page.id, site.content_slot, GridRect::default());

        let html = composer(&site).compose_page(&page).unwrap().html;

        let header = html.find("<header").unwrap();
        let main = html.find("<main").unwrap();
        let footer = html.find("<footer").unwrap();
        assert!(header < main && main < footer);
    }

    #[test]
    fn test_sections_ordered_by_grid_position() {
        let site = standard_site();
        let page = published(&site, "home");
        let lower = add_section(&site, page.id, site.content_slot, GridRect::new(0, 5, 12, 1));
        let upper = add_section(&site, page.id, site.content_slot, GridRect::new(0, 0, 12, 1));

        let composed = composer(&site).compose_page(&page).unwrap();

        let ids: Vec<Id> = composed.sections.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![upper.id, lower.id]);
    }

    #[test]
    fn test_optional_placeholder_omitted_required_falls_back() {
        let site = site(vec![
            slot(Placeholder::Content, false),
            slot(Placeholder::Sidebar, true),
        ]);
        let page = published(&site, "home");

        let html = composer(&site).compose_page(&page).unwrap().html;

        assert!(html.contains("trellis-content-empty"));
        assert!(!html.contains("<aside"));
        assert!(!html.contains("<header"));
    }

    #[test]
    fn test_sidebar_left_renders_first() {
        let site = site(vec![
            slot(Placeholder::Content, false),
            slot(Placeholder::Sidebar, false),
        ]);
        let page = published(&site, "home");
        add_section(&site, page.id, site.sidebar_left_slot, GridRect::new(0, 0, 4, 1));

        let html = composer(&site).compose_page(&page).unwrap().html;

        assert!(html.find("<aside").unwrap() < html.find("trellis-content").unwrap());
    }

    #[test]
    fn test_compose_twice_is_identical() {
        let store = Arc::new(MemoryStore::new());
        seed_demo(&*store).unwrap();
        let cache = MemoryCache::new();
        let composer = TemplateComposer::new(
            Arc::clone(&store) as Arc<dyn Store>,
            &cache,
            RenderOptions::default(),
        );

        let first = composer.render_public(None).unwrap();
        let second = composer.render_public(None).unwrap();

        assert_eq!(first.html, second.html);
        assert!(first.html.contains("/themes/aurora/css/theme.css?v=1.0.0"));
        assert!(first.html.contains(r#"<style id="trellis-styles">"#));
    }

    #[test]
    fn test_no_active_theme() {
        let store = Arc::new(MemoryStore::new());
        let page = store
            .insert_page(page("home", PageStatus::Published, None))
            .unwrap();
        let composer =
            TemplateComposer::new(store as Arc<dyn Store>, &NullCache, RenderOptions::default());

        let err = composer.compose_page(&page).unwrap_err();

        assert!(matches!(err, ComposeError::NoActiveTheme));
        assert_eq!(err.status_code(), 503);
    }

    #[test]
    fn test_missing_template_is_invalid() {
        let site = standard_site();
        let page = site
            .store
            .insert_page(page("orphan", PageStatus::Published, None))
            .unwrap();

        let err = composer(&site).compose_page(&page).unwrap_err();

        assert_eq!(err.kind(), "invalid-template");
    }

    #[test]
    fn test_template_of_inactive_theme_is_invalid() {
        let site = standard_site();
        let page = published(&site, "home");
        let other = site
            .store
            .insert_theme(Theme {
                id: 0,
                slug: "other".to_owned(),
                name: "Other".to_owned(),
                active: false,
                base_path: "/themes/other".to_owned(),
                version: String::new(),
                css: Vec::new(),
                js: Vec::new(),
            })
            .unwrap();
        site.store.activate_theme(other.id).unwrap();

        let err = composer(&site).compose_page(&page).unwrap_err();

        assert!(matches!(err, ComposeError::InvalidTemplate { .. }));
        site.store.activate_theme(site.theme).unwrap();
        assert!(composer(&site).compose_page(&page).is_ok());
    }

    #[test]
    fn test_root_resolution() {
        let site = standard_site();
        let composer = composer(&site);
        assert!(matches!(composer.resolve_root(), Err(ComposeError::NoHomepage)));

        site.store
            .insert_page(page("draft", PageStatus::Draft, Some(site.template)))
            .unwrap();
        assert!(matches!(composer.resolve_root(), Err(ComposeError::NoHomepage)));

        let first = published(&site, "first");
        published(&site, "second");
        assert_eq!(composer.resolve_root().unwrap().id, first.id);

        let mut home = published(&site, "home");
        home.is_homepage = true;
        site.store.update_page(home.clone()).unwrap();
        assert_eq!(composer.resolve_root().unwrap().id, home.id);
    }

    #[test]
    fn test_drafts_are_not_public() {
        let site = standard_site();
        site.store
            .insert_page(page("secret", PageStatus::Draft, Some(site.template)))
            .unwrap();

        let err = composer(&site).render_public(Some("secret")).unwrap_err();

        assert!(matches!(err, ComposeError::NotFound(_)));
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_panicking_widget_becomes_render_failure() {
        fn explode(_cx: &FieldContext, _env: &mut WidgetEnv<'_>) -> Result<String, WidgetError> {
            panic!("widget exploded")
        }
        let site = standard_site();
        let page = published(&site, "home");
        let section = add_section(&site, page.id, site.content_slot, GridRect::default());
        add_heading(&site, section.id, "boom");
        let mut registry = WidgetRegistry::with_builtins();
        registry.register(WidgetKind::Heading, explode);

        let composer = composer(&site).with_registry(registry);
        let err = composer.compose_page(&page).unwrap_err();

        assert!(matches!(err, ComposeError::RenderFailure(_)));
        let error_page = composer.error_page(&err);
        assert_eq!(error_page.status, 500);
        assert!(!error_page.html.contains("exploded"));
    }

    #[test]
    fn test_header_fallback_uses_header_menu() {
        let site = standard_site();
        let page = published(&site, "home");
        let menu = site
            .store
            .insert_menu(Menu {
                id: 0,
                name: "Main".to_owned(),
                location: "header".to_owned(),
                template_id: None,
            })
            .unwrap();
        site.store
            .insert_menu_item(MenuItem {
                id: 0,
                menu_id: menu.id,
                parent_id: None,
                label: "Home".to_owned(),
                target: LinkTarget::Page(page.id),
                order: 0,
                active: true,
            })
            .unwrap();

        let composed = composer(&site).compose_page(&page).unwrap();

        assert!(composed.html.contains(r#"<nav class="site-nav" aria-label="Main"><ul class="nav"><li class="nav-item current">"#));
        assert_eq!(composed.context.menu("header").unwrap().items.len(), 1);
    }

    #[test]
    fn test_preview_section_and_widget() {
        let site = standard_site();
        let page = published(&site, "home");
        let section = add_section(&site, page.id, site.content_slot, GridRect::default());
        let widget = add_heading(&site, section.id, "Preview");
        let composer = composer(&site);

        let section_preview = composer.preview_section(section.id).unwrap();
        let widget_preview = composer.preview_widget(widget.id).unwrap();

        assert_eq!(section_preview.section.widgets.len(), 1);
        assert!(widget_preview.widget.html.contains("Preview"));
        assert_eq!(
            composer.preview_section(999).unwrap_err().status_code(),
            404
        );
    }
}
