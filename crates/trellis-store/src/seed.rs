//! Built-in widget types and the demo site.

use chrono::DateTime;

use crate::model::{
    AssetEntry, AssetLayer, ContentItem, FieldDef, FieldKind, FieldMap, FieldValue, GridRect, Id,
    LinkTarget, Media, Menu, MenuItem, Page, PageStatus, Placeholder, PlaceholderSlot, Section,
    SectionKind, SectionSettings, Template, TemplateSection, Theme, Widget, WidgetType,
};
use crate::store::{Store, StoreError};

fn widget_type(slug: &str, name: &str, icon: &str, description: &str, fields: Vec<FieldDef>) -> WidgetType {
    WidgetType {
        slug: slug.to_owned(),
        name: name.to_owned(),
        description: description.to_owned(),
        icon: icon.to_owned(),
        fields,
    }
}

fn text(value: &str) -> FieldValue {
    FieldValue::Text(value.to_owned())
}

/// Schemas of the widget kinds the renderer ships with.
#[must_use]
pub fn builtin_widget_types() -> Vec<WidgetType> {
    use FieldKind as K;

    vec![
        widget_type(
            "heading",
            "Heading",
            "type",
            "Section title",
            vec![
                FieldDef::new("text", "Text", K::Text).required(),
                FieldDef::new("level", "Level", K::Select)
                    .with_options(&["h1", "h2", "h3", "h4"])
                    .with_default(text("h2")),
            ],
        ),
        widget_type(
            "text",
            "Text",
            "align-left",
            "Markdown formatted text",
            vec![FieldDef::new("body", "Body", K::Textarea).required()],
        ),
        widget_type(
            "image",
            "Image",
            "image",
            "Single image with caption",
            vec![
                FieldDef::new("image", "Image", K::Image).required(),
                FieldDef::new("alt", "Alternative text", K::Text),
                FieldDef::new("caption", "Caption", K::Text),
            ],
        ),
        widget_type(
            "hero",
            "Hero",
            "star",
            "Large banner with background image",
            vec![
                FieldDef::new("title", "Title", K::Text).required(),
                FieldDef::new("subtitle", "Subtitle", K::Textarea),
                FieldDef::new("background", "Background", K::Image),
                FieldDef::new("cta_label", "Button label", K::Text),
                FieldDef::new("cta_url", "Button link", K::Text),
            ],
        ),
        widget_type(
            "button",
            "Button",
            "mouse-pointer",
            "Call to action link",
            vec![
                FieldDef::new("label", "Label", K::Text).required(),
                FieldDef::new("url", "Link", K::Text).required(),
                FieldDef::new("style", "Style", K::Radio)
                    .with_options(&["primary", "secondary", "link"])
                    .with_default(text("primary")),
                FieldDef::new("new_tab", "Open in new tab", K::Checkbox)
                    .with_default(FieldValue::Bool(false)),
            ],
        ),
        widget_type(
            "gallery",
            "Gallery",
            "grid",
            "Grid of images",
            vec![
                FieldDef::new("images", "Images", K::Repeater).with_fields(vec![
                    FieldDef::new("image", "Image", K::Image).required(),
                    FieldDef::new("caption", "Caption", K::Text),
                ]),
                FieldDef::new("columns", "Columns", K::Select)
                    .with_options(&["2", "3", "4"])
                    .with_default(text("3")),
            ],
        ),
        widget_type(
            "content-card",
            "Content card",
            "file-text",
            "Teaser for a content item",
            vec![
                FieldDef::new("content", "Content", K::Content).required(),
                FieldDef::new("show_excerpt", "Show excerpt", K::Checkbox)
                    .with_default(FieldValue::Bool(true)),
                FieldDef::new("attachment", "Attachment", K::File),
            ],
        ),
        widget_type(
            "spacer",
            "Spacer",
            "move-vertical",
            "Vertical whitespace",
            vec![
                FieldDef::new("size", "Size", K::Select)
                    .with_options(&["sm", "md", "lg"])
                    .with_default(text("md")),
            ],
        ),
        widget_type(
            "html",
            "HTML",
            "code",
            "Raw markup, inserted as-is",
            vec![FieldDef::new("markup", "Markup", K::Textarea).required()],
        ),
    ]
}

fn page(title: &str, slug: &str, status: PageStatus, template_id: Id) -> Page {
    Page {
        id: 0,
        title: title.to_owned(),
        slug: slug.to_owned(),
        status,
        is_homepage: false,
        template_id: Some(template_id),
        updated_at: DateTime::default(),
    }
}

fn section(page_id: Id, template_section_id: Id, position: GridRect) -> Section {
    Section {
        id: 0,
        page_id,
        template_section_id,
        settings: SectionSettings::default(),
        position,
        locked: false,
        version: 0,
        updated_at: DateTime::default(),
    }
}

fn widget(section_id: Id, widget_type: &str, order: i32, fields: &[(&str, FieldValue)]) -> Widget {
    Widget {
        id: 0,
        section_id,
        widget_type: widget_type.to_owned(),
        order,
        position: None,
        fields: fields
            .iter()
            .map(|(name, value)| ((*name).to_owned(), value.clone()))
            .collect::<FieldMap>(),
        locked: false,
        version: 0,
        updated_at: DateTime::default(),
    }
}

fn template_section(
    template_id: Id,
    name: &str,
    slug: &str,
    kind: SectionKind,
    placeholder: Placeholder,
    defaults: SectionSettings,
) -> TemplateSection {
    TemplateSection {
        id: 0,
        template_id,
        name: name.to_owned(),
        slug: slug.to_owned(),
        kind,
        placeholder,
        defaults,
    }
}

fn menu_item(menu_id: Id, parent_id: Option<Id>, label: &str, target: LinkTarget, order: i32) -> MenuItem {
    MenuItem {
        id: 0,
        menu_id,
        parent_id,
        label: label.to_owned(),
        target,
        order,
        active: true,
    }
}

/// Populate `store` with the built-in widget types and a small demo site.
///
/// Intended for an empty store; running it twice fails on duplicate page
/// slugs after the widget types have been refreshed.
pub fn seed_demo(store: &dyn Store) -> Result<(), StoreError> {
    for widget_type in builtin_widget_types() {
        store.upsert_widget_type(widget_type)?;
    }

    let theme = store.insert_theme(Theme {
        id: 0,
        slug: "aurora".to_owned(),
        name: "Aurora".to_owned(),
        active: true,
        base_path: "/themes/aurora".to_owned(),
        version: "1.0.0".to_owned(),
        css: vec![
            AssetEntry::new("css/custom.css", AssetLayer::Custom),
            AssetEntry::new("vendor/bootstrap.min.css", AssetLayer::Framework),
            AssetEntry::new("css/theme.css", AssetLayer::Core),
            AssetEntry::new("css/responsive.css", AssetLayer::Responsive),
        ],
        js: vec![
            AssetEntry::new("vendor/bootstrap.bundle.min.js", AssetLayer::Framework),
            AssetEntry::new("js/theme.js", AssetLayer::Core),
        ],
    })?;

    let template = store.insert_template(Template {
        id: 0,
        name: "Default".to_owned(),
        slug: "default".to_owned(),
        theme_id: theme.id,
        placeholders: vec![
            PlaceholderSlot {
                placeholder: Placeholder::Header,
                optional: false,
            },
            PlaceholderSlot {
                placeholder: Placeholder::Content,
                optional: false,
            },
            PlaceholderSlot {
                placeholder: Placeholder::Sidebar,
                optional: true,
            },
            PlaceholderSlot {
                placeholder: Placeholder::Footer,
                optional: false,
            },
        ],
        css: vec!["templates/default.css".to_owned()],
        js: vec!["templates/default.js".to_owned()],
    })?;

    let hero_slot = store.insert_template_section(template_section(
        template.id,
        "Hero",
        "hero",
        SectionKind::FullWidth,
        Placeholder::Content,
        SectionSettings {
            custom_classes: Some(vec!["py-5".to_owned()]),
            ..SectionSettings::default()
        },
    ))?;
    let main_slot = store.insert_template_section(template_section(
        template.id,
        "Main",
        "main",
        SectionKind::MultiColumn,
        Placeholder::Content,
        SectionSettings {
            columns: Some(2),
            ..SectionSettings::default()
        },
    ))?;
    let sidebar_slot = store.insert_template_section(template_section(
        template.id,
        "Sidebar",
        "sidebar",
        SectionKind::SidebarRight,
        Placeholder::Sidebar,
        SectionSettings {
            background_color: Some("#f8f9fa".to_owned()),
            ..SectionSettings::default()
        },
    ))?;

    let hero_image = store.insert_media(Media {
        id: 0,
        path: "uploads/hero.jpg".to_owned(),
        alt: "Mountain ridge at dawn".to_owned(),
    })?;
    let team_image = store.insert_media(Media {
        id: 0,
        path: "uploads/team.jpg".to_owned(),
        alt: "The team".to_owned(),
    })?;
    let notes = store.insert_content(ContentItem {
        id: 0,
        title: "Launch notes".to_owned(),
        slug: "launch-notes".to_owned(),
        excerpt: "What shipped in the first release.".to_owned(),
    })?;

    let home = store.insert_page(Page {
        is_homepage: true,
        ..page("Home", "home", PageStatus::Published, template.id)
    })?;
    let about = store.insert_page(page("About", "about", PageStatus::Published, template.id))?;
    store.insert_page(page("Roadmap", "roadmap", PageStatus::Draft, template.id))?;

    let hero = store.insert_section(section(home.id, hero_slot.id, GridRect::new(0, 0, 12, 4)))?;
    store.insert_widget(widget(
        hero.id,
        "hero",
        0,
        &[
            ("title", text("Build pages, not templates")),
            ("subtitle", text("Compose sections and widgets on a grid.")),
            ("background", FieldValue::Media(hero_image.id)),
            ("cta_label", text("Learn more")),
            ("cta_url", text("/about")),
        ],
    ))?;

    let main = store.insert_section(section(home.id, main_slot.id, GridRect::new(0, 4, 12, 6)))?;
    store.insert_widget(widget(main.id, "heading", 0, &[("text", text("Latest"))]))?;
    store.insert_widget(widget(
        main.id,
        "text",
        1,
        &[("body", text("Trellis renders **sections** of *widgets* into themed pages."))],
    ))?;
    store.insert_widget(widget(
        main.id,
        "content-card",
        2,
        &[("content", FieldValue::Content(notes.id))],
    ))?;

    let aside = store.insert_section(section(home.id, sidebar_slot.id, GridRect::new(0, 0, 4, 6)))?;
    store.insert_widget(widget(
        aside.id,
        "button",
        0,
        &[("label", text("Contact us")), ("url", text("/contact"))],
    ))?;

    let about_main = store.insert_section(section(about.id, main_slot.id, GridRect::new(0, 0, 12, 6)))?;
    store.insert_widget(widget(about_main.id, "heading", 0, &[("text", text("About us")), ("level", text("h1"))]))?;
    store.insert_widget(widget(
        about_main.id,
        "image",
        1,
        &[("image", FieldValue::Media(team_image.id))],
    ))?;

    let header = store.insert_menu(Menu {
        id: 0,
        name: "Main navigation".to_owned(),
        location: "header".to_owned(),
        template_id: None,
    })?;
    store.insert_menu_item(menu_item(header.id, None, "Home", LinkTarget::Page(home.id), 0))?;
    let about_item = store.insert_menu_item(menu_item(header.id, None, "About", LinkTarget::Page(about.id), 1))?;
    store.insert_menu_item(menu_item(
        header.id,
        Some(about_item.id),
        "Team",
        LinkTarget::Anchor("team".to_owned()),
        0,
    ))?;
    store.insert_menu_item(menu_item(
        header.id,
        None,
        "Docs",
        LinkTarget::Url("https://example.com/docs".to_owned()),
        2,
    ))?;

    let footer = store.insert_menu(Menu {
        id: 0,
        name: "Footer".to_owned(),
        location: "footer".to_owned(),
        template_id: None,
    })?;
    store.insert_menu_item(menu_item(footer.id, None, "About", LinkTarget::Page(about.id), 0))?;
    store.insert_menu_item(menu_item(
        footer.id,
        None,
        "Contact",
        LinkTarget::Url("/contact".to_owned()),
        1,
    ))?;

    tracing::info!(revision = store.revision(), "Seeded demo site");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[test]
    fn test_builtin_types_have_unique_slugs() {
        let types = builtin_widget_types();
        let mut slugs: Vec<_> = types.iter().map(|t| t.slug.as_str()).collect();
        slugs.sort_unstable();
        slugs.dedup();
        assert_eq!(slugs.len(), types.len());
    }

    #[test]
    fn test_seed_demo_populates_site() {
        let store = MemoryStore::new();
        seed_demo(&store).unwrap();

        let pages = store.pages().unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages.iter().filter(|p| p.is_homepage).count(), 1);
        assert_eq!(store.active_theme().unwrap().unwrap().slug, "aurora");
        assert_eq!(store.widget_types().unwrap().len(), builtin_widget_types().len());

        let home = store.page_by_slug("home").unwrap().unwrap();
        assert_eq!(store.sections(home.id).unwrap().len(), 3);
    }

    #[test]
    fn test_seed_demo_twice_fails_on_slug() {
        let store = MemoryStore::new();
        seed_demo(&store).unwrap();
        assert!(seed_demo(&store).is_err());
    }
}
