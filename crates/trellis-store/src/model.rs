//! Persisted entities.
//!
//! Pages own sections and sections own widgets. Widgets reference media and
//! content items by id only, so deleting media never rewrites widget fields.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Entity identifier allocated by the store. Strictly increasing.
pub type Id = u64;

/// Publication status of a page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    /// Visible only through admin preview.
    #[default]
    Draft,
    /// Served on the public site.
    Published,
}

/// A page of the public site.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: Id,
    pub title: String,
    /// URL slug: lowercase ASCII letters, digits and `-`.
    pub slug: String,
    #[serde(default)]
    pub status: PageStatus,
    /// Served at `/`. At most one page carries the flag.
    #[serde(default)]
    pub is_homepage: bool,
    #[serde(default)]
    pub template_id: Option<Id>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl Page {
    /// Public URL path of the page.
    #[must_use]
    pub fn url(&self) -> String {
        if self.is_homepage {
            "/".to_owned()
        } else {
            format!("/{}", self.slug)
        }
    }

    /// Whether the page may be served publicly.
    #[must_use]
    pub fn is_published(&self) -> bool {
        self.status == PageStatus::Published
    }
}

/// Named region of a template layout.
///
/// Variant order is the fixed structural order of the assembled page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placeholder {
    Header,
    Content,
    Sidebar,
    Footer,
}

impl Placeholder {
    /// All placeholders in structural order.
    pub const ALL: [Self; 4] = [Self::Header, Self::Content, Self::Sidebar, Self::Footer];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Content => "content",
            Self::Sidebar => "sidebar",
            Self::Footer => "footer",
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A placeholder declared by a template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderSlot {
    pub placeholder: Placeholder,
    /// Optional slots are omitted when the page has no section for them.
    #[serde(default)]
    pub optional: bool,
}

/// Named page layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: Id,
    pub name: String,
    pub slug: String,
    pub theme_id: Id,
    pub placeholders: Vec<PlaceholderSlot>,
    /// Default stylesheet bundle, relative to the theme base path.
    #[serde(default)]
    pub css: Vec<String>,
    /// Default script bundle, relative to the theme base path.
    #[serde(default)]
    pub js: Vec<String>,
}

impl Template {
    /// Declaration for `placeholder`, if the template has one.
    #[must_use]
    pub fn slot(&self, placeholder: Placeholder) -> Option<&PlaceholderSlot> {
        self.placeholders
            .iter()
            .find(|slot| slot.placeholder == placeholder)
    }
}

/// Layout kind of a section.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKind {
    #[default]
    FullWidth,
    MultiColumn,
    SidebarLeft,
    SidebarRight,
}

impl SectionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullWidth => "full-width",
            Self::MultiColumn => "multi-column",
            Self::SidebarLeft => "sidebar-left",
            Self::SidebarRight => "sidebar-right",
        }
    }
}

/// Section settings.
///
/// Known keys are typed; anything else lands in `extra` and is carried
/// through untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_classes: Option<Vec<String>>,
    /// Columns per row for widgets without a grid rectangle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<u16>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SectionSettings {
    /// Merge these settings over `defaults`. Keys set here win.
    #[must_use]
    pub fn merged_over(&self, defaults: &Self) -> Self {
        let mut extra = defaults.extra.clone();
        for (key, value) in &self.extra {
            extra.insert(key.clone(), value.clone());
        }
        Self {
            background_color: self
                .background_color
                .clone()
                .or_else(|| defaults.background_color.clone()),
            custom_classes: self
                .custom_classes
                .clone()
                .or_else(|| defaults.custom_classes.clone()),
            columns: self.columns.or(defaults.columns),
            extra,
        }
    }
}

/// Slot definition within a template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateSection {
    pub id: Id,
    pub template_id: Id,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub kind: SectionKind,
    pub placeholder: Placeholder,
    #[serde(default)]
    pub defaults: SectionSettings,
}

/// Rectangle on the layout grid, in grid units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridRect {
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
}

impl GridRect {
    #[must_use]
    pub fn new(x: u16, y: u16, w: u16, h: u16) -> Self {
        Self { x, y, w, h }
    }

    /// Whether the two rectangles share any cell.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        u32::from(self.x) < other.right()
            && u32::from(other.x) < self.right()
            && u32::from(self.y) < other.bottom()
            && u32::from(other.y) < self.bottom()
    }

    /// First column to the right of the rectangle.
    #[must_use]
    pub fn right(&self) -> u32 {
        u32::from(self.x) + u32::from(self.w)
    }

    /// First row below the rectangle.
    #[must_use]
    pub fn bottom(&self) -> u32 {
        u32::from(self.y) + u32::from(self.h)
    }
}

impl Default for GridRect {
    fn default() -> Self {
        Self::new(0, 0, 12, 1)
    }
}

/// Page-level instance of a template section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: Id,
    pub page_id: Id,
    pub template_section_id: Id,
    #[serde(default)]
    pub settings: SectionSettings,
    #[serde(default)]
    pub position: GridRect,
    /// Locked sections block overlapping moves of their siblings.
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

/// Widget field values keyed by field name.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// A typed widget field value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Bool(bool),
    /// Media id, resolved to a URL at render time.
    Media(Id),
    /// Content item id.
    Content(Id),
    /// Repeater rows.
    List(Vec<FieldMap>),
    /// Value for a field the widget type does not declare.
    Json(Value),
}

impl FieldValue {
    /// Plain JSON form used by the API.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::Bool(flag) => Value::Bool(*flag),
            Self::Media(id) | Self::Content(id) => Value::from(*id),
            Self::List(rows) => Value::Array(
                rows.iter()
                    .map(|row| Value::Object(fields_to_json(row)))
                    .collect(),
            ),
            Self::Json(value) => value.clone(),
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(flag) => Some(*flag),
            _ => None,
        }
    }
}

/// Plain JSON object for a field map.
#[must_use]
pub fn fields_to_json(fields: &FieldMap) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect()
}

/// A configured widget instance inside a section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: Id,
    pub section_id: Id,
    /// Widget type slug.
    pub widget_type: String,
    /// Order index within the section. Ties resolve by id.
    #[serde(default)]
    pub order: i32,
    /// Free-form grid rectangle inside the section.
    #[serde(default)]
    pub position: Option<GridRect>,
    #[serde(default)]
    pub fields: FieldMap,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

/// Input control kind of a widget field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
    Select,
    Radio,
    Checkbox,
    Image,
    File,
    Repeater,
    Content,
}

/// Schema entry for one widget field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    /// Allowed values for select and radio fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<FieldValue>,
    /// Row schema for repeater fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDef>,
}

impl FieldDef {
    /// Field with no options, default or nested schema.
    #[must_use]
    pub fn new(name: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_owned(),
            label: label.to_owned(),
            kind,
            required: false,
            options: Vec::new(),
            default: None,
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_default(mut self, value: FieldValue) -> Self {
        self.default = Some(value);
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|&o| o.to_owned()).collect();
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: Vec<FieldDef>) -> Self {
        self.fields = fields;
        self
    }
}

/// Schema of a widget type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WidgetType {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl WidgetType {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Navigation menu bound to a location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub id: Id,
    pub name: String,
    /// Location key such as `header` or `footer`.
    pub location: String,
    /// Restricts the menu to pages using this template.
    #[serde(default)]
    pub template_id: Option<Id>,
}

/// Where a menu item points.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum LinkTarget {
    Page(Id),
    Url(String),
    /// In-page section anchor, without `#`.
    Anchor(String),
}

/// Flat menu row. The tree is rebuilt from `parent_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: Id,
    pub menu_id: Id,
    #[serde(default)]
    pub parent_id: Option<Id>,
    pub label: String,
    pub target: LinkTarget,
    #[serde(default)]
    pub order: i32,
    /// Inactive items are hidden together with their subtree.
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// Precedence layer of a theme asset.
///
/// Variant order is load order: later layers override earlier ones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetLayer {
    Framework,
    #[default]
    Core,
    Responsive,
    Custom,
}

/// One entry of a theme asset manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
    /// Path relative to the theme base path.
    pub path: String,
    #[serde(default)]
    pub layer: AssetLayer,
}

impl AssetEntry {
    #[must_use]
    pub fn new(path: &str, layer: AssetLayer) -> Self {
        Self {
            path: path.to_owned(),
            layer,
        }
    }
}

/// Bundle of assets applied to the public site.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub id: Id,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub active: bool,
    /// URL prefix of the theme's asset directory.
    pub base_path: String,
    /// Appended to asset URLs for cache busting.
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub css: Vec<AssetEntry>,
    #[serde(default)]
    pub js: Vec<AssetEntry>,
}

/// Uploaded media file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub id: Id,
    /// Path relative to the media base URL.
    pub path: String,
    #[serde(default)]
    pub alt: String,
}

/// Content item that widgets can reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: Id,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub excerpt: String,
}
