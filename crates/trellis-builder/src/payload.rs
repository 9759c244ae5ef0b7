//! Request payloads and their validation.
//!
//! Widget field values arrive as plain JSON and are coerced against the widget
//! type schema before they are stored:
//!
//! | Field kind | Accepted input | Stored as |
//! |---|---|---|
//! | text, textarea | string, number, boolean | text |
//! | select, radio | same, and one of the declared options | text |
//! | checkbox | boolean, `0`/`1`, `"on"`/`"off"`, `"true"`/`"false"`, `"yes"`/`"no"` | boolean |
//! | image, file | media id as number, numeric string or `{"id": ..}` | media reference |
//! | content | content id, same forms | content reference |
//! | repeater | array of objects, each validated against the nested fields | list |
//!
//! Keys the schema does not declare are kept as raw JSON.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use trellis_store::{
    FieldDef, FieldKind, FieldMap, FieldValue, Id, SectionSettings, Store, StoreError, WidgetType,
};

use crate::error::ValidationErrors;
use crate::grid::{LayoutItem, PositionPatch};

static COLOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(#[0-9a-fA-F]{3,8}|[a-zA-Z]+|rgba?\(\s*\d{1,3}%?\s*,\s*\d{1,3}%?\s*,\s*\d{1,3}%?\s*(,\s*(0|1|0?\.\d+)\s*)?\))$")
        .expect("invalid color regex")
});

static CLASS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[_a-zA-Z][_a-zA-Z0-9-]*$").expect("invalid class regex"));

/// Body of section create and update calls.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionPayload {
    #[serde(default)]
    pub template_section_id: Option<Id>,
    /// Replaces the stored settings when present.
    #[serde(default)]
    pub settings: Option<Value>,
    #[serde(default)]
    pub position: Option<PositionPatch>,
    #[serde(default)]
    pub locked: Option<bool>,
    /// Expected version. Absent means last write wins.
    #[serde(default)]
    pub version: Option<u64>,
}

/// Body of widget create and update calls.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WidgetPayload {
    #[serde(default)]
    pub widget_type: Option<String>,
    #[serde(default)]
    pub order: Option<i32>,
    #[serde(default)]
    pub position: Option<PositionPatch>,
    /// Replaces the stored field values when present.
    #[serde(default)]
    pub fields: Option<Map<String, Value>>,
    #[serde(default)]
    pub locked: Option<bool>,
    #[serde(default)]
    pub version: Option<u64>,
}

/// Body of the position endpoints: a partial rectangle plus optional version.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionPayload {
    #[serde(flatten)]
    pub position: PositionPatch,
    #[serde(default)]
    pub version: Option<u64>,
}

/// Body of a widget layout sync.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutPayload {
    pub items: Vec<LayoutItem>,
}

/// Parse and check section settings against a grid of `columns` columns.
pub fn parse_settings(value: &Value, columns: u16) -> Result<SectionSettings, ValidationErrors> {
    if !value.is_object() {
        return Err(ValidationErrors::single("settings", "must be an object"));
    }
    let settings: SectionSettings = serde_json::from_value(value.clone())
        .map_err(|e| ValidationErrors::single("settings", e.to_string()))?;

    let mut errors = ValidationErrors::new();
    if let Some(color) = &settings.background_color
        && !COLOR_PATTERN.is_match(color.trim())
    {
        errors.add(
            "settings.background_color",
            "must be a hex, named or rgb() color",
        );
    }
    for (i, class) in settings.custom_classes.iter().flatten().enumerate() {
        if !CLASS_PATTERN.is_match(class) {
            errors.add(
                format!("settings.custom_classes[{i}]"),
                "is not a valid CSS class name",
            );
        }
    }
    if let Some(n) = settings.columns
        && (n == 0 || n > columns)
    {
        errors.add(
            "settings.columns",
            format!("must be between 1 and {columns}"),
        );
    }

    if errors.is_empty() {
        Ok(settings)
    } else {
        Err(errors)
    }
}

/// Coerce `input` against the schema of `widget_type`.
///
/// Required fields without a declared default must be present and non-empty.
/// Nulls count as absent.
pub fn coerce_fields(
    widget_type: &WidgetType,
    input: &Map<String, Value>,
) -> Result<FieldMap, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let fields = coerce_map(&widget_type.fields, input, "fields", &mut errors);
    if errors.is_empty() {
        Ok(fields)
    } else {
        Err(errors)
    }
}

fn coerce_map(
    defs: &[FieldDef],
    input: &Map<String, Value>,
    prefix: &str,
    errors: &mut ValidationErrors,
) -> FieldMap {
    let mut fields = FieldMap::new();
    for def in defs {
        let path = format!("{prefix}.{}", def.name);
        match input.get(&def.name).filter(|v| !v.is_null()) {
            Some(value) => {
                if let Some(coerced) = coerce_value(def, value, &path, errors) {
                    if def.required && is_blank(&coerced) && def.default.is_none() {
                        errors.add(path, "is required");
                    } else {
                        fields.insert(def.name.clone(), coerced);
                    }
                }
            }
            None if def.required && def.default.is_none() && def.kind != FieldKind::Checkbox => {
                errors.add(path, "is required");
            }
            None => {}
        }
    }
    for (key, value) in input {
        if value.is_null() || defs.iter().any(|def| &def.name == key) {
            continue;
        }
        fields.insert(key.clone(), FieldValue::Json(value.clone()));
    }
    fields
}

fn coerce_value(
    def: &FieldDef,
    value: &Value,
    path: &str,
    errors: &mut ValidationErrors,
) -> Option<FieldValue> {
    let coerced = match def.kind {
        FieldKind::Text | FieldKind::Textarea => text(value).map(FieldValue::Text),
        FieldKind::Select | FieldKind::Radio => match text(value) {
            Some(choice) if def.options.is_empty() || def.options.contains(&choice) => {
                Some(FieldValue::Text(choice))
            }
            Some(_) => {
                errors.add(path, format!("must be one of: {}", def.options.join(", ")));
                return None;
            }
            None => None,
        },
        FieldKind::Checkbox => boolean(value).map(FieldValue::Bool),
        FieldKind::Image | FieldKind::File => id(value).map(FieldValue::Media),
        FieldKind::Content => id(value).map(FieldValue::Content),
        FieldKind::Repeater => {
            let Value::Array(rows) = value else {
                errors.add(path, "must be a list");
                return None;
            };
            let mut coerced = Vec::with_capacity(rows.len());
            for (i, row) in rows.iter().enumerate() {
                let row_path = format!("{path}[{i}]");
                match row {
                    Value::Object(row) => {
                        coerced.push(coerce_map(&def.fields, row, &row_path, errors));
                    }
                    _ => errors.add(row_path, "must be an object"),
                }
            }
            return Some(FieldValue::List(coerced));
        }
    };
    if coerced.is_none() {
        errors.add(path, expectation(def.kind));
    }
    coerced
}

fn expectation(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Text | FieldKind::Textarea | FieldKind::Select | FieldKind::Radio => {
            "must be a string"
        }
        FieldKind::Checkbox => "must be a boolean",
        FieldKind::Image | FieldKind::File => "must be a media id",
        FieldKind::Content => "must be a content id",
        FieldKind::Repeater => "must be a list",
    }
}

fn is_blank(value: &FieldValue) -> bool {
    match value {
        FieldValue::Text(s) => s.trim().is_empty(),
        FieldValue::List(rows) => rows.is_empty(),
        _ => false,
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => Some(true),
            "" | "0" | "false" | "off" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn id(value: &Value) -> Option<Id> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Object(map) => map.get("id").and_then(id),
        _ => None,
    }
}

/// Report media and content references in `fields` that do not exist.
pub fn check_references(
    fields: &FieldMap,
    store: &dyn Store,
) -> Result<ValidationErrors, StoreError> {
    let mut errors = ValidationErrors::new();
    check_map(fields, "fields", store, &mut errors)?;
    Ok(errors)
}

fn check_map(
    fields: &FieldMap,
    prefix: &str,
    store: &dyn Store,
    errors: &mut ValidationErrors,
) -> Result<(), StoreError> {
    for (name, value) in fields {
        let path = format!("{prefix}.{name}");
        let missing = match value {
            FieldValue::Media(id) => {
                is_missing(store.media(*id))?.then(|| format!("media {id} does not exist"))
            }
            FieldValue::Content(id) => {
                is_missing(store.content(*id))?.then(|| format!("content item {id} does not exist"))
            }
            FieldValue::List(rows) => {
                for (i, row) in rows.iter().enumerate() {
                    check_map(row, &format!("{path}[{i}]"), store, errors)?;
                }
                None
            }
            _ => None,
        };
        if let Some(message) = missing {
            errors.add(path, message);
        }
    }
    Ok(())
}

/// `Ok(true)` when the lookup failed with not-found.
fn is_missing<T>(lookup: Result<T, StoreError>) -> Result<bool, StoreError> {
    match lookup {
        Ok(_) => Ok(false),
        Err(e) if e.is_not_found() => Ok(true),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use trellis_store::{Media, MemoryStore, builtin_widget_types};

    use super::*;

    fn widget_type(slug: &str) -> WidgetType {
        builtin_widget_types()
            .into_iter()
            .find(|t| t.slug == slug)
            .unwrap()
    }

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_checkbox_coercion() {
        let button = widget_type("button");
        for (input, expected) in [
            (json!("on"), true),
            (json!("1"), true),
            (json!(1), true),
            (json!("off"), false),
            (json!(""), false),
            (json!(false), false),
        ] {
            let fields = coerce_fields(
                &button,
                &object(json!({"label": "Go", "url": "/go", "new_tab": input})),
            )
            .unwrap();
            assert_eq!(fields["new_tab"], FieldValue::Bool(expected));
        }
    }

    #[test]
    fn test_invalid_checkbox_rejected() {
        let errors = coerce_fields(
            &widget_type("button"),
            &object(json!({"label": "Go", "url": "/go", "new_tab": "maybe"})),
        )
        .unwrap_err();
        assert_eq!(
            errors.get("fields.new_tab"),
            Some(&["must be a boolean".to_owned()][..])
        );
    }

    #[test]
    fn test_required_fields() {
        let errors = coerce_fields(&widget_type("button"), &object(json!({"label": "  "})))
            .unwrap_err();
        assert!(errors.get("fields.label").is_some());
        assert!(errors.get("fields.url").is_some());
        assert!(errors.get("fields.style").is_none());
    }

    #[test]
    fn test_select_options_enforced() {
        let heading = widget_type("heading");
        let errors =
            coerce_fields(&heading, &object(json!({"text": "Hi", "level": "h9"}))).unwrap_err();
        assert!(errors.get("fields.level").unwrap()[0].starts_with("must be one of"));

        let fields = coerce_fields(&heading, &object(json!({"text": 42, "level": "h3"}))).unwrap();
        assert_eq!(fields["text"], FieldValue::Text("42".to_owned()));
    }

    #[test]
    fn test_media_ids_and_unknown_keys() {
        let fields = coerce_fields(
            &widget_type("image"),
            &object(json!({"image": "7", "alt": "A cat", "ratio": 1.5, "note": null})),
        )
        .unwrap();

        assert_eq!(fields["image"], FieldValue::Media(7));
        assert_eq!(fields["ratio"], FieldValue::Json(json!(1.5)));
        assert!(!fields.contains_key("note"));
    }

    #[test]
    fn test_repeater_rows_validated_with_paths() {
        let errors = coerce_fields(
            &widget_type("gallery"),
            &object(json!({"images": [{"image": 1}, {"caption": "no image"}, "x"]})),
        )
        .unwrap_err();

        assert!(errors.get("fields.images[1].image").is_some());
        assert!(errors.get("fields.images[2]").is_some());
    }

    #[test]
    fn test_repeater_coerced() {
        let fields = coerce_fields(
            &widget_type("gallery"),
            &object(json!({"images": [{"image": {"id": 3}, "caption": "One"}], "columns": 2})),
        )
        .unwrap();

        let FieldValue::List(rows) = &fields["images"] else {
            panic!("expected list");
        };
        assert_eq!(rows[0]["image"], FieldValue::Media(3));
        assert_eq!(fields["columns"], FieldValue::Text("2".to_owned()));
    }

    #[test]
    fn test_settings_validation() {
        let settings = parse_settings(
            &json!({"background_color": "#fafafa", "custom_classes": ["py-5"], "columns": 3, "anchor": "intro"}),
            12,
        )
        .unwrap();
        assert_eq!(settings.columns, Some(3));
        assert_eq!(settings.extra["anchor"], "intro");

        let errors = parse_settings(
            &json!({"background_color": "red; position: fixed", "custom_classes": ["ok", "1bad"], "columns": 0}),
            12,
        )
        .unwrap_err();
        assert!(errors.get("settings.background_color").is_some());
        assert!(errors.get("settings.custom_classes[1]").is_some());
        assert!(errors.get("settings.columns").is_some());

        assert!(parse_settings(&json!([1]), 12).is_err());
    }

    #[test]
    fn test_dangling_references_reported() {
        let store = MemoryStore::new();
        let media = store
            .insert_media(Media {
                id: 0,
                path: "a.jpg".to_owned(),
                alt: String::new(),
            })
            .unwrap();
        let mut fields = FieldMap::new();
        fields.insert("image".to_owned(), FieldValue::Media(media.id));
        fields.insert("attachment".to_owned(), FieldValue::Media(99));

        let errors = check_references(&fields, &store).unwrap();

        assert_eq!(errors.fields().len(), 1);
        assert!(errors.get("fields.attachment").is_some());
    }

    #[test]
    fn test_position_payload_flattened() {
        let payload: PositionPayload =
            serde_json::from_value(json!({"x": -1, "w": 4, "version": 2})).unwrap();
        assert_eq!(payload.position.x, Some(-1));
        assert_eq!(payload.position.y, None);
        assert_eq!(payload.version, Some(2));
    }
}
