//! Widget field context.
//!
//! A widget renders from its stored field values, completed by the defaults
//! its type declares and by computed values (DOM id, background class).

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use trellis_store::{FieldKind, FieldMap, FieldValue, Id, Widget, WidgetType, fields_to_json};

/// Error raised by a widget renderer. Degrades to the failed-widget block.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WidgetError {
    #[error("required field '{0}' is missing")]
    MissingField(String),
    #[error("field '{field}' must be {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },
    #[error("{0}")]
    Unresolved(String),
}

/// CSS class for a dynamic background image: `bg-` plus the first 12 hex
/// characters of the SHA-256 of `url`.
#[must_use]
pub fn background_class(url: &str) -> String {
    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    format!("bg-{}", &digest[..12])
}

/// Field values available to a widget renderer.
#[derive(Clone, Debug)]
pub struct FieldContext {
    widget_id: Id,
    dom_id: String,
    values: FieldMap,
}

impl FieldContext {
    /// Stored values of `widget`, then defaults declared by `widget_type` for
    /// fields the widget does not set.
    #[must_use]
    pub fn new(widget: &Widget, widget_type: Option<&WidgetType>) -> Self {
        let mut values = widget.fields.clone();
        if let Some(widget_type) = widget_type {
            for def in &widget_type.fields {
                if let Some(default) = &def.default {
                    values
                        .entry(def.name.clone())
                        .or_insert_with(|| default.clone());
                }
            }
            // Unchecked checkboxes without a default read as false
            for def in &widget_type.fields {
                if def.kind == FieldKind::Checkbox {
                    values
                        .entry(def.name.clone())
                        .or_insert(FieldValue::Bool(false));
                }
            }
        }
        Self {
            widget_id: widget.id,
            dom_id: format!("widget-{}", widget.id),
            values,
        }
    }

    #[must_use]
    pub fn widget_id(&self) -> Id {
        self.widget_id
    }

    /// Computed DOM id, `widget-{id}`.
    #[must_use]
    pub fn dom_id(&self) -> &str {
        &self.dom_id
    }

    /// Resolved values, stored first, defaults filled in.
    #[must_use]
    pub fn values(&self) -> &FieldMap {
        &self.values
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Text value. Empty strings count as unset.
    pub fn text(&self, name: &str) -> Result<Option<&str>, WidgetError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(FieldValue::Text(text)) if text.is_empty() => Ok(None),
            Some(FieldValue::Text(text)) => Ok(Some(text)),
            Some(_) => Err(invalid(name, "text")),
        }
    }

    pub fn require_text(&self, name: &str) -> Result<&str, WidgetError> {
        self.text(name)?
            .ok_or_else(|| WidgetError::MissingField(name.to_owned()))
    }

    pub fn flag(&self, name: &str) -> Result<bool, WidgetError> {
        match self.values.get(name) {
            None => Ok(false),
            Some(FieldValue::Bool(flag)) => Ok(*flag),
            Some(_) => Err(invalid(name, "a boolean")),
        }
    }

    /// Media reference id.
    pub fn media(&self, name: &str) -> Result<Option<Id>, WidgetError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(FieldValue::Media(id)) => Ok(Some(*id)),
            Some(_) => Err(invalid(name, "a media reference")),
        }
    }

    /// Content reference id.
    pub fn content(&self, name: &str) -> Result<Option<Id>, WidgetError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(FieldValue::Content(id)) => Ok(Some(*id)),
            Some(_) => Err(invalid(name, "a content reference")),
        }
    }

    /// Repeater rows.
    pub fn list(&self, name: &str) -> Result<&[FieldMap], WidgetError> {
        match self.values.get(name) {
            None => Ok(&[]),
            Some(FieldValue::List(rows)) => Ok(rows),
            Some(_) => Err(invalid(name, "a list")),
        }
    }

    /// Plain JSON view including the computed `dom_id`.
    #[must_use]
    pub fn to_json(&self) -> Map<String, Value> {
        let mut json = fields_to_json(&self.values);
        json.insert("dom_id".to_owned(), Value::String(self.dom_id.clone()));
        json
    }
}

fn invalid(field: &str, expected: &'static str) -> WidgetError {
    WidgetError::InvalidField {
        field: field.to_owned(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use trellis_store::FieldDef;

    use super::*;

    fn widget(fields: FieldMap) -> Widget {
        Widget {
            id: 7,
            section_id: 1,
            widget_type: "button".to_owned(),
            order: 0,
            position: None,
            fields,
            locked: false,
            version: 1,
            updated_at: Default::default(),
        }
    }

    fn button_type() -> WidgetType {
        WidgetType {
            slug: "button".to_owned(),
            name: "Button".to_owned(),
            description: String::new(),
            icon: String::new(),
            fields: vec![
                FieldDef::new("label", "Label", FieldKind::Text).required(),
                FieldDef::new("style", "Style", FieldKind::Radio)
                    .with_options(&["primary", "link"])
                    .with_default(FieldValue::Text("primary".to_owned())),
                FieldDef::new("new_tab", "New tab", FieldKind::Checkbox),
            ],
        }
    }

    #[test]
    fn test_stored_values_win_over_defaults() {
        let mut fields = FieldMap::new();
        fields.insert("style".to_owned(), FieldValue::Text("link".to_owned()));
        let cx = FieldContext::new(&widget(fields), Some(&button_type()));

        assert_eq!(cx.text("style").unwrap(), Some("link"));
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let cx = FieldContext::new(&widget(FieldMap::new()), Some(&button_type()));

        assert_eq!(cx.text("style").unwrap(), Some("primary"));
        assert!(!cx.flag("new_tab").unwrap());
        assert_eq!(cx.dom_id(), "widget-7");
        assert_eq!(
            cx.require_text("label").unwrap_err(),
            WidgetError::MissingField("label".to_owned())
        );
    }

    #[test]
    fn test_wrong_type_is_invalid() {
        let mut fields = FieldMap::new();
        fields.insert("label".to_owned(), FieldValue::Bool(true));
        let cx = FieldContext::new(&widget(fields), None);

        assert!(matches!(
            cx.require_text("label"),
            Err(WidgetError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_background_class_is_stable() {
        let class = background_class("/media/uploads/hero.jpg");
        assert_eq!(class.len(), "bg-".len() + 12);
        assert_eq!(class, background_class("/media/uploads/hero.jpg"));
        assert_ne!(class, background_class("/media/uploads/other.jpg"));
    }

    #[test]
    fn test_to_json_includes_dom_id() {
        let cx = FieldContext::new(&widget(FieldMap::new()), Some(&button_type()));
        let json = cx.to_json();
        assert_eq!(json["dom_id"], "widget-7");
        assert_eq!(json["style"], "primary");
    }
}
