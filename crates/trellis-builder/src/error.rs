//! Builder errors.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use trellis_render::ComposeError;
use trellis_store::StoreError;

/// Field-level validation messages keyed by field path (`x`, `fields.title`,
/// `items[2].w`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors with one message.
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Move every message of `other` into `self`.
    pub fn merge(&mut self, other: Self) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// Same as [`merge`](Self::merge), with every field path prefixed.
    pub fn merge_prefixed(&mut self, prefix: &str, other: Self) {
        for (field, messages) in other.0 {
            self.0
                .entry(format!("{prefix}.{field}"))
                .or_default()
                .extend(messages);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.0
    }

    /// `Ok(())` when empty, otherwise [`BuilderError::Validation`].
    pub fn into_result(self) -> Result<(), BuilderError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(BuilderError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field} {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Page builder error.
#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    /// Payload failed validation. Nothing was written.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Compose(#[from] ComposeError),
}

impl From<ValidationErrors> for BuilderError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl BuilderError {
    /// HTTP status for the error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::Store(StoreError::Invalid(_)) => 422,
            Self::Store(StoreError::NotFound { .. }) => 404,
            Self::Store(StoreError::Conflict { .. }) => 409,
            Self::Store(_) => 500,
            Self::Compose(e) => e.status_code(),
        }
    }

    /// Field-level messages, for validation errors.
    #[must_use]
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use trellis_store::Entity;

    use super::*;

    #[test]
    fn test_messages_grouped_by_field() {
        let mut errors = ValidationErrors::single("w", "must be at least 1");
        errors.add("x", "must not be negative");
        errors.add("w", "must not exceed 12");

        assert_eq!(errors.get("w").unwrap().len(), 2);
        assert_eq!(
            errors.to_string(),
            "w must be at least 1; w must not exceed 12; x must not be negative"
        );
    }

    #[test]
    fn test_merge_prefixed() {
        let mut errors = ValidationErrors::new();
        errors.merge_prefixed("items[1]", ValidationErrors::single("x", "bad"));

        assert_eq!(errors.get("items[1].x"), Some(&["bad".to_owned()][..]));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            BuilderError::from(ValidationErrors::single("x", "bad")).status_code(),
            422
        );
        assert_eq!(
            BuilderError::from(StoreError::not_found(Entity::Widget, 4)).status_code(),
            404
        );
        let conflict = StoreError::Conflict {
            entity: Entity::Section,
            id: 1,
            expected: 1,
            actual: 2,
        };
        assert_eq!(BuilderError::from(conflict).status_code(), 409);
        assert_eq!(
            BuilderError::from(ComposeError::NoActiveTheme).status_code(),
            503
        );
    }

    #[test]
    fn test_empty_errors_are_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }
}
