//! Page-level style queue.

use std::collections::HashSet;

/// Per-instance CSS rules collected while rendering one page.
///
/// Rules are keyed by selector. Pushing a selector that is already queued is a
/// no-op, so resolving the same widget twice never duplicates a rule. Output
/// keeps first-insertion order.
#[derive(Debug, Default)]
pub struct StyleQueue {
    seen: HashSet<String>,
    rules: Vec<String>,
}

impl StyleQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `selector { declarations }`. Returns `false` if the selector was already queued.
    pub fn push(&mut self, selector: &str, declarations: &str) -> bool {
        if !self.seen.insert(selector.to_owned()) {
            return false;
        }
        self.rules.push(format!("{selector} {{ {declarations} }}"));
        true
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Queued rules in insertion order.
    #[must_use]
    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    /// Consume the queue, returning its rules.
    #[must_use]
    pub fn into_rules(self) -> Vec<String> {
        self.rules
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_push_is_idempotent_per_selector() {
        let mut queue = StyleQueue::new();
        assert!(queue.push(".bg-1", "background-image: url('/a.jpg');"));
        assert!(!queue.push(".bg-1", "background-image: url('/a.jpg');"));
        assert!(queue.push(".bg-2", "color: red;"));

        assert_eq!(
            queue.into_rules(),
            vec![
                ".bg-1 { background-image: url('/a.jpg'); }".to_owned(),
                ".bg-2 { color: red; }".to_owned(),
            ]
        );
    }
}
