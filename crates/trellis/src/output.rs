//! Colored terminal output on stderr.
//!
//! Stdout is reserved for rendered HTML so `trellis render` can be piped.

use console::{Style, Term};

/// Terminal output formatter.
pub(crate) struct Output {
    term: Term,
    label: Style,
    good: Style,
    warn: Style,
    bad: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            label: Style::new().cyan().bold(),
            good: Style::new().green(),
            warn: Style::new().yellow(),
            bad: Style::new().red(),
        }
    }

    /// `label: value` line with the label highlighted.
    pub(crate) fn field(&self, label: &str, value: &dyn std::fmt::Display) {
        self.line(&format!("{} {value}", self.label.apply_to(format!("{label}:"))));
    }

    pub(crate) fn success(&self, msg: &str) {
        self.line(&self.good.apply_to(msg).to_string());
    }

    pub(crate) fn warning(&self, msg: &str) {
        self.line(&self.warn.apply_to(msg).to_string());
    }

    pub(crate) fn error(&self, msg: &str) {
        self.line(&self.bad.apply_to(msg).to_string());
    }

    fn line(&self, text: &str) {
        // Nothing sensible to do when stderr is gone
        let _ = self.term.write_line(text);
    }
}
