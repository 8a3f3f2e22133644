//! Diagnostic records and the helper the classifier reports through.

use safecheck_ast::Location;
use serde::Serialize;

/// Message used for AST shapes the checker does not model.
pub const INTERNAL_ERROR: &str = "internal checker error, please report";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Severity {
    pub fn display(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub location: Location,
    pub message: String,
    pub severity: Severity,
    /// Name of the rule that was running when the diagnostic was emitted.
    pub rule: &'static str,
}

/// Where rule violations end up.
pub trait DiagnosticSink {
    fn report(&mut self, location: Location, message: &str, severity: Severity);
}

/// Collecting sink, tagging every record with the rule currently running.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    rule: &'static str,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rule(&mut self, rule: &'static str) {
        self.rule = rule;
    }

    pub fn items(&self) -> &[Diagnostic] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.items
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|d| d.message.as_str())
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages().any(|m| m.contains(needle))
    }
}

impl DiagnosticSink for Diagnostics {
    fn report(&mut self, location: Location, message: &str, severity: Severity) {
        self.items.push(Diagnostic {
            location,
            message: message.to_string(),
            severity,
            rule: self.rule,
        });
    }
}

/// Decides whether and at which level a classifier finding is surfaced.
///
/// The first finding goes out at the configured level, every later one as a
/// note attached to it. A null helper swallows everything, which is how quiet
/// (cache-filling) queries run.
pub struct DiagHelper<'s> {
    sink: Option<&'s mut dyn DiagnosticSink>,
    next: Severity,
}

impl<'s> DiagHelper<'s> {
    pub fn null() -> Self {
        Self {
            sink: None,
            next: Severity::Note,
        }
    }

    pub fn new(sink: &'s mut dyn DiagnosticSink, level: Severity) -> Self {
        Self {
            sink: Some(sink),
            next: level,
        }
    }

    /// Every finding is a note, used for detail below an already reported error.
    pub fn notes(sink: &'s mut dyn DiagnosticSink) -> Self {
        Self::new(sink, Severity::Note)
    }

    pub fn is_null(&self) -> bool {
        self.sink.is_none()
    }

    pub fn diag(&mut self, location: Location, message: &str) {
        if let Some(sink) = self.sink.as_deref_mut() {
            let level = std::mem::replace(&mut self.next, Severity::Note);
            sink.report(location, message, level);
        }
    }

    /// Reports a checker bug. Always an error, even from a notes helper.
    pub fn internal_error(&mut self, location: Location) {
        tracing::warn!(?location, "{INTERNAL_ERROR}");
        if let Some(sink) = self.sink.as_deref_mut() {
            sink.report(location, INTERNAL_ERROR, Severity::Error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_finding_uses_level_rest_are_notes() {
        let mut sink = Diagnostics::new();
        sink.set_rule("record-decl");
        {
            let mut dh = DiagHelper::new(&mut sink, Severity::Error);
            dh.diag(Location::unknown(), "unsafe type declaration");
            dh.diag(Location::unknown(), "member 'p' is not safe");
        }
        let items = sink.items();
        assert_eq!(items[0].severity, Severity::Error);
        assert_eq!(items[1].severity, Severity::Note);
        assert_eq!(items[1].rule, "record-decl");
        assert_eq!(sink.error_count(), 1);
    }

    #[test]
    fn null_helper_swallows_everything() {
        let mut dh = DiagHelper::null();
        dh.diag(Location::unknown(), "ignored");
        dh.internal_error(Location::unknown());
        assert!(dh.is_null());
    }

    #[test]
    fn internal_error_is_an_error_from_notes_helper() {
        let mut sink = Diagnostics::new();
        DiagHelper::notes(&mut sink).internal_error(Location::unknown());
        assert_eq!(sink.items()[0].severity, Severity::Error);
        assert_eq!(sink.items()[0].message, INTERNAL_ERROR);
    }
}
