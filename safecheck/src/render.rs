use safecheck_ast::{Location, TranslationUnit};
use safecheck_core::{Diagnostic, Severity};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Finding<'a> {
    pub file: Option<&'a str>,
    pub offset: usize,
    pub len: usize,
    pub severity: Severity,
    pub rule: &'static str,
    pub message: &'a str,
}

#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub input: String,
    pub errors: usize,
    pub findings: Vec<Finding<'a>>,
}

fn file_of(unit: &TranslationUnit, loc: Location) -> Option<&str> {
    loc.file
        .and_then(|f| unit.file(f))
        .map(|f| f.path.as_str())
}

pub fn findings<'a>(unit: &'a TranslationUnit, diags: &'a [Diagnostic]) -> Vec<Finding<'a>> {
    diags
        .iter()
        .map(|d| Finding {
            file: file_of(unit, d.location),
            offset: d.location.span.start,
            len: d.location.span.len,
            severity: d.severity,
            rule: d.rule,
            message: &d.message,
        })
        .collect()
}

/// `main.cpp:120: error: unsafe type declaration [record-decl]`, notes indented.
pub fn text(findings: &[Finding<'_>]) -> String {
    let mut out = String::new();
    for f in findings {
        if f.severity == Severity::Note {
            out.push_str("  ");
        }
        out.push_str(&format!(
            "{}:{}: {}: {} [{}]\n",
            f.file.unwrap_or("<unknown>"),
            f.offset,
            f.severity.display(),
            f.message,
            f.rule
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use safecheck_ast::span;

    #[test]
    fn notes_are_indented_under_their_error() {
        let mut unit = TranslationUnit::new();
        let main = unit.add_file("main.cpp", false);
        let diags = vec![
            Diagnostic {
                location: Location::new(main, span(12, 3)),
                message: "unsafe type declaration".into(),
                severity: Severity::Error,
                rule: "record-decl",
            },
            Diagnostic {
                location: Location::unknown(),
                message: "member 'p' is not safe".into(),
                severity: Severity::Note,
                rule: "record-decl",
            },
        ];
        let rendered = text(&findings(&unit, &diags));
        assert_eq!(
            rendered,
            "main.cpp:12: error: unsafe type declaration [record-decl]\n  <unknown>:0: note: member 'p' is not safe [record-decl]\n"
        );
    }
}
