//! Diagnostic bag shared by every pass of the Canopy compiler pipeline.
//!
//! Diagnostics are values, not exceptions (see the pipeline's error-handling
//! design): every pass records findings into a [`DiagnosticBag`] keyed by
//! severity and span instead of aborting. [`DiagnosticCode`] partitions the
//! code space into the ranges used by the parser, the resolver, the type
//! checker and the other passes; [`Severity::Error`] suppresses IR emission
//! to downstream consumers but never prevents the IR cache from being
//! populated.

use std::fmt;

pub mod code;
pub mod span;

pub use code::DiagnosticCode;
pub use span::Span;

/// Severity of a recorded diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single diagnostic record.
///
/// `message_args` carries the interpolation values used by [`DiagnosticCode::message`];
/// keeping them structured (rather than pre-formatted into a string) lets
/// consumers re-render the message in another locale or format.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub span: Span,
    pub file: Option<String>,
    pub message_args: Vec<String>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(code: DiagnosticCode, span: Span, message_args: Vec<String>) -> Self {
        Self {
            severity: code.default_severity(),
            code,
            span,
            file: None,
            message_args,
        }
    }

    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    #[must_use]
    pub fn message(&self) -> String {
        self.code.message(&self.message_args)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}: {}",
            self.span,
            self.code,
            self.severity,
            self.message()
        )
    }
}

/// A per-file collection of diagnostics, grouped for fast severity queries.
///
/// The bag itself does not decide whether errors suppress IR emission;
/// callers of [`DiagnosticBag::has_errors`] make that call at the query
/// boundary (see `canopy-db`'s `all_diagnostics`/`emit_ir` queries).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(other);
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn by_severity(&self, severity: Severity) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .collect()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl IntoIterator for DiagnosticBag {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

impl FromIterator<Diagnostic> for DiagnosticBag {
    fn from_iter<T: IntoIterator<Item = Diagnostic>>(iter: T) -> Self {
        Self {
            diagnostics: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_severity_is_detected() {
        let mut bag = DiagnosticBag::new();
        assert!(!bag.has_errors());
        bag.push(Diagnostic::new(
            DiagnosticCode::BS0001,
            Span::new(0, 1),
            vec!["Mana".into()],
        ));
        assert!(bag.has_errors());
    }

    #[test]
    fn warnings_do_not_count_as_errors() {
        let mut bag = DiagnosticBag::new();
        bag.push(Diagnostic::new(
            DiagnosticCode::BS0104,
            Span::new(0, 1),
            vec!["health".into()],
        ));
        assert!(!bag.has_errors());
        assert_eq!(bag.by_severity(Severity::Warning).len(), 1);
    }
}
