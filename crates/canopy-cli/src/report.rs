//! Renders a [`DiagnosticBag`] to stdout/stderr in a compiler-style
//! `severity[code]: message` line per entry.

use canopy_diagnostics::{DiagnosticBag, Severity};

pub fn print(file: &str, diagnostics: &DiagnosticBag) {
    for diag in diagnostics.iter() {
        let message = diag.code.message(&diag.message_args);
        println!(
            "{file}:{}..{}: {}[{}]: {message}",
            diag.span.start,
            diag.span.end,
            diag.severity,
            diag.code,
        );
    }
}

#[must_use]
pub fn error_count(diagnostics: &DiagnosticBag) -> usize {
    diagnostics.iter().filter(|d| d.severity == Severity::Error).count()
}
