//! Generic type-argument checking (C7, spec.md §4.7's generics half).
//!
//! The DSL never writes generic syntax itself; it only ever names a host
//! type by its fully-qualified string (spec.md §3's `type-ref =
//! fully-qualified-name`). A host type name can still *be* a closed generic
//! reference textually (`List<Item>`, following the host language's own
//! generic-name spelling), so this pass parses every type name the
//! checker touched — the context type, every tree's blackboard type, and
//! every `TypeRef::Host` produced by C6 — for that shape and validates it
//! against the provider, independent of where in the AST the name came
//! from. Grounded on `core/type-checker/src/type_checker.rs`'s post-pass
//! validation step, retargeted from struct-field generics to this flatter
//! string-name model.

use rustc_hash::FxHashSet;

use canopy_ast::ast::Program;
use canopy_diagnostics::{Diagnostic, DiagnosticBag, DiagnosticCode, Span};

use crate::host::{HostTypeProvider, TypeRef};
use crate::types::TypeTable;

#[must_use]
pub fn check(program: &Program, types: &TypeTable, context_type: &str, host: &dyn HostTypeProvider) -> DiagnosticBag {
    let mut diagnostics = DiagnosticBag::new();
    let mut seen = FxHashSet::default();
    check_name(context_type, Span::empty_at(0), host, &mut seen, &mut diagnostics);
    for tree in &program.trees {
        if let Some(bb) = &tree.blackboard_type {
            check_name(bb, tree.span, host, &mut seen, &mut diagnostics);
        }
    }
    for ty in types.values() {
        if let TypeRef::Host(name) = ty {
            check_name(name, Span::empty_at(0), host, &mut seen, &mut diagnostics);
        }
    }
    diagnostics
}

/// Splits `Outer<A, B>` into `("Outer", ["A", "B"])`, respecting nested
/// angle brackets in the argument list. Returns `None` for a plain name.
fn parse_generic(type_name: &str) -> Option<(&str, Vec<&str>)> {
    let open = type_name.find('<')?;
    let close = type_name.rfind('>')?;
    if close < open {
        return None;
    }
    let base = &type_name[..open];
    let inner = &type_name[open + 1..close];
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in inner.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                args.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let tail = inner[start..].trim();
    if !tail.is_empty() || !inner.is_empty() {
        args.push(tail);
    }
    Some((base, args))
}

fn check_name(
    type_name: &str,
    span: Span,
    host: &dyn HostTypeProvider,
    seen: &mut FxHashSet<String>,
    diagnostics: &mut DiagnosticBag,
) {
    if !seen.insert(type_name.to_string()) {
        return;
    }
    match parse_generic(type_name) {
        Some((base, arg_names)) => {
            for arg in &arg_names {
                check_name(arg, span, host, seen, diagnostics);
            }
            let expected = host.type_params(base).len();
            if expected != arg_names.len() {
                diagnostics.push(Diagnostic::new(
                    DiagnosticCode::BS0042,
                    span,
                    vec![expected.to_string(), arg_names.len().to_string()],
                ));
                return;
            }
            let args: Vec<TypeRef> = arg_names.iter().map(|a| TypeRef::Host((*a).to_string())).collect();
            if let Err(err) = host.close_generic(base, &args) {
                diagnostics.push(Diagnostic::new(
                    DiagnosticCode::BS0041,
                    span,
                    vec![err.type_arg, err.constraint],
                ));
            }
        }
        None => {
            if !host.type_params(type_name).is_empty() {
                diagnostics.push(Diagnostic::new(DiagnosticCode::BS0043, span, vec![type_name.to_string()]));
            }
        }
    }
}
