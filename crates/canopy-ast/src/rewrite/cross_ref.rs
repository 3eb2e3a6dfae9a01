//! Cross-tree reference resolution: validates every [`crate::ast::Node::Ref`]
//! against the set of trees declared in the same program and checks the
//! resulting reference graph for cycles.
//!
//! Runs after macro and defdec expansion so a `ref` reached only through a
//! macro or defdec body is validated too, not just the ones written directly
//! in a `tree` definition.

use rustc_hash::{FxHashMap, FxHashSet};

use canopy_diagnostics::{Diagnostic, DiagnosticBag, DiagnosticCode, Span};

use crate::ast::{Node, Program};

#[must_use]
pub fn resolve_cross_tree_refs(program: &Program) -> DiagnosticBag {
    let mut diagnostics = DiagnosticBag::new();

    let tree_names: FxHashSet<&str> = program.trees.iter().map(|t| t.name.as_str()).collect();
    let other_names: FxHashSet<&str> = program
        .defdecs
        .iter()
        .map(|d| d.name.as_str())
        .chain(program.defmacros.iter().map(|m| m.name.as_str()))
        .collect();

    let mut refs_by_tree: FxHashMap<String, Vec<String>> = FxHashMap::default();
    for tree in &program.trees {
        let mut refs = Vec::new();
        collect_refs(&tree.root, &mut refs);
        for (name, span) in &refs {
            if !tree_names.contains(name.as_str()) {
                if other_names.contains(name.as_str()) {
                    diagnostics.push(Diagnostic::new(DiagnosticCode::BS0036, *span, vec![name.clone()]));
                } else {
                    diagnostics.push(Diagnostic::new(DiagnosticCode::BS0038, *span, vec![name.clone()]));
                }
            }
        }
        let targets = refs
            .into_iter()
            .map(|(name, _)| name)
            .filter(|name| tree_names.contains(name.as_str()))
            .collect();
        refs_by_tree.insert(tree.name.clone(), targets);
    }

    for tree in &program.trees {
        let mut visiting = FxHashSet::default();
        let mut visited = FxHashSet::default();
        if let Some(cycle_root) = find_cycle(&tree.name, &refs_by_tree, &mut visiting, &mut visited) {
            diagnostics.push(Diagnostic::new(DiagnosticCode::BS0037, tree.span, vec![cycle_root]));
        }
    }

    diagnostics
}

/// Depth-first walk collecting every `ref` target name and the span of the
/// `ref` node itself, so a bad target can be pointed at directly rather than
/// at the enclosing tree.
fn collect_refs(node: &Node, out: &mut Vec<(String, Span)>) {
    if let Node::Ref(r) = node {
        out.push((r.name.clone(), r.span));
    }
    for child in node.children() {
        collect_refs(&child, out);
    }
}

fn find_cycle(
    name: &str,
    graph: &FxHashMap<String, Vec<String>>,
    visiting: &mut FxHashSet<String>,
    visited: &mut FxHashSet<String>,
) -> Option<String> {
    if visited.contains(name) {
        return None;
    }
    if !visiting.insert(name.to_string()) {
        return Some(name.to_string());
    }
    if let Some(targets) = graph.get(name) {
        for target in targets {
            if let Some(cycle_root) = find_cycle(target, graph, visiting, visited) {
                return Some(cycle_root);
            }
        }
    }
    visiting.remove(name);
    visited.insert(name.to_string());
    None
}
