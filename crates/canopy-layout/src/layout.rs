//! Pure IR-to-layout projection (spec.md §4.11). `build_layout` never
//! mutates its inputs and never fails: an IR tree is already well-formed
//! by the time it reaches this crate, so there is nothing left to reject.

use canopy_diagnostics::{Diagnostic, DiagnosticBag, Span};
use canopy_ir::{IrNode, IrTree};
use canopy_sema::TypeRef;

use crate::print;

/// One projected node: editor-facing shape only, no `Rc` sharing with the
/// IR it was built from (this tree is a disposable view, not a value
/// participating in C9's optimizer or C10's caches).
#[derive(Debug, Clone)]
pub struct LayoutNode {
    pub id: u32,
    pub node_type_tag: &'static str,
    pub label: Option<String>,
    pub origin: Span,
    pub resolved_type: Option<TypeRef>,
    pub children: Vec<LayoutNode>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct LayoutTree {
    pub name: String,
    pub root: LayoutNode,
}

fn node_type_tag(node: &IrNode) -> &'static str {
    match node {
        IrNode::Tree(_) => "tree",
        IrNode::Selector(_) => "selector",
        IrNode::Sequence(_) => "sequence",
        IrNode::Parallel(_) => "parallel",
        IrNode::Guard(_) => "guard",
        IrNode::If(_) => "if",
        IrNode::Invert(_) => "invert",
        IrNode::Repeat(_) => "repeat",
        IrNode::Timeout(_) => "timeout",
        IrNode::Cooldown(_) => "cooldown",
        IrNode::While(_) => "while",
        IrNode::Reactive(_) => "reactive",
        IrNode::ReactiveSelect(_) => "reactive-select",
        IrNode::TreeRef(_) => "tree-ref",
        IrNode::Condition(_) => "condition",
        IrNode::Action(_) => "action",
    }
}

fn node_label(node: &IrNode) -> Option<String> {
    match node {
        IrNode::Condition(n) => Some(print::format_expr(&n.expr)),
        IrNode::Action(n) => Some(print::format_action_label(&n.method.name, &n.args)),
        IrNode::TreeRef(n) => Some(n.name.clone()),
        IrNode::Tree(n) => Some(n.name.clone()),
        IrNode::Guard(n) => Some(print::format_expr(&n.condition)),
        IrNode::If(n) => Some(print::format_expr(&n.condition)),
        IrNode::While(n) => Some(print::format_expr(&n.condition)),
        IrNode::Reactive(n) => Some(print::format_expr(&n.condition)),
        IrNode::Repeat(n) => Some(n.count.to_string()),
        IrNode::Timeout(n) | IrNode::Cooldown(n) => Some(format!("{}s", n.seconds)),
        IrNode::Selector(_)
        | IrNode::Sequence(_)
        | IrNode::ReactiveSelect(_)
        | IrNode::Parallel(_)
        | IrNode::Invert(_) => None,
    }
}

fn build_node(node: &IrNode) -> LayoutNode {
    let children: Vec<LayoutNode> = node.children().iter().map(build_node).collect();
    LayoutNode {
        id: node.id(),
        node_type_tag: node_type_tag(node),
        label: node_label(node),
        origin: node.origin(),
        resolved_type: node.type_ref().cloned(),
        children,
        diagnostics: Vec::new(),
    }
}

fn span_contains(outer: Span, inner: Span) -> bool {
    outer.start <= inner.start && inner.end <= outer.end
}

/// Places each diagnostic at the deepest node whose origin contains it,
/// per spec.md §4.11's "bundles per-node diagnostics by matching
/// diagnostic spans to node origins."
fn place(node: &mut LayoutNode, pending: Vec<Diagnostic>) {
    let mut mine = Vec::new();
    let mut per_child: Vec<Vec<Diagnostic>> = node.children.iter().map(|_| Vec::new()).collect();
    'outer: for diag in pending {
        for (child, bucket) in node.children.iter().zip(per_child.iter_mut()) {
            if span_contains(child.origin, diag.span) {
                bucket.push(diag);
                continue 'outer;
            }
        }
        mine.push(diag);
    }
    for (child, bucket) in node.children.iter_mut().zip(per_child.into_iter()) {
        place(child, bucket);
    }
    node.diagnostics = mine;
}

/// Pure projection of `tree`'s IR into an editor-facing layout model,
/// bundling `diagnostics` onto the nodes whose origins contain them.
#[must_use]
pub fn build_layout(tree: &IrTree, diagnostics: &DiagnosticBag) -> LayoutTree {
    let child = build_node(&tree.root);
    let mut root = LayoutNode {
        id: tree.id,
        node_type_tag: "tree",
        label: Some(tree.name.clone()),
        origin: tree.origin,
        resolved_type: None,
        children: vec![child],
        diagnostics: Vec::new(),
    };
    let pending: Vec<Diagnostic> = diagnostics
        .iter()
        .filter(|d| span_contains(root.origin, d.span))
        .cloned()
        .collect();
    place(&mut root, pending);
    LayoutTree {
        name: tree.name.clone(),
        root,
    }
}
