//! defdec expansion: replaces every [`crate::ast::Node::DefdecCall`] with a
//! fresh instantiation of the named defdec's body, substituting declared
//! parameters for the call's expression arguments and the `<body>`
//! placeholder for the call's trailing node-kind argument.

use std::rc::Rc;

use canopy_diagnostics::{Diagnostic, DiagnosticBag, DiagnosticCode};
use rustc_hash::FxHashMap;

use crate::ast::*;
use crate::ids::IdAllocator;

const MAX_EXPANSION_DEPTH: usize = 100;

#[must_use]
pub fn expand_defdecs(program: Program, ids: &mut IdAllocator) -> (Program, DiagnosticBag) {
    let defdecs: FxHashMap<String, Rc<DefdecDef>> = program
        .defdecs
        .iter()
        .map(|d| (d.name.clone(), d.clone()))
        .collect();
    let mut diagnostics = DiagnosticBag::new();
    let mut expander = Expander {
        defdecs: &defdecs,
        ids,
        diagnostics: &mut diagnostics,
    };

    let trees = program
        .trees
        .iter()
        .map(|t| {
            let mut stack = Vec::new();
            Rc::new(TreeDef {
                root: expander.expand(&t.root, &mut stack),
                ..(**t).clone()
            })
        })
        .collect();

    (
        Program {
            trees,
            ..program
        },
        diagnostics,
    )
}

struct Expander<'a> {
    defdecs: &'a FxHashMap<String, Rc<DefdecDef>>,
    ids: &'a mut IdAllocator,
    diagnostics: &'a mut DiagnosticBag,
}

impl<'a> Expander<'a> {
    fn expand(&mut self, node: &Node, stack: &mut Vec<String>) -> Node {
        if let Node::DefdecCall(call) = node {
            return self.expand_call(call, stack);
        }
        clone_node_shallow_remapped(node, &mut |child| self.expand(child, stack))
    }

    fn expand_call(&mut self, call: &DefdecCallNode, stack: &mut Vec<String>) -> Node {
        let Some(def) = self.defdecs.get(&call.name).cloned() else {
            self.diagnostics.push(Diagnostic::new(
                DiagnosticCode::BS0023,
                call.span,
                vec![call.name.clone()],
            ));
            return Node::Selector(Rc::new(Composite {
                id: self.ids.next_id(),
                span: call.span,
                cst_origin: None,
                children: Vec::new(),
            }));
        };

        if def.params.len() != call.args.len() {
            self.diagnostics.push(Diagnostic::new(
                DiagnosticCode::BS0024,
                call.span,
                vec![
                    call.name.clone(),
                    def.params.len().to_string(),
                    call.args.len().to_string(),
                ],
            ));
        }

        if stack.iter().filter(|n| **n == call.name).count() >= 1 {
            self.diagnostics.push(Diagnostic::new(
                DiagnosticCode::BS0025,
                call.span,
                vec![call.name.clone()],
            ));
            return Node::Selector(Rc::new(Composite {
                id: self.ids.next_id(),
                span: call.span,
                cst_origin: None,
                children: Vec::new(),
            }));
        }
        if stack.len() >= MAX_EXPANSION_DEPTH {
            self.diagnostics.push(Diagnostic::new(
                DiagnosticCode::BS0025,
                call.span,
                vec![call.name.clone()],
            ));
            return Node::Selector(Rc::new(Composite {
                id: self.ids.next_id(),
                span: call.span,
                cst_origin: None,
                children: Vec::new(),
            }));
        }

        let instance = instantiate(&def.body, self.ids);
        let substituted = substitute(&instance, &def.params, &call.args, &call.body, self.ids);

        stack.push(call.name.clone());
        let expanded = self.expand(&substituted, stack);
        stack.pop();
        expanded
    }
}

/// Deep-clones `node`, assigning every node *and every expression nested
/// inside it* a fresh id and clearing `cst_origin` (the clone no longer
/// corresponds 1:1 to source text). Used each time a defdec body is
/// instantiated at a call site, since the same definition can be expanded
/// any number of times and no two instances may share an id.
fn instantiate(node: &Node, ids: &mut IdAllocator) -> Node {
    let remapped = match node {
        Node::Guard(n) => Node::Guard(Rc::new(Guard {
            condition: instantiate_expr(&n.condition, ids),
            child: n.child.as_ref().map(|c| instantiate(c, ids)),
            ..(**n).clone()
        })),
        Node::If(n) => Node::If(Rc::new(If {
            condition: instantiate_expr(&n.condition, ids),
            then_branch: instantiate(&n.then_branch, ids),
            else_branch: n.else_branch.as_ref().map(|c| instantiate(c, ids)),
            ..(**n).clone()
        })),
        Node::While(n) => Node::While(Rc::new(While {
            condition: instantiate_expr(&n.condition, ids),
            child: n.child.as_ref().map(|c| instantiate(c, ids)),
            ..(**n).clone()
        })),
        Node::Reactive(n) => Node::Reactive(Rc::new(Reactive {
            condition: instantiate_expr(&n.condition, ids),
            children: n.children.iter().map(|c| instantiate(c, ids)).collect(),
            ..(**n).clone()
        })),
        Node::Check(n) => Node::Check(Rc::new(Check {
            condition: instantiate_expr(&n.condition, ids),
            ..(**n).clone()
        })),
        Node::ActionCall(n) => Node::ActionCall(Rc::new(ActionCall {
            args: n
                .args
                .iter()
                .map(|a| Argument {
                    name: a.name.clone(),
                    value: instantiate_expr(&a.value, ids),
                })
                .collect(),
            ..(**n).clone()
        })),
        Node::DefdecCall(n) => Node::DefdecCall(Rc::new(DefdecCallNode {
            args: n.args.iter().map(|a| instantiate_expr(a, ids)).collect(),
            body: instantiate(&n.body, ids),
            ..(**n).clone()
        })),
        _ => clone_node_shallow_remapped(node, &mut |child| instantiate(child, ids)),
    };
    remapped.with_fresh_id(ids)
}

fn instantiate_expr(expr: &Expr, ids: &mut IdAllocator) -> Expr {
    clone_expr_shallow_remapped(expr, &mut |child| instantiate_expr(child, ids)).with_fresh_id(ids)
}

/// Walks a defdec body instance, replacing `<body>` placeholders with
/// `body_replacement` and member-loads whose path is exactly one of
/// `params` with the matching positional argument from `args`.
fn substitute(node: &Node, params: &[String], args: &[Expr], body_replacement: &Node, ids: &mut IdAllocator) -> Node {
    if matches!(node, Node::BodyPlaceholder(_)) {
        return instantiate(body_replacement, ids);
    }
    match node {
        Node::Guard(g) => Node::Guard(Rc::new(Guard {
            condition: substitute_expr(&g.condition, params, args, ids),
            child: g
                .child
                .as_ref()
                .map(|c| substitute(c, params, args, body_replacement, ids)),
            ..(**g).clone()
        })),
        Node::If(n) => Node::If(Rc::new(If {
            condition: substitute_expr(&n.condition, params, args, ids),
            then_branch: substitute(&n.then_branch, params, args, body_replacement, ids),
            else_branch: n
                .else_branch
                .as_ref()
                .map(|c| substitute(c, params, args, body_replacement, ids)),
            ..(**n).clone()
        })),
        Node::While(n) => Node::While(Rc::new(While {
            condition: substitute_expr(&n.condition, params, args, ids),
            child: n
                .child
                .as_ref()
                .map(|c| substitute(c, params, args, body_replacement, ids)),
            ..(**n).clone()
        })),
        Node::Reactive(n) => Node::Reactive(Rc::new(Reactive {
            condition: substitute_expr(&n.condition, params, args, ids),
            children: n
                .children
                .iter()
                .map(|c| substitute(c, params, args, body_replacement, ids))
                .collect(),
            ..(**n).clone()
        })),
        Node::Check(n) => Node::Check(Rc::new(Check {
            condition: substitute_expr(&n.condition, params, args, ids),
            ..(**n).clone()
        })),
        Node::ActionCall(n) => Node::ActionCall(Rc::new(ActionCall {
            args: n
                .args
                .iter()
                .map(|a| Argument {
                    name: a.name.clone(),
                    value: substitute_expr(&a.value, params, args, ids),
                })
                .collect(),
            ..(**n).clone()
        })),
        Node::DefdecCall(n) => Node::DefdecCall(Rc::new(DefdecCallNode {
            args: n
                .args
                .iter()
                .map(|a| substitute_expr(a, params, args, ids))
                .collect(),
            body: substitute(&n.body, params, args, body_replacement, ids),
            ..(**n).clone()
        })),
        _ => clone_node_shallow_remapped(node, &mut |child| {
            substitute(child, params, args, body_replacement, ids)
        }),
    }
}

fn substitute_expr(expr: &Expr, params: &[String], args: &[Expr], ids: &mut IdAllocator) -> Expr {
    if let Expr::MemberLoad(m) = expr {
        if m.path.segments.len() == 1 {
            if let Some(i) = params.iter().position(|p| *p == m.path.segments[0]) {
                if let Some(arg) = args.get(i) {
                    return instantiate_expr(arg, ids);
                }
            }
        }
    }
    clone_expr_shallow_remapped(expr, &mut |child| substitute_expr(child, params, args, ids))
}

// --- generic shallow-clone helpers ---------------------------------------

trait WithFreshId {
    fn with_fresh_id(self, ids: &mut IdAllocator) -> Self;
}

impl WithFreshId for Node {
    fn with_fresh_id(self, ids: &mut IdAllocator) -> Node {
        let fresh = ids.next_id();
        set_node_id(self, fresh)
    }
}

impl WithFreshId for Expr {
    fn with_fresh_id(self, ids: &mut IdAllocator) -> Expr {
        let fresh = ids.next_id();
        set_expr_id(self, fresh)
    }
}

fn set_node_id(node: Node, id: NodeId) -> Node {
    macro_rules! with_id {
        ($variant:ident, $n:expr) => {
            Node::$variant(Rc::new({
                let mut v = (*$n).clone();
                v.id = id;
                v.cst_origin = None;
                v
            }))
        };
    }
    match node {
        Node::Tree(n) => with_id!(Tree, n),
        Node::Selector(n) => with_id!(Selector, n),
        Node::Sequence(n) => with_id!(Sequence, n),
        Node::ReactiveSelect(n) => with_id!(ReactiveSelect, n),
        Node::Parallel(n) => with_id!(Parallel, n),
        Node::Guard(n) => with_id!(Guard, n),
        Node::If(n) => with_id!(If, n),
        Node::Invert(n) => with_id!(Invert, n),
        Node::Repeat(n) => with_id!(Repeat, n),
        Node::Timeout(n) => with_id!(Timeout, n),
        Node::Cooldown(n) => with_id!(Cooldown, n),
        Node::While(n) => with_id!(While, n),
        Node::Reactive(n) => with_id!(Reactive, n),
        Node::Check(n) => with_id!(Check, n),
        Node::ActionCall(n) => with_id!(ActionCall, n),
        Node::DefdecCall(n) => with_id!(DefdecCall, n),
        Node::Ref(n) => with_id!(Ref, n),
        Node::BodyPlaceholder(n) => with_id!(BodyPlaceholder, n),
    }
}

fn set_expr_id(expr: Expr, id: NodeId) -> Expr {
    macro_rules! with_id {
        ($variant:ident, $n:expr) => {
            Expr::$variant(Rc::new({
                let mut v = (*$n).clone();
                v.id = id;
                v.cst_origin = None;
                v
            }))
        };
    }
    match expr {
        Expr::MemberLoad(n) => with_id!(MemberLoad, n),
        Expr::BlackboardLoad(n) => with_id!(BlackboardLoad, n),
        Expr::Literal(n) => with_id!(Literal, n),
        Expr::Binary(n) => with_id!(Binary, n),
        Expr::Unary(n) => with_id!(Unary, n),
        Expr::Logic(n) => with_id!(Logic, n),
        Expr::CallExpr(n) => with_id!(CallExpr, n),
    }
}

/// Rebuilds `node` with every *direct child node* replaced by applying `f`,
/// leaving expressions and scalar fields untouched. Used by rewrites that
/// only ever substitute whole node-kind subtrees.
fn clone_node_shallow_remapped(node: &Node, f: &mut impl FnMut(&Node) -> Node) -> Node {
    match node {
        Node::Tree(n) => Node::Tree(Rc::new(TreeDef {
            root: f(&n.root),
            ..(**n).clone()
        })),
        Node::Selector(n) => Node::Selector(Rc::new(Composite {
            children: n.children.iter().map(f).collect(),
            ..(**n).clone()
        })),
        Node::Sequence(n) => Node::Sequence(Rc::new(Composite {
            children: n.children.iter().map(f).collect(),
            ..(**n).clone()
        })),
        Node::ReactiveSelect(n) => Node::ReactiveSelect(Rc::new(Composite {
            children: n.children.iter().map(f).collect(),
            ..(**n).clone()
        })),
        Node::Parallel(n) => Node::Parallel(Rc::new(Parallel {
            children: n.children.iter().map(f).collect(),
            ..(**n).clone()
        })),
        Node::Guard(n) => Node::Guard(Rc::new(Guard {
            child: n.child.as_ref().map(f),
            ..(**n).clone()
        })),
        Node::If(n) => Node::If(Rc::new(If {
            then_branch: f(&n.then_branch),
            else_branch: n.else_branch.as_ref().map(f),
            ..(**n).clone()
        })),
        Node::Invert(n) => Node::Invert(Rc::new(Invert {
            child: n.child.as_ref().map(f),
            ..(**n).clone()
        })),
        Node::Repeat(n) => Node::Repeat(Rc::new(Repeat {
            child: n.child.as_ref().map(f),
            ..(**n).clone()
        })),
        Node::Timeout(n) => Node::Timeout(Rc::new(Timeout {
            child: n.child.as_ref().map(f),
            ..(**n).clone()
        })),
        Node::Cooldown(n) => Node::Cooldown(Rc::new(Cooldown {
            child: n.child.as_ref().map(f),
            ..(**n).clone()
        })),
        Node::While(n) => Node::While(Rc::new(While {
            child: n.child.as_ref().map(f),
            ..(**n).clone()
        })),
        Node::Reactive(n) => Node::Reactive(Rc::new(Reactive {
            children: n.children.iter().map(f).collect(),
            ..(**n).clone()
        })),
        Node::DefdecCall(n) => Node::DefdecCall(Rc::new(DefdecCallNode {
            body: f(&n.body),
            ..(**n).clone()
        })),
        Node::Check(_) | Node::ActionCall(_) | Node::Ref(_) | Node::BodyPlaceholder(_) => {
            node.clone()
        }
    }
}

fn clone_expr_shallow_remapped(expr: &Expr, f: &mut impl FnMut(&Expr) -> Expr) -> Expr {
    match expr {
        Expr::Binary(n) => Expr::Binary(Rc::new(Binary {
            lhs: f(&n.lhs),
            rhs: f(&n.rhs),
            ..(**n).clone()
        })),
        Expr::Unary(n) => Expr::Unary(Rc::new(Unary {
            operand: f(&n.operand),
            ..(**n).clone()
        })),
        Expr::Logic(n) => Expr::Logic(Rc::new(Logic {
            operands: n.operands.iter().map(f).collect(),
            ..(**n).clone()
        })),
        Expr::CallExpr(n) => Expr::CallExpr(Rc::new(CallExpr {
            args: n
                .args
                .iter()
                .map(|a| Argument {
                    name: a.name.clone(),
                    value: f(&a.value),
                })
                .collect(),
            ..(**n).clone()
        })),
        Expr::MemberLoad(_) | Expr::BlackboardLoad(_) | Expr::Literal(_) => expr.clone(),
    }
}
