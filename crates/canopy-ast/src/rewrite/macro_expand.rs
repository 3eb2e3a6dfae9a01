//! Macro expansion: replaces an [`crate::ast::Node::ActionCall`] whose
//! callee names a declared `defmacro` with a fresh lowering of that macro's
//! template, substituting its declared parameters for the call's argument
//! expressions by name.
//!
//! Unlike a defdec, a macro's template was never lowered during the initial
//! CST->AST pass (only its CST id was kept, see
//! [`crate::ast::DefmacroDef::template_cst`]) — each expansion re-lowers it
//! fresh from the owning [`CstTree`], which is what keeps separately
//! expanded instances from aliasing ids with each other or with the call
//! site.

use std::rc::Rc;

use canopy_diagnostics::{Diagnostic, DiagnosticBag, DiagnosticCode};
use canopy_syntax::cst::CstTree;
use rustc_hash::FxHashMap;

use crate::ast::*;
use crate::ids::IdAllocator;
use crate::lower::lower_template;

const MAX_EXPANSION_DEPTH: usize = 100;

#[must_use]
pub fn expand_macros(program: Program, cst: &CstTree, ids: &mut IdAllocator) -> (Program, DiagnosticBag) {
    let macros: FxHashMap<String, Rc<DefmacroDef>> = program
        .defmacros
        .iter()
        .map(|m| (m.name.clone(), m.clone()))
        .collect();
    if macros.is_empty() {
        return (program, DiagnosticBag::new());
    }

    let mut diagnostics = DiagnosticBag::new();
    let mut expander = Expander {
        cst,
        macros: &macros,
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
    let defdecs = program
        .defdecs
        .iter()
        .map(|d| {
            let mut stack = Vec::new();
            Rc::new(DefdecDef {
                body: expander.expand(&d.body, &mut stack),
                ..(**d).clone()
            })
        })
        .collect();

    (
        Program {
            trees,
            defdecs,
            ..program
        },
        diagnostics,
    )
}

struct Expander<'a> {
    cst: &'a CstTree,
    macros: &'a FxHashMap<String, Rc<DefmacroDef>>,
    ids: &'a mut IdAllocator,
    diagnostics: &'a mut DiagnosticBag,
}

impl<'a> Expander<'a> {
    fn expand(&mut self, node: &Node, stack: &mut Vec<String>) -> Node {
        if let Node::ActionCall(call) = node {
            let name = call.callee.segments.join(".");
            if let Some(def) = self.macros.get(&name).cloned() {
                return self.expand_call(&name, call, &def, stack);
            }
        }
        recurse_children(node, &mut |child| self.expand(child, stack))
    }

    fn expand_call(
        &mut self,
        name: &str,
        call: &ActionCall,
        def: &DefmacroDef,
        stack: &mut Vec<String>,
    ) -> Node {
        if call.args.len() != def.params.len() {
            self.diagnostics.push(Diagnostic::new(
                DiagnosticCode::BS0032,
                call.span,
                vec![name.to_string(), def.params.len().to_string(), call.args.len().to_string()],
            ));
        }
        if stack.iter().any(|n| n == name) {
            self.diagnostics.push(Diagnostic::new(
                DiagnosticCode::BS0034,
                call.span,
                vec![name.to_string()],
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
                DiagnosticCode::BS0033,
                call.span,
                vec![MAX_EXPANSION_DEPTH.to_string()],
            ));
            return Node::Selector(Rc::new(Composite {
                id: self.ids.next_id(),
                span: call.span,
                cst_origin: None,
                children: Vec::new(),
            }));
        }

        let (template, lower_diags) = lower_template(self.cst, def.template_cst, self.ids);
        self.diagnostics.extend(lower_diags);
        let arg_values: Vec<Expr> = call.args.iter().map(|a| a.value.clone()).collect();
        let substituted = substitute(&template, &def.params, &arg_values, self.ids);

        stack.push(name.to_string());
        let expanded = self.expand(&substituted, stack);
        stack.pop();
        expanded
    }
}

/// Replaces member-loads whose path is exactly one of `params` with the
/// matching positional argument expression from the call site, cloning each
/// substituted expression with a fresh id so a param referenced more than
/// once in the template does not alias ids between uses.
fn substitute(node: &Node, params: &[String], args: &[Expr], ids: &mut IdAllocator) -> Node {
    match node {
        Node::Guard(n) => Node::Guard(Rc::new(Guard {
            condition: substitute_expr(&n.condition, params, args, ids),
            child: n.child.as_ref().map(|c| substitute(c, params, args, ids)),
            ..(**n).clone()
        })),
        Node::If(n) => Node::If(Rc::new(If {
            condition: substitute_expr(&n.condition, params, args, ids),
            then_branch: substitute(&n.then_branch, params, args, ids),
            else_branch: n.else_branch.as_ref().map(|c| substitute(c, params, args, ids)),
            ..(**n).clone()
        })),
        Node::While(n) => Node::While(Rc::new(While {
            condition: substitute_expr(&n.condition, params, args, ids),
            child: n.child.as_ref().map(|c| substitute(c, params, args, ids)),
            ..(**n).clone()
        })),
        Node::Reactive(n) => Node::Reactive(Rc::new(Reactive {
            condition: substitute_expr(&n.condition, params, args, ids),
            children: n.children.iter().map(|c| substitute(c, params, args, ids)).collect(),
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
            args: n.args.iter().map(|a| substitute_expr(a, params, args, ids)).collect(),
            body: substitute(&n.body, params, args, ids),
            ..(**n).clone()
        })),
        _ => recurse_children(node, &mut |child| substitute(child, params, args, ids)),
    }
}

fn substitute_expr(expr: &Expr, params: &[String], args: &[Expr], ids: &mut IdAllocator) -> Expr {
    if let Expr::MemberLoad(m) = expr {
        if m.path.segments.len() == 1 {
            if let Some(i) = params.iter().position(|p| *p == m.path.segments[0]) {
                if let Some(arg) = args.get(i) {
                    return fresh_expr_id(arg.clone(), ids);
                }
            }
        }
    }
    match expr {
        Expr::Binary(n) => Expr::Binary(Rc::new(Binary {
            lhs: substitute_expr(&n.lhs, params, args, ids),
            rhs: substitute_expr(&n.rhs, params, args, ids),
            ..(**n).clone()
        })),
        Expr::Unary(n) => Expr::Unary(Rc::new(Unary {
            operand: substitute_expr(&n.operand, params, args, ids),
            ..(**n).clone()
        })),
        Expr::Logic(n) => Expr::Logic(Rc::new(Logic {
            operands: n.operands.iter().map(|o| substitute_expr(o, params, args, ids)).collect(),
            ..(**n).clone()
        })),
        Expr::CallExpr(n) => Expr::CallExpr(Rc::new(CallExpr {
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
        Expr::MemberLoad(_) | Expr::BlackboardLoad(_) | Expr::Literal(_) => expr.clone(),
    }
}

fn fresh_expr_id(expr: Expr, ids: &mut IdAllocator) -> Expr {
    let id = ids.next_id();
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

fn recurse_children(node: &Node, f: &mut impl FnMut(&Node) -> Node) -> Node {
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
