//! Flow-sensitive nullable analysis (C7, spec.md §4.7's nullable half).
//!
//! The flow state is an immutable map from member-path key to
//! `{MaybeNull, NotNull}`, threaded top-down and cloned at every branch
//! point rather than mutated in place, matching the teacher's AST-walk
//! style in `core/type-checker/src/type_checker.rs` generalized from a
//! single bottom-up/top-down pass to a branching one. Keys are textual
//! (`.A.B` for a context member path, `$A.B` for a blackboard path) since
//! narrowing is purely syntactic: spec.md §4.7 narrows on repeated
//! occurrences of the same written path, not on aliasing or SSA identity.

use rustc_hash::FxHashMap;

use canopy_ast::ast::{BinaryOp, Binary, Expr, LiteralValue, LogicOp, MemberPath, Node, NodeId, Program};
use canopy_diagnostics::{Diagnostic, DiagnosticBag, DiagnosticCode, Span};

use crate::host::Nullability;
use crate::symbol::{ResolvedSymbol, SymbolTable};

type FlowState = FxHashMap<String, Nullability>;

struct Checker<'a> {
    symbols: &'a SymbolTable,
    diagnostics: DiagnosticBag,
}

#[must_use]
pub fn check(program: &Program, symbols: &SymbolTable) -> DiagnosticBag {
    let mut checker = Checker {
        symbols,
        diagnostics: DiagnosticBag::new(),
    };
    for tree in &program.trees {
        checker.check_node(&tree.root, &FlowState::default());
    }
    for defdec in &program.defdecs {
        checker.check_node(&defdec.body, &FlowState::default());
    }
    checker.diagnostics
}

fn is_null_literal(e: &Expr) -> bool {
    matches!(e, Expr::Literal(l) if matches!(l.value, LiteralValue::Null))
}

fn path_key(e: &Expr) -> Option<String> {
    match e {
        Expr::MemberLoad(n) => Some(format!(".{}", n.path.segments.join("."))),
        Expr::BlackboardLoad(n) => Some(format!("${}", n.path.segments.join("."))),
        _ => None,
    }
}

/// If `n` is `(= x null)` or `(!= x null)` (either operand order), returns
/// whether it was `!=` plus the non-null operand.
fn null_comparison(n: &Binary) -> Option<(bool, &Expr)> {
    if !matches!(n.op, BinaryOp::Eq | BinaryOp::Ne) {
        return None;
    }
    let lhs_null = is_null_literal(&n.lhs);
    let rhs_null = is_null_literal(&n.rhs);
    if lhs_null == rhs_null {
        return None;
    }
    let path_expr = if lhs_null { &n.rhs } else { &n.lhs };
    Some((matches!(n.op, BinaryOp::Ne), path_expr))
}

/// Paths proven non-null when `cond` evaluates true: `(!= x null)` directly,
/// or the union of an `and`'s operands (spec.md §4.7's left-to-right
/// accumulation collapses here since all operands must hold).
fn narrowed_paths(cond: &Expr) -> Vec<String> {
    match cond {
        Expr::Binary(n) => match null_comparison(n) {
            Some((true, path_expr)) => path_key(path_expr).into_iter().collect(),
            _ => Vec::new(),
        },
        Expr::Logic(n) if matches!(n.op, LogicOp::And) => n.operands.iter().flat_map(narrowed_paths).collect(),
        _ => Vec::new(),
    }
}

fn apply_narrowing(cond: &Expr, flow: &mut FlowState) {
    for path in narrowed_paths(cond) {
        flow.insert(path, Nullability::NotNull);
    }
}

impl<'a> Checker<'a> {
    fn symbol_nullability(&self, id: NodeId) -> Option<Nullability> {
        match self.symbols.get(&id)? {
            ResolvedSymbol::Member { nullability, .. } | ResolvedSymbol::BlackboardMember { nullability, .. } => {
                Some(*nullability)
            }
            _ => None,
        }
    }

    fn check_null_comparison(&mut self, span: Span, path_expr: &Expr, is_ne: bool, flow: &FlowState) {
        let (Some(key), Some(id)) = (
            path_key(path_expr),
            match path_expr {
                Expr::MemberLoad(n) | Expr::BlackboardLoad(n) => Some(n.id),
                _ => None,
            },
        ) else {
            return;
        };
        let Some(nullability) = self.symbol_nullability(id) else {
            return;
        };
        if nullability == Nullability::NotNull {
            self.diagnostics.push(Diagnostic::new(DiagnosticCode::BS0047, span, vec![key]));
            return;
        }
        if flow.get(&key) == Some(&Nullability::NotNull) {
            let code = if is_ne { DiagnosticCode::BS0045 } else { DiagnosticCode::BS0046 };
            self.diagnostics.push(Diagnostic::new(code, span, vec![]));
        }
    }

    fn check_deref(&mut self, id: NodeId, path: &MemberPath, span: Span, is_blackboard: bool, flow: &FlowState) {
        let Some(nullability) = self.symbol_nullability(id) else {
            return;
        };
        if nullability != Nullability::Nullable {
            return;
        }
        let key = if is_blackboard {
            format!("${}", path.segments.join("."))
        } else {
            format!(".{}", path.segments.join("."))
        };
        if flow.get(&key) == Some(&Nullability::NotNull) {
            return;
        }
        self.diagnostics.push(Diagnostic::new(DiagnosticCode::BS0044, span, vec![key]));
    }

    fn check_expr(&mut self, expr: &Expr, flow: &FlowState) {
        match expr {
            Expr::MemberLoad(n) => self.check_deref(n.id, &n.path, n.span, false, flow),
            Expr::BlackboardLoad(n) => self.check_deref(n.id, &n.path, n.span, true, flow),
            Expr::Literal(_) => {}
            Expr::Binary(n) => {
                if let Some((is_ne, path_expr)) = null_comparison(n) {
                    self.check_null_comparison(n.span, path_expr, is_ne, flow);
                } else {
                    self.check_expr(&n.lhs, flow);
                    self.check_expr(&n.rhs, flow);
                }
            }
            Expr::Unary(n) => self.check_expr(&n.operand, flow),
            Expr::Logic(n) => match n.op {
                LogicOp::And => {
                    let mut local = flow.clone();
                    for operand in &n.operands {
                        self.check_expr(operand, &local);
                        apply_narrowing(operand, &mut local);
                    }
                }
                LogicOp::Or => {
                    for operand in &n.operands {
                        self.check_expr(operand, flow);
                    }
                }
            },
            Expr::CallExpr(n) => {
                for arg in &n.args {
                    self.check_expr(&arg.value, flow);
                }
            }
        }
    }

    fn check_node(&mut self, node: &Node, flow: &FlowState) {
        match node {
            Node::Guard(n) => {
                self.check_expr(&n.condition, flow);
                let mut child_flow = flow.clone();
                apply_narrowing(&n.condition, &mut child_flow);
                if let Some(child) = &n.child {
                    self.check_node(child, &child_flow);
                }
                return;
            }
            Node::If(n) => {
                self.check_expr(&n.condition, flow);
                let mut then_flow = flow.clone();
                apply_narrowing(&n.condition, &mut then_flow);
                self.check_node(&n.then_branch, &then_flow);
                if let Some(else_branch) = &n.else_branch {
                    // spec.md §4.7: the else branch stays maybe-null, even
                    // if the condition's negation would statically imply
                    // non-null — no narrowing is derived from a false
                    // `(!= x null)`.
                    self.check_node(else_branch, flow);
                }
                return;
            }
            Node::While(n) => {
                self.check_expr(&n.condition, flow);
                let mut child_flow = flow.clone();
                apply_narrowing(&n.condition, &mut child_flow);
                if let Some(child) = &n.child {
                    self.check_node(child, &child_flow);
                }
                return;
            }
            Node::Reactive(n) => {
                self.check_expr(&n.condition, flow);
                let mut child_flow = flow.clone();
                apply_narrowing(&n.condition, &mut child_flow);
                for child in &n.children {
                    self.check_node(child, &child_flow);
                }
                return;
            }
            Node::Check(n) => {
                self.check_expr(&n.condition, flow);
                return;
            }
            Node::Sequence(n) => {
                let mut running = flow.clone();
                for child in &n.children {
                    self.check_node(child, &running);
                    if let Node::Check(c) = child {
                        apply_narrowing(&c.condition, &mut running);
                    }
                }
                return;
            }
            Node::Selector(n) | Node::ReactiveSelect(n) => {
                for child in &n.children {
                    self.check_node(child, flow);
                }
                return;
            }
            Node::Parallel(n) => {
                for child in &n.children {
                    self.check_node(child, flow);
                }
                return;
            }
            Node::ActionCall(n) => {
                for arg in &n.args {
                    self.check_expr(&arg.value, flow);
                }
            }
            _ => {}
        }
        for child in node.children() {
            self.check_node(&child, flow);
        }
    }
}
