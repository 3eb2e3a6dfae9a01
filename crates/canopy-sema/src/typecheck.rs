//! Type inference and checking (C6), grounded on
//! `core/type-checker/src/type_checker.rs`'s bottom-up/top-down split.
//!
//! Bottom-up inference fills [`TypeTable`] for every expression; top-down
//! checking walks nodes enforcing spec.md §4.6's constraints against it.
//! Both share one [`ErrorType`]-style sentinel ([`TypeRef::Error`]) for
//! cascade suppression: any constraint read against an expression already
//! typed `Error` is satisfied silently, so one root cause produces one
//! diagnostic (spec.md §8's cascade-suppression invariant).

use canopy_ast::ast::{BinaryOp, Expr, LiteralValue, LogicOp, Node, UnaryOp};
use canopy_diagnostics::{Diagnostic, DiagnosticBag, DiagnosticCode, Span};

use crate::symbol::{ResolvedSymbol, SymbolTable};
use crate::types::{arithmetic_result, comparable, is_numeric, PromotionTable, TypeRef, TypeTable};

pub struct TypeChecker<'a> {
    symbols: &'a SymbolTable,
    types: TypeTable,
    promotions: PromotionTable,
    diagnostics: DiagnosticBag,
}

pub struct TypeCheckResult {
    pub types: TypeTable,
    pub promotions: PromotionTable,
}

#[must_use]
pub fn check(program: &canopy_ast::ast::Program, symbols: &SymbolTable) -> (TypeCheckResult, DiagnosticBag) {
    let mut checker = TypeChecker {
        symbols,
        types: TypeTable::default(),
        promotions: PromotionTable::default(),
        diagnostics: DiagnosticBag::new(),
    };
    for tree in &program.trees {
        checker.check_node(&tree.root);
    }
    for defdec in &program.defdecs {
        checker.check_node(&defdec.body);
    }
    (
        TypeCheckResult {
            types: checker.types,
            promotions: checker.promotions,
        },
        checker.diagnostics,
    )
}

impl<'a> TypeChecker<'a> {
    /// Bottom-up: computes (and caches) the type of `expr`, per spec.md
    /// §4.6's promotion table.
    fn infer(&mut self, expr: &Expr) -> TypeRef {
        if let Some(cached) = self.types.get(&expr.id()) {
            return cached.clone();
        }
        let ty = match expr {
            Expr::Literal(lit) => match &lit.value {
                LiteralValue::Int(_) => TypeRef::Int,
                LiteralValue::Float(_) => TypeRef::Float,
                LiteralValue::Bool(_) => TypeRef::Bool,
                LiteralValue::Str(_) => TypeRef::String,
                LiteralValue::Null => TypeRef::Null,
                LiteralValue::Enum(type_name, _) => TypeRef::Host(type_name.clone()),
            },
            Expr::MemberLoad(n) => self.symbol_type(n.id),
            Expr::BlackboardLoad(n) => self.symbol_type(n.id),
            Expr::CallExpr(n) => self.check_call_args(n.id, &n.args),
            Expr::Binary(n) => {
                let lhs = self.infer(&n.lhs);
                let rhs = self.infer(&n.rhs);
                self.check_binary(n.id, n.op, n.span, &lhs, &rhs)
            }
            Expr::Unary(n) => {
                let operand = self.infer(&n.operand);
                match n.op {
                    UnaryOp::Not => {
                        if operand != TypeRef::Error && operand != TypeRef::Bool {
                            self.diagnostics.push(Diagnostic::new(
                                DiagnosticCode::BS0002,
                                n.span,
                                vec![TypeRef::Bool.to_string(), operand.to_string()],
                            ));
                            TypeRef::Error
                        } else {
                            TypeRef::Bool
                        }
                    }
                }
            }
            Expr::Logic(n) => {
                let op_name = match n.op {
                    LogicOp::And => "and",
                    LogicOp::Or => "or",
                };
                let mut any_error = false;
                for operand in &n.operands {
                    let t = self.infer(operand);
                    if t == TypeRef::Error {
                        any_error = true;
                    } else if t != TypeRef::Bool {
                        self.diagnostics.push(Diagnostic::new(
                            DiagnosticCode::BS0022,
                            n.span,
                            vec![op_name.to_string()],
                        ));
                        any_error = true;
                    }
                }
                if any_error {
                    TypeRef::Error
                } else {
                    TypeRef::Bool
                }
            }
        };
        self.types.insert(expr.id(), ty.clone());
        ty
    }

    fn symbol_type(&mut self, id: canopy_ast::ast::NodeId) -> TypeRef {
        self.symbols.get(&id).map_or(TypeRef::Error, ResolvedSymbol::type_ref)
    }

    fn check_binary(&mut self, id: canopy_ast::ast::NodeId, op: BinaryOp, span: Span, lhs: &TypeRef, rhs: &TypeRef) -> TypeRef {
        if *lhs == TypeRef::Error || *rhs == TypeRef::Error {
            return TypeRef::Error;
        }
        match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                match arithmetic_result(lhs, rhs) {
                    Some(result) => {
                        if result == TypeRef::Float && (lhs == &TypeRef::Int || rhs == &TypeRef::Int) && lhs != rhs {
                            self.promotions.insert(id);
                        }
                        result
                    }
                    None => {
                        self.diagnostics.push(Diagnostic::new(
                            DiagnosticCode::BS0003,
                            span,
                            vec![binary_op_symbol(op).to_string(), lhs.to_string(), rhs.to_string()],
                        ));
                        TypeRef::Error
                    }
                }
            }
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne => {
                if comparable(lhs, rhs) {
                    if is_numeric(lhs) && is_numeric(rhs) && lhs != rhs {
                        self.promotions.insert(id);
                    }
                    TypeRef::Bool
                } else {
                    self.diagnostics.push(Diagnostic::new(
                        DiagnosticCode::BS0003,
                        span,
                        vec![binary_op_symbol(op).to_string(), lhs.to_string(), rhs.to_string()],
                    ));
                    TypeRef::Error
                }
            }
        }
    }

    fn check_call_args(&mut self, id: canopy_ast::ast::NodeId, args: &[canopy_ast::ast::Argument]) -> TypeRef {
        let arg_types: Vec<TypeRef> = args.iter().map(|a| self.infer(&a.value)).collect();
        let Some(symbol) = self.symbols.get(&id) else {
            return TypeRef::Error;
        };
        let ResolvedSymbol::Method {
            name,
            param_types,
            return_type,
            ..
        } = symbol
        else {
            return symbol.type_ref();
        };
        if param_types.len() != args.len() {
            self.diagnostics.push(Diagnostic::new(
                DiagnosticCode::BS0005,
                args.first().map_or(Span::empty_at(0), |a| a.value.span()),
                vec![name.clone(), param_types.len().to_string(), args.len().to_string()],
            ));
        } else {
            for (i, (expected, found)) in param_types.iter().zip(arg_types.iter()).enumerate() {
                if *found != TypeRef::Error && *expected != *found && !(is_numeric(expected) && is_numeric(found)) {
                    self.diagnostics.push(Diagnostic::new(
                        DiagnosticCode::BS0006,
                        args[i].value.span(),
                        vec![(i + 1).to_string(), name.clone(), expected.to_string(), found.to_string()],
                    ));
                }
            }
        }
        return_type.clone()
    }

    /// Top-down: walks node-shaped constraints per spec.md §4.6.
    fn check_node(&mut self, node: &Node) {
        match node {
            Node::Guard(n) => {
                self.require_bool(&n.condition, "guard", n.span);
                if let Some(child) = &n.child {
                    self.check_node(child);
                }
                return;
            }
            Node::If(n) => {
                self.require_bool(&n.condition, "if", n.span);
                self.check_node(&n.then_branch);
                if let Some(else_branch) = &n.else_branch {
                    self.check_node(else_branch);
                }
                return;
            }
            Node::While(n) => {
                self.require_bool(&n.condition, "while", n.span);
                if let Some(child) = &n.child {
                    self.check_node(child);
                }
                return;
            }
            Node::Reactive(n) => {
                self.require_bool(&n.condition, "reactive", n.span);
                if n.children.len() < 2 {
                    self.diagnostics
                        .push(Diagnostic::new(DiagnosticCode::BS0015, n.span, vec!["reactive".to_string()]));
                }
                for child in &n.children {
                    self.check_node(child);
                }
                return;
            }
            Node::Check(n) => {
                let ty = self.infer(&n.condition);
                if ty != TypeRef::Error && ty != TypeRef::Bool {
                    self.diagnostics
                        .push(Diagnostic::new(DiagnosticCode::BS0007, n.span, vec![ty.to_string()]));
                }
                return;
            }
            Node::Repeat(n) => {
                if n.count <= 0 {
                    self.diagnostics.push(Diagnostic::new(DiagnosticCode::BS0013, n.span, vec![]));
                }
            }
            Node::Timeout(n) => {
                if n.seconds <= 0.0 {
                    self.diagnostics
                        .push(Diagnostic::new(DiagnosticCode::BS0014, n.span, vec!["timeout".to_string()]));
                }
            }
            Node::Cooldown(n) => {
                if n.seconds <= 0.0 {
                    self.diagnostics
                        .push(Diagnostic::new(DiagnosticCode::BS0014, n.span, vec!["cooldown".to_string()]));
                }
            }
            Node::Selector(n) | Node::Sequence(n) | Node::ReactiveSelect(n) => {
                if n.children.len() < 2 {
                    self.diagnostics
                        .push(Diagnostic::new(DiagnosticCode::BS0015, n.span, vec![node_kind_name(node).to_string()]));
                }
            }
            Node::Parallel(n) => {
                if n.children.len() < 2 {
                    self.diagnostics
                        .push(Diagnostic::new(DiagnosticCode::BS0015, n.span, vec!["parallel".to_string()]));
                }
            }
            Node::ActionCall(n) => {
                self.check_call_args(n.id, &n.args);
                if let Some(ResolvedSymbol::Method {
                    return_type,
                    returns_node,
                    ..
                }) = self.symbols.get(&n.id)
                {
                    if !returns_node && !is_status_type(return_type) {
                        self.diagnostics.push(Diagnostic::new(
                            DiagnosticCode::BS0008,
                            n.span,
                            vec![n.callee.segments.join(".")],
                        ));
                    }
                }
            }
            _ => {}
        }
        for child in node.children() {
            self.check_node(&child);
        }
    }

    fn require_bool(&mut self, condition: &Expr, node_kind: &str, span: Span) {
        let ty = self.infer(condition);
        if ty != TypeRef::Error && ty != TypeRef::Bool {
            self.diagnostics
                .push(Diagnostic::new(DiagnosticCode::BS0021, span, vec![node_kind.to_string()]));
        }
    }
}

fn binary_op_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Lt => "<",
        BinaryOp::Gt => ">",
        BinaryOp::Le => "<=",
        BinaryOp::Ge => ">=",
        BinaryOp::Eq => "=",
        BinaryOp::Ne => "!=",
    }
}

fn node_kind_name(node: &Node) -> &'static str {
    match node {
        Node::Selector(_) => "select",
        Node::Sequence(_) => "seq",
        Node::ReactiveSelect(_) => "reactive-select",
        _ => "composite",
    }
}

/// spec.md §4.6: "action methods must return the runtime status type or the
/// runtime node type". The runtime status type isn't modeled as a distinct
/// `TypeRef` variant (it's whatever host type the provider reports), so any
/// non-node `Host` return type is accepted as "status-shaped"; only
/// Canopy's own primitives (`int`, `float`, `bool`, `string`, `null`) are
/// rejected, since a genuine action method never meaningfully returns one.
fn is_status_type(t: &TypeRef) -> bool {
    matches!(t, TypeRef::Host(_))
}
