//! AST→IR lowering (C8), grounded on `canopy-ast::lower`'s CST→AST lowering
//! shape: one recursive `lower_node`/`lower_expr` pair, translating each
//! construct by matching on the AST tag and building the corresponding IR
//! struct, with conversions inserted explicitly rather than left implicit
//! (spec.md §4.8).

use std::rc::Rc;

use canopy_ast::ast::{self, Expr, Node, NodeId};
use canopy_ast::ids::IdAllocator;
use canopy_diagnostics::{Diagnostic, DiagnosticBag, DiagnosticCode, Span};
use canopy_sema::{PromotionTable, ResolvedSymbol, SymbolTable, TypeRef, TypeTable};

use crate::ir::*;

pub struct LowerResult {
    pub trees: Vec<IrTree>,
}

#[must_use]
pub fn lower(
    program: &ast::Program,
    symbols: &SymbolTable,
    types: &TypeTable,
    promotions: &PromotionTable,
    ids: &mut IdAllocator,
) -> (LowerResult, DiagnosticBag) {
    let mut lowerer = Lowerer {
        symbols,
        types,
        promotions,
        ids,
        diagnostics: DiagnosticBag::new(),
    };
    let trees = program
        .trees
        .iter()
        .map(|tree| IrTree {
            id: tree.id,
            origin: tree.span,
            name: tree.name.clone(),
            root: lowerer.lower_node(&tree.root),
        })
        .collect();
    (LowerResult { trees }, lowerer.diagnostics)
}

struct Lowerer<'a> {
    symbols: &'a SymbolTable,
    types: &'a TypeTable,
    promotions: &'a PromotionTable,
    ids: &'a mut IdAllocator,
    diagnostics: DiagnosticBag,
}

impl<'a> Lowerer<'a> {
    fn type_of(&self, id: NodeId) -> TypeRef {
        self.types.get(&id).cloned().unwrap_or(TypeRef::Error)
    }

    fn method_ref(&self, id: NodeId) -> (MethodRef, bool, bool, TypeRef) {
        match self.symbols.get(&id) {
            Some(ResolvedSymbol::Method {
                declaring_type,
                name,
                param_types,
                return_type,
                is_async,
                returns_node,
            }) => (
                MethodRef {
                    declaring_type: declaring_type.clone(),
                    name: name.clone(),
                    param_types: param_types.clone(),
                },
                *is_async,
                *returns_node,
                return_type.clone(),
            ),
            _ => (
                MethodRef {
                    declaring_type: String::new(),
                    name: String::new(),
                    param_types: Vec::new(),
                },
                false,
                false,
                TypeRef::Error,
            ),
        }
    }

    fn lower_args(&mut self, args: &[ast::Argument]) -> Vec<IrArg> {
        args.iter()
            .map(|a| IrArg {
                name: a.name.clone(),
                value: self.lower_expr(&a.value),
            })
            .collect()
    }

    /// Wraps `expr` in an `ir-convert` to `target` if its type differs,
    /// per spec.md §4.8's explicit int→float promotion. Convert nodes have
    /// no AST origin, so they draw a fresh id from the shared allocator.
    fn convert_if_needed(&mut self, expr: IrExpr, target: &TypeRef) -> IrExpr {
        if expr.type_ref() == target {
            return expr;
        }
        let origin = expr.origin();
        IrExpr::Convert(Rc::new(IrConvert {
            id: self.ids.next_id(),
            origin,
            operand: expr,
            target_type: target.clone(),
        }))
    }

    fn lower_binary(&mut self, n: &ast::Binary) -> IrExpr {
        let mut lhs = self.lower_expr(&n.lhs);
        let mut rhs = self.lower_expr(&n.rhs);
        let result_ty = self.type_of(n.id);
        if self.promotions.contains(&n.id) {
            // `PromotionTable` only ever records an int/float mismatch
            // (see `canopy_sema::types::arithmetic_result`/`comparable`),
            // so the promoted operand type is always float, regardless of
            // whether the binary op's own result type is (comparisons
            // result in `Bool`, not the promoted numeric type).
            if matches!(lhs.type_ref(), TypeRef::Int) {
                lhs = self.convert_if_needed(lhs, &TypeRef::Float);
            }
            if matches!(rhs.type_ref(), TypeRef::Int) {
                rhs = self.convert_if_needed(rhs, &TypeRef::Float);
            }
        }
        IrExpr::BinaryOp(Rc::new(IrBinaryOp {
            id: n.id,
            origin: n.span,
            op: n.op,
            lhs,
            rhs,
            type_ref: result_ty,
        }))
    }

    fn lower_expr(&mut self, expr: &Expr) -> IrExpr {
        match expr {
            Expr::MemberLoad(n) => IrExpr::MemberLoad(Rc::new(IrMemberLoad {
                id: n.id,
                origin: n.span,
                member: MemberRef {
                    segments: n.path.segments.clone(),
                },
                type_ref: self.type_of(n.id),
            })),
            Expr::BlackboardLoad(n) => IrExpr::BlackboardLoad(Rc::new(IrMemberLoad {
                id: n.id,
                origin: n.span,
                member: MemberRef {
                    segments: n.path.segments.clone(),
                },
                type_ref: self.type_of(n.id),
            })),
            Expr::Literal(n) => IrExpr::Literal(Rc::new(IrLiteral {
                id: n.id,
                origin: n.span,
                value: n.value.clone(),
                type_ref: self.type_of(n.id),
            })),
            Expr::Binary(n) => self.lower_binary(n),
            Expr::Unary(n) => {
                let operand = self.lower_expr(&n.operand);
                IrExpr::UnaryOp(Rc::new(IrUnaryExpr {
                    id: n.id,
                    origin: n.span,
                    op: IrUnaryOp::Not,
                    operand,
                    type_ref: self.type_of(n.id),
                }))
            }
            Expr::Logic(n) => {
                let operands = n.operands.iter().map(|o| self.lower_expr(o)).collect();
                IrExpr::LogicOp(Rc::new(IrLogicOp {
                    id: n.id,
                    origin: n.span,
                    op: n.op,
                    operands,
                    type_ref: self.type_of(n.id),
                }))
            }
            Expr::CallExpr(n) => {
                let (method, _is_async, _returns_node, _return_ty) = self.method_ref(n.id);
                let args = self.lower_args(&n.args);
                IrExpr::Call(Rc::new(IrCall {
                    id: n.id,
                    origin: n.span,
                    method,
                    args,
                    type_ref: self.type_of(n.id),
                }))
            }
        }
    }

    /// Folds a `reactive`'s multiple AST children (the AST keeps the
    /// composite-shaped `Vec<Node>` the parser allows) into the single IR
    /// body the S-expression grammar expects, sequencing them when there is
    /// more than one.
    fn reactive_body(&mut self, children: &[Node]) -> IrNode {
        let mut lowered: Vec<IrNode> = children.iter().map(|c| self.lower_node(c)).collect();
        if lowered.len() == 1 {
            lowered.pop().unwrap()
        } else {
            IrNode::Sequence(Rc::new(IrComposite {
                id: self.ids.next_id(),
                origin: children.first().map_or(Span::empty_at(0), |c| c.span()),
                children: lowered,
            }))
        }
    }

    fn lower_node(&mut self, node: &Node) -> IrNode {
        match node {
            Node::Tree(n) => IrNode::Tree(Rc::new(IrTree {
                id: n.id,
                origin: n.span,
                name: n.name.clone(),
                root: self.lower_node(&n.root),
            })),
            Node::Selector(n) => IrNode::Selector(Rc::new(IrComposite {
                id: n.id,
                origin: n.span,
                children: n.children.iter().map(|c| self.lower_node(c)).collect(),
            })),
            Node::Sequence(n) => IrNode::Sequence(Rc::new(IrComposite {
                id: n.id,
                origin: n.span,
                children: n.children.iter().map(|c| self.lower_node(c)).collect(),
            })),
            Node::ReactiveSelect(n) => IrNode::ReactiveSelect(Rc::new(IrComposite {
                id: n.id,
                origin: n.span,
                children: n.children.iter().map(|c| self.lower_node(c)).collect(),
            })),
            Node::Parallel(n) => IrNode::Parallel(Rc::new(IrParallel {
                id: n.id,
                origin: n.span,
                policy: n.policy,
                children: n.children.iter().map(|c| self.lower_node(c)).collect(),
            })),
            Node::Guard(n) => IrNode::Guard(Rc::new(IrGuard {
                id: n.id,
                origin: n.span,
                condition: self.lower_expr(&n.condition),
                body: n.child.as_ref().map(|c| self.lower_node(c)),
            })),
            Node::If(n) => IrNode::If(Rc::new(IrIf {
                id: n.id,
                origin: n.span,
                condition: self.lower_expr(&n.condition),
                then_branch: self.lower_node(&n.then_branch),
                else_branch: n.else_branch.as_ref().map(|c| self.lower_node(c)),
            })),
            Node::Invert(n) => IrNode::Invert(Rc::new(IrInvert {
                id: n.id,
                origin: n.span,
                child: n.child.as_ref().map(|c| self.lower_node(c)),
            })),
            Node::Repeat(n) => IrNode::Repeat(Rc::new(IrRepeat {
                id: n.id,
                origin: n.span,
                count: n.count,
                child: n.child.as_ref().map(|c| self.lower_node(c)),
            })),
            Node::Timeout(n) => IrNode::Timeout(Rc::new(IrTimeout {
                id: n.id,
                origin: n.span,
                seconds: n.seconds,
                child: n.child.as_ref().map(|c| self.lower_node(c)),
            })),
            Node::Cooldown(n) => IrNode::Cooldown(Rc::new(IrCooldown {
                id: n.id,
                origin: n.span,
                seconds: n.seconds,
                child: n.child.as_ref().map(|c| self.lower_node(c)),
            })),
            Node::While(n) => IrNode::While(Rc::new(IrWhile {
                id: n.id,
                origin: n.span,
                condition: self.lower_expr(&n.condition),
                body: n.child.as_ref().map(|c| self.lower_node(c)),
            })),
            Node::Reactive(n) => {
                let body = self.reactive_body(&n.children);
                IrNode::Reactive(Rc::new(IrReactive {
                    id: n.id,
                    origin: n.span,
                    condition: self.lower_expr(&n.condition),
                    body,
                }))
            }
            Node::Check(n) => IrNode::Condition(Rc::new(IrCondition {
                id: n.id,
                origin: n.span,
                expr: self.lower_expr(&n.condition),
            })),
            Node::ActionCall(n) => {
                let (method, is_async, returns_node, return_ty) = self.method_ref(n.id);
                let args = self.lower_args(&n.args);
                IrNode::Action(Rc::new(IrAction {
                    id: n.id,
                    origin: n.span,
                    method,
                    args,
                    is_async,
                    is_subtree: returns_node,
                    type_ref: return_ty,
                }))
            }
            Node::DefdecCall(n) => {
                // C4 expands every defdec-call away; reaching one here means
                // expansion was skipped (e.g. an earlier unresolved-name
                // error left it in place). Lower its body directly so the
                // IR tree stays well-formed.
                self.lower_node(&n.body)
            }
            Node::Ref(n) => IrNode::TreeRef(Rc::new(IrTreeRef {
                id: n.id,
                origin: n.span,
                name: n.name.clone(),
            })),
            Node::BodyPlaceholder(n) => {
                self.diagnostics.push(Diagnostic::new(
                    DiagnosticCode::BS0901,
                    n.span,
                    vec!["unsubstituted <body> placeholder reached IR lowering".to_string()],
                ));
                IrNode::Condition(Rc::new(IrCondition {
                    id: n.id,
                    origin: n.span,
                    expr: IrExpr::Literal(Rc::new(IrLiteral {
                        id: self.ids.next_id(),
                        origin: n.span,
                        value: ast::LiteralValue::Bool(false),
                        type_ref: TypeRef::Bool,
                    })),
                }))
            }
        }
    }
}
