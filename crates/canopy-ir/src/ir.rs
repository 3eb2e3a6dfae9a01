//! IR node types (spec.md §3's "IR node" data model), produced by C8's
//! AST→IR lowering and consumed by C9's optimizer and C11's serializer.
//!
//! Mirrors `canopy-ast::ast`'s `Node`/`Expr` tagged-enum-of-`Rc`-structs
//! shape (grounded on the same `core/ast/src/arena.rs` rationale): IR trees
//! are immutable values, so sharing an untouched subtree across an
//! optimizer pass is a cheap `Rc` clone rather than a deep copy.

use std::rc::Rc;

use canopy_ast::ast::{BinaryOp, LiteralValue, LogicOp, ParallelPolicy};
use canopy_diagnostics::Span;
use canopy_sema::TypeRef;

pub type IrId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrUnaryOp {
    Not,
    /// Part of the S-expression grammar (spec.md §6) for completeness; the
    /// current DSL grammar has no unary-minus expression form (only
    /// `canopy_ast::ast::UnaryOp::Not` is ever lowered), so C8 never
    /// produces this variant.
    Negate,
}

#[derive(Debug, Clone)]
pub struct MethodRef {
    pub declaring_type: String,
    pub name: String,
    pub param_types: Vec<TypeRef>,
}

#[derive(Debug, Clone)]
pub struct MemberRef {
    pub segments: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct IrArg {
    pub name: Option<String>,
    pub value: IrExpr,
}

/// Control and leaf IR nodes (spec.md §3's "Control"/"Leaves" variant
/// lists).
#[derive(Debug, Clone)]
pub enum IrNode {
    Tree(Rc<IrTree>),
    Selector(Rc<IrComposite>),
    Sequence(Rc<IrComposite>),
    Parallel(Rc<IrParallel>),
    Guard(Rc<IrGuard>),
    If(Rc<IrIf>),
    Invert(Rc<IrInvert>),
    Repeat(Rc<IrRepeat>),
    Timeout(Rc<IrTimeout>),
    Cooldown(Rc<IrCooldown>),
    While(Rc<IrWhile>),
    Reactive(Rc<IrReactive>),
    ReactiveSelect(Rc<IrComposite>),
    TreeRef(Rc<IrTreeRef>),
    Condition(Rc<IrCondition>),
    Action(Rc<IrAction>),
}

impl IrNode {
    #[must_use]
    pub fn id(&self) -> IrId {
        match self {
            IrNode::Tree(n) => n.id,
            IrNode::Selector(n) | IrNode::Sequence(n) | IrNode::ReactiveSelect(n) => n.id,
            IrNode::Parallel(n) => n.id,
            IrNode::Guard(n) => n.id,
            IrNode::If(n) => n.id,
            IrNode::Invert(n) => n.id,
            IrNode::Repeat(n) => n.id,
            IrNode::Timeout(n) => n.id,
            IrNode::Cooldown(n) => n.id,
            IrNode::While(n) => n.id,
            IrNode::Reactive(n) => n.id,
            IrNode::TreeRef(n) => n.id,
            IrNode::Condition(n) => n.id,
            IrNode::Action(n) => n.id,
        }
    }

    #[must_use]
    pub fn origin(&self) -> Span {
        match self {
            IrNode::Tree(n) => n.origin,
            IrNode::Selector(n) | IrNode::Sequence(n) | IrNode::ReactiveSelect(n) => n.origin,
            IrNode::Parallel(n) => n.origin,
            IrNode::Guard(n) => n.origin,
            IrNode::If(n) => n.origin,
            IrNode::Invert(n) => n.origin,
            IrNode::Repeat(n) => n.origin,
            IrNode::Timeout(n) => n.origin,
            IrNode::Cooldown(n) => n.origin,
            IrNode::While(n) => n.origin,
            IrNode::Reactive(n) => n.origin,
            IrNode::TreeRef(n) => n.origin,
            IrNode::Condition(n) => n.origin,
            IrNode::Action(n) => n.origin,
        }
    }

    #[must_use]
    pub fn type_ref(&self) -> Option<&TypeRef> {
        match self {
            IrNode::Action(n) => Some(&n.type_ref),
            _ => None,
        }
    }

    #[must_use]
    pub fn children(&self) -> Vec<IrNode> {
        match self {
            IrNode::Tree(n) => vec![n.root.clone()],
            IrNode::Selector(n) | IrNode::Sequence(n) | IrNode::ReactiveSelect(n) => n.children.clone(),
            IrNode::Parallel(n) => n.children.clone(),
            IrNode::Guard(n) => n.body.iter().cloned().collect(),
            IrNode::If(n) => {
                let mut out = vec![n.then_branch.clone()];
                out.extend(n.else_branch.clone());
                out
            }
            IrNode::Invert(n) => n.child.iter().cloned().collect(),
            IrNode::Repeat(n) => n.child.iter().cloned().collect(),
            IrNode::Timeout(n) => n.child.iter().cloned().collect(),
            IrNode::Cooldown(n) => n.child.iter().cloned().collect(),
            IrNode::While(n) => n.body.iter().cloned().collect(),
            IrNode::Reactive(n) => vec![n.body.clone()],
            IrNode::TreeRef(_) | IrNode::Condition(_) | IrNode::Action(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IrTree {
    pub id: IrId,
    pub origin: Span,
    pub name: String,
    pub root: IrNode,
}

#[derive(Debug, Clone)]
pub struct IrComposite {
    pub id: IrId,
    pub origin: Span,
    pub children: Vec<IrNode>,
}

#[derive(Debug, Clone)]
pub struct IrParallel {
    pub id: IrId,
    pub origin: Span,
    pub policy: ParallelPolicy,
    pub children: Vec<IrNode>,
}

#[derive(Debug, Clone)]
pub struct IrGuard {
    pub id: IrId,
    pub origin: Span,
    pub condition: IrExpr,
    pub body: Option<IrNode>,
}

#[derive(Debug, Clone)]
pub struct IrIf {
    pub id: IrId,
    pub origin: Span,
    pub condition: IrExpr,
    pub then_branch: IrNode,
    pub else_branch: Option<IrNode>,
}

#[derive(Debug, Clone)]
pub struct IrInvert {
    pub id: IrId,
    pub origin: Span,
    pub child: Option<IrNode>,
}

#[derive(Debug, Clone)]
pub struct IrRepeat {
    pub id: IrId,
    pub origin: Span,
    pub count: i64,
    pub child: Option<IrNode>,
}

#[derive(Debug, Clone)]
pub struct IrTimeout {
    pub id: IrId,
    pub origin: Span,
    pub seconds: f64,
    pub child: Option<IrNode>,
}

#[derive(Debug, Clone)]
pub struct IrCooldown {
    pub id: IrId,
    pub origin: Span,
    pub seconds: f64,
    pub child: Option<IrNode>,
}

#[derive(Debug, Clone)]
pub struct IrWhile {
    pub id: IrId,
    pub origin: Span,
    pub condition: IrExpr,
    pub body: Option<IrNode>,
}

#[derive(Debug, Clone)]
pub struct IrReactive {
    pub id: IrId,
    pub origin: Span,
    pub condition: IrExpr,
    pub body: IrNode,
}

#[derive(Debug, Clone)]
pub struct IrTreeRef {
    pub id: IrId,
    pub origin: Span,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct IrCondition {
    pub id: IrId,
    pub origin: Span,
    pub expr: IrExpr,
}

#[derive(Debug, Clone)]
pub struct IrAction {
    pub id: IrId,
    pub origin: Span,
    pub method: MethodRef,
    pub args: Vec<IrArg>,
    pub is_async: bool,
    /// True when the resolved method returns the runtime node type
    /// (spec.md §4.8): the emitter treats this call as a subtree rather
    /// than a leaf action.
    pub is_subtree: bool,
    pub type_ref: TypeRef,
}

/// Expression IR nodes (spec.md §3's "Expressions" variant list). Every
/// variant carries a non-null `type_ref`, per spec.md §3.
#[derive(Debug, Clone)]
pub enum IrExpr {
    MemberLoad(Rc<IrMemberLoad>),
    BlackboardLoad(Rc<IrMemberLoad>),
    Literal(Rc<IrLiteral>),
    BinaryOp(Rc<IrBinaryOp>),
    UnaryOp(Rc<IrUnaryExpr>),
    LogicOp(Rc<IrLogicOp>),
    Call(Rc<IrCall>),
    Convert(Rc<IrConvert>),
}

impl IrExpr {
    #[must_use]
    pub fn id(&self) -> IrId {
        match self {
            IrExpr::MemberLoad(n) | IrExpr::BlackboardLoad(n) => n.id,
            IrExpr::Literal(n) => n.id,
            IrExpr::BinaryOp(n) => n.id,
            IrExpr::UnaryOp(n) => n.id,
            IrExpr::LogicOp(n) => n.id,
            IrExpr::Call(n) => n.id,
            IrExpr::Convert(n) => n.id,
        }
    }

    #[must_use]
    pub fn origin(&self) -> Span {
        match self {
            IrExpr::MemberLoad(n) | IrExpr::BlackboardLoad(n) => n.origin,
            IrExpr::Literal(n) => n.origin,
            IrExpr::BinaryOp(n) => n.origin,
            IrExpr::UnaryOp(n) => n.origin,
            IrExpr::LogicOp(n) => n.origin,
            IrExpr::Call(n) => n.origin,
            IrExpr::Convert(n) => n.origin,
        }
    }

    #[must_use]
    pub fn type_ref(&self) -> &TypeRef {
        match self {
            IrExpr::MemberLoad(n) | IrExpr::BlackboardLoad(n) => &n.type_ref,
            IrExpr::Literal(n) => &n.type_ref,
            IrExpr::BinaryOp(n) => &n.type_ref,
            IrExpr::UnaryOp(n) => &n.type_ref,
            IrExpr::LogicOp(n) => &n.type_ref,
            IrExpr::Call(n) => &n.type_ref,
            IrExpr::Convert(n) => &n.target_type,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IrMemberLoad {
    pub id: IrId,
    pub origin: Span,
    pub member: MemberRef,
    pub type_ref: TypeRef,
}

#[derive(Debug, Clone)]
pub struct IrLiteral {
    pub id: IrId,
    pub origin: Span,
    pub value: LiteralValue,
    pub type_ref: TypeRef,
}

#[derive(Debug, Clone)]
pub struct IrBinaryOp {
    pub id: IrId,
    pub origin: Span,
    pub op: BinaryOp,
    pub lhs: IrExpr,
    pub rhs: IrExpr,
    pub type_ref: TypeRef,
}

#[derive(Debug, Clone)]
pub struct IrUnaryExpr {
    pub id: IrId,
    pub origin: Span,
    pub op: IrUnaryOp,
    pub operand: IrExpr,
    pub type_ref: TypeRef,
}

#[derive(Debug, Clone)]
pub struct IrLogicOp {
    pub id: IrId,
    pub origin: Span,
    pub op: LogicOp,
    pub operands: Vec<IrExpr>,
    pub type_ref: TypeRef,
}

#[derive(Debug, Clone)]
pub struct IrCall {
    pub id: IrId,
    pub origin: Span,
    pub method: MethodRef,
    pub args: Vec<IrArg>,
    pub type_ref: TypeRef,
}

#[derive(Debug, Clone)]
pub struct IrConvert {
    pub id: IrId,
    pub origin: Span,
    pub operand: IrExpr,
    pub target_type: TypeRef,
}
