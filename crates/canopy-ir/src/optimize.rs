//! IR optimizer (C9): a small ordered pass manager, spec.md §4.9.
//!
//! Each pass walks the whole tree and rebuilds it value-by-value (IR nodes
//! are immutable, per spec.md §3's ownership note); an untouched subtree
//! keeps its id and becomes a cheap `Rc` clone, while a pass that actually
//! replaces a node hands out a fresh id from the shared [`IdAllocator`],
//! matching spec.md §8's id-stability invariant for optimizer output.
//! Grounded on `core/type-checker/src/type_checker.rs`'s single-pass
//! recursive-rebuild style, run four times over with a different
//! transformation at each pass instead of once. Constant folding and
//! convert fusion each iterate to a fixpoint (folding a binary op can
//! expose another fold one level up; fusing a double convert can expose
//! another fusion); dead-node elimination and single-child collapse are
//! single-pass, since each only ever shrinks a composite once.

use std::rc::Rc;

use canopy_ast::ast::{BinaryOp, LiteralValue};
use canopy_ast::ids::IdAllocator;

use crate::ir::*;

const FIXPOINT_ITERATION_LIMIT: u32 = 32;

#[must_use]
pub fn optimize(tree: IrTree, ids: &mut IdAllocator) -> IrTree {
    let mut root = tree.root;
    root = fold_to_fixpoint(root);
    root = dce_node(root);
    root = collapse_node(root);
    root = fuse_to_fixpoint(root, ids);
    IrTree {
        id: tree.id,
        origin: tree.origin,
        name: tree.name,
        root,
    }
}

/// Runs [`fold_node`] until it stops changing the tree, detected by
/// comparing each iteration's S-expression rendering against the last.
fn fold_to_fixpoint(mut root: IrNode) -> IrNode {
    let mut prev = crate::sexpr::serialize_node(&root);
    for _ in 0..FIXPOINT_ITERATION_LIMIT {
        root = fold_node(root);
        let next = crate::sexpr::serialize_node(&root);
        if next == prev {
            break;
        }
        prev = next;
    }
    root
}

/// Runs [`fuse_node`] until it stops changing the tree, same fixpoint
/// detection as [`fold_to_fixpoint`].
fn fuse_to_fixpoint(mut root: IrNode, ids: &mut IdAllocator) -> IrNode {
    let mut prev = crate::sexpr::serialize_node(&root);
    for _ in 0..FIXPOINT_ITERATION_LIMIT {
        root = fuse_node(root, ids);
        let next = crate::sexpr::serialize_node(&root);
        if next == prev {
            break;
        }
        prev = next;
    }
    root
}

// ---- Pass 1: constant folding ----

fn eval_binary(op: BinaryOp, lhs: &LiteralValue, rhs: &LiteralValue) -> Option<LiteralValue> {
    use BinaryOp::{Add, Div, Eq, Ge, Gt, Le, Lt, Mod, Mul, Ne, Sub};
    use LiteralValue::{Bool, Float, Int, Str};
    match (lhs, rhs) {
        (Int(a), Int(b)) => match op {
            Add => Some(Int(a + b)),
            Sub => Some(Int(a - b)),
            Mul => Some(Int(a * b)),
            Div if *b != 0 => Some(Int(a / b)),
            Mod if *b != 0 => Some(Int(a % b)),
            Lt => Some(Bool(a < b)),
            Gt => Some(Bool(a > b)),
            Le => Some(Bool(a <= b)),
            Ge => Some(Bool(a >= b)),
            Eq => Some(Bool(a == b)),
            Ne => Some(Bool(a != b)),
            _ => None,
        },
        (Float(a), Float(b)) => match op {
            Add => Some(Float(a + b)),
            Sub => Some(Float(a - b)),
            Mul => Some(Float(a * b)),
            Div if *b != 0.0 => Some(Float(a / b)),
            Mod if *b != 0.0 => Some(Float(a % b)),
            Lt => Some(Bool(a < b)),
            Gt => Some(Bool(a > b)),
            Le => Some(Bool(a <= b)),
            Ge => Some(Bool(a >= b)),
            Eq => Some(Bool(a == b)),
            Ne => Some(Bool(a != b)),
            _ => None,
        },
        (Bool(a), Bool(b)) => match op {
            Eq => Some(Bool(a == b)),
            Ne => Some(Bool(a != b)),
            _ => None,
        },
        (Str(a), Str(b)) => match op {
            Eq => Some(Bool(a == b)),
            Ne => Some(Bool(a != b)),
            _ => None,
        },
        _ => None,
    }
}

fn eval_unary(op: IrUnaryOp, operand: &LiteralValue) -> Option<LiteralValue> {
    match (op, operand) {
        (IrUnaryOp::Not, LiteralValue::Bool(b)) => Some(LiteralValue::Bool(!b)),
        (IrUnaryOp::Negate, LiteralValue::Int(n)) => Some(LiteralValue::Int(-n)),
        (IrUnaryOp::Negate, LiteralValue::Float(f)) => Some(LiteralValue::Float(-f)),
        _ => None,
    }
}

fn fold_args(args: &[IrArg]) -> Vec<IrArg> {
    args.iter()
        .map(|a| IrArg {
            name: a.name.clone(),
            value: fold_expr(a.value.clone()),
        })
        .collect()
}

fn fold_expr(expr: IrExpr) -> IrExpr {
    match expr {
        IrExpr::BinaryOp(n) => {
            let lhs = fold_expr(n.lhs.clone());
            let rhs = fold_expr(n.rhs.clone());
            if let (IrExpr::Literal(l), IrExpr::Literal(r)) = (&lhs, &rhs) {
                if let Some(value) = eval_binary(n.op, &l.value, &r.value) {
                    return IrExpr::Literal(Rc::new(IrLiteral {
                        id: n.id,
                        origin: n.origin,
                        value,
                        type_ref: n.type_ref.clone(),
                    }));
                }
            }
            IrExpr::BinaryOp(Rc::new(IrBinaryOp {
                id: n.id,
                origin: n.origin,
                op: n.op,
                lhs,
                rhs,
                type_ref: n.type_ref.clone(),
            }))
        }
        IrExpr::UnaryOp(n) => {
            let operand = fold_expr(n.operand.clone());
            if let IrExpr::Literal(l) = &operand {
                if let Some(value) = eval_unary(n.op, &l.value) {
                    return IrExpr::Literal(Rc::new(IrLiteral {
                        id: n.id,
                        origin: n.origin,
                        value,
                        type_ref: n.type_ref.clone(),
                    }));
                }
            }
            IrExpr::UnaryOp(Rc::new(IrUnaryExpr {
                id: n.id,
                origin: n.origin,
                op: n.op,
                operand,
                type_ref: n.type_ref.clone(),
            }))
        }
        IrExpr::LogicOp(n) => IrExpr::LogicOp(Rc::new(IrLogicOp {
            id: n.id,
            origin: n.origin,
            op: n.op,
            operands: n.operands.iter().cloned().map(fold_expr).collect(),
            type_ref: n.type_ref.clone(),
        })),
        IrExpr::Call(n) => IrExpr::Call(Rc::new(IrCall {
            id: n.id,
            origin: n.origin,
            method: n.method.clone(),
            args: fold_args(&n.args),
            type_ref: n.type_ref.clone(),
        })),
        IrExpr::Convert(n) => IrExpr::Convert(Rc::new(IrConvert {
            id: n.id,
            origin: n.origin,
            operand: fold_expr(n.operand.clone()),
            target_type: n.target_type.clone(),
        })),
        other @ (IrExpr::MemberLoad(_) | IrExpr::BlackboardLoad(_) | IrExpr::Literal(_)) => other,
    }
}

fn fold_node(node: IrNode) -> IrNode {
    match node {
        IrNode::Tree(n) => IrNode::Tree(Rc::new(IrTree {
            id: n.id,
            origin: n.origin,
            name: n.name.clone(),
            root: fold_node(n.root.clone()),
        })),
        IrNode::Selector(n) => IrNode::Selector(Rc::new(IrComposite {
            id: n.id,
            origin: n.origin,
            children: n.children.iter().cloned().map(fold_node).collect(),
        })),
        IrNode::Sequence(n) => IrNode::Sequence(Rc::new(IrComposite {
            id: n.id,
            origin: n.origin,
            children: n.children.iter().cloned().map(fold_node).collect(),
        })),
        IrNode::ReactiveSelect(n) => IrNode::ReactiveSelect(Rc::new(IrComposite {
            id: n.id,
            origin: n.origin,
            children: n.children.iter().cloned().map(fold_node).collect(),
        })),
        IrNode::Parallel(n) => IrNode::Parallel(Rc::new(IrParallel {
            id: n.id,
            origin: n.origin,
            policy: n.policy,
            children: n.children.iter().cloned().map(fold_node).collect(),
        })),
        IrNode::Guard(n) => IrNode::Guard(Rc::new(IrGuard {
            id: n.id,
            origin: n.origin,
            condition: fold_expr(n.condition.clone()),
            body: n.body.clone().map(fold_node),
        })),
        IrNode::If(n) => IrNode::If(Rc::new(IrIf {
            id: n.id,
            origin: n.origin,
            condition: fold_expr(n.condition.clone()),
            then_branch: fold_node(n.then_branch.clone()),
            else_branch: n.else_branch.clone().map(fold_node),
        })),
        IrNode::Invert(n) => IrNode::Invert(Rc::new(IrInvert {
            id: n.id,
            origin: n.origin,
            child: n.child.clone().map(fold_node),
        })),
        IrNode::Repeat(n) => IrNode::Repeat(Rc::new(IrRepeat {
            id: n.id,
            origin: n.origin,
            count: n.count,
            child: n.child.clone().map(fold_node),
        })),
        IrNode::Timeout(n) => IrNode::Timeout(Rc::new(IrTimeout {
            id: n.id,
            origin: n.origin,
            seconds: n.seconds,
            child: n.child.clone().map(fold_node),
        })),
        IrNode::Cooldown(n) => IrNode::Cooldown(Rc::new(IrCooldown {
            id: n.id,
            origin: n.origin,
            seconds: n.seconds,
            child: n.child.clone().map(fold_node),
        })),
        IrNode::While(n) => IrNode::While(Rc::new(IrWhile {
            id: n.id,
            origin: n.origin,
            condition: fold_expr(n.condition.clone()),
            body: n.body.clone().map(fold_node),
        })),
        IrNode::Reactive(n) => IrNode::Reactive(Rc::new(IrReactive {
            id: n.id,
            origin: n.origin,
            condition: fold_expr(n.condition.clone()),
            body: fold_node(n.body.clone()),
        })),
        IrNode::Condition(n) => IrNode::Condition(Rc::new(IrCondition {
            id: n.id,
            origin: n.origin,
            expr: fold_expr(n.expr.clone()),
        })),
        IrNode::Action(n) => IrNode::Action(Rc::new(IrAction {
            id: n.id,
            origin: n.origin,
            method: n.method.clone(),
            args: fold_args(&n.args),
            is_async: n.is_async,
            is_subtree: n.is_subtree,
            type_ref: n.type_ref.clone(),
        })),
        other @ IrNode::TreeRef(_) => other,
    }
}

// ---- Pass 2: dead-node elimination ----

fn is_condition_literal(node: &IrNode, want: bool) -> bool {
    if let IrNode::Condition(c) = node {
        if let IrExpr::Literal(l) = &c.expr {
            return matches!(&l.value, LiteralValue::Bool(b) if *b == want);
        }
    }
    false
}

fn truncate_after(children: Vec<IrNode>, stop_value: bool) -> Vec<IrNode> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        let stop = is_condition_literal(&child, stop_value);
        out.push(child);
        if stop {
            break;
        }
    }
    out
}

fn dce_node(node: IrNode) -> IrNode {
    match node {
        IrNode::Sequence(n) => {
            let children: Vec<IrNode> = n.children.iter().cloned().map(dce_node).collect();
            IrNode::Sequence(Rc::new(IrComposite {
                id: n.id,
                origin: n.origin,
                children: truncate_after(children, false),
            }))
        }
        IrNode::Selector(n) => {
            let children: Vec<IrNode> = n.children.iter().cloned().map(dce_node).collect();
            IrNode::Selector(Rc::new(IrComposite {
                id: n.id,
                origin: n.origin,
                children: truncate_after(children, true),
            }))
        }
        IrNode::ReactiveSelect(n) => IrNode::ReactiveSelect(Rc::new(IrComposite {
            id: n.id,
            origin: n.origin,
            children: n.children.iter().cloned().map(dce_node).collect(),
        })),
        IrNode::Parallel(n) => IrNode::Parallel(Rc::new(IrParallel {
            id: n.id,
            origin: n.origin,
            policy: n.policy,
            children: n.children.iter().cloned().map(dce_node).collect(),
        })),
        IrNode::Tree(n) => IrNode::Tree(Rc::new(IrTree {
            id: n.id,
            origin: n.origin,
            name: n.name.clone(),
            root: dce_node(n.root.clone()),
        })),
        IrNode::Guard(n) => IrNode::Guard(Rc::new(IrGuard {
            id: n.id,
            origin: n.origin,
            condition: n.condition.clone(),
            body: n.body.clone().map(dce_node),
        })),
        IrNode::If(n) => IrNode::If(Rc::new(IrIf {
            id: n.id,
            origin: n.origin,
            condition: n.condition.clone(),
            then_branch: dce_node(n.then_branch.clone()),
            else_branch: n.else_branch.clone().map(dce_node),
        })),
        IrNode::Invert(n) => IrNode::Invert(Rc::new(IrInvert {
            id: n.id,
            origin: n.origin,
            child: n.child.clone().map(dce_node),
        })),
        IrNode::Repeat(n) => IrNode::Repeat(Rc::new(IrRepeat {
            id: n.id,
            origin: n.origin,
            count: n.count,
            child: n.child.clone().map(dce_node),
        })),
        IrNode::Timeout(n) => IrNode::Timeout(Rc::new(IrTimeout {
            id: n.id,
            origin: n.origin,
            seconds: n.seconds,
            child: n.child.clone().map(dce_node),
        })),
        IrNode::Cooldown(n) => IrNode::Cooldown(Rc::new(IrCooldown {
            id: n.id,
            origin: n.origin,
            seconds: n.seconds,
            child: n.child.clone().map(dce_node),
        })),
        IrNode::While(n) => IrNode::While(Rc::new(IrWhile {
            id: n.id,
            origin: n.origin,
            condition: n.condition.clone(),
            body: n.body.clone().map(dce_node),
        })),
        IrNode::Reactive(n) => IrNode::Reactive(Rc::new(IrReactive {
            id: n.id,
            origin: n.origin,
            condition: n.condition.clone(),
            body: dce_node(n.body.clone()),
        })),
        other @ (IrNode::Condition(_) | IrNode::Action(_) | IrNode::TreeRef(_)) => other,
    }
}

// ---- Pass 3: single-child collapse / double-invert cancellation ----

fn collapse_node(node: IrNode) -> IrNode {
    match node {
        IrNode::Selector(n) => {
            let children: Vec<IrNode> = n.children.iter().cloned().map(collapse_node).collect();
            if children.len() == 1 {
                children.into_iter().next().unwrap()
            } else {
                IrNode::Selector(Rc::new(IrComposite {
                    id: n.id,
                    origin: n.origin,
                    children,
                }))
            }
        }
        IrNode::Sequence(n) => {
            let children: Vec<IrNode> = n.children.iter().cloned().map(collapse_node).collect();
            if children.len() == 1 {
                children.into_iter().next().unwrap()
            } else {
                IrNode::Sequence(Rc::new(IrComposite {
                    id: n.id,
                    origin: n.origin,
                    children,
                }))
            }
        }
        IrNode::ReactiveSelect(n) => IrNode::ReactiveSelect(Rc::new(IrComposite {
            id: n.id,
            origin: n.origin,
            children: n.children.iter().cloned().map(collapse_node).collect(),
        })),
        IrNode::Parallel(n) => IrNode::Parallel(Rc::new(IrParallel {
            id: n.id,
            origin: n.origin,
            policy: n.policy,
            children: n.children.iter().cloned().map(collapse_node).collect(),
        })),
        IrNode::Tree(n) => IrNode::Tree(Rc::new(IrTree {
            id: n.id,
            origin: n.origin,
            name: n.name.clone(),
            root: collapse_node(n.root.clone()),
        })),
        IrNode::Invert(n) => {
            let child = n.child.clone().map(collapse_node);
            if let Some(IrNode::Invert(inner)) = &child {
                if let Some(grandchild) = &inner.child {
                    return grandchild.clone();
                }
            }
            IrNode::Invert(Rc::new(IrInvert {
                id: n.id,
                origin: n.origin,
                child,
            }))
        }
        IrNode::Guard(n) => IrNode::Guard(Rc::new(IrGuard {
            id: n.id,
            origin: n.origin,
            condition: n.condition.clone(),
            body: n.body.clone().map(collapse_node),
        })),
        IrNode::If(n) => IrNode::If(Rc::new(IrIf {
            id: n.id,
            origin: n.origin,
            condition: n.condition.clone(),
            then_branch: collapse_node(n.then_branch.clone()),
            else_branch: n.else_branch.clone().map(collapse_node),
        })),
        IrNode::Repeat(n) => IrNode::Repeat(Rc::new(IrRepeat {
            id: n.id,
            origin: n.origin,
            count: n.count,
            child: n.child.clone().map(collapse_node),
        })),
        IrNode::Timeout(n) => IrNode::Timeout(Rc::new(IrTimeout {
            id: n.id,
            origin: n.origin,
            seconds: n.seconds,
            child: n.child.clone().map(collapse_node),
        })),
        IrNode::Cooldown(n) => IrNode::Cooldown(Rc::new(IrCooldown {
            id: n.id,
            origin: n.origin,
            seconds: n.seconds,
            child: n.child.clone().map(collapse_node),
        })),
        IrNode::While(n) => IrNode::While(Rc::new(IrWhile {
            id: n.id,
            origin: n.origin,
            condition: n.condition.clone(),
            body: n.body.clone().map(collapse_node),
        })),
        IrNode::Reactive(n) => IrNode::Reactive(Rc::new(IrReactive {
            id: n.id,
            origin: n.origin,
            condition: n.condition.clone(),
            body: collapse_node(n.body.clone()),
        })),
        other @ (IrNode::Condition(_) | IrNode::Action(_) | IrNode::TreeRef(_)) => other,
    }
}

// ---- Pass 4: convert fusion ----

fn fuse_expr(expr: IrExpr, ids: &mut IdAllocator) -> IrExpr {
    match expr {
        IrExpr::Convert(n) => {
            let operand = fuse_expr(n.operand.clone(), ids);
            if let IrExpr::Convert(inner) = &operand {
                if inner.target_type == n.target_type {
                    return IrExpr::Convert(Rc::new(IrConvert {
                        id: n.id,
                        origin: n.origin,
                        operand: inner.operand.clone(),
                        target_type: n.target_type.clone(),
                    }));
                }
            }
            if let (IrExpr::Literal(l), canopy_sema::TypeRef::Float) = (&operand, &n.target_type) {
                if let LiteralValue::Int(value) = &l.value {
                    return IrExpr::Literal(Rc::new(IrLiteral {
                        id: ids.next_id(),
                        origin: n.origin,
                        value: LiteralValue::Float(*value as f64),
                        type_ref: canopy_sema::TypeRef::Float,
                    }));
                }
            }
            IrExpr::Convert(Rc::new(IrConvert {
                id: n.id,
                origin: n.origin,
                operand,
                target_type: n.target_type.clone(),
            }))
        }
        IrExpr::BinaryOp(n) => IrExpr::BinaryOp(Rc::new(IrBinaryOp {
            id: n.id,
            origin: n.origin,
            op: n.op,
            lhs: fuse_expr(n.lhs.clone(), ids),
            rhs: fuse_expr(n.rhs.clone(), ids),
            type_ref: n.type_ref.clone(),
        })),
        IrExpr::UnaryOp(n) => IrExpr::UnaryOp(Rc::new(IrUnaryExpr {
            id: n.id,
            origin: n.origin,
            op: n.op,
            operand: fuse_expr(n.operand.clone(), ids),
            type_ref: n.type_ref.clone(),
        })),
        IrExpr::LogicOp(n) => IrExpr::LogicOp(Rc::new(IrLogicOp {
            id: n.id,
            origin: n.origin,
            op: n.op,
            operands: n.operands.iter().cloned().map(|o| fuse_expr(o, ids)).collect(),
            type_ref: n.type_ref.clone(),
        })),
        IrExpr::Call(n) => IrExpr::Call(Rc::new(IrCall {
            id: n.id,
            origin: n.origin,
            method: n.method.clone(),
            args: n
                .args
                .iter()
                .map(|a| IrArg {
                    name: a.name.clone(),
                    value: fuse_expr(a.value.clone(), ids),
                })
                .collect(),
            type_ref: n.type_ref.clone(),
        })),
        other @ (IrExpr::MemberLoad(_) | IrExpr::BlackboardLoad(_) | IrExpr::Literal(_)) => other,
    }
}

fn fuse_node(node: IrNode, ids: &mut IdAllocator) -> IrNode {
    match node {
        IrNode::Tree(n) => IrNode::Tree(Rc::new(IrTree {
            id: n.id,
            origin: n.origin,
            name: n.name.clone(),
            root: fuse_node(n.root.clone(), ids),
        })),
        IrNode::Selector(n) => IrNode::Selector(Rc::new(IrComposite {
            id: n.id,
            origin: n.origin,
            children: n.children.iter().cloned().map(|c| fuse_node(c, ids)).collect(),
        })),
        IrNode::Sequence(n) => IrNode::Sequence(Rc::new(IrComposite {
            id: n.id,
            origin: n.origin,
            children: n.children.iter().cloned().map(|c| fuse_node(c, ids)).collect(),
        })),
        IrNode::ReactiveSelect(n) => IrNode::ReactiveSelect(Rc::new(IrComposite {
            id: n.id,
            origin: n.origin,
            children: n.children.iter().cloned().map(|c| fuse_node(c, ids)).collect(),
        })),
        IrNode::Parallel(n) => IrNode::Parallel(Rc::new(IrParallel {
            id: n.id,
            origin: n.origin,
            policy: n.policy,
            children: n.children.iter().cloned().map(|c| fuse_node(c, ids)).collect(),
        })),
        IrNode::Guard(n) => IrNode::Guard(Rc::new(IrGuard {
            id: n.id,
            origin: n.origin,
            condition: fuse_expr(n.condition.clone(), ids),
            body: n.body.clone().map(|c| fuse_node(c, ids)),
        })),
        IrNode::If(n) => IrNode::If(Rc::new(IrIf {
            id: n.id,
            origin: n.origin,
            condition: fuse_expr(n.condition.clone(), ids),
            then_branch: fuse_node(n.then_branch.clone(), ids),
            else_branch: n.else_branch.clone().map(|c| fuse_node(c, ids)),
        })),
        IrNode::Invert(n) => IrNode::Invert(Rc::new(IrInvert {
            id: n.id,
            origin: n.origin,
            child: n.child.clone().map(|c| fuse_node(c, ids)),
        })),
        IrNode::Repeat(n) => IrNode::Repeat(Rc::new(IrRepeat {
            id: n.id,
            origin: n.origin,
            count: n.count,
            child: n.child.clone().map(|c| fuse_node(c, ids)),
        })),
        IrNode::Timeout(n) => IrNode::Timeout(Rc::new(IrTimeout {
            id: n.id,
            origin: n.origin,
            seconds: n.seconds,
            child: n.child.clone().map(|c| fuse_node(c, ids)),
        })),
        IrNode::Cooldown(n) => IrNode::Cooldown(Rc::new(IrCooldown {
            id: n.id,
            origin: n.origin,
            seconds: n.seconds,
            child: n.child.clone().map(|c| fuse_node(c, ids)),
        })),
        IrNode::While(n) => IrNode::While(Rc::new(IrWhile {
            id: n.id,
            origin: n.origin,
            condition: fuse_expr(n.condition.clone(), ids),
            body: n.body.clone().map(|c| fuse_node(c, ids)),
        })),
        IrNode::Reactive(n) => IrNode::Reactive(Rc::new(IrReactive {
            id: n.id,
            origin: n.origin,
            condition: fuse_expr(n.condition.clone(), ids),
            body: fuse_node(n.body.clone(), ids),
        })),
        IrNode::Condition(n) => IrNode::Condition(Rc::new(IrCondition {
            id: n.id,
            origin: n.origin,
            expr: fuse_expr(n.expr.clone(), ids),
        })),
        IrNode::Action(n) => IrNode::Action(Rc::new(IrAction {
            id: n.id,
            origin: n.origin,
            method: n.method.clone(),
            args: n
                .args
                .iter()
                .map(|a| IrArg {
                    name: a.name.clone(),
                    value: fuse_expr(a.value.clone(), ids),
                })
                .collect(),
            is_async: n.is_async,
            is_subtree: n.is_subtree,
            type_ref: n.type_ref.clone(),
        })),
        other @ IrNode::TreeRef(_) => other,
    }
}
