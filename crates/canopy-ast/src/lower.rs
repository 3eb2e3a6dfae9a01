//! CST->AST lowering (C3).
//!
//! Walks the lossless CST and produces the AST described in [`crate::ast`].
//! `Missing` and `Error` CST nodes contribute no AST output: a slot that
//! would have held their lowering becomes `None`, or is dropped from a
//! `Vec`, rather than a sentinel error node.
//!
//! The one real ambiguity is the generic `(callee arg*)` shape: the parser
//! records it uniformly as `SyntaxKind::Call` regardless of position.
//! Lowering re-derives that context from which function reaches the node:
//! [`Lowerer::lower_node`] only ever gets called where the parser required a
//! node, [`Lowerer::lower_expr`] only where it required an expression, so
//! each resolves a `Call` its own way:
//!
//! - `lower_expr` always produces a [`CallExpr`].
//! - `lower_node` produces a [`DefdecCallNode`] if the callee names a
//!   `defdec` declared anywhere in the same program, otherwise an
//!   [`ActionCall`].
//! - A bare member-access token reached through `lower_node` becomes an
//!   `ActionCall` with no arguments.

use std::rc::Rc;

use canopy_diagnostics::{Diagnostic, DiagnosticBag, DiagnosticCode, Span};
use canopy_syntax::cst::{CstElement, CstTree, SyntaxKind};
use canopy_syntax::token::TokenKind;
use rustc_hash::FxHashSet;

use crate::ast::*;
use crate::ids::IdAllocator;

pub struct LowerResult {
    pub program: Program,
    pub arena: AstArena,
    pub ids: IdAllocator,
}

#[must_use]
pub fn lower(cst: &CstTree) -> (LowerResult, DiagnosticBag) {
    let mut ids = IdAllocator::starting_after(cst.node_count().saturating_sub(1));
    let mut lowerer = Lowerer::new(cst, &mut ids);
    let program = lowerer.lower_program();
    let diagnostics = lowerer.diagnostics;
    let mut arena = AstArena::new();
    for tree in &program.trees {
        arena.index(&tree.root);
    }
    for defdec in &program.defdecs {
        arena.index(&defdec.body);
    }
    (
        LowerResult {
            program,
            arena,
            ids,
        },
        diagnostics,
    )
}

/// Lowers a single CST subtree (a `defmacro` template) in node position,
/// using the same call-disambiguation rules as a full-program lowering and
/// drawing ids from the caller's shared allocator. Used by the macro
/// expansion rewriter, which needs a fresh instantiation of a template at
/// every call site.
#[must_use]
pub fn lower_template(cst: &CstTree, template_cst: u32, ids: &mut IdAllocator) -> (Node, DiagnosticBag) {
    let mut lowerer = Lowerer::new(cst, ids);
    let node = lowerer.lower_node(template_cst);
    (node, lowerer.diagnostics)
}

struct Lowerer<'a, 'b> {
    cst: &'a CstTree,
    ids: &'b mut IdAllocator,
    defdec_names: FxHashSet<String>,
    diagnostics: DiagnosticBag,
}

impl<'a, 'b> Lowerer<'a, 'b> {
    fn new(cst: &'a CstTree, ids: &'b mut IdAllocator) -> Self {
        let defdec_names = cst
            .children(cst.root())
            .iter()
            .filter_map(|c| match c {
                CstElement::Node(id) if cst.node(*id).kind == SyntaxKind::Defdec => {
                    Some(defdec_name(cst, *id))
                }
                _ => None,
            })
            .collect();
        Self {
            cst,
            ids,
            defdec_names,
            diagnostics: DiagnosticBag::new(),
        }
    }

    fn lower_program(&mut self) -> Program {
        let mut program = Program::default();
        let root = self.cst.root();
        for child in self.cst.children(root).to_vec() {
            let CstElement::Node(id) = child else { continue };
            match self.cst.node(id).kind {
                SyntaxKind::TreeDef => program.trees.push(Rc::new(self.lower_tree_def(id))),
                SyntaxKind::Defdec => program.defdecs.push(Rc::new(self.lower_defdec(id))),
                SyntaxKind::Defmacro => program.defmacros.push(Rc::new(self.lower_defmacro(id))),
                SyntaxKind::Import => program.imports.push(self.lower_import(id)),
                SyntaxKind::Error | SyntaxKind::Missing => {}
                _ => {}
            }
        }
        if program.trees.is_empty() {
            self.diagnostics.push(Diagnostic::new(
                DiagnosticCode::BS0302,
                self.cst.span(root),
                vec![],
            ));
        }
        let mut seen = FxHashSet::default();
        for tree in &program.trees {
            if !seen.insert(tree.name.clone()) {
                self.diagnostics.push(Diagnostic::new(
                    DiagnosticCode::BS0301,
                    tree.span,
                    vec![tree.name.clone()],
                ));
            }
        }
        program
    }

    fn lower_tree_def(&mut self, id: u32) -> TreeDef {
        let name = self.ident_child_text(id, 0).unwrap_or_default();
        let blackboard_type = self.keyword_arg_ident(id, ":blackboard");
        let root = self
            .node_children(id)
            .into_iter()
            .find_map(|c| self.lower_node_opt(c))
            .unwrap_or_else(|| self.empty_selector(id));
        TreeDef {
            id,
            span: self.cst.span(id),
            cst_origin: Some(id),
            name,
            blackboard_type,
            root,
        }
    }

    /// A tree body with no usable child (fully erroneous source) still
    /// needs a root node to hang diagnostics and later passes off of.
    fn empty_selector(&mut self, cst_origin: u32) -> Node {
        Node::Selector(Rc::new(Composite {
            id: self.ids.next_id(),
            span: self.cst.span(cst_origin),
            cst_origin: None,
            children: Vec::new(),
        }))
    }

    fn lower_defdec(&mut self, id: u32) -> DefdecDef {
        let name = self.ident_child_text(id, 0).unwrap_or_default();
        let params = self.param_list(id);
        let body = self
            .node_children(id)
            .into_iter()
            .find_map(|c| self.lower_node_opt(c))
            .unwrap_or_else(|| self.empty_selector(id));
        let placeholders = count_body_placeholders(&body);
        if placeholders == 0 {
            self.diagnostics.push(Diagnostic::new(
                DiagnosticCode::BS0026,
                self.cst.span(id),
                vec![name.clone()],
            ));
        } else if placeholders > 1 {
            self.diagnostics.push(Diagnostic::new(
                DiagnosticCode::BS0027,
                self.cst.span(id),
                vec![name.clone()],
            ));
        }
        DefdecDef {
            id,
            span: self.cst.span(id),
            cst_origin: Some(id),
            name,
            params,
            body,
        }
    }

    fn lower_defmacro(&mut self, id: u32) -> DefmacroDef {
        let name = self.ident_child_text(id, 0).unwrap_or_default();
        let params = self.param_list(id);
        let template_cst = self
            .node_children(id)
            .into_iter()
            .next()
            .unwrap_or(id);
        DefmacroDef {
            id,
            span: self.cst.span(id),
            name,
            params,
            template_cst,
        }
    }

    fn lower_import(&mut self, id: u32) -> ImportDecl {
        let path = self
            .descendant_token_of(id, TokenKind::String)
            .map(|t| unquote(&self.cst.token(t).text))
            .unwrap_or_default();
        ImportDecl {
            id,
            span: self.cst.span(id),
            cst_origin: Some(id),
            path,
        }
    }

    // --- nodes ---------------------------------------------------------

    fn lower_node_opt(&mut self, id: u32) -> Option<Node> {
        let kind = self.cst.node(id).kind;
        if matches!(kind, SyntaxKind::Error | SyntaxKind::Missing) {
            return None;
        }
        Some(self.lower_node(id))
    }

    #[allow(clippy::too_many_lines)]
    fn lower_node(&mut self, id: u32) -> Node {
        let span = self.cst.span(id);
        match self.cst.node(id).kind {
            SyntaxKind::Selector => Node::Selector(Rc::new(self.lower_composite(id))),
            SyntaxKind::Sequence => Node::Sequence(Rc::new(self.lower_composite(id))),
            SyntaxKind::ReactiveSelect => Node::ReactiveSelect(Rc::new(self.lower_composite(id))),
            SyntaxKind::Parallel => Node::Parallel(Rc::new(self.lower_parallel(id))),
            SyntaxKind::Guard => {
                let condition = self.lower_condition(id);
                let child = self.first_child_node(id);
                Node::Guard(Rc::new(Guard {
                    id,
                    span,
                    cst_origin: Some(id),
                    condition,
                    child,
                }))
            }
            SyntaxKind::If => {
                let condition = self.lower_condition(id);
                let mut branches = self.node_children(id).into_iter();
                let then_branch = branches
                    .next()
                    .and_then(|c| self.lower_node_opt(c))
                    .unwrap_or_else(|| self.empty_selector(id));
                let else_branch = branches.next().and_then(|c| self.lower_node_opt(c));
                Node::If(Rc::new(If {
                    id,
                    span,
                    cst_origin: Some(id),
                    condition,
                    then_branch,
                    else_branch,
                }))
            }
            SyntaxKind::Invert => Node::Invert(Rc::new(Invert {
                id,
                span,
                cst_origin: Some(id),
                child: self.first_child_node(id),
            })),
            SyntaxKind::Repeat => {
                let count = self
                    .descendant_token_of(id, TokenKind::Int)
                    .and_then(|t| self.cst.token(t).text.parse::<i64>().ok());
                if count.is_none_or(|c| c <= 0) {
                    self.diagnostics.push(Diagnostic::new(
                        DiagnosticCode::BS0013,
                        span,
                        vec![],
                    ));
                }
                Node::Repeat(Rc::new(Repeat {
                    id,
                    span,
                    cst_origin: Some(id),
                    count: count.unwrap_or(0),
                    child: self.first_child_node(id),
                }))
            }
            SyntaxKind::Timeout => {
                let seconds = self.duration_literal(id, "timeout");
                Node::Timeout(Rc::new(Timeout {
                    id,
                    span,
                    cst_origin: Some(id),
                    seconds,
                    child: self.first_child_node(id),
                }))
            }
            SyntaxKind::Cooldown => {
                let seconds = self.duration_literal(id, "cooldown");
                Node::Cooldown(Rc::new(Cooldown {
                    id,
                    span,
                    cst_origin: Some(id),
                    seconds,
                    child: self.first_child_node(id),
                }))
            }
            SyntaxKind::While => {
                let condition = self.lower_condition(id);
                Node::While(Rc::new(While {
                    id,
                    span,
                    cst_origin: Some(id),
                    condition,
                    child: self.first_child_node(id),
                }))
            }
            SyntaxKind::Reactive => {
                let condition = self.lower_condition(id);
                let children = self.lower_node_children(id);
                Node::Reactive(Rc::new(Reactive {
                    id,
                    span,
                    cst_origin: Some(id),
                    condition,
                    children,
                }))
            }
            SyntaxKind::Check => Node::Check(Rc::new(Check {
                id,
                span,
                cst_origin: Some(id),
                condition: self.lower_condition(id),
            })),
            SyntaxKind::Ref => Node::Ref(Rc::new(RefNode {
                id,
                span,
                cst_origin: Some(id),
                name: self.ident_child_text(id, 0).unwrap_or_default(),
            })),
            SyntaxKind::Call => self.lower_call_node(id),
            SyntaxKind::BodyPlaceholder => Node::BodyPlaceholder(Rc::new(BodyPlaceholderNode {
                id,
                span,
                cst_origin: Some(id),
            })),
            SyntaxKind::MemberAccess => {
                let text = self.leaf_text(id);
                Node::ActionCall(Rc::new(ActionCall {
                    id,
                    span,
                    cst_origin: Some(id),
                    callee: member_path(&text),
                    args: Vec::new(),
                }))
            }
            _ => self.empty_selector(id),
        }
    }

    fn lower_composite(&mut self, id: u32) -> Composite {
        let span = self.cst.span(id);
        let children = self.lower_node_children(id);
        if children.len() < 2 {
            self.diagnostics.push(Diagnostic::new(
                DiagnosticCode::BS0015,
                span,
                vec![self.cst.text(id)],
            ));
        }
        Composite {
            id,
            span,
            cst_origin: Some(id),
            children,
        }
    }

    fn lower_parallel(&mut self, id: u32) -> Parallel {
        let span = self.cst.span(id);
        let policy = self.parallel_policy(id);
        let children = self.lower_node_children(id);
        if children.len() < 2 {
            self.diagnostics.push(Diagnostic::new(
                DiagnosticCode::BS0015,
                span,
                vec!["parallel".into()],
            ));
        }
        Parallel {
            id,
            span,
            cst_origin: Some(id),
            policy,
            children,
        }
    }

    fn parallel_policy(&self, id: u32) -> ParallelPolicy {
        let policy_node = self
            .cst
            .children(id)
            .iter()
            .find_map(|c| match c {
                CstElement::Node(n) if self.cst.node(*n).kind == SyntaxKind::ParallelPolicy => {
                    Some(*n)
                }
                _ => None,
            });
        let Some(policy_node) = policy_node else {
            return ParallelPolicy::Any;
        };
        if let Some(t) = self.descendant_token_of(policy_node, TokenKind::Int) {
            return ParallelPolicy::N(self.cst.token(t).text.parse().unwrap_or(1));
        }
        for t in self.cst.descendant_tokens(policy_node) {
            let token = self.cst.token(t);
            if token.kind == TokenKind::KeywordArg {
                return match token.text.as_str() {
                    ":all" => ParallelPolicy::All,
                    _ => ParallelPolicy::Any,
                };
            }
        }
        ParallelPolicy::Any
    }

    fn lower_call_node(&mut self, id: u32) -> Node {
        let span = self.cst.span(id);
        let callee = self.call_callee(id);
        let name = callee.segments.join(".");
        if self.defdec_names.contains(&name) {
            let (args, body) = self.defdec_call_args_and_body(id);
            Node::DefdecCall(Rc::new(DefdecCallNode {
                id,
                span,
                cst_origin: Some(id),
                name,
                args,
                body,
            }))
        } else {
            let args = self.call_args(id);
            Node::ActionCall(Rc::new(ActionCall {
                id,
                span,
                cst_origin: Some(id),
                callee,
                args,
            }))
        }
    }

    /// Splits a defdec-call's arguments into the expression arguments that
    /// substitute for its declared parameters and the one trailing node-kind
    /// child (if any) that substitutes for its `<body>` placeholder.
    fn defdec_call_args_and_body(&mut self, id: u32) -> (Vec<Expr>, Node) {
        let mut args = Vec::new();
        let mut body = None;
        for child in self.cst.children(id).to_vec() {
            let CstElement::Node(n) = child else { continue };
            let kind = self.cst.node(n).kind;
            if kind == SyntaxKind::KeywordArgument {
                if let Some(value_id) = self.node_children(n).into_iter().next() {
                    args.push(self.lower_expr(value_id));
                }
            } else if is_node_kind(kind) {
                body = Some(self.lower_node(n));
            } else {
                args.push(self.lower_expr(n));
            }
        }
        (args, body.unwrap_or_else(|| self.empty_selector(id)))
    }

    fn call_callee(&self, id: u32) -> MemberPath {
        let head = self
            .cst
            .children(id)
            .iter()
            .find_map(|c| match c {
                CstElement::Token(t) => {
                    let tok = self.cst.token(*t);
                    matches!(tok.kind, TokenKind::MemberAccess | TokenKind::Ident)
                        .then(|| tok.text.clone())
                }
                CstElement::Node(_) => None,
            });
        match head {
            Some(text) if text.starts_with('.') => member_path(&text),
            Some(text) => MemberPath {
                segments: vec![text],
            },
            None => MemberPath {
                segments: Vec::new(),
            },
        }
    }

    fn call_args(&mut self, id: u32) -> Vec<Argument> {
        self.cst
            .children(id)
            .to_vec()
            .into_iter()
            .filter_map(|c| match c {
                CstElement::Node(n) if self.cst.node(n).kind == SyntaxKind::KeywordArgument => {
                    let name = self.descendant_token_of(n, TokenKind::KeywordArg).map(|t| {
                        let text = self.cst.token(t).text.clone();
                        text.trim_start_matches(':').to_string()
                    });
                    let value_id = self.node_children(n).into_iter().next()?;
                    Some(Argument {
                        name,
                        value: self.lower_expr(value_id),
                    })
                }
                CstElement::Node(n) => Some(Argument {
                    name: None,
                    value: self.lower_expr(n),
                }),
                CstElement::Token(_) => None,
            })
            .collect()
    }

    // --- expressions -----------------------------------------------------

    fn lower_condition(&mut self, id: u32) -> Expr {
        match self.node_children(id).into_iter().next() {
            Some(child) => self.lower_expr(child),
            None => self.missing_bool_literal(id),
        }
    }

    fn missing_bool_literal(&mut self, cst_origin: u32) -> Expr {
        Expr::Literal(Rc::new(Literal {
            id: self.ids.next_id(),
            span: self.cst.span(cst_origin),
            cst_origin: None,
            value: LiteralValue::Bool(false),
        }))
    }

    #[allow(clippy::too_many_lines)]
    fn lower_expr(&mut self, id: u32) -> Expr {
        let span = self.cst.span(id);
        match self.cst.node(id).kind {
            SyntaxKind::LiteralInt => Expr::Literal(Rc::new(Literal {
                id,
                span,
                cst_origin: Some(id),
                value: self
                    .leaf_text(id)
                    .parse::<i64>()
                    .map(LiteralValue::Int)
                    .unwrap_or_else(|_| {
                        self.invalid_literal(id);
                        LiteralValue::Int(0)
                    }),
            })),
            SyntaxKind::LiteralFloat => Expr::Literal(Rc::new(Literal {
                id,
                span,
                cst_origin: Some(id),
                value: self
                    .leaf_text(id)
                    .parse::<f64>()
                    .map(LiteralValue::Float)
                    .unwrap_or_else(|_| {
                        self.invalid_literal(id);
                        LiteralValue::Float(0.0)
                    }),
            })),
            SyntaxKind::LiteralBool => Expr::Literal(Rc::new(Literal {
                id,
                span,
                cst_origin: Some(id),
                value: LiteralValue::Bool(self.leaf_text(id) == "true"),
            })),
            SyntaxKind::LiteralString => Expr::Literal(Rc::new(Literal {
                id,
                span,
                cst_origin: Some(id),
                value: LiteralValue::Str(unquote(&self.leaf_text(id))),
            })),
            SyntaxKind::LiteralNull => Expr::Literal(Rc::new(Literal {
                id,
                span,
                cst_origin: Some(id),
                value: LiteralValue::Null,
            })),
            SyntaxKind::LiteralEnum => {
                let text = self.leaf_text(id);
                let (ty, member) = split_enum_literal(&text);
                Expr::Literal(Rc::new(Literal {
                    id,
                    span,
                    cst_origin: Some(id),
                    value: LiteralValue::Enum(ty, member),
                }))
            }
            SyntaxKind::MemberAccess => Expr::MemberLoad(Rc::new(MemberLoad {
                id,
                span,
                cst_origin: Some(id),
                path: member_path(&self.leaf_text(id)),
            })),
            SyntaxKind::BlackboardAccess => Expr::BlackboardLoad(Rc::new(MemberLoad {
                id,
                span,
                cst_origin: Some(id),
                path: blackboard_path(&self.leaf_text(id)),
            })),
            SyntaxKind::Binary => {
                let op = self.binary_op(id);
                let mut children = self.cst.children(id).to_vec().into_iter().filter_map(|c| {
                    if let CstElement::Node(n) = c {
                        Some(n)
                    } else {
                        None
                    }
                });
                let lhs = children
                    .next()
                    .map(|n| self.lower_expr(n))
                    .unwrap_or_else(|| self.missing_bool_literal(id));
                let rhs = children
                    .next()
                    .map(|n| self.lower_expr(n))
                    .unwrap_or_else(|| self.missing_bool_literal(id));
                Expr::Binary(Rc::new(Binary {
                    id,
                    span,
                    cst_origin: Some(id),
                    op,
                    lhs,
                    rhs,
                }))
            }
            SyntaxKind::Unary => {
                let operand = self
                    .node_children(id)
                    .into_iter()
                    .next()
                    .map(|n| self.lower_expr(n))
                    .unwrap_or_else(|| self.missing_bool_literal(id));
                Expr::Unary(Rc::new(Unary {
                    id,
                    span,
                    cst_origin: Some(id),
                    op: UnaryOp::Not,
                    operand,
                }))
            }
            SyntaxKind::Logic => {
                let op = if self.head_keyword(id) == "or" {
                    LogicOp::Or
                } else {
                    LogicOp::And
                };
                let operands = self
                    .node_children(id)
                    .into_iter()
                    .map(|n| self.lower_expr(n))
                    .collect();
                Expr::Logic(Rc::new(Logic {
                    id,
                    span,
                    cst_origin: Some(id),
                    op,
                    operands,
                }))
            }
            SyntaxKind::Call => {
                let callee = self.call_callee(id);
                let args = self.call_args(id);
                Expr::CallExpr(Rc::new(CallExpr {
                    id,
                    span,
                    cst_origin: Some(id),
                    callee,
                    args,
                }))
            }
            _ => self.missing_bool_literal(id),
        }
    }

    fn invalid_literal(&mut self, id: u32) {
        self.diagnostics.push(Diagnostic::new(
            DiagnosticCode::BS0020,
            self.cst.span(id),
            vec![self.cst.text(id)],
        ));
    }

    fn binary_op(&self, id: u32) -> BinaryOp {
        let op_token = self.cst.descendant_tokens(id).into_iter().find_map(|t| {
            let tok = self.cst.token(t);
            matches!(
                tok.kind,
                TokenKind::Plus
                    | TokenKind::Minus
                    | TokenKind::Star
                    | TokenKind::Slash
                    | TokenKind::Percent
                    | TokenKind::Lt
                    | TokenKind::Gt
                    | TokenKind::Le
                    | TokenKind::Ge
                    | TokenKind::Eq
                    | TokenKind::Ne
            )
            .then_some(tok.kind)
        });
        match op_token {
            Some(TokenKind::Plus) => BinaryOp::Add,
            Some(TokenKind::Minus) => BinaryOp::Sub,
            Some(TokenKind::Star) => BinaryOp::Mul,
            Some(TokenKind::Slash) => BinaryOp::Div,
            Some(TokenKind::Percent) => BinaryOp::Mod,
            Some(TokenKind::Lt) => BinaryOp::Lt,
            Some(TokenKind::Gt) => BinaryOp::Gt,
            Some(TokenKind::Le) => BinaryOp::Le,
            Some(TokenKind::Ge) => BinaryOp::Ge,
            Some(TokenKind::Ne) => BinaryOp::Ne,
            _ => BinaryOp::Eq,
        }
    }

    fn duration_literal(&mut self, id: u32, what: &str) -> f64 {
        let value = self.cst.descendant_tokens(id).into_iter().find_map(|t| {
            let tok = self.cst.token(t);
            match tok.kind {
                TokenKind::Int => tok.text.parse::<i64>().ok().map(|v| v as f64),
                TokenKind::Float => tok.text.parse::<f64>().ok(),
                _ => None,
            }
        });
        if value.is_none_or(|v| v <= 0.0) {
            self.diagnostics.push(Diagnostic::new(
                DiagnosticCode::BS0014,
                self.cst.span(id),
                vec![what.to_string()],
            ));
        }
        value.unwrap_or(0.0)
    }

    // --- small helpers ---------------------------------------------------

    fn node_children(&self, id: u32) -> Vec<u32> {
        self.cst
            .children(id)
            .iter()
            .filter_map(|c| match c {
                CstElement::Node(n)
                    if !matches!(
                        self.cst.node(*n).kind,
                        SyntaxKind::ParallelPolicy | SyntaxKind::KeywordArgument
                    ) =>
                {
                    Some(*n)
                }
                _ => None,
            })
            .collect()
    }

    fn first_child_node(&mut self, id: u32) -> Option<Node> {
        self.node_children(id)
            .into_iter()
            .find_map(|c| self.lower_node_opt(c))
    }

    fn lower_node_children(&mut self, id: u32) -> Vec<Node> {
        self.node_children(id)
            .into_iter()
            .filter_map(|c| self.lower_node_opt(c))
            .collect()
    }

    fn leaf_text(&self, id: u32) -> String {
        self.cst.text(id)
    }

    fn head_keyword(&self, id: u32) -> String {
        self.cst
            .descendant_tokens(id)
            .into_iter()
            .filter_map(|t| {
                let tok = self.cst.token(t);
                (tok.kind == TokenKind::Ident).then(|| tok.text.clone())
            })
            .next()
            .unwrap_or_default()
    }

    fn ident_child_text(&self, id: u32, skip: usize) -> Option<String> {
        self.cst
            .descendant_tokens(id)
            .into_iter()
            .filter(|t| self.cst.token(*t).kind == TokenKind::Ident)
            .nth(skip + 1)
            .map(|t| self.cst.token(t).text.clone())
    }

    fn keyword_arg_ident(&self, id: u32, keyword: &str) -> Option<String> {
        let tokens = self.cst.descendant_tokens(id);
        let pos = tokens.iter().position(|t| {
            let tok = self.cst.token(*t);
            tok.kind == TokenKind::KeywordArg && tok.text == keyword
        })?;
        tokens
            .get(pos + 1)
            .filter(|t| self.cst.token(**t).kind == TokenKind::Ident)
            .map(|t| self.cst.token(*t).text.clone())
    }

    fn descendant_token_of(&self, id: u32, kind: TokenKind) -> Option<u32> {
        self.cst
            .descendant_tokens(id)
            .into_iter()
            .find(|t| self.cst.token(*t).kind == kind)
    }

    fn param_list(&self, id: u32) -> Vec<String> {
        self.cst
            .descendant_tokens(id)
            .into_iter()
            .filter(|t| self.cst.token(*t).kind == TokenKind::Ident)
            .skip(1) // the defdec/defmacro's own name
            .map(|t| self.cst.token(t).text.clone())
            .collect()
    }
}

/// CST kinds that lower to a [`Node`] rather than an [`Expr`]; used to spot
/// the trailing subtree argument of a defdec call that substitutes for its
/// `<body>` placeholder.
fn is_node_kind(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::Selector
            | SyntaxKind::Sequence
            | SyntaxKind::ReactiveSelect
            | SyntaxKind::Parallel
            | SyntaxKind::Guard
            | SyntaxKind::If
            | SyntaxKind::Invert
            | SyntaxKind::Repeat
            | SyntaxKind::Timeout
            | SyntaxKind::Cooldown
            | SyntaxKind::While
            | SyntaxKind::Reactive
            | SyntaxKind::Check
            | SyntaxKind::Ref
    )
}

fn defdec_name(cst: &CstTree, id: u32) -> String {
    cst.descendant_tokens(id)
        .into_iter()
        .filter(|t| cst.token(*t).kind == TokenKind::Ident)
        .nth(1)
        .map(|t| cst.token(t).text.clone())
        .unwrap_or_default()
}

fn member_path(text: &str) -> MemberPath {
    MemberPath {
        segments: text.trim_start_matches('.').split('.').map(str::to_string).collect(),
    }
}

fn blackboard_path(text: &str) -> MemberPath {
    MemberPath {
        segments: text.trim_start_matches('$').split('.').map(str::to_string).collect(),
    }
}

fn split_enum_literal(text: &str) -> (String, String) {
    let rest = text.trim_start_matches(':').trim_start_matches(':');
    match rest.split_once('.') {
        Some((ty, member)) => (ty.to_string(), member.to_string()),
        None => (rest.to_string(), String::new()),
    }
}

fn unquote(text: &str) -> String {
    let inner = text.strip_prefix('"').unwrap_or(text);
    let inner = inner.strip_suffix('"').unwrap_or(inner);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn count_body_placeholders(node: &Node) -> usize {
    fn walk(node: &Node, count: &mut usize) {
        if matches!(node, Node::BodyPlaceholder(_)) {
            *count += 1;
        }
        for child in node.children() {
            walk(&child, count);
        }
    }
    let mut count = 0;
    walk(node, &mut count);
    count
}
