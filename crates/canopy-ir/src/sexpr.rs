//! IR S-expression writer/reader (C11), format exactly as spec.md §6
//! specifies, bit-exact.
//!
//! The deserializer is a small recursive-descent parser over a dedicated
//! tokenizer rather than a reuse of `canopy_syntax::lexer`: the surface
//! DSL's token set is shaped around `.Member`/`$Member`/`name:` syntax that
//! has no counterpart here, while the IR grammar's leading-colon keywords
//! (`:add`, `:type`, `:any`...) have no counterpart there. Both tokenizers
//! follow the same char-scan-plus-`Span` shape, just over disjoint
//! alphabets.

use std::rc::Rc;

use canopy_ast::ast::{BinaryOp, LiteralValue, LogicOp, ParallelPolicy};
use canopy_diagnostics::Span;
use canopy_sema::TypeRef;

use crate::ir::*;

// ---- writer ----

fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn fmt_float(f: f64) -> String {
    let s = format!("{f}");
    if s.contains('.') || s.contains('e') || s.contains("inf") || s.contains("NaN") {
        s
    } else {
        format!("{s}.0")
    }
}

fn type_ref_str(t: &TypeRef) -> String {
    t.to_string()
}

fn binary_op_kw(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => ":add",
        BinaryOp::Sub => ":sub",
        BinaryOp::Mul => ":mul",
        BinaryOp::Div => ":div",
        BinaryOp::Mod => ":mod",
        BinaryOp::Lt => ":lt",
        BinaryOp::Gt => ":gt",
        BinaryOp::Le => ":le",
        BinaryOp::Ge => ":ge",
        BinaryOp::Eq => ":eq",
        BinaryOp::Ne => ":ne",
    }
}

fn logic_op_kw(op: LogicOp) -> &'static str {
    match op {
        LogicOp::And => ":and",
        LogicOp::Or => ":or",
    }
}

fn unary_op_kw(op: IrUnaryOp) -> &'static str {
    match op {
        IrUnaryOp::Not => ":not",
        IrUnaryOp::Negate => ":negate",
    }
}

fn literal_value_str(value: &LiteralValue) -> (String, &'static str) {
    match value {
        LiteralValue::Int(n) => (n.to_string(), ":int"),
        LiteralValue::Float(f) => (fmt_float(*f), ":float"),
        LiteralValue::Bool(b) => (b.to_string(), ":bool"),
        LiteralValue::Str(s) => (quote_string(s), ":string"),
        LiteralValue::Null => ("null".to_string(), ":null"),
        LiteralValue::Enum(ty, member) => (format!("::{ty}.{member}"), ":enum"),
    }
}

fn member_segments(member: &MemberRef) -> String {
    let segs: Vec<String> = member.segments.iter().map(|s| quote_string(s)).collect();
    format!("({})", segs.join(" "))
}

fn args_str(args: &[IrArg]) -> String {
    let rendered: Vec<String> = args.iter().map(|a| serialize_expr(&a.value)).collect();
    format!("({})", rendered.join(" "))
}

#[must_use]
pub fn serialize_expr(expr: &IrExpr) -> String {
    match expr {
        IrExpr::MemberLoad(n) => format!(
            "(ir-member-load {} :type {})",
            member_segments(&n.member),
            quote_string(&type_ref_str(&n.type_ref))
        ),
        IrExpr::BlackboardLoad(n) => format!(
            "(ir-blackboard-load {} :type {})",
            member_segments(&n.member),
            quote_string(&type_ref_str(&n.type_ref))
        ),
        IrExpr::Literal(n) => {
            let (text, kind) = literal_value_str(&n.value);
            format!("(ir-literal {text} {kind})")
        }
        IrExpr::BinaryOp(n) => format!(
            "(ir-binary-op {} {} {})",
            binary_op_kw(n.op),
            serialize_expr(&n.lhs),
            serialize_expr(&n.rhs)
        ),
        IrExpr::UnaryOp(n) => format!("(ir-unary-op {} {})", unary_op_kw(n.op), serialize_expr(&n.operand)),
        IrExpr::LogicOp(n) => {
            let operands: Vec<String> = n.operands.iter().map(serialize_expr).collect();
            format!("(ir-logic-op {} {})", logic_op_kw(n.op), operands.join(" "))
        }
        IrExpr::Call(n) => format!(
            "(ir-call {} {} {} :type {})",
            quote_string(&n.method.declaring_type),
            quote_string(&n.method.name),
            args_str(&n.args),
            quote_string(&type_ref_str(&n.type_ref))
        ),
        IrExpr::Convert(n) => format!(
            "(ir-convert {} :to {})",
            serialize_expr(&n.operand),
            quote_string(&type_ref_str(&n.target_type))
        ),
    }
}

#[must_use]
pub fn serialize_node(node: &IrNode) -> String {
    match node {
        IrNode::Tree(n) => format!("(ir-tree {} {})", quote_string(&n.name), serialize_node(&n.root)),
        IrNode::Selector(n) => {
            let children: Vec<String> = n.children.iter().map(serialize_node).collect();
            format!("(ir-selector {})", children.join(" "))
        }
        IrNode::Sequence(n) => {
            let children: Vec<String> = n.children.iter().map(serialize_node).collect();
            format!("(ir-sequence {})", children.join(" "))
        }
        IrNode::ReactiveSelect(n) => {
            let children: Vec<String> = n.children.iter().map(serialize_node).collect();
            format!("(ir-reactive-select {})", children.join(" "))
        }
        IrNode::Parallel(n) => {
            let policy = match n.policy {
                ParallelPolicy::Any => ":any".to_string(),
                ParallelPolicy::All => ":all".to_string(),
                ParallelPolicy::N(count) => format!("(:n {count})"),
            };
            let children: Vec<String> = n.children.iter().map(serialize_node).collect();
            format!("(ir-parallel {policy} {})", children.join(" "))
        }
        IrNode::Guard(n) => {
            let body = n.body.as_ref().map_or(String::new(), |b| format!(" {}", serialize_node(b)));
            format!("(ir-guard {}{body})", serialize_expr(&n.condition))
        }
        IrNode::If(n) => {
            let else_part = n
                .else_branch
                .as_ref()
                .map_or(String::new(), |e| format!(" {}", serialize_node(e)));
            format!(
                "(ir-if {} {}{else_part})",
                serialize_expr(&n.condition),
                serialize_node(&n.then_branch)
            )
        }
        IrNode::Invert(n) => {
            let child = n.child.as_ref().map_or(String::new(), |c| format!(" {}", serialize_node(c)));
            format!("(ir-invert{child})")
        }
        IrNode::Repeat(n) => {
            let child = n.child.as_ref().map_or(String::new(), |c| format!(" {}", serialize_node(c)));
            format!("(ir-repeat {}{child})", n.count)
        }
        IrNode::Timeout(n) => {
            let child = n.child.as_ref().map_or(String::new(), |c| format!(" {}", serialize_node(c)));
            format!("(ir-timeout {}{child})", fmt_float(n.seconds))
        }
        IrNode::Cooldown(n) => {
            let child = n.child.as_ref().map_or(String::new(), |c| format!(" {}", serialize_node(c)));
            format!("(ir-cooldown {}{child})", fmt_float(n.seconds))
        }
        IrNode::While(n) => {
            let body = n.body.as_ref().map_or(String::new(), |b| format!(" {}", serialize_node(b)));
            format!("(ir-while {}{body})", serialize_expr(&n.condition))
        }
        IrNode::Reactive(n) => format!(
            "(ir-reactive {} {})",
            serialize_expr(&n.condition),
            serialize_node(&n.body)
        ),
        IrNode::TreeRef(n) => format!("(ir-tree-ref {})", quote_string(&n.name)),
        IrNode::Condition(n) => format!("(ir-condition {})", serialize_expr(&n.expr)),
        IrNode::Action(n) => format!(
            "(ir-action {} {} {} :type {})",
            quote_string(&n.method.declaring_type),
            quote_string(&n.method.name),
            args_str(&n.args),
            quote_string(&type_ref_str(&n.type_ref))
        ),
    }
}

// ---- reader ----

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    LParen,
    RParen,
    Atom(String),
    Keyword(String),
    Str(String),
}

fn tokenize(src: &str) -> Result<Vec<Tok>, String> {
    let mut out = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                out.push(Tok::LParen);
                i += 1;
            }
            ')' => {
                out.push(Tok::RParen);
                i += 1;
            }
            '"' => {
                i += 1;
                let mut s = String::new();
                loop {
                    if i >= chars.len() {
                        return Err("unterminated string literal".to_string());
                    }
                    match chars[i] {
                        '"' => {
                            i += 1;
                            break;
                        }
                        '\\' if i + 1 < chars.len() => {
                            let escaped = chars[i + 1];
                            s.push(match escaped {
                                'n' => '\n',
                                't' => '\t',
                                other => other,
                            });
                            i += 2;
                        }
                        other => {
                            s.push(other);
                            i += 1;
                        }
                    }
                }
                out.push(Tok::Str(s));
            }
            ':' => {
                let start = i;
                i += 1;
                while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '(' && chars[i] != ')' {
                    i += 1;
                }
                out.push(Tok::Keyword(chars[start..i].iter().collect()));
            }
            _ => {
                let start = i;
                while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '(' && chars[i] != ')' {
                    i += 1;
                }
                out.push(Tok::Atom(chars[start..i].iter().collect()));
            }
        }
    }
    Ok(out)
}

struct Reader {
    toks: Vec<Tok>,
    pos: usize,
}

impl Reader {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn next(&mut self) -> Result<Tok, String> {
        let t = self.toks.get(self.pos).cloned().ok_or("unexpected end of input")?;
        self.pos += 1;
        Ok(t)
    }

    fn expect_lparen(&mut self) -> Result<(), String> {
        match self.next()? {
            Tok::LParen => Ok(()),
            other => Err(format!("expected `(`, found {other:?}")),
        }
    }

    fn expect_rparen(&mut self) -> Result<(), String> {
        match self.next()? {
            Tok::RParen => Ok(()),
            other => Err(format!("expected `)`, found {other:?}")),
        }
    }

    fn expect_tag(&mut self) -> Result<String, String> {
        match self.next()? {
            Tok::Atom(s) => Ok(s),
            other => Err(format!("expected a tag atom, found {other:?}")),
        }
    }

    fn expect_keyword(&mut self) -> Result<String, String> {
        match self.next()? {
            Tok::Keyword(s) => Ok(s),
            other => Err(format!("expected a keyword, found {other:?}")),
        }
    }

    fn expect_str(&mut self) -> Result<String, String> {
        match self.next()? {
            Tok::Str(s) => Ok(s),
            other => Err(format!("expected a string literal, found {other:?}")),
        }
    }

    fn expect_atom(&mut self) -> Result<String, String> {
        match self.next()? {
            Tok::Atom(s) => Ok(s),
            other => Err(format!("expected an atom, found {other:?}")),
        }
    }

    fn at_rparen(&self) -> bool {
        matches!(self.peek(), Some(Tok::RParen))
    }

    fn read_type_ref(s: &str) -> TypeRef {
        match s {
            "int" => TypeRef::Int,
            "float" => TypeRef::Float,
            "bool" => TypeRef::Bool,
            "string" => TypeRef::String,
            "null" => TypeRef::Null,
            "<error>" => TypeRef::Error,
            other => TypeRef::Host(other.to_string()),
        }
    }

    fn read_segments(&mut self) -> Result<Vec<String>, String> {
        self.expect_lparen()?;
        let mut segs = Vec::new();
        while !self.at_rparen() {
            segs.push(self.expect_str()?);
        }
        self.expect_rparen()?;
        Ok(segs)
    }

    fn read_args(&mut self) -> Result<Vec<IrArg>, String> {
        self.expect_lparen()?;
        let mut args = Vec::new();
        while !self.at_rparen() {
            args.push(IrArg {
                name: None,
                value: self.read_expr()?,
            });
        }
        self.expect_rparen()?;
        Ok(args)
    }

    fn read_expr(&mut self) -> Result<IrExpr, String> {
        self.expect_lparen()?;
        let tag = self.expect_tag()?;
        let expr = match tag.as_str() {
            "ir-member-load" => {
                let segments = self.read_segments()?;
                let _type_kw = self.expect_keyword()?;
                let type_ref = Self::read_type_ref(&self.expect_str()?);
                IrExpr::MemberLoad(Rc::new(IrMemberLoad {
                    id: 0,
                    origin: Span::empty_at(0),
                    member: MemberRef { segments },
                    type_ref,
                }))
            }
            "ir-blackboard-load" => {
                let segments = self.read_segments()?;
                let _type_kw = self.expect_keyword()?;
                let type_ref = Self::read_type_ref(&self.expect_str()?);
                IrExpr::BlackboardLoad(Rc::new(IrMemberLoad {
                    id: 0,
                    origin: Span::empty_at(0),
                    member: MemberRef { segments },
                    type_ref,
                }))
            }
            "ir-literal" => {
                let value_tok = self.next()?;
                let kind = self.expect_keyword()?;
                let value = match kind.as_str() {
                    ":int" => LiteralValue::Int(
                        match value_tok {
                            Tok::Atom(s) => s,
                            other => return Err(format!("expected int literal atom, found {other:?}")),
                        }
                        .parse()
                        .map_err(|e| format!("bad int literal: {e}"))?,
                    ),
                    ":float" => LiteralValue::Float(
                        match value_tok {
                            Tok::Atom(s) => s,
                            other => return Err(format!("expected float literal atom, found {other:?}")),
                        }
                        .parse()
                        .map_err(|e| format!("bad float literal: {e}"))?,
                    ),
                    ":bool" => LiteralValue::Bool(match value_tok {
                        Tok::Atom(s) => s == "true",
                        other => return Err(format!("expected bool literal atom, found {other:?}")),
                    }),
                    ":string" => LiteralValue::Str(match value_tok {
                        Tok::Str(s) => s,
                        other => return Err(format!("expected string literal, found {other:?}")),
                    }),
                    ":null" => LiteralValue::Null,
                    ":enum" => {
                        let text = match value_tok {
                            Tok::Atom(s) | Tok::Keyword(s) => s,
                            other => return Err(format!("expected enum literal token, found {other:?}")),
                        };
                        let rest = text.strip_prefix("::").ok_or("malformed enum literal")?;
                        let (ty, member) = rest.split_once('.').ok_or("malformed enum literal")?;
                        LiteralValue::Enum(ty.to_string(), member.to_string())
                    }
                    other => return Err(format!("unknown literal kind {other}")),
                };
                let type_ref = match &value {
                    LiteralValue::Int(_) => TypeRef::Int,
                    LiteralValue::Float(_) => TypeRef::Float,
                    LiteralValue::Bool(_) => TypeRef::Bool,
                    LiteralValue::Str(_) => TypeRef::String,
                    LiteralValue::Null => TypeRef::Null,
                    LiteralValue::Enum(ty, _) => TypeRef::Host(ty.clone()),
                };
                IrExpr::Literal(Rc::new(IrLiteral {
                    id: 0,
                    origin: Span::empty_at(0),
                    value,
                    type_ref,
                }))
            }
            "ir-binary-op" => {
                let op_kw = self.expect_keyword()?;
                let op = match op_kw.as_str() {
                    ":add" => BinaryOp::Add,
                    ":sub" => BinaryOp::Sub,
                    ":mul" => BinaryOp::Mul,
                    ":div" => BinaryOp::Div,
                    ":mod" => BinaryOp::Mod,
                    ":lt" => BinaryOp::Lt,
                    ":gt" => BinaryOp::Gt,
                    ":le" => BinaryOp::Le,
                    ":ge" => BinaryOp::Ge,
                    ":eq" => BinaryOp::Eq,
                    ":ne" => BinaryOp::Ne,
                    other => return Err(format!("unknown binary op {other}")),
                };
                let lhs = self.read_expr()?;
                let rhs = self.read_expr()?;
                let type_ref = lhs.type_ref().clone();
                IrExpr::BinaryOp(Rc::new(IrBinaryOp {
                    id: 0,
                    origin: Span::empty_at(0),
                    op,
                    lhs,
                    rhs,
                    type_ref,
                }))
            }
            "ir-unary-op" => {
                let op_kw = self.expect_keyword()?;
                let op = match op_kw.as_str() {
                    ":not" => IrUnaryOp::Not,
                    ":negate" => IrUnaryOp::Negate,
                    other => return Err(format!("unknown unary op {other}")),
                };
                let operand = self.read_expr()?;
                let type_ref = operand.type_ref().clone();
                IrExpr::UnaryOp(Rc::new(IrUnaryExpr {
                    id: 0,
                    origin: Span::empty_at(0),
                    op,
                    operand,
                    type_ref,
                }))
            }
            "ir-logic-op" => {
                let op_kw = self.expect_keyword()?;
                let op = match op_kw.as_str() {
                    ":and" => LogicOp::And,
                    ":or" => LogicOp::Or,
                    other => return Err(format!("unknown logic op {other}")),
                };
                let mut operands = Vec::new();
                while !self.at_rparen() {
                    operands.push(self.read_expr()?);
                }
                IrExpr::LogicOp(Rc::new(IrLogicOp {
                    id: 0,
                    origin: Span::empty_at(0),
                    op,
                    operands,
                    type_ref: TypeRef::Bool,
                }))
            }
            "ir-call" => {
                let declaring_type = self.expect_str()?;
                let name = self.expect_str()?;
                let args = self.read_args()?;
                let _type_kw = self.expect_keyword()?;
                let type_ref = Self::read_type_ref(&self.expect_str()?);
                IrExpr::Call(Rc::new(IrCall {
                    id: 0,
                    origin: Span::empty_at(0),
                    method: MethodRef {
                        declaring_type,
                        name,
                        param_types: Vec::new(),
                    },
                    args,
                    type_ref,
                }))
            }
            "ir-convert" => {
                let operand = self.read_expr()?;
                let _to_kw = self.expect_keyword()?;
                let target_type = Self::read_type_ref(&self.expect_str()?);
                IrExpr::Convert(Rc::new(IrConvert {
                    id: 0,
                    origin: Span::empty_at(0),
                    operand,
                    target_type,
                }))
            }
            other => return Err(format!("unknown expression form {other}")),
        };
        self.expect_rparen()?;
        Ok(expr)
    }

    fn read_node(&mut self) -> Result<IrNode, String> {
        self.expect_lparen()?;
        let tag = self.expect_tag()?;
        let node = match tag.as_str() {
            "ir-tree" => {
                let name = self.expect_str()?;
                let root = self.read_node()?;
                IrNode::Tree(Rc::new(IrTree {
                    id: 0,
                    origin: Span::empty_at(0),
                    name,
                    root,
                }))
            }
            "ir-selector" => {
                let mut children = Vec::new();
                while !self.at_rparen() {
                    children.push(self.read_node()?);
                }
                IrNode::Selector(Rc::new(IrComposite {
                    id: 0,
                    origin: Span::empty_at(0),
                    children,
                }))
            }
            "ir-sequence" => {
                let mut children = Vec::new();
                while !self.at_rparen() {
                    children.push(self.read_node()?);
                }
                IrNode::Sequence(Rc::new(IrComposite {
                    id: 0,
                    origin: Span::empty_at(0),
                    children,
                }))
            }
            "ir-reactive-select" => {
                let mut children = Vec::new();
                while !self.at_rparen() {
                    children.push(self.read_node()?);
                }
                IrNode::ReactiveSelect(Rc::new(IrComposite {
                    id: 0,
                    origin: Span::empty_at(0),
                    children,
                }))
            }
            "ir-parallel" => {
                let policy = match self.peek() {
                    Some(Tok::Keyword(k)) if k == ":any" => {
                        self.next()?;
                        ParallelPolicy::Any
                    }
                    Some(Tok::Keyword(k)) if k == ":all" => {
                        self.next()?;
                        ParallelPolicy::All
                    }
                    Some(Tok::LParen) => {
                        self.expect_lparen()?;
                        let kw = self.expect_keyword()?;
                        if kw != ":n" {
                            return Err(format!("expected :n in parallel policy, found {kw}"));
                        }
                        let count: u32 = self.expect_atom()?.parse().map_err(|e| format!("bad parallel count: {e}"))?;
                        self.expect_rparen()?;
                        ParallelPolicy::N(count)
                    }
                    other => return Err(format!("expected a parallel policy, found {other:?}")),
                };
                let mut children = Vec::new();
                while !self.at_rparen() {
                    children.push(self.read_node()?);
                }
                IrNode::Parallel(Rc::new(IrParallel {
                    id: 0,
                    origin: Span::empty_at(0),
                    policy,
                    children,
                }))
            }
            "ir-guard" => {
                let condition = self.read_expr()?;
                let body = if self.at_rparen() { None } else { Some(self.read_node()?) };
                IrNode::Guard(Rc::new(IrGuard {
                    id: 0,
                    origin: Span::empty_at(0),
                    condition,
                    body,
                }))
            }
            "ir-if" => {
                let condition = self.read_expr()?;
                let then_branch = self.read_node()?;
                let else_branch = if self.at_rparen() { None } else { Some(self.read_node()?) };
                IrNode::If(Rc::new(IrIf {
                    id: 0,
                    origin: Span::empty_at(0),
                    condition,
                    then_branch,
                    else_branch,
                }))
            }
            "ir-invert" => {
                let child = if self.at_rparen() { None } else { Some(self.read_node()?) };
                IrNode::Invert(Rc::new(IrInvert {
                    id: 0,
                    origin: Span::empty_at(0),
                    child,
                }))
            }
            "ir-repeat" => {
                let count: i64 = self.expect_atom()?.parse().map_err(|e| format!("bad repeat count: {e}"))?;
                let child = if self.at_rparen() { None } else { Some(self.read_node()?) };
                IrNode::Repeat(Rc::new(IrRepeat {
                    id: 0,
                    origin: Span::empty_at(0),
                    count,
                    child,
                }))
            }
            "ir-timeout" => {
                let seconds: f64 = self.expect_atom()?.parse().map_err(|e| format!("bad timeout seconds: {e}"))?;
                let child = if self.at_rparen() { None } else { Some(self.read_node()?) };
                IrNode::Timeout(Rc::new(IrTimeout {
                    id: 0,
                    origin: Span::empty_at(0),
                    seconds,
                    child,
                }))
            }
            "ir-cooldown" => {
                let seconds: f64 = self.expect_atom()?.parse().map_err(|e| format!("bad cooldown seconds: {e}"))?;
                let child = if self.at_rparen() { None } else { Some(self.read_node()?) };
                IrNode::Cooldown(Rc::new(IrCooldown {
                    id: 0,
                    origin: Span::empty_at(0),
                    seconds,
                    child,
                }))
            }
            "ir-while" => {
                let condition = self.read_expr()?;
                let body = if self.at_rparen() { None } else { Some(self.read_node()?) };
                IrNode::While(Rc::new(IrWhile {
                    id: 0,
                    origin: Span::empty_at(0),
                    condition,
                    body,
                }))
            }
            "ir-reactive" => {
                let condition = self.read_expr()?;
                let body = self.read_node()?;
                IrNode::Reactive(Rc::new(IrReactive {
                    id: 0,
                    origin: Span::empty_at(0),
                    condition,
                    body,
                }))
            }
            "ir-tree-ref" => {
                let name = self.expect_str()?;
                IrNode::TreeRef(Rc::new(IrTreeRef {
                    id: 0,
                    origin: Span::empty_at(0),
                    name,
                }))
            }
            "ir-condition" => {
                let expr = self.read_expr()?;
                IrNode::Condition(Rc::new(IrCondition {
                    id: 0,
                    origin: Span::empty_at(0),
                    expr,
                }))
            }
            "ir-action" => {
                let declaring_type = self.expect_str()?;
                let name = self.expect_str()?;
                let args = self.read_args()?;
                let _type_kw = self.expect_keyword()?;
                let type_ref = Self::read_type_ref(&self.expect_str()?);
                IrNode::Action(Rc::new(IrAction {
                    id: 0,
                    origin: Span::empty_at(0),
                    method: MethodRef {
                        declaring_type,
                        name,
                        param_types: Vec::new(),
                    },
                    args,
                    is_async: false,
                    is_subtree: false,
                    type_ref,
                }))
            }
            other => return Err(format!("unknown IR node form {other}")),
        };
        self.expect_rparen()?;
        Ok(node)
    }
}

/// Parses one IR node (or `ir-tree`) from its bit-exact S-expression form.
/// Round-trips node shape and typing; ids/origins/`is_async`/`is_subtree`
/// carry no textual representation in the grammar and come back as
/// placeholders, since nothing outside an active compilation can recover
/// them from text alone.
pub fn parse_node(src: &str) -> Result<IrNode, String> {
    let toks = tokenize(src)?;
    let mut reader = Reader { toks, pos: 0 };
    let node = reader.read_node()?;
    if reader.pos != reader.toks.len() {
        return Err("trailing input after IR node".to_string());
    }
    Ok(node)
}
