//! Name resolution (C5): binds every member path and call in the AST to a
//! host symbol obtained from the injected [`crate::host::HostTypeProvider`].
//!
//! Grounded on `core/type-checker/src/symbol_table.rs`'s scope/symbol split,
//! retargeted from a host-language reflection table (struct/enum/function
//! symbols registered per scope) to Canopy's single flat context-type
//! lookup: there is no lexical scoping in the DSL itself, only member-path
//! resolution against whatever type the path starts from.

use rustc_hash::FxHashMap;

use canopy_ast::ast::{Expr, MemberPath, Node, NodeId, Program};
use canopy_diagnostics::{Diagnostic, DiagnosticBag, DiagnosticCode, Span};

use crate::host::{HostTypeProvider, Nullability, TypeRef};

#[derive(Debug, Clone)]
pub enum ResolvedSymbol {
    Member {
        declaring_type: String,
        type_ref: TypeRef,
        nullability: Nullability,
    },
    Method {
        declaring_type: String,
        name: String,
        param_types: Vec<TypeRef>,
        return_type: TypeRef,
        is_async: bool,
        returns_node: bool,
    },
    BlackboardMember {
        declaring_type: String,
        type_ref: TypeRef,
        nullability: Nullability,
    },
    /// Resolution failed; a diagnostic was already recorded. Carried so C6
    /// can apply cascade suppression without re-deriving "this failed".
    Error,
}

impl ResolvedSymbol {
    #[must_use]
    pub fn type_ref(&self) -> TypeRef {
        match self {
            ResolvedSymbol::Member { type_ref, .. } | ResolvedSymbol::BlackboardMember { type_ref, .. } => {
                type_ref.clone()
            }
            ResolvedSymbol::Method { return_type, .. } => return_type.clone(),
            ResolvedSymbol::Error => TypeRef::Error,
        }
    }
}

pub type SymbolTable = FxHashMap<NodeId, ResolvedSymbol>;

/// The five-way kebab-case candidate search from spec.md §4.5, in priority
/// order. The first candidate that names a real member on `type_name` wins;
/// a same-priority tie (two distinct members matching the same candidate
/// string under case-insensitive exact match) still emits `BS0104`.
fn candidates(segment: &str) -> [String; 5] {
    [
        segment.to_string(),
        to_pascal_case(segment),
        to_camel_case(segment),
        format!("_{}", to_camel_case(segment)),
        to_snake_case(segment),
    ]
}

fn to_pascal_case(s: &str) -> String {
    s.split(['-', '_'])
        .filter(|p| !p.is_empty())
        .map(|p| {
            let mut chars = p.chars();
            match chars.next() {
                Some(c) => c.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn to_camel_case(s: &str) -> String {
    let pascal = to_pascal_case(s);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(c) => c.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn to_snake_case(s: &str) -> String {
    s.replace('-', "_")
}

/// Finds the highest-priority member or method name on `type_name` matching
/// one of `segment`'s candidate spellings, case-insensitively. Returns the
/// actual member name found plus whether more than one member matched at
/// that same priority level (for `BS0104`).
fn resolve_member_name<'a>(
    host: &'a dyn HostTypeProvider,
    type_name: &str,
    segment: &str,
) -> Option<(&'a str, bool)> {
    for candidate in candidates(segment) {
        let matches: Vec<&str> = host
            .members(type_name)
            .iter()
            .map(|m| m.name.as_str())
            .filter(|name| name.eq_ignore_ascii_case(&candidate))
            .collect();
        if let Some(first) = matches.first() {
            return Some((first, matches.len() > 1));
        }
    }
    None
}

fn resolve_method_name<'a>(
    host: &'a dyn HostTypeProvider,
    type_name: &str,
    segment: &str,
    arg_count: usize,
) -> Option<(&'a str, bool)> {
    for candidate in candidates(segment) {
        let matches: Vec<&str> = host
            .methods(type_name)
            .iter()
            .filter(|m| m.name.eq_ignore_ascii_case(&candidate) && m.param_types.len() == arg_count)
            .map(|m| m.name.as_str())
            .collect();
        if let Some(first) = matches.first() {
            return Some((first, matches.len() > 1));
        }
        // Fall back to name-only match (arity is narrowed first per
        // spec.md §4.5, but an arity mismatch is a type-checker concern,
        // not a resolution failure) so BS0005 rather than BS0001 fires.
        let by_name: Vec<&str> = host
            .methods(type_name)
            .iter()
            .filter(|m| m.name.eq_ignore_ascii_case(&candidate))
            .map(|m| m.name.as_str())
            .collect();
        if let Some(first) = by_name.first() {
            return Some((first, by_name.len() > 1));
        }
    }
    None
}

pub struct Resolver<'a> {
    host: &'a dyn HostTypeProvider,
    context_type: &'a str,
    table: SymbolTable,
    diagnostics: DiagnosticBag,
}

#[must_use]
pub fn resolve(program: &Program, host: &dyn HostTypeProvider, context_type: &str) -> (SymbolTable, DiagnosticBag) {
    let mut resolver = Resolver {
        host,
        context_type,
        table: SymbolTable::default(),
        diagnostics: DiagnosticBag::new(),
    };
    for tree in &program.trees {
        resolver.visit_node(&tree.root, tree.blackboard_type.as_deref());
    }
    for defdec in &program.defdecs {
        resolver.visit_node(&defdec.body, None);
    }
    (resolver.table, resolver.diagnostics)
}

impl<'a> Resolver<'a> {
    fn visit_node(&mut self, node: &Node, blackboard_type: Option<&str>) {
        match node {
            Node::Guard(n) => self.visit_expr(&n.condition, blackboard_type),
            Node::If(n) => self.visit_expr(&n.condition, blackboard_type),
            Node::While(n) => self.visit_expr(&n.condition, blackboard_type),
            Node::Reactive(n) => self.visit_expr(&n.condition, blackboard_type),
            Node::Check(n) => self.visit_expr(&n.condition, blackboard_type),
            Node::ActionCall(n) => {
                let symbol = self.resolve_call(&n.callee, n.args.len(), n.span, n.id);
                self.table.insert(n.id, symbol);
                for arg in &n.args {
                    self.visit_expr(&arg.value, blackboard_type);
                }
            }
            _ => {}
        }
        for child in node.children() {
            self.visit_node(&child, blackboard_type);
        }
    }

    fn visit_expr(&mut self, expr: &Expr, blackboard_type: Option<&str>) {
        match expr {
            Expr::MemberLoad(n) => {
                let symbol = self.resolve_path(&n.path, self.context_type, n.span);
                self.table.insert(n.id, symbol);
            }
            Expr::BlackboardLoad(n) => {
                let symbol = match blackboard_type {
                    Some(bb) => match self.resolve_path(&n.path, bb, n.span) {
                        ResolvedSymbol::Member {
                            declaring_type,
                            type_ref,
                            nullability,
                        } => ResolvedSymbol::BlackboardMember {
                            declaring_type,
                            type_ref,
                            nullability,
                        },
                        other => other,
                    },
                    None => {
                        self.diagnostics.push(Diagnostic::new(
                            DiagnosticCode::BS0028,
                            n.span,
                            vec![n.path.segments.join(".")],
                        ));
                        ResolvedSymbol::Error
                    }
                };
                self.table.insert(n.id, symbol);
            }
            Expr::Binary(n) => {
                self.visit_expr(&n.lhs, blackboard_type);
                self.visit_expr(&n.rhs, blackboard_type);
            }
            Expr::Unary(n) => self.visit_expr(&n.operand, blackboard_type),
            Expr::Logic(n) => {
                for operand in &n.operands {
                    self.visit_expr(operand, blackboard_type);
                }
            }
            Expr::CallExpr(n) => {
                let symbol = self.resolve_call(&n.callee, n.args.len(), n.span, n.id);
                self.table.insert(n.id, symbol);
                for arg in &n.args {
                    self.visit_expr(&arg.value, blackboard_type);
                }
            }
            Expr::Literal(_) => {}
        }
    }

    /// Resolves the last segment of `path` as a method call on the type the
    /// earlier segments chain to.
    fn resolve_call(&mut self, path: &MemberPath, arg_count: usize, span: Span, _node_id: NodeId) -> ResolvedSymbol {
        let Some((last, head)) = path.segments.split_last() else {
            return ResolvedSymbol::Error;
        };
        let mut current_type = self.context_type.to_string();
        for segment in head {
            match resolve_member_name(self.host, &current_type, segment) {
                Some((name, ambiguous)) => {
                    if ambiguous {
                        self.diagnostics.push(Diagnostic::new(
                            DiagnosticCode::BS0104,
                            span,
                            vec![segment.clone(), name.to_string()],
                        ));
                    }
                    let member = self.host.members(&current_type).iter().find(|m| m.name == name).unwrap();
                    match &member.type_ref {
                        TypeRef::Host(t) => current_type = t.clone(),
                        _ => return self.unknown(segment, span),
                    }
                }
                None => return self.unknown(segment, span),
            }
        }
        match resolve_method_name(self.host, &current_type, last, arg_count) {
            Some((name, ambiguous)) => {
                if ambiguous {
                    self.diagnostics.push(Diagnostic::new(
                        DiagnosticCode::BS0104,
                        span,
                        vec![last.clone(), name.to_string()],
                    ));
                }
                let method = self.host.methods(&current_type).iter().find(|m| m.name == name).unwrap();
                if method.obsolete {
                    self.diagnostics
                        .push(Diagnostic::new(DiagnosticCode::BS0010, span, vec![method.name.clone()]));
                }
                ResolvedSymbol::Method {
                    declaring_type: current_type.clone(),
                    name: method.name.clone(),
                    param_types: method.param_types.clone(),
                    return_type: method.return_type.clone(),
                    is_async: method.is_async,
                    returns_node: method.returns_node,
                }
            }
            None => self.unknown(last, span),
        }
    }

    fn resolve_path(&mut self, path: &MemberPath, root_type: &str, span: Span) -> ResolvedSymbol {
        let mut current_type = root_type.to_string();
        let mut result = None;
        for (i, segment) in path.segments.iter().enumerate() {
            match resolve_member_name(self.host, &current_type, segment) {
                Some((name, ambiguous)) => {
                    if ambiguous {
                        self.diagnostics.push(Diagnostic::new(
                            DiagnosticCode::BS0104,
                            span,
                            vec![segment.clone(), name.to_string()],
                        ));
                    }
                    let member = self.host.members(&current_type).iter().find(|m| m.name == name).unwrap();
                    if member.obsolete {
                        self.diagnostics
                            .push(Diagnostic::new(DiagnosticCode::BS0010, span, vec![member.name.clone()]));
                    }
                    result = Some(ResolvedSymbol::Member {
                        declaring_type: current_type.clone(),
                        type_ref: member.type_ref.clone(),
                        nullability: member.nullability,
                    });
                    if let TypeRef::Host(t) = &member.type_ref {
                        current_type = t.clone();
                    } else if i + 1 < path.segments.len() {
                        return self.unknown(&path.segments[i + 1], span);
                    }
                }
                None => return self.unknown(segment, span),
            }
        }
        result.unwrap_or(ResolvedSymbol::Error)
    }

    fn unknown(&mut self, segment: &str, span: Span) -> ResolvedSymbol {
        self.diagnostics
            .push(Diagnostic::new(DiagnosticCode::BS0001, span, vec![segment.to_string()]));
        ResolvedSymbol::Error
    }
}
