//! Recursive-descent parser (C2): tokens to lossless CST with error recovery.
//!
//! The parser never fails to produce a tree. Unexpected tokens at node
//! position are wrapped in an `Error` node and skipped to the next `(` or
//! matching `)`; required-but-absent tokens are represented by zero-length
//! `Missing` sentinels; unmatched `(`/`)` are reported but do not stop
//! parsing.

use canopy_diagnostics::{Diagnostic, DiagnosticBag, DiagnosticCode, Span};

use crate::cst::{CstBuilder, CstTree, SyntaxKind};
use crate::token::{Token, TokenKind};

/// Whether a generic list form is being parsed where a full node (a
/// selector, decorator, call, ...) is expected, or where an expression
/// (binary/unary/logic/literal/member-access) is expected. Calls are not
/// disambiguated here; that is left to CST->AST lowering (C3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Node,
    Expr,
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    builder: CstBuilder,
    diagnostics: DiagnosticBag,
}

const COMPOSITE_KEYWORDS: &[&str] = &["select", "seq", "parallel"];
const DECORATOR_KEYWORDS: &[&str] = &[
    "guard", "if", "invert", "repeat", "timeout", "cooldown", "while",
];
const REACTIVE_KEYWORDS: &[&str] = &["reactive", "reactive-select"];
const TOP_LEVEL_KEYWORDS: &[&str] = &["tree", "defdec", "defmacro", "import"];

impl<'a> Parser<'a> {
    #[must_use]
    pub fn new(tokens: &'a [Token]) -> Self {
        let mut builder = CstBuilder::new();
        builder.push_tokens(tokens.to_vec());
        Self {
            tokens,
            pos: 0,
            builder,
            diagnostics: DiagnosticBag::new(),
        }
    }

    #[must_use]
    pub fn parse(mut self) -> (CstTree, DiagnosticBag) {
        self.builder.start_node(SyntaxKind::Program);
        while !self.at_eof() {
            self.parse_top_level_form();
        }
        let root = self.builder.finish_node();
        (self.builder.finish(root), self.diagnostics)
    }

    // --- token stream helpers -------------------------------------------------

    fn at_eof(&self) -> bool {
        self.peek_kind() == TokenKind::Eof
    }

    fn peek_kind(&self) -> TokenKind {
        self.tokens.get(self.pos).map_or(TokenKind::Eof, |t| t.kind)
    }

    fn peek_text(&self) -> &str {
        self.tokens.get(self.pos).map_or("", |t| t.text.as_str())
    }

    fn is_keyword(&self, word: &str) -> bool {
        self.peek_kind() == TokenKind::Ident && self.peek_text() == word
    }

    fn is_any_keyword(&self, words: &[&str]) -> bool {
        self.peek_kind() == TokenKind::Ident && words.contains(&self.peek_text())
    }

    fn bump(&mut self) -> u32 {
        let idx = self.pos.min(self.tokens.len().saturating_sub(1)) as u32;
        if self.pos < self.tokens.len() && self.tokens[self.pos].kind != TokenKind::Eof {
            self.pos += 1;
        }
        self.builder.token_leaf(idx);
        idx
    }

    /// Consumes the current token if it has `kind`, else records a
    /// zero-length `Missing` sentinel at the insertion point.
    fn expect(&mut self, kind: TokenKind, what: &str) {
        if self.peek_kind() == kind {
            self.bump();
        } else {
            self.missing(what);
        }
    }

    fn missing(&mut self, what: &str) {
        let offset = self.current_offset();
        self.builder.start_node(SyntaxKind::Missing);
        self.builder.finish_node();
        self.diagnostics.push(Diagnostic::new(
            DiagnosticCode::BS0016,
            Span::empty_at(offset),
            vec![format!("<missing {what}>")],
        ));
    }

    fn current_offset(&self) -> u32 {
        self.tokens
            .get(self.pos)
            .map_or(0, |t| t.span.start)
    }

    // --- top level --------------------------------------------------------

    fn parse_top_level_form(&mut self) {
        if self.peek_kind() == TokenKind::RParen {
            // Stray closing paren with no form to close (recovery policy c).
            let offset = self.current_offset();
            self.bump();
            report_stray_rparen(&mut self.diagnostics, offset);
            return;
        }
        if self.peek_kind() != TokenKind::LParen {
            self.recover_unexpected_token();
            return;
        }
        self.parse_paren_form(Position::Node);
    }

    /// Skips an unexpected token at node position by collecting it into an
    /// `Error` node and resynchronizing on the next `(` or matching `)`.
    fn recover_unexpected_token(&mut self) {
        let offset = self.current_offset();
        let text = self.peek_text().to_string();
        self.builder.start_node(SyntaxKind::Error);
        while !matches!(self.peek_kind(), TokenKind::LParen | TokenKind::RParen | TokenKind::Eof) {
            self.bump();
        }
        self.builder.finish_node();
        self.diagnostics.push(Diagnostic::new(
            DiagnosticCode::BS0016,
            Span::empty_at(offset),
            vec![text],
        ));
    }

    // --- generic paren form dispatch --------------------------------------

    fn parse_paren_form(&mut self, position: Position) -> u32 {
        if self.peek_kind() != TokenKind::LParen {
            return self.parse_atom(position);
        }

        if self.is_keyword("tree") {
            self.parse_tree_def()
        } else if self.is_keyword("defdec") {
            self.parse_defdec()
        } else if self.is_keyword("defmacro") {
            self.parse_defmacro()
        } else if self.is_keyword("import") {
            self.parse_import()
        } else if self.is_keyword("ref") {
            self.parse_ref()
        } else if self.is_any_keyword(COMPOSITE_KEYWORDS) {
            self.parse_composite()
        } else if self.is_any_keyword(DECORATOR_KEYWORDS) {
            self.parse_decorator()
        } else if self.is_any_keyword(REACTIVE_KEYWORDS) {
            self.parse_reactive()
        } else if self.is_keyword("check") {
            self.parse_check()
        } else if self.is_keyword("and") || self.is_keyword("or") {
            self.parse_logic()
        } else if self.is_keyword("not") {
            self.parse_unary()
        } else {
            self.lookahead_operator_head().map_or_else(
                || self.parse_call(position),
                |_| self.parse_binary(),
            )
        }
    }

    /// Peeks past `(` to see whether the head token is an arithmetic /
    /// comparison operator, in which case this is a binary expression form.
    fn lookahead_operator_head(&self) -> Option<TokenKind> {
        let next = self.tokens.get(self.pos + 1)?;
        matches!(
            next.kind,
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
        .then_some(next.kind)
    }

    // --- top-level forms ---------------------------------------------------

    fn parse_tree_def(&mut self) -> u32 {
        self.builder.start_node(SyntaxKind::TreeDef);
        self.bump(); // (
        self.bump(); // tree
        self.expect(TokenKind::Ident, "tree name");
        if self.peek_kind() == TokenKind::KeywordArg && self.peek_text() == ":blackboard" {
            self.bump();
            self.expect(TokenKind::Ident, "blackboard type");
        }
        while self.peek_kind() != TokenKind::RParen && !self.at_eof() {
            self.parse_paren_form(Position::Node);
        }
        self.close_paren();
        self.builder.finish_node()
    }

    fn parse_defdec(&mut self) -> u32 {
        self.builder.start_node(SyntaxKind::Defdec);
        self.bump(); // (
        self.bump(); // defdec
        self.expect(TokenKind::Ident, "defdec name");
        self.parse_param_list();
        while self.peek_kind() != TokenKind::RParen && !self.at_eof() {
            self.parse_paren_form(Position::Node);
        }
        self.close_paren();
        self.builder.finish_node()
    }

    fn parse_defmacro(&mut self) -> u32 {
        self.builder.start_node(SyntaxKind::Defmacro);
        self.bump(); // (
        self.bump(); // defmacro
        self.expect(TokenKind::Ident, "macro name");
        self.parse_param_list();
        while self.peek_kind() != TokenKind::RParen && !self.at_eof() {
            self.parse_paren_form(Position::Node);
        }
        self.close_paren();
        self.builder.finish_node()
    }

    fn parse_param_list(&mut self) {
        if self.peek_kind() != TokenKind::LParen {
            self.missing("parameter list");
            return;
        }
        self.bump(); // (
        while self.peek_kind() == TokenKind::Ident {
            self.bump();
        }
        self.expect(TokenKind::RParen, ")");
    }

    fn parse_import(&mut self) -> u32 {
        self.builder.start_node(SyntaxKind::Import);
        self.bump(); // (
        self.bump(); // import
        self.expect(TokenKind::String, "import path");
        self.close_paren();
        self.builder.finish_node()
    }

    fn parse_ref(&mut self) -> u32 {
        self.builder.start_node(SyntaxKind::Ref);
        self.bump(); // (
        self.bump(); // ref
        self.expect(TokenKind::Ident, "tree name");
        self.close_paren();
        self.builder.finish_node()
    }

    // --- control-flow nodes -------------------------------------------------

    fn parse_composite(&mut self) -> u32 {
        let kind = match self.peek_text() {
            "select" => SyntaxKind::Selector,
            "seq" => SyntaxKind::Sequence,
            _ => SyntaxKind::Parallel,
        };
        self.builder.start_node(kind);
        self.bump(); // (
        self.bump(); // keyword
        if kind == SyntaxKind::Parallel {
            self.parse_parallel_policy();
        }
        while self.peek_kind() != TokenKind::RParen && !self.at_eof() {
            self.parse_paren_form(Position::Node);
        }
        self.close_paren();
        self.builder.finish_node()
    }

    fn parse_parallel_policy(&mut self) {
        self.builder.start_node(SyntaxKind::ParallelPolicy);
        match self.peek_kind() {
            TokenKind::KeywordArg if matches!(self.peek_text(), ":any" | ":all") => {
                self.bump();
            }
            TokenKind::LParen => {
                self.bump();
                if self.peek_kind() == TokenKind::KeywordArg && self.peek_text() == ":n" {
                    self.bump();
                    self.expect(TokenKind::Int, "parallel count");
                } else {
                    self.missing(":n");
                }
                self.expect(TokenKind::RParen, ")");
            }
            _ => self.missing("parallel policy"),
        }
        self.builder.finish_node();
    }

    fn parse_decorator(&mut self) -> u32 {
        let kind = match self.peek_text() {
            "guard" => SyntaxKind::Guard,
            "if" => SyntaxKind::If,
            "invert" => SyntaxKind::Invert,
            "repeat" => SyntaxKind::Repeat,
            "timeout" => SyntaxKind::Timeout,
            "cooldown" => SyntaxKind::Cooldown,
            _ => SyntaxKind::While,
        };
        self.builder.start_node(kind);
        self.bump(); // (
        self.bump(); // keyword
        match kind {
            SyntaxKind::Guard | SyntaxKind::If | SyntaxKind::While => {
                self.parse_paren_form(Position::Expr);
            }
            SyntaxKind::Repeat => {
                self.expect(TokenKind::Int, "repeat count");
            }
            SyntaxKind::Timeout | SyntaxKind::Cooldown => {
                if matches!(self.peek_kind(), TokenKind::Int | TokenKind::Float) {
                    self.bump();
                } else {
                    self.missing("duration");
                }
            }
            SyntaxKind::Invert => {}
            _ => unreachable!(),
        }
        while self.peek_kind() != TokenKind::RParen && !self.at_eof() {
            self.parse_paren_form(Position::Node);
        }
        self.close_paren();
        self.builder.finish_node()
    }

    fn parse_reactive(&mut self) -> u32 {
        if self.peek_text() == "reactive-select" {
            self.builder.start_node(SyntaxKind::ReactiveSelect);
            self.bump(); // (
            self.bump(); // reactive-select
            while self.peek_kind() != TokenKind::RParen && !self.at_eof() {
                self.parse_paren_form(Position::Node);
            }
            self.close_paren();
            self.builder.finish_node()
        } else {
            self.builder.start_node(SyntaxKind::Reactive);
            self.bump(); // (
            self.bump(); // reactive
            self.parse_paren_form(Position::Expr);
            while self.peek_kind() != TokenKind::RParen && !self.at_eof() {
                self.parse_paren_form(Position::Node);
            }
            self.close_paren();
            self.builder.finish_node()
        }
    }

    fn parse_check(&mut self) -> u32 {
        self.builder.start_node(SyntaxKind::Check);
        self.bump(); // (
        self.bump(); // check
        self.parse_paren_form(Position::Expr);
        self.close_paren();
        self.builder.finish_node()
    }

    // --- expressions --------------------------------------------------------

    fn parse_logic(&mut self) -> u32 {
        self.builder.start_node(SyntaxKind::Logic);
        self.bump(); // (
        self.bump(); // and|or
        while self.peek_kind() != TokenKind::RParen && !self.at_eof() {
            self.parse_paren_form(Position::Expr);
        }
        self.close_paren();
        self.builder.finish_node()
    }

    fn parse_unary(&mut self) -> u32 {
        self.builder.start_node(SyntaxKind::Unary);
        self.bump(); // (
        self.bump(); // not
        self.parse_paren_form(Position::Expr);
        self.close_paren();
        self.builder.finish_node()
    }

    fn parse_binary(&mut self) -> u32 {
        self.builder.start_node(SyntaxKind::Binary);
        self.bump(); // (
        self.bump(); // operator
        self.parse_paren_form(Position::Expr);
        self.parse_paren_form(Position::Expr);
        self.close_paren();
        self.builder.finish_node()
    }

    /// Generic `(callee arg*)` shape: an action call, a defdec-call, or a
    /// tree-ref shorthand, depending on what `callee` resolves to. That
    /// decision is made during CST->AST lowering (C3); the parser only
    /// records the shape.
    fn parse_call(&mut self, _position: Position) -> u32 {
        self.builder.start_node(SyntaxKind::Call);
        self.bump(); // (
        // callee: member-access chain or bare identifier
        if matches!(self.peek_kind(), TokenKind::MemberAccess | TokenKind::Ident) {
            self.bump();
        } else {
            self.missing("callee");
        }
        while self.peek_kind() != TokenKind::RParen && !self.at_eof() {
            self.parse_argument();
        }
        self.close_paren();
        self.builder.finish_node()
    }

    fn parse_argument(&mut self) {
        if self.peek_kind() == TokenKind::KeywordArg {
            self.builder.start_node(SyntaxKind::KeywordArgument);
            self.bump();
            self.parse_paren_form(Position::Expr);
            self.builder.finish_node();
        } else {
            self.parse_paren_form(Position::Expr);
        }
    }

    fn parse_atom(&mut self, position: Position) -> u32 {
        match self.peek_kind() {
            TokenKind::Int => self.leaf(SyntaxKind::LiteralInt),
            TokenKind::Float => self.leaf(SyntaxKind::LiteralFloat),
            TokenKind::Bool => self.leaf(SyntaxKind::LiteralBool),
            TokenKind::String => self.leaf(SyntaxKind::LiteralString),
            TokenKind::Null => self.leaf(SyntaxKind::LiteralNull),
            TokenKind::EnumLiteral => self.leaf(SyntaxKind::LiteralEnum),
            TokenKind::MemberAccess => self.leaf(SyntaxKind::MemberAccess),
            TokenKind::BlackboardAccess => self.leaf(SyntaxKind::BlackboardAccess),
            TokenKind::Ident if position == Position::Node => self.parse_call(position),
            TokenKind::Ident => self.leaf(SyntaxKind::MemberAccess),
            TokenKind::BodyPlaceholder => self.leaf(SyntaxKind::BodyPlaceholder),
            _ => {
                self.recover_unexpected_token();
                // Emit a Missing node so the caller still gets a child id.
                self.builder.start_node(SyntaxKind::Missing);
                self.builder.finish_node()
            }
        }
    }

    fn leaf(&mut self, kind: SyntaxKind) -> u32 {
        self.builder.start_node(kind);
        self.bump();
        self.builder.finish_node()
    }

    /// Consumes the closing `)`, or if end-of-file is reached first, closes
    /// the form anyway and reports the unmatched `(` (recovery policy b).
    fn close_paren(&mut self) {
        if self.peek_kind() == TokenKind::RParen {
            self.bump();
            return;
        }
        // Stray extra `)` tokens belonging to an inner form are consumed by
        // that form; here we've run out of input without seeing our `)`.
        let offset = self.current_offset();
        self.diagnostics.push(Diagnostic::new(
            DiagnosticCode::BS0018,
            Span::empty_at(offset),
            vec![],
        ));
    }
}

/// Skips a stray `)` at the top level (recovery policy c) and reports it.
pub(crate) fn report_stray_rparen(diagnostics: &mut DiagnosticBag, offset: u32) {
    diagnostics.push(Diagnostic::new(
        DiagnosticCode::BS0019,
        Span::empty_at(offset),
        vec![],
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(src: &str) -> (CstTree, DiagnosticBag) {
        let (tokens, _) = Lexer::new(src).tokenize();
        Parser::new(&tokens).parse()
    }

    #[test]
    fn round_trips_minimal_tree() {
        let src = "(tree T (select (seq (check (< .Health 30)) (.Flee)) (.Patrol)))";
        let (tree, diags) = parse(src);
        assert!(diags.is_empty());
        assert_eq!(tree.to_full_string(tree.root()), src);
    }

    #[test]
    fn unmatched_open_paren_reports_bs0018() {
        let src = "(tree T (select (.Patrol)";
        let (tree, diags) = parse(src);
        assert_eq!(tree.to_full_string(tree.root()), src);
        assert!(diags.iter().any(|d| d.code == DiagnosticCode::BS0018));
    }

    #[test]
    fn stray_closing_paren_reports_bs0019_and_does_not_hang() {
        let src = "(tree T (select (.Patrol))))";
        let (tree, diags) = parse(src);
        assert_eq!(tree.to_full_string(tree.root()), src);
        assert!(diags.iter().any(|d| d.code == DiagnosticCode::BS0019));
    }

    #[test]
    fn ids_increase_in_document_order() {
        let src = "(tree T (select (.Patrol) (.Flee)))";
        let (tree, _) = parse(src);
        assert_eq!(tree.root(), 0, "the first node opened is the program root");
        // Ids are assigned at `start_node` time (document order), so a
        // node's id is always smaller than any of its descendants'.
        fn check(tree: &CstTree, id: u32) {
            for c in tree.children(id) {
                if let crate::cst::CstElement::Node(child) = c {
                    assert!(*child > id, "descendant id must exceed ancestor id");
                    check(tree, *child);
                }
            }
        }
        check(&tree, tree.root());
    }
}
