//! Token and trivia types produced by the lexer (C1).
//!
//! Trivia attribution follows the "Roslyn rule": leading trivia is the
//! whitespace/comments that lead up to a token; trailing trivia extends from
//! the token to and including the next newline. A token's *full span*
//! therefore starts at its first leading trivia and ends at its last
//! trailing trivia.

use canopy_diagnostics::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    LParen,
    RParen,
    Int,
    Float,
    String,
    Bool,
    Null,
    Ident,
    MemberAccess,
    BlackboardAccess,
    EnumLiteral,
    KeywordArg,
    BodyPlaceholder,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    Error,
    Eof,
}

impl TokenKind {
    #[must_use]
    pub fn is_trivia_boundary(self) -> bool {
        !matches!(self, TokenKind::Eof)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriviaKind {
    Whitespace,
    Newline,
    LineComment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trivia {
    pub kind: TriviaKind,
    pub span: Span,
    pub text: String,
}

/// A lexed token together with the trivia attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Span of the token's own text, excluding trivia.
    pub span: Span,
    pub text: String,
    pub leading_trivia: Vec<Trivia>,
    pub trailing_trivia: Vec<Trivia>,
}

impl Token {
    #[must_use]
    pub fn full_span(&self) -> Span {
        let start = self
            .leading_trivia
            .first()
            .map_or(self.span.start, |t| t.span.start);
        let end = self
            .trailing_trivia
            .last()
            .map_or(self.span.end, |t| t.span.end);
        Span::new(start, end)
    }

    #[must_use]
    pub fn full_text(&self) -> String {
        let mut out = String::new();
        for t in &self.leading_trivia {
            out.push_str(&t.text);
        }
        out.push_str(&self.text);
        for t in &self.trailing_trivia {
            out.push_str(&t.text);
        }
        out
    }
}
