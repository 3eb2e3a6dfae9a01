//! One-pass, no-backtracking lexer (C1).
//!
//! Produces a flat token stream with leading/trailing trivia already
//! attached. Lexing never halts: unrecognized bytes become an `Error` token
//! and scanning resumes at the next delimiter.

use canopy_diagnostics::{Diagnostic, DiagnosticCode, Span};

use crate::token::{Token, Trivia, TriviaKind};
pub use crate::token::TokenKind;

enum RawItem {
    Token {
        kind: TokenKind,
        span: Span,
        text: String,
    },
    Trivia {
        kind: TriviaKind,
        span: Span,
        text: String,
    },
}

pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: u32,
    diagnostics: Vec<Diagnostic>,
    raw: Vec<RawItem>,
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'-'
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            diagnostics: Vec::new(),
            raw: Vec::new(),
        }
    }

    /// Lexes the whole source, returning the trivia-attached token stream
    /// (terminated by an `Eof` token) plus any lexical diagnostics.
    #[must_use]
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        while (self.pos as usize) < self.bytes.len() {
            self.scan_one();
        }
        self.raw.push(RawItem::Token {
            kind: TokenKind::Eof,
            span: Span::empty_at(self.pos),
            text: String::new(),
        });
        let tokens = Self::attach_trivia(self.raw);
        (tokens, self.diagnostics)
    }

    fn cur(&self) -> Option<u8> {
        self.bytes.get(self.pos as usize).copied()
    }

    fn at(&self, offset: u32) -> Option<u8> {
        self.bytes.get((self.pos + offset) as usize).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.cur();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn slice(&self, start: u32, end: u32) -> String {
        self.src[start as usize..end as usize].to_string()
    }

    fn push_token(&mut self, kind: TokenKind, start: u32) {
        let span = Span::new(start, self.pos);
        let text = self.slice(start, self.pos);
        self.raw.push(RawItem::Token { kind, span, text });
    }

    #[allow(clippy::too_many_lines)]
    fn scan_one(&mut self) {
        let start = self.pos;
        let c = match self.cur() {
            Some(c) => c,
            None => return,
        };

        match c {
            b' ' | b'\t' | b'\r' => {
                while matches!(self.cur(), Some(b' ' | b'\t' | b'\r')) {
                    self.pos += 1;
                }
                let span = Span::new(start, self.pos);
                self.raw.push(RawItem::Trivia {
                    kind: TriviaKind::Whitespace,
                    span,
                    text: self.slice(start, self.pos),
                });
            }
            b'\n' => {
                self.pos += 1;
                let span = Span::new(start, self.pos);
                self.raw.push(RawItem::Trivia {
                    kind: TriviaKind::Newline,
                    span,
                    text: self.slice(start, self.pos),
                });
            }
            b';' => {
                while !matches!(self.cur(), None | Some(b'\n')) {
                    self.pos += 1;
                }
                let span = Span::new(start, self.pos);
                self.raw.push(RawItem::Trivia {
                    kind: TriviaKind::LineComment,
                    span,
                    text: self.slice(start, self.pos),
                });
            }
            b'(' => {
                self.pos += 1;
                self.push_token(TokenKind::LParen, start);
            }
            b')' => {
                self.pos += 1;
                self.push_token(TokenKind::RParen, start);
            }
            b'"' => self.scan_string(start),
            b'.' if self.at(1).is_some_and(is_ident_start) => self.scan_member_chain(start),
            b'$' if self.at(1).is_some_and(is_ident_start) => self.scan_blackboard(start),
            b':' if self.at(1) == Some(b':') => self.scan_enum_literal(start),
            b':' if self.at(1).is_some_and(is_ident_start) => {
                self.pos += 1;
                while self.cur().is_some_and(is_ident_continue) {
                    self.pos += 1;
                }
                self.push_token(TokenKind::KeywordArg, start);
            }
            b'<' if self.src[start as usize..].starts_with("<body>") => {
                self.pos += 6;
                self.push_token(TokenKind::BodyPlaceholder, start);
            }
            b'<' => {
                self.pos += 1;
                if self.cur() == Some(b'=') {
                    self.pos += 1;
                    self.push_token(TokenKind::Le, start);
                } else {
                    self.push_token(TokenKind::Lt, start);
                }
            }
            b'>' => {
                self.pos += 1;
                if self.cur() == Some(b'=') {
                    self.pos += 1;
                    self.push_token(TokenKind::Ge, start);
                } else {
                    self.push_token(TokenKind::Gt, start);
                }
            }
            b'=' => {
                self.pos += 1;
                self.push_token(TokenKind::Eq, start);
            }
            b'!' if self.at(1) == Some(b'=') => {
                self.pos += 2;
                self.push_token(TokenKind::Ne, start);
            }
            b'+' => {
                self.pos += 1;
                self.push_token(TokenKind::Plus, start);
            }
            b'-' if self.at(1).is_some_and(|c| c.is_ascii_digit()) && self.literal_context() => {
                self.pos += 1;
                self.scan_number(start);
            }
            b'-' => {
                self.pos += 1;
                self.push_token(TokenKind::Minus, start);
            }
            b'*' => {
                self.pos += 1;
                self.push_token(TokenKind::Star, start);
            }
            b'/' => {
                self.pos += 1;
                self.push_token(TokenKind::Slash, start);
            }
            b'%' => {
                self.pos += 1;
                self.push_token(TokenKind::Percent, start);
            }
            c if c.is_ascii_digit() => self.scan_number(start),
            c if is_ident_start(c) => self.scan_ident(start),
            _ => self.scan_error(start),
        }
    }

    /// Whether a `-` immediately followed by a digit should be read as part
    /// of a negative literal: the preceding non-trivia token is `(`, or this
    /// is the start of the file, or the last raw item is whitespace
    /// following something that is not itself a number.
    fn literal_context(&self) -> bool {
        let last_token = self.raw.iter().rev().find_map(|item| match item {
            RawItem::Token { kind, .. } => Some(*kind),
            RawItem::Trivia { .. } => None,
        });
        !matches!(last_token, Some(TokenKind::Int | TokenKind::Float))
    }

    fn scan_number(&mut self, start: u32) {
        while self.cur().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let mut is_float = false;
        if self.cur() == Some(b'.') && self.at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.pos += 1;
            while self.cur().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        self.push_token(
            if is_float {
                TokenKind::Float
            } else {
                TokenKind::Int
            },
            start,
        );
    }

    fn scan_ident(&mut self, start: u32) {
        while self.cur().is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        let text = self.slice(start, self.pos);
        let kind = match text.as_str() {
            "true" | "false" => TokenKind::Bool,
            "null" => TokenKind::Null,
            _ => TokenKind::Ident,
        };
        self.push_token(kind, start);
    }

    fn scan_member_chain(&mut self, start: u32) {
        loop {
            self.pos += 1; // consume '.'
            while self.cur().is_some_and(is_ident_continue) {
                self.pos += 1;
            }
            if self.cur() != Some(b'.') || !self.at(1).is_some_and(is_ident_start) {
                break;
            }
        }
        self.push_token(TokenKind::MemberAccess, start);
    }

    fn scan_blackboard(&mut self, start: u32) {
        self.pos += 1; // consume '$'
        while self.cur().is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        while self.cur() == Some(b'.') && self.at(1).is_some_and(is_ident_start) {
            self.pos += 1;
            while self.cur().is_some_and(is_ident_continue) {
                self.pos += 1;
            }
        }
        self.push_token(TokenKind::BlackboardAccess, start);
    }

    fn scan_enum_literal(&mut self, start: u32) {
        self.pos += 2; // consume '::'
        while self.cur().is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        if self.cur() == Some(b'.') {
            self.pos += 1;
            while self.cur().is_some_and(is_ident_continue) {
                self.pos += 1;
            }
        }
        self.push_token(TokenKind::EnumLiteral, start);
    }

    fn scan_string(&mut self, start: u32) {
        self.pos += 1; // opening quote
        loop {
            match self.cur() {
                None | Some(b'\n') => {
                    self.diagnostics.push(Diagnostic::new(
                        DiagnosticCode::BS0017,
                        Span::new(start, self.pos),
                        vec![],
                    ));
                    break;
                }
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    self.pos += 1;
                    if self.cur().is_some() {
                        self.pos += 1;
                    }
                }
                Some(_) => {
                    self.pos += 1;
                }
            }
        }
        self.push_token(TokenKind::String, start);
    }

    fn scan_error(&mut self, start: u32) {
        while !matches!(self.cur(), None | Some(b' ' | b'\t' | b'\r' | b'\n' | b'(' | b')')) {
            self.pos += 1;
        }
        if self.pos == start {
            self.pos += 1;
        }
        let span = Span::new(start, self.pos);
        self.diagnostics.push(Diagnostic::new(
            DiagnosticCode::BS0016,
            span,
            vec![self.slice(start, self.pos)],
        ));
        self.push_token(TokenKind::Error, start);
    }

    /// Distributes trivia runs between the previous token's trailing
    /// position and the next token's leading position, splitting each run
    /// at its first newline per the Roslyn rule.
    fn attach_trivia(raw: Vec<RawItem>) -> Vec<Token> {
        let mut tokens: Vec<Token> = Vec::new();
        let mut pending: Vec<Trivia> = Vec::new();

        for item in raw {
            match item {
                RawItem::Trivia { kind, span, text } => pending.push(Trivia { kind, span, text }),
                RawItem::Token { kind, span, text } => {
                    if let Some(prev) = tokens.last_mut() {
                        let split = pending
                            .iter()
                            .position(|t| t.kind == TriviaKind::Newline)
                            .map_or(pending.len(), |i| i + 1);
                        let trailing: Vec<_> = pending.drain(..split).collect();
                        prev.trailing_trivia = trailing;
                    }
                    tokens.push(Token {
                        kind,
                        span,
                        text,
                        leading_trivia: std::mem::take(&mut pending),
                        trailing_trivia: Vec::new(),
                    });
                }
            }
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().0.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_parens_and_idents() {
        assert_eq!(
            kinds("(tree T)"),
            vec![
                TokenKind::LParen,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::RParen,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn negative_literal_after_paren() {
        let (tokens, _) = Lexer::new("(< .Health -30)").tokenize();
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Int && t.text == "-30"));
    }

    #[test]
    fn minus_after_literal_is_operator() {
        let (tokens, _) = Lexer::new("(- 30 5)").tokenize();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::LParen,
                TokenKind::Minus,
                TokenKind::Int,
                TokenKind::Int,
                TokenKind::RParen,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn member_access_chain_is_one_token() {
        let (tokens, _) = Lexer::new(".Foo.Bar.Baz").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::MemberAccess);
        assert_eq!(tokens[0].text, ".Foo.Bar.Baz");
    }

    #[test]
    fn trailing_trivia_stops_at_newline() {
        let (tokens, _) = Lexer::new("(a) ; comment\n(b)").tokenize();
        let first_rparen = &tokens[2];
        assert_eq!(first_rparen.kind, TokenKind::RParen);
        assert!(first_rparen
            .trailing_trivia
            .iter()
            .any(|t| t.kind == TriviaKind::LineComment));
        assert!(first_rparen
            .trailing_trivia
            .iter()
            .any(|t| t.kind == TriviaKind::Newline));
    }

    #[test]
    fn full_string_round_trips_source() {
        let src = "(tree T ; hi\n  (.Patrol))";
        let (tokens, _) = Lexer::new(src).tokenize();
        let rebuilt: String = tokens.iter().map(Token::full_text).collect();
        assert_eq!(rebuilt, src);
    }

    #[test]
    fn unterminated_string_reports_bs0017() {
        let (_, diags) = Lexer::new("(\"unterminated)").tokenize();
        assert!(diags
            .iter()
            .any(|d| d.code == DiagnosticCode::BS0017));
    }
}
