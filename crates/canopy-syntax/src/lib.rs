#![warn(clippy::pedantic)]
//! Lexer, lossless CST parser and canonical-source formatter for the Canopy
//! behavior-tree DSL (components C1, C2 and C14).
//!
//! ```
//! use canopy_syntax::parse;
//!
//! let source = "(tree T (select (.Patrol)))";
//! let (tree, diagnostics) = parse(source);
//! assert!(diagnostics.is_empty());
//! assert_eq!(tree.to_full_string(tree.root()), source);
//! ```

pub mod cst;
pub mod format;
pub mod lexer;
pub mod parser;
pub mod token;

use canopy_diagnostics::DiagnosticBag;
use cst::CstTree;

/// Lexes and parses `source`, returning the lossless CST and any parse
/// diagnostics. Never fails: a malformed program still yields a tree
/// satisfying `source == tree.to_full_string(tree.root())`.
#[must_use]
pub fn parse(source: &str) -> (CstTree, DiagnosticBag) {
    let (tokens, lex_diags) = lexer::Lexer::new(source).tokenize();
    let (tree, parse_diags) = parser::Parser::new(&tokens).parse();
    let mut diagnostics = DiagnosticBag::from_iter(lex_diags);
    diagnostics.extend(parse_diags);
    (tree, diagnostics)
}
