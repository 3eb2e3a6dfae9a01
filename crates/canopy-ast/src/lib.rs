#![warn(clippy::pedantic)]
//! CST->AST lowering and the defdec/macro/cross-tree AST rewriters for the
//! Canopy behavior-tree DSL (components C3 and C4).
//!
//! ```
//! use canopy_syntax::parse;
//! use canopy_ast::lower_and_rewrite;
//!
//! let source = "(tree T (select (.Patrol)))";
//! let (cst, parse_diags) = parse(source);
//! assert!(parse_diags.is_empty());
//! let (program, _arena, diags) = lower_and_rewrite(&cst);
//! assert!(diags.is_empty());
//! assert_eq!(program.trees.len(), 1);
//! ```

pub mod ast;
pub mod ids;
pub mod lower;
pub mod rewrite;

use canopy_diagnostics::DiagnosticBag;
use canopy_syntax::cst::CstTree;

pub use ast::{AstArena, Node, Program};
pub use ids::IdAllocator;

/// Runs the full C3+C4 pipeline over a parsed CST: lowers it to an AST, then
/// expands macros and defdecs and resolves cross-tree references. Shares one
/// [`IdAllocator`] across both stages so every rewritten or synthesized node
/// gets an id past the highest one the parser produced.
#[must_use]
pub fn lower_and_rewrite(cst: &CstTree) -> (Program, AstArena, DiagnosticBag) {
    let (lowered, mut diagnostics) = lower::lower(cst);
    let lower::LowerResult { program, mut ids, .. } = lowered;
    let (program, arena, rewrite_diags) = rewrite::rewrite_program(program, cst, &mut ids);
    diagnostics.extend(rewrite_diags);
    (program, arena, diagnostics)
}
