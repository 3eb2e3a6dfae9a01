#![warn(clippy::pedantic)]
//! AST→IR lowering, the IR optimizer pass manager, and the S-expression IR
//! format (C8, C9, C11).

pub mod ir;
pub mod lower;
pub mod optimize;
pub mod sexpr;

pub use ir::{IrArg, IrExpr, IrId, IrNode, IrTree, IrUnaryOp, MemberRef, MethodRef};
pub use lower::{lower, LowerResult};
pub use optimize::optimize;
pub use sexpr::{parse_node, serialize_expr, serialize_node};

use canopy_ast::ast::Program;
use canopy_ast::ids::IdAllocator;
use canopy_diagnostics::DiagnosticBag;
use canopy_sema::{PromotionTable, SymbolTable, TypeTable};

/// Runs C8 lowering followed by C9's four ordered optimizer passes over
/// every tree in `program`, per spec.md §4.8/§4.9.
#[must_use]
pub fn lower_and_optimize(
    program: &Program,
    symbols: &SymbolTable,
    types: &TypeTable,
    promotions: &PromotionTable,
    ids: &mut IdAllocator,
) -> (Vec<IrTree>, DiagnosticBag) {
    let (result, diagnostics) = lower::lower(program, symbols, types, promotions, ids);
    let trees = result.trees.into_iter().map(|t| optimize::optimize(t, ids)).collect();
    (trees, diagnostics)
}
