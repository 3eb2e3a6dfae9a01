//! AST rewriters (C4): defdec expansion, macro expansion and cross-tree
//! reference resolution.
//!
//! All three run as a fixed pipeline over one lowered [`crate::ast::Program`]
//! and share the same [`crate::ids::IdAllocator`], so every node synthesized
//! by a rewrite gets an id past the highest one the parser or an earlier
//! rewrite handed out. None of them mutate an existing node in place: each
//! produces a new tree, leaving the input untouched, which is what lets a
//! query-engine layer cache the pre-rewrite lowering independently.

mod cross_ref;
mod defdec;
mod macro_expand;

pub use cross_ref::resolve_cross_tree_refs;
pub use defdec::expand_defdecs;
pub use macro_expand::expand_macros;

use canopy_diagnostics::DiagnosticBag;
use canopy_syntax::cst::CstTree;

use crate::ast::{AstArena, Program};
use crate::ids::IdAllocator;

/// Runs the three rewriters in the order the expansion semantics require:
/// macros first (they can themselves expand to defdec calls or refs),
/// then defdecs, then cross-tree reference resolution, which needs the
/// fully expanded shape of every tree to validate `ref` targets.
///
/// `cst` is the tree the program was lowered from; macro expansion needs it
/// to re-lower each `defmacro` template fresh at every call site.
pub fn rewrite_program(
    program: Program,
    cst: &CstTree,
    ids: &mut IdAllocator,
) -> (Program, AstArena, DiagnosticBag) {
    let mut diagnostics = DiagnosticBag::new();

    let (program, macro_diags) = expand_macros(program, cst, ids);
    diagnostics.extend(macro_diags);

    let (program, defdec_diags) = expand_defdecs(program, ids);
    diagnostics.extend(defdec_diags);

    let cross_ref_diags = resolve_cross_tree_refs(&program);
    diagnostics.extend(cross_ref_diags);

    let mut arena = AstArena::new();
    for tree in &program.trees {
        arena.index(&tree.root);
    }

    (program, arena, diagnostics)
}
