//! General testable properties from spec.md §8 not already pinned down by
//! one of the six named scenarios: CST round-trip, id stability across the
//! optimizer, cascade suppression, and the constant-folding/collapse passes
//! that make up "optimizer soundness" for this DSL.

use canopy_ast::ast::LiteralValue;
use canopy_diagnostics::DiagnosticCode;
use canopy_ir::{IrExpr, IrId, IrNode};

use crate::utils::{db_for, NPC_FIXTURE};

/// `source == tree.to_full_string(tree.root())` must hold for any parse,
/// successful or not (spec.md §8's CST round-trip invariant).
#[test]
fn cst_round_trips_well_formed_and_malformed_sources() {
    let sources = [
        "(tree T (select (.Patrol)))",
        "(tree T (select (seq (check (< .Health 30)) (.Flee)) (.Patrol)))",
        "(tree T (select (.Patrol)",
        "(tree T )))extra",
        "",
    ];
    for source in sources {
        let (cst, _) = canopy_syntax::parse(source);
        assert_eq!(cst.to_full_string(cst.root()), source, "round-trip failed for {source:?}");
    }
}

/// An IR node the optimizer doesn't touch (not folded, not collapsed, not
/// fused, not eliminated) keeps the id assigned at lowering time.
#[test]
fn optimizer_preserves_ids_of_untouched_action_nodes() {
    let source = "(tree T (select (.Flee) (.Patrol)))";
    let (mut db, file) = db_for(source, "Npc", NPC_FIXTURE);
    let lowered = db.lower(&file).unwrap();
    let resolved = db.resolve(&file).unwrap();
    let checked = db.type_check(&file).unwrap();

    let mut ids = lowered.ids.clone();
    let (pre, _diags) =
        canopy_ir::lower(&lowered.program, &resolved.symbols, &checked.types, &checked.promotions, &mut ids);
    let pre_tree = pre.trees.into_iter().next().unwrap();

    let IrNode::Selector(sel) = &pre_tree.root else {
        panic!("expected selector root for two sibling actions");
    };
    let pre_ids: Vec<IrId> = sel
        .children
        .iter()
        .map(|c| match c {
            IrNode::Action(a) => a.id,
            other => panic!("expected action child, got {other:?}"),
        })
        .collect();

    let post_tree = canopy_ir::optimize(pre_tree.clone(), &mut ids);
    let IrNode::Selector(post_sel) = &post_tree.root else {
        panic!("two-child selector must survive single-child collapse");
    };
    let post_ids: Vec<IrId> = post_sel
        .children
        .iter()
        .map(|c| match c {
            IrNode::Action(a) => a.id,
            other => panic!("expected action child, got {other:?}"),
        })
        .collect();

    assert_eq!(pre_ids, post_ids);
}

/// Constant folding reduces a fully literal comparison to a literal bool,
/// and iterates to a fixpoint rather than stopping after one pass.
#[test]
fn constant_condition_folds_to_a_literal() {
    let source = "(tree T (check (< 10 20)))";
    let (mut db, file) = db_for(source, "Npc", NPC_FIXTURE);
    let emitted = db.emit_ir(&file).unwrap();
    assert!(!emitted.suppressed);

    let IrNode::Condition(condition) = &emitted.trees[0].root else {
        panic!("expected a condition root");
    };
    assert!(matches!(&condition.expr, IrExpr::Literal(l) if l.value == LiteralValue::Bool(true)));
}

/// A selector or sequence with exactly one child collapses to that child
/// directly; the tree's root becomes the action itself, not a composite.
#[test]
fn single_child_composite_collapses() {
    let source = "(tree T (select (.Patrol)))";
    let (mut db, file) = db_for(source, "Npc", NPC_FIXTURE);
    let emitted = db.emit_ir(&file).unwrap();
    assert!(matches!(&emitted.trees[0].root, IrNode::Action(a) if a.method.name == "Patrol"));
}

/// One root-cause resolution failure produces exactly one diagnostic, not a
/// cascade of dependent type/nullable errors about the same expression
/// (spec.md §8's cascade-suppression invariant), and IR emission is
/// suppressed without panicking on the `TypeRef::Error` sentinel.
#[test]
fn unresolved_member_does_not_cascade_into_type_errors() {
    let source = "(tree T (check (< .Mana .AlsoMissing)))";
    let (mut db, file) = db_for(source, "Npc", NPC_FIXTURE);
    let all = db.all_diagnostics(&file).unwrap();

    let resolution_errors = all.iter().filter(|d| d.code == DiagnosticCode::BS0001).count();
    assert_eq!(resolution_errors, 2, "one BS0001 per unresolved member, no more");

    let comparison_type_errors = all.iter().filter(|d| d.code == DiagnosticCode::BS0003).count();
    assert_eq!(comparison_type_errors, 0, "a failed member resolution must not also report a type mismatch");

    let emitted = db.emit_ir(&file).unwrap();
    assert!(emitted.suppressed);
}
