//! Incremental-reuse invariants from spec.md §8, beyond the single
//! scenario-4 reparse exercised in `scenarios.rs`.

use std::rc::Rc;

use crate::utils::{db_for, NPC_FIXTURE};

/// Re-running a derived query with nothing invalidated must not recompute:
/// the returned value is the very same `Rc` as the previous call.
#[test]
fn unchanged_inputs_reuse_every_derived_query() {
    let source = "(tree T (select (seq (check (< .Health 30)) (.Flee)) (.Patrol)))";
    let (mut db, file) = db_for(source, "Npc", NPC_FIXTURE);

    let lex1 = db.lex(&file).unwrap();
    let parse1 = db.parse(&file).unwrap();
    let lower1 = db.lower(&file).unwrap();
    let resolve1 = db.resolve(&file).unwrap();
    let check1 = db.type_check(&file).unwrap();
    let ir1 = db.emit_ir(&file).unwrap();

    assert!(Rc::ptr_eq(&lex1, &db.lex(&file).unwrap()));
    assert!(Rc::ptr_eq(&parse1, &db.parse(&file).unwrap()));
    assert!(Rc::ptr_eq(&lower1, &db.lower(&file).unwrap()));
    assert!(Rc::ptr_eq(&resolve1, &db.resolve(&file).unwrap()));
    assert!(Rc::ptr_eq(&check1, &db.type_check(&file).unwrap()));
    assert!(Rc::ptr_eq(&ir1, &db.emit_ir(&file).unwrap()));
}

/// Editing the source text invalidates every derived query that transitively
/// reads it, forcing a fresh `Rc` out of each on the next call.
#[test]
fn source_edit_invalidates_every_dependent_query() {
    let (mut db, file) = db_for("(tree T (select (.Patrol)))", "Npc", NPC_FIXTURE);

    let lower1 = db.lower(&file).unwrap();
    let resolve1 = db.resolve(&file).unwrap();
    let ir1 = db.emit_ir(&file).unwrap();

    db.set_source_text(file.clone(), Rc::<str>::from("(tree T (select (.Flee)))"));

    assert!(!Rc::ptr_eq(&lower1, &db.lower(&file).unwrap()));
    assert!(!Rc::ptr_eq(&resolve1, &db.resolve(&file).unwrap()));
    assert!(!Rc::ptr_eq(&ir1, &db.emit_ir(&file).unwrap()));
}

/// A `context_type` edit invalidates resolution/type-checking/IR, but the
/// syntax-only queries (`lex`, `parse`) don't depend on it and must survive
/// untouched.
#[test]
fn context_type_edit_spares_syntax_queries() {
    let (mut db, file) = db_for("(tree T (select (.Patrol)))", "Npc", NPC_FIXTURE);

    let parse1 = db.parse(&file).unwrap();
    let resolve1 = db.resolve(&file).unwrap();

    db.set_context_type(file.clone(), Rc::<str>::from("OtherNpc"));

    assert!(Rc::ptr_eq(&parse1, &db.parse(&file).unwrap()));
    assert!(!Rc::ptr_eq(&resolve1, &db.resolve(&file).unwrap()));
}

/// Setting an input to an equal value is a no-op: the revision does not
/// advance, so dependent queries keep their cached value.
#[test]
fn setting_the_same_source_text_again_does_not_invalidate() {
    let source = "(tree T (select (.Patrol)))";
    let (mut db, file) = db_for(source, "Npc", NPC_FIXTURE);

    let parse1 = db.parse(&file).unwrap();
    db.set_source_text(file.clone(), Rc::<str>::from(source));
    assert!(Rc::ptr_eq(&parse1, &db.parse(&file).unwrap()));
}
