//! The six concrete test scenarios of spec.md §8, run verbatim against
//! `canopy-db`'s `QueryDb`.

use canopy_ast::ast::{BinaryOp, LiteralValue};
use canopy_diagnostics::DiagnosticCode;
use canopy_ir::{IrExpr, IrNode};
use canopy_sema::TypeRef;

use crate::utils::{db_for, NPC_FIXTURE, TARGET_FIXTURE};

/// Scenario 1: a well-typed minimal tree produces no diagnostics and the
/// expected IR shape, including the implicit int->float conversion on the
/// comparison's literal operand.
#[test]
fn minimal_tree_emits_expected_ir() {
    let source = "(tree T (select (seq (check (< .Health 30)) (.Flee)) (.Patrol)))";
    let (mut db, file) = db_for(source, "Npc", NPC_FIXTURE);

    let all = db.all_diagnostics(&file).unwrap();
    assert!(all.is_empty(), "unexpected diagnostics: {:?}", all.iter().collect::<Vec<_>>());

    let emitted = db.emit_ir(&file).unwrap();
    assert!(!emitted.suppressed);
    assert_eq!(emitted.trees.len(), 1);

    let IrNode::Selector(selector) = &emitted.trees[0].root else {
        panic!("expected selector root");
    };
    assert_eq!(selector.children.len(), 2);

    let IrNode::Sequence(sequence) = &selector.children[0] else {
        panic!("expected sequence as selector's first child");
    };
    assert_eq!(sequence.children.len(), 2);

    let IrNode::Condition(condition) = &sequence.children[0] else {
        panic!("expected condition as sequence's first child");
    };
    let IrExpr::BinaryOp(cmp) = &condition.expr else {
        panic!("expected a binary comparison");
    };
    assert_eq!(cmp.op, BinaryOp::Lt);
    assert!(matches!(&cmp.lhs, IrExpr::MemberLoad(m) if m.member.segments == ["Health"] && m.type_ref == TypeRef::Float));
    let IrExpr::Convert(conv) = &cmp.rhs else {
        panic!("expected the int literal promoted with an explicit Convert");
    };
    assert_eq!(conv.target_type, TypeRef::Float);
    assert!(matches!(&conv.operand, IrExpr::Literal(l) if l.value == LiteralValue::Int(30)));

    let IrNode::Action(flee) = &sequence.children[1] else {
        panic!("expected action as sequence's second child");
    };
    assert_eq!(flee.method.name, "Flee");

    let IrNode::Action(patrol) = &selector.children[1] else {
        panic!("expected action as selector's second child");
    };
    assert_eq!(patrol.method.name, "Patrol");
}

/// Scenario 2: a reference to a member the context type doesn't have
/// produces exactly one `BS0001`, naming the member, and no cascading
/// type/resolution errors.
#[test]
fn missing_member_reports_single_diagnostic() {
    let source = "(tree T (check (< .Mana 30)))";
    let (mut db, file) = db_for(source, "Npc", NPC_FIXTURE);

    let all = db.all_diagnostics(&file).unwrap();
    let errors: Vec<_> = all.iter().filter(|d| d.code == DiagnosticCode::BS0001).collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message_args.iter().any(|a| a == "Mana"));

    assert!(!all.iter().any(|d| d.code == DiagnosticCode::BS0003));
    assert!(!all.iter().any(|d| d.code == DiagnosticCode::BS0007));
}

/// Scenario 3: an unmatched opening paren is recovered with `BS0018`, the
/// CST still round-trips the source exactly, and no IR is produced.
#[test]
fn unmatched_paren_recovers_with_round_trip() {
    let source = "(tree T (select (.Patrol)";
    let (mut db, file) = db_for(source, "Npc", NPC_FIXTURE);

    let parsed = db.parse(&file).unwrap();
    assert!(parsed.diagnostics.iter().any(|d| d.code == DiagnosticCode::BS0018));
    assert_eq!(parsed.cst.to_full_string(parsed.cst.root()), source);

    // Lowering still runs over the recovered CST rather than aborting.
    db.lower(&file).unwrap();

    let emitted = db.emit_ir(&file).unwrap();
    assert!(emitted.suppressed);
}

/// Scenario 4: an incremental edit back to the original source reproduces
/// an equal (though not identical) parse result, and the intermediate edit
/// produces a genuinely different one.
#[test]
fn incremental_reparse_reuses_and_diverges() {
    let a = "(tree T (select (.Patrol)))";
    let b = "(tree T (select (.Flee)))";
    let (mut db, file) = db_for(a, "Npc", NPC_FIXTURE);

    let p1 = db.parse(&file).unwrap();

    db.set_source_text(file.clone(), std::rc::Rc::<str>::from(b));
    let p2 = db.parse(&file).unwrap();
    assert_ne!(p1.cst.to_full_string(p1.cst.root()), p2.cst.to_full_string(p2.cst.root()));

    db.set_source_text(file.clone(), std::rc::Rc::<str>::from(a));
    let p3 = db.parse(&file).unwrap();
    assert_eq!(p1.cst.to_full_string(p1.cst.root()), p3.cst.to_full_string(p3.cst.root()));
}

/// Scenario 5: editing one file's source text does not disturb another
/// file's already-cached `parse` result (same object, not merely an equal
/// one).
#[test]
fn cross_file_edits_do_not_interfere() {
    let source = "(tree T (select (.Patrol)))";
    let (mut db, f1) = db_for(source, "Npc", NPC_FIXTURE);
    let f2 = canopy_db::FileId::new("test://other.bt");
    db.set_source_text(f2.clone(), std::rc::Rc::<str>::from(source));
    db.set_context_type(f2.clone(), std::rc::Rc::<str>::from("Npc"));

    let host = canopy_sema::StaticHostTypeProvider::from_json(NPC_FIXTURE).unwrap();
    db.set_roslyn_compilation(f2.clone(), host as std::rc::Rc<dyn canopy_sema::HostTypeProvider>);

    let p2_before = db.parse(&f2).unwrap();

    db.set_source_text(f1.clone(), std::rc::Rc::<str>::from("(tree T (select (.Flee)))"));
    db.parse(&f1).unwrap();

    let p2_after = db.parse(&f2).unwrap();
    assert!(std::rc::Rc::ptr_eq(&p2_before, &p2_after));
}

/// Scenario 6: a nullable member guarded by `(!= x null)` narrows to
/// non-null for the guard's body, so passing it as an argument raises no
/// `BS0044`; removing the guard brings the diagnostic back.
#[test]
fn nullable_narrowing_under_guard() {
    let guarded = "(tree T (seq (guard (!= .Target null) (.Attack .Target))))";
    let (mut db, file) = db_for(guarded, "Npc", TARGET_FIXTURE);
    let all = db.all_diagnostics(&file).unwrap();
    assert!(!all.iter().any(|d| d.code == DiagnosticCode::BS0044));

    let unguarded = "(tree T (seq (.Attack .Target)))";
    let (mut db, file) = db_for(unguarded, "Npc", TARGET_FIXTURE);
    let all = db.all_diagnostics(&file).unwrap();
    assert!(all.iter().any(|d| d.code == DiagnosticCode::BS0044));
}
