//! The life of an additional code from draft to rollback

use crate::test_utils::*;
use tariffdb::{Partition, RecordData, TariffError, TransactionPosition, WorkflowStatus};

/// Additional code `{X, 1}` valid from 2021
fn code_x1() -> RecordData {
    RecordData::new(additional_code("X", "1"), from(2021))
}

// ============================================================================
// Scenario A: draft visibility
// ============================================================================

#[test]
fn test_draft_is_visible_only_from_its_workbasket() {
    let db = checked_db();
    let w1 = workbasket(&db, "W1");
    let (created, t1) = create(&db, w1, code_x1());

    let txn = db.transaction(t1).unwrap();
    assert_eq!(txn.position(), TransactionPosition::new(Partition::Draft, 1));

    let identity = additional_code("X", "1");
    assert_eq!(db.resolve_as_of(&identity, t1).unwrap(), Some(created));
    assert_eq!(db.resolve_latest_approved(&identity), None);

    // Another workbasket cannot see it either
    let other = workbasket(&db, "other");
    let (_, t_other) = create(&db, other, RecordData::new(additional_code("X", "2"), from(2021)));
    assert_eq!(db.resolve_as_of(&identity, t_other).unwrap(), None);
}

// ============================================================================
// Scenario B: first approval seeds history
// ============================================================================

#[test]
fn test_first_approval_becomes_the_seed() {
    let db = checked_db();
    let w1 = workbasket(&db, "W1");
    let (created, t1) = create(&db, w1, code_x1());

    assert!(db.validate_workbasket(w1).unwrap().is_empty());
    db.submit_for_approval(w1).unwrap();
    let positions = db.approve(w1, APPROVER).unwrap();

    assert_eq!(positions, vec![TransactionPosition::new(Partition::SeedFile, 1)]);
    let txn = db.transaction(t1).unwrap();
    assert_eq!(txn.partition, Partition::SeedFile);
    assert_eq!(txn.order, 1);
    assert_eq!(
        db.resolve_latest_approved(&additional_code("X", "1")).unwrap().id,
        created.id
    );
    assert_eq!(db.latest_approved_transaction().unwrap().id, t1);
}

// ============================================================================
// Scenario C: overlapping update
// ============================================================================

#[test]
fn test_overlapping_update_yields_one_violation() {
    let db = checked_db();
    let w1 = workbasket(&db, "W1");
    create(&db, w1, code_x1());
    validate_and_approve(&db, w1);

    // Stretch back over 2020, which the approved version never covered
    let w2 = workbasket(&db, "W2");
    let (updated, t2) = update(&db, w2, code_x1().with_validity(from(2020)));

    let violations = db.validate_workbasket(w2).unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].rule_code, "ACN2");
    assert_eq!(violations[0].version, updated.id);
    assert_eq!(violations[0].transaction, t2);

    let errors = db.check_errors(w2);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].rule_code, "ACN2");
}

#[test]
fn test_end_dating_update_passes() {
    let db = checked_db();
    let w1 = workbasket(&db, "W1");
    create(&db, w1, code_x1());
    validate_and_approve(&db, w1);

    let w2 = workbasket(&db, "W2");
    update(&db, w2, code_x1().with_validity(between(2021, 2025)));
    assert!(db.validate_workbasket(w2).unwrap().is_empty());
}

#[test]
fn test_recreating_live_identity_is_refused() {
    let db = checked_db();
    let w1 = workbasket(&db, "W1");
    let (_, t1) = create(&db, w1, code_x1());
    validate_and_approve(&db, w1);

    // Creating the same identity again is refused at append time
    let w2 = workbasket(&db, "W2");
    let mut scope = db.begin(w2).unwrap();
    let err = scope.create(code_x1()).unwrap_err();
    assert!(matches!(err, TariffError::IdentityConflict { .. }));
    assert!(err.is_conflict());
    assert!(scope.finish().is_none());
    assert!(db.transactions_of(w2).is_empty());
    assert_eq!(db.current_transaction(w2).unwrap(), Some(t1));
}

// ============================================================================
// Scenario D: failing check blocks submission until revalidated
// ============================================================================

#[test]
fn test_failing_check_blocks_then_revalidation_unblocks() {
    let db = checked_db();
    let w1 = workbasket(&db, "W1");
    let (original, _) = create(&db, w1, code_x1());
    validate_and_approve(&db, w1);

    // W3 introduces type Y, still in draft
    let w3 = workbasket(&db, "W3");
    create(&db, w3, RecordData::new(additional_code_type("Y"), from(2000)));

    // W2 points {X,1} at type Y, which W2 cannot see yet
    let w2 = workbasket(&db, "W2");
    let (linked, _) = update(&db, w2, code_x1().link(additional_code_type("Y")));
    let violations = db.validate_workbasket(w2).unwrap();
    assert_eq!(violations.len(), 2);
    assert!(violations.iter().any(|v| v.rule_code == "ACN4"));
    assert!(violations.iter().any(|v| v.rule_code == "ACN3"));

    let err = db.submit_for_approval(w2).unwrap_err();
    assert!(matches!(err, TariffError::NotFullyChecked { unchecked: 1, .. }));
    assert_eq!(db.workbasket(w2).unwrap().status, WorkflowStatus::Editing);

    // Once W3 is approved, W2's old check is stale rather than failed
    validate_and_approve(&db, w3);
    assert_eq!(db.unchecked_or_errored_transactions(w2).len(), 1);

    assert!(db.validate_workbasket(w2).unwrap().is_empty());
    db.submit_for_approval(w2).unwrap();
    let positions = db.approve(w2, APPROVER).unwrap();
    assert_eq!(positions, vec![TransactionPosition::new(Partition::Revision, 2)]);

    let group = db.history(original.group).unwrap();
    assert_eq!(group.len(), 2);
    assert_eq!(
        db.resolve_latest_approved(&additional_code("X", "1")).unwrap().id,
        linked.id
    );
}

// ============================================================================
// Scenario E: rollback and restore
// ============================================================================

#[test]
fn test_errored_workbasket_rolls_back_pointer() {
    let db = checked_db();
    let w1 = workbasket(&db, "W1");
    let (original, _) = create(&db, w1, code_x1());
    validate_and_approve(&db, w1);

    let w3 = workbasket(&db, "W3");
    let (revised, _) = update(&db, w3, code_x1().with_validity(between(2021, 2030)));
    validate_and_approve(&db, w3);
    db.export_to_cds(w3).unwrap();
    db.cds_confirmed(w3).unwrap();
    assert_eq!(db.workbasket(w3).unwrap().status, WorkflowStatus::Published);

    let identity = additional_code("X", "1");
    assert_eq!(db.resolve_latest_approved(&identity).unwrap().id, revised.id);

    db.mark_errored(w3).unwrap();
    assert_eq!(db.workbasket(w3).unwrap().status, WorkflowStatus::Errored);
    assert_eq!(db.resolve_latest_approved(&identity).unwrap().id, original.id);

    db.restore(w3).unwrap();
    assert_eq!(db.workbasket(w3).unwrap().status, WorkflowStatus::Editing);
    assert_eq!(db.resolve_latest_approved(&identity).unwrap().id, original.id);

    // The audit trail keeps both versions
    assert_eq!(db.history(original.group).unwrap().len(), 2);
}

#[test]
fn test_restored_workbasket_can_be_resubmitted() {
    let db = checked_db();
    let w1 = workbasket(&db, "W1");
    create(&db, w1, code_x1());
    validate_and_approve(&db, w1);

    let w3 = workbasket(&db, "W3");
    let (revised, t3) = update(&db, w3, code_x1().with_validity(between(2021, 2030)));
    validate_and_approve(&db, w3);
    let committed = db.transaction(t3).unwrap().position();
    db.export_to_cds(w3).unwrap();
    db.mark_errored(w3).unwrap();
    db.restore(w3).unwrap();

    validate_and_approve(&db, w3);
    assert_eq!(db.transaction(t3).unwrap().position(), committed);
    assert_eq!(
        db.resolve_latest_approved(&additional_code("X", "1")).unwrap().id,
        revised.id
    );
    assert_eq!(db.metrics().approvals, 3);
    assert_eq!(db.metrics().rollbacks, 1);
}

#[test]
fn test_restored_workbasket_sees_its_own_revision() {
    let db = checked_db();
    let w1 = workbasket(&db, "W1");
    let (original, _) = create(&db, w1, code_x1());
    validate_and_approve(&db, w1);

    let w3 = workbasket(&db, "W3");
    let (revised, _) = update(&db, w3, code_x1().with_validity(between(2021, 2030)));
    validate_and_approve(&db, w3);
    db.export_to_cds(w3).unwrap();
    db.mark_errored(w3).unwrap();
    db.restore(w3).unwrap();

    // A new edit in the restored workbasket builds on its committed revision
    let (_, t_new) = create(&db, w3, RecordData::new(additional_code("X", "2"), from(2021)));
    let identity = additional_code("X", "1");
    assert_eq!(db.resolve_as_of(&identity, t_new).unwrap().unwrap().id, revised.id);
    assert_eq!(db.resolve_current(&identity, t_new).unwrap().unwrap().id, revised.id);
    assert_eq!(db.resolve_latest_approved(&identity).unwrap().id, original.id);

    // Other workbaskets still see the rolled-back pointer
    let other = workbasket(&db, "other");
    let (_, t_other) = create(&db, other, RecordData::new(additional_code("X", "3"), from(2021)));
    assert_eq!(db.resolve_as_of(&identity, t_other).unwrap().unwrap().id, original.id);

    validate_and_approve(&db, w3);
    assert_eq!(db.resolve_latest_approved(&identity).unwrap().id, revised.id);
}

#[test]
fn test_approved_workbasket_cannot_be_errored_before_export() {
    let db = checked_db();
    let w1 = workbasket(&db, "W1");
    create(&db, w1, code_x1());
    validate_and_approve(&db, w1);

    let err = db.mark_errored(w1).unwrap_err();
    assert!(matches!(
        err,
        TariffError::InvalidTransition { from: WorkflowStatus::Approved, .. }
    ));
    assert!(db.resolve_latest_approved(&additional_code("X", "1")).is_some());
}
