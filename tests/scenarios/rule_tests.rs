//! Rules that reach beyond the version being checked

use crate::test_utils::*;
use tariffdb::{
    Database, EntityKind, IdentifyingKey, MustExist, OnlyApplicableAfter, RecordData,
    RuleRegistry, TariffError, TransactionId, WorkBasketId,
};

/// Approved type `T` from 2000 with code `{T,1}` from 2021 using it
fn approved_type_in_use(db: &Database) {
    let w1 = workbasket(db, "W1");
    create(db, w1, RecordData::new(additional_code_type("T"), from(2000)));
    create(
        db,
        w1,
        RecordData::new(additional_code("T", "1"), from(2021)).link(additional_code_type("T")),
    );
    validate_and_approve(db, w1);
}

/// One transaction holding one DELETE of the identity's current version
fn delete(db: &Database, wb: WorkBasketId, identity: &IdentifyingKey) -> TransactionId {
    let current = db.resolve_latest_approved(identity).unwrap();
    let mut scope = db.begin(wb).unwrap();
    scope.delete(current.group, current.data.clone()).unwrap();
    scope.finish().unwrap()
}

// ============================================================================
// Delete protection
// ============================================================================

#[test]
fn test_deleting_type_in_use_is_refused() {
    let db = checked_db();
    approved_type_in_use(&db);

    let w2 = workbasket(&db, "W2");
    delete(&db, w2, &additional_code_type("T"));
    let violations = db.validate_workbasket(w2).unwrap();

    // CT1 on the delete itself, ACN3 on the code that would lose its type
    assert_eq!(violations.len(), 2);
    assert!(violations.iter().any(|v| v.rule_code == "CT1"));
    assert!(violations
        .iter()
        .any(|v| v.rule_code == "ACN3" && v.identity == additional_code("T", "1")));

    let err = db.submit_for_approval(w2).unwrap_err();
    assert!(matches!(err, TariffError::NotFullyChecked { .. }));
}

#[test]
fn test_deleting_type_after_its_codes_passes() {
    let db = checked_db();
    approved_type_in_use(&db);

    let w2 = workbasket(&db, "W2");
    delete(&db, w2, &additional_code("T", "1"));
    delete(&db, w2, &additional_code_type("T"));
    validate_and_approve(&db, w2);

    let ty = additional_code_type("T");
    assert!(db.resolve_latest_approved(&ty).is_none());
    assert!(db.latest_deleted(&ty).is_some());
    assert!(db.resolve_latest_approved(&additional_code("T", "1")).is_none());
}

// ============================================================================
// Indirect rules
// ============================================================================

#[test]
fn test_shortening_type_rechecks_its_codes() {
    let db = checked_db();
    approved_type_in_use(&db);
    let code = db.resolve_latest_approved(&additional_code("T", "1")).unwrap();

    let w2 = workbasket(&db, "W2");
    let (_, t2) = update(
        &db,
        w2,
        RecordData::new(additional_code_type("T"), between(2000, 2010)),
    );
    let violations = db.validate_workbasket(w2).unwrap();

    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].rule_code, "ACN3");
    assert_eq!(violations[0].version, code.id);
    assert_eq!(violations[0].transaction, t2);
    assert_eq!(db.check_errors(w2).len(), 1);
    assert!(db.submit_for_approval(w2).is_err());
}

#[test]
fn test_extending_type_passes() {
    let db = checked_db();
    approved_type_in_use(&db);

    let w2 = workbasket(&db, "W2");
    update(&db, w2, RecordData::new(additional_code_type("T"), from(1990)));
    validate_and_approve(&db, w2);
}

// ============================================================================
// Ad hoc validation
// ============================================================================

#[test]
fn test_validate_is_idempotent_and_not_persisted() {
    let db = checked_db();
    approved_type_in_use(&db);

    let w2 = workbasket(&db, "W2");
    let (shortened, _) = update(
        &db,
        w2,
        RecordData::new(additional_code_type("T"), between(2000, 2010)),
    );

    let first = db.validate(&[shortened.clone()]).unwrap();
    let second = db.validate(&[shortened]).unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
    assert!(db.checks(w2).is_empty());
}

#[test]
fn test_parallel_duplicate_fails_after_first_is_approved() {
    let db = checked_db();
    let data = RecordData::new(additional_code("X", "1"), from(2021));

    let w1 = workbasket(&db, "W1");
    let w2 = workbasket(&db, "W2");
    create(&db, w1, data.clone());
    create(&db, w2, data);

    validate_and_approve(&db, w1);
    let violations = db.validate_workbasket(w2).unwrap();
    assert_eq!(violations.len(), 2);
    assert!(violations.iter().any(|v| v.rule_code == "ACN1"));
    assert!(violations.iter().any(|v| v.rule_code == "ACN2"));
}

#[test]
fn test_delete_then_recreate_in_one_workbasket_passes() {
    let db = checked_db();
    let w1 = workbasket(&db, "W1");
    create(&db, w1, RecordData::new(additional_code("X", "1"), from(2021)));
    validate_and_approve(&db, w1);
    let identity = additional_code("X", "1");
    let original = db.resolve_latest_approved(&identity).unwrap();

    let w2 = workbasket(&db, "W2");
    delete(&db, w2, &identity);
    let (recreated, t2) = create(&db, w2, RecordData::new(identity.clone(), from(2020)));
    assert_eq!(db.resolve_as_of(&identity, t2).unwrap().unwrap().id, recreated.id);

    assert!(db.validate_workbasket(w2).unwrap().is_empty());
    db.submit_for_approval(w2).unwrap();
    db.approve(w2, APPROVER).unwrap();

    let live = db.resolve_latest_approved(&identity).unwrap();
    assert_eq!(live.id, recreated.id);
    assert_ne!(live.group, original.group);
}

#[test]
fn test_cutoff_skips_versions_starting_before_it() {
    init_tracing();
    let registry = RuleRegistry::new().with_rule(
        EntityKind::AdditionalCode,
        OnlyApplicableAfter::new(
            date(2020, 12, 31),
            MustExist::new(
                "ACN4",
                "The referenced additional code type must exist.",
                EntityKind::AdditionalCodeType,
            ),
        ),
    );
    let db = Database::builder().rules(registry).ephemeral().unwrap();
    let wb = workbasket(&db, "legacy");

    let (legacy, _) = create(
        &db,
        wb,
        RecordData::new(additional_code("Z", "1"), from(2019)).link(additional_code_type("Z")),
    );
    let (recent, _) = create(
        &db,
        wb,
        RecordData::new(additional_code("Z", "2"), from(2022)).link(additional_code_type("Z")),
    );

    assert!(db.validate(&[legacy]).unwrap().is_empty());
    let violations = db.validate(&[recent.clone()]).unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].rule_code, "ACN4");
    assert_eq!(violations[0].version, recent.id);
}
