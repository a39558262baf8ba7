//! Shared helpers for the scenario suite

#![allow(dead_code)]

use chrono::NaiveDate;
use std::sync::Arc;
use tariffdb::{
    Database, EntityKind, EntityVersion, IdentifyingKey, MustExist, NoOverlapping,
    PreventDeleteIfInUse, RecordData, RuleRegistry, TariffConfig, TransactionId,
    UniqueIdentifyingFields, UserId, ValidityPeriod, ValidityPeriodContained, WorkBasketId,
};

pub const AUTHOR: UserId = UserId::new(1);
pub const APPROVER: UserId = UserId::new(2);

/// Route tracing output through the test harness
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn from(year: i32) -> ValidityPeriod {
    ValidityPeriod::starting(date(year, 1, 1))
}

pub fn between(start: i32, end: i32) -> ValidityPeriod {
    ValidityPeriod::new(date(start, 1, 1), Some(date(end, 1, 1))).unwrap()
}

/// Additional code `{type, code}`
pub fn additional_code(ty: &str, code: &str) -> IdentifyingKey {
    IdentifyingKey::new(EntityKind::AdditionalCode)
        .with("type", ty)
        .with("code", code)
}

/// Additional code type `{type}`
pub fn additional_code_type(ty: &str) -> IdentifyingKey {
    IdentifyingKey::new(EntityKind::AdditionalCodeType).with("type", ty)
}

/// Rules on additional codes and their types
///
/// | Code | Kind | Shape |
/// |------|------|-------|
/// | ACN1 | additional code | unique identifying fields |
/// | ACN2 | additional code | no overlapping |
/// | ACN3 | additional code (indirect on type) | within its type |
/// | ACN4 | additional code | type must exist |
/// | CT1 | additional code type | no delete while in use |
pub fn registry() -> RuleRegistry {
    RuleRegistry::new()
        .with_rule(
            EntityKind::AdditionalCode,
            UniqueIdentifyingFields::new("ACN1", "The additional code must be unique."),
        )
        .with_rule(
            EntityKind::AdditionalCode,
            NoOverlapping::new(
                "ACN2",
                "Versions of an additional code must not overlap in time.",
            ),
        )
        .with_linked_rule(
            EntityKind::AdditionalCode,
            EntityKind::AdditionalCodeType,
            ValidityPeriodContained::new(
                "ACN3",
                "The validity period of the additional code must be within that of its type.",
                EntityKind::AdditionalCodeType,
            ),
        )
        .with_rule(
            EntityKind::AdditionalCode,
            MustExist::new(
                "ACN4",
                "The referenced additional code type must exist.",
                EntityKind::AdditionalCodeType,
            ),
        )
        .with_rule(
            EntityKind::AdditionalCodeType,
            PreventDeleteIfInUse::new(
                "CT1",
                "An additional code type cannot be deleted while it is used.",
            )
            .used_by([EntityKind::AdditionalCode]),
        )
}

/// Ephemeral database with the additional code rules
pub fn checked_db() -> Arc<Database> {
    init_tracing();
    Database::builder().rules(registry()).ephemeral().unwrap()
}

/// Ephemeral database that does not require checks before submission
pub fn unchecked_db() -> Arc<Database> {
    init_tracing();
    Database::builder()
        .rules(registry())
        .config(TariffConfig {
            skip_validation: true,
            ..TariffConfig::default()
        })
        .ephemeral()
        .unwrap()
}

pub fn workbasket(db: &Database, title: &str) -> WorkBasketId {
    db.create_workbasket(title, "scenario", AUTHOR).unwrap().id
}

/// One transaction holding one CREATE
pub fn create(db: &Database, wb: WorkBasketId, data: RecordData) -> (EntityVersion, TransactionId) {
    let mut scope = db.begin(wb).unwrap();
    let version = scope.create(data).unwrap();
    (version, scope.finish().unwrap())
}

/// One transaction holding one UPDATE of the identity's current group
pub fn update(db: &Database, wb: WorkBasketId, data: RecordData) -> (EntityVersion, TransactionId) {
    let group = db.resolve_latest_approved(&data.identity).unwrap().group;
    let mut scope = db.begin(wb).unwrap();
    let version = scope.update(group, data).unwrap();
    (version, scope.finish().unwrap())
}

/// Validate, submit and approve; panics on any failure
pub fn validate_and_approve(db: &Database, wb: WorkBasketId) {
    let violations = db.validate_workbasket(wb).unwrap();
    assert!(violations.is_empty(), "unexpected violations: {:?}", violations);
    db.submit_for_approval(wb).unwrap();
    db.approve(wb, APPROVER).unwrap();
}
