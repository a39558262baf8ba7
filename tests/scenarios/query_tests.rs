//! Reads through the query facade and the history helpers

use crate::test_utils::*;
use serde_json::json;
use tariffdb::{Database, EntityKind, RecordData, TransactionId, VersionQuery};

/// Two approved types, three approved codes, and a draft end-dating `{A,1}`
///
/// Returns the draft's transaction.
fn catalogue(db: &Database) -> TransactionId {
    let w1 = workbasket(db, "W1");
    for ty in ["A", "B"] {
        create(db, w1, RecordData::new(additional_code_type(ty), from(2000)));
    }
    create(
        db,
        w1,
        RecordData::new(additional_code("A", "1"), from(2021)).link(additional_code_type("A")),
    );
    create(
        db,
        w1,
        RecordData::new(additional_code("A", "2"), between(2000, 2010))
            .link(additional_code_type("A")),
    );
    create(
        db,
        w1,
        RecordData::new(additional_code("B", "1"), from(2021))
            .link(additional_code_type("B"))
            .attribute("description", json!("Spirits")),
    );
    validate_and_approve(db, w1);

    let w2 = workbasket(db, "W2");
    let (_, t2) = update(
        db,
        w2,
        RecordData::new(additional_code("A", "1"), between(2021, 2025))
            .link(additional_code_type("A")),
    );
    t2
}

#[test]
fn test_kind_query_reads_latest_approved() {
    let db = checked_db();
    catalogue(&db);

    let codes = db.query(&VersionQuery::kind(EntityKind::AdditionalCode)).unwrap();
    assert_eq!(codes.len(), 3);
    let a1 = codes
        .iter()
        .find(|v| v.data.identity == additional_code("A", "1"))
        .unwrap();
    assert!(a1.data.validity.is_unbounded());
}

#[test]
fn test_live_on_and_links_to_narrow_results() {
    let db = checked_db();
    catalogue(&db);

    let live = VersionQuery::kind(EntityKind::AdditionalCode).live_on(date(2022, 6, 1));
    assert_eq!(db.query(&live).unwrap().len(), 2);

    let of_a = VersionQuery::kind(EntityKind::AdditionalCode).links_to(additional_code_type("A"));
    assert_eq!(db.query(&of_a).unwrap().len(), 2);

    let both = of_a.live_on(date(2005, 1, 1));
    let found = db.query(&both).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].data.identity, additional_code("A", "2"));
}

#[test]
fn test_predicate_filters_on_attributes() {
    let db = checked_db();
    catalogue(&db);

    let spirits = VersionQuery::kind(EntityKind::AdditionalCode)
        .filter(|v| v.data.attributes.get("description") == Some(&json!("Spirits")));
    let found = db.query(&spirits).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].data.identity, additional_code("B", "1"));
}

#[test]
fn test_as_of_modes_differ_on_drafts() {
    let db = checked_db();
    let t2 = catalogue(&db);
    let a1 = additional_code("A", "1");
    let pick = move |q: VersionQuery| q.filter(move |v| v.data.identity == additional_code("A", "1"));

    let approved = db.resolve_latest_approved(&a1).unwrap();
    let draft = db.resolve_as_of(&a1, t2).unwrap().unwrap();
    assert_ne!(approved.id, draft.id);

    let as_of = db
        .query(&pick(VersionQuery::kind(EntityKind::AdditionalCode).as_of(t2)))
        .unwrap();
    assert_eq!(as_of[0].id, draft.id);

    let approved_as_of = db
        .query(&pick(VersionQuery::kind(EntityKind::AdditionalCode).approved_as_of(t2)))
        .unwrap();
    assert_eq!(approved_as_of[0].id, approved.id);

    // Full history includes the draft row
    let all = VersionQuery::kind(EntityKind::AdditionalCode).all_versions();
    assert_eq!(db.query(&all).unwrap().len(), 4);
}

#[test]
fn test_order_by_record_code_puts_types_first() {
    let db = checked_db();
    catalogue(&db);

    let ordered = db.query(&VersionQuery::all().order_by_record_code()).unwrap();
    let kinds: Vec<EntityKind> = ordered.iter().map(|v| v.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            EntityKind::AdditionalCodeType,
            EntityKind::AdditionalCodeType,
            EntityKind::AdditionalCode,
            EntityKind::AdditionalCode,
            EntityKind::AdditionalCode,
        ]
    );
    assert_eq!(ordered[0].data.identity, additional_code_type("A"));
}

#[test]
fn test_history_helpers_after_revision() {
    let db = checked_db();
    let t2 = catalogue(&db);
    let a1 = additional_code("A", "1");
    let original = db.resolve_latest_approved(&a1).unwrap();

    let w2 = db.transaction(t2).unwrap().workbasket;
    validate_and_approve(&db, w2);

    let up_to = db.versions_up_to(&a1, t2).unwrap();
    assert_eq!(up_to.len(), 2);
    assert_eq!(db.first_version(&a1).unwrap().id, original.id);
    assert!(db.latest_deleted(&a1).is_none());
    assert_eq!(db.history(original.group).unwrap().len(), 2);
    assert_eq!(
        db.resolve_latest_approved(&a1).unwrap().data.validity,
        between(2021, 2025)
    );
}
