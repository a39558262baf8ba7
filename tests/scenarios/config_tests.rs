//! Configuration persisted next to the data directory

use crate::test_utils::*;
use tariffdb::{
    Database, Partition, RecordData, TariffConfig, TariffError, TransactionPosition,
    CONFIG_FILE_NAME,
};

#[test]
fn test_open_writes_default_config() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path()).unwrap();

    assert!(!db.is_ephemeral());
    assert_eq!(db.data_dir(), dir.path());
    assert!(dir.path().join(CONFIG_FILE_NAME).exists());
    assert_eq!(db.config(), TariffConfig::default());
}

#[test]
fn test_config_updates_survive_reopen() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    {
        let db = Database::open(dir.path()).unwrap();
        db.update_config(|c| c.skip_validation = true).unwrap();
    }
    let db = Database::open(dir.path()).unwrap();
    assert!(db.config().skip_validation);
}

#[test]
fn test_invalid_update_keeps_old_config() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path()).unwrap();

    let err = db.update_config(|c| c.max_pending_jobs = 0).unwrap_err();
    assert!(matches!(err, TariffError::Config(_)));
    assert_eq!(db.config().max_pending_jobs, TariffConfig::default().max_pending_jobs);

    let reopened = TariffConfig::from_file(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
    assert_eq!(reopened, TariffConfig::default());
}

#[test]
fn test_revision_only_scheme_skips_the_seed() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = TariffConfig {
        partition_scheme: "REVISION_ONLY".to_string(),
        skip_validation: true,
        ..TariffConfig::default()
    };
    let db = Database::open_with_config(dir.path(), config).unwrap();

    let wb = workbasket(&db, "W1");
    create(&db, wb, RecordData::new(additional_code("X", "1"), from(2021)));
    db.submit_for_approval(wb).unwrap();
    let positions = db.approve(wb, APPROVER).unwrap();
    assert_eq!(positions, vec![TransactionPosition::new(Partition::Revision, 1)]);
}

#[test]
fn test_skip_validation_allows_unchecked_submission() {
    let db = unchecked_db();
    let wb = workbasket(&db, "W1");
    create(&db, wb, RecordData::new(additional_code("X", "1"), from(2021)));
    assert_eq!(db.unchecked_or_errored_transactions(wb).len(), 1);
    db.submit_for_approval(wb).unwrap();
}
