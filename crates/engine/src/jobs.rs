//! Validation job boundaries
//!
//! Validation runs out of line. The database exposes two message
//! boundaries and leaves the execution engine to a collaborator:
//!
//! 1. `enqueue_validation(workbasket)` records a job and returns its id
//! 2. `validation_completed(job, results)` applies the results
//!
//! Between the two, the workbasket may be edited, submitted or even
//! approved. Each job remembers a fingerprint of the workbasket's
//! transactions and its status at enqueue time. Results whose fingerprint
//! no longer matches are discarded, never applied.
//!
//! Applying results is all-or-nothing: old checks are deleted and the new
//! batch inserted under one write guard. A terminated job writes nothing.

use crate::database::Database;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tariff_core::{
    EntityVersion, TariffError, TariffResult, TransactionId, VersionId, WorkBasketId,
    WorkflowStatus,
};
use tariff_rules::{BusinessRuleChecker, Violation};
use tariff_storage::{Catalog, CheckBatch};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identifier of a validation job
pub type JobId = Uuid;

/// A validation request awaiting results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationJob {
    /// Job id
    pub id: JobId,
    /// Workbasket to validate
    pub workbasket: WorkBasketId,
    /// (transaction, newest version) for each transaction at enqueue time
    pub fingerprint: Vec<(TransactionId, Option<VersionId>)>,
    /// Workbasket status at enqueue time
    pub status: WorkflowStatus,
    /// When the job was enqueued
    pub enqueued_at: DateTime<Utc>,
}

impl ValidationJob {
    /// Transactions covered by the job
    pub fn transactions(&self) -> Vec<TransactionId> {
        self.fingerprint.iter().map(|(txn, _)| *txn).collect()
    }
}

/// Output of running a job's check set
#[derive(Debug, Clone)]
pub struct ValidationResults {
    /// Job the results belong to
    pub job: JobId,
    /// Check rows and per-transaction summaries to persist
    pub batch: CheckBatch,
    /// Failing checks
    pub violations: Vec<Violation>,
}

impl ValidationResults {
    /// Check if every rule passed
    pub fn is_successful(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Current fingerprint of a workbasket's transactions
fn fingerprint(catalog: &Catalog, workbasket: WorkBasketId) -> Vec<(TransactionId, Option<VersionId>)> {
    catalog
        .transactions_of(workbasket)
        .into_iter()
        .map(|t| (t.id, catalog.newest_version_in(t.id)))
        .collect()
}

// ============================================================================
// Outbox
// ============================================================================

/// Bounded set of jobs awaiting results
///
/// The bound is checked before insertion without a global lock, so
/// concurrent enqueues on different workbaskets may briefly exceed it.
#[derive(Debug)]
pub struct ValidationOutbox {
    jobs: DashMap<JobId, ValidationJob>,
    capacity: AtomicUsize,
}

impl ValidationOutbox {
    /// Create an outbox holding at most `capacity` jobs
    pub fn new(capacity: usize) -> Self {
        Self {
            jobs: DashMap::new(),
            capacity: AtomicUsize::new(capacity),
        }
    }

    pub(crate) fn set_capacity(&self, capacity: usize) {
        self.capacity.store(capacity, Ordering::Relaxed);
    }

    /// Number of pending jobs
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Check if no job is pending
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    fn push(&self, job: ValidationJob) -> TariffResult<()> {
        let capacity = self.capacity.load(Ordering::Relaxed);
        if self.jobs.len() >= capacity {
            return Err(TariffError::invalid_input(format!(
                "validation outbox is full ({} pending jobs)",
                capacity
            )));
        }
        self.jobs.insert(job.id, job);
        Ok(())
    }

    fn get(&self, id: JobId) -> Option<ValidationJob> {
        self.jobs.get(&id).map(|entry| entry.value().clone())
    }

    fn remove(&self, id: JobId) -> Option<ValidationJob> {
        self.jobs.remove(&id).map(|(_, job)| job)
    }

    fn remove_for_workbasket(&self, workbasket: WorkBasketId) -> Vec<ValidationJob> {
        let ids: Vec<JobId> = self
            .jobs
            .iter()
            .filter(|entry| entry.value().workbasket == workbasket)
            .map(|entry| *entry.key())
            .collect();
        ids.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    fn snapshot(&self) -> Vec<ValidationJob> {
        let mut jobs: Vec<ValidationJob> = self.jobs.iter().map(|e| e.value().clone()).collect();
        jobs.sort_by_key(|job| job.enqueued_at);
        jobs
    }
}

// ============================================================================
// Database API
// ============================================================================

impl Database {
    /// Record a validation job for a workbasket
    ///
    /// Any earlier job for the same workbasket is superseded and dropped.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown workbasket
    /// - `InvalidInput` when the outbox is full
    pub fn enqueue_validation(&self, workbasket: WorkBasketId) -> TariffResult<JobId> {
        let job = {
            let reader = self.store.read();
            let record = reader.workbasket(workbasket)?;
            ValidationJob {
                id: Uuid::new_v4(),
                workbasket,
                fingerprint: fingerprint(&reader, workbasket),
                status: record.status,
                enqueued_at: Utc::now(),
            }
        };

        for superseded in self.jobs.remove_for_workbasket(workbasket) {
            self.coordinator.record_validation_terminated();
            debug!(target: "tariff::jobs", job = %superseded.id, workbasket = %workbasket, "Validation job superseded");
        }

        let id = job.id;
        let transactions = job.fingerprint.len();
        self.jobs.push(job)?;
        self.coordinator.record_validation_enqueued();
        info!(
            target: "tariff::jobs",
            job = %id,
            workbasket = %workbasket,
            transactions,
            "Validation enqueued"
        );
        Ok(id)
    }

    /// Jobs awaiting results, oldest first
    pub fn pending_jobs(&self) -> Vec<ValidationJob> {
        self.jobs.snapshot()
    }

    /// Get a pending job
    pub fn job(&self, id: JobId) -> Option<ValidationJob> {
        self.jobs.get(id)
    }

    /// Run a pending job's check set against the current store
    ///
    /// Reads only; nothing is persisted until
    /// [`validation_completed`](Self::validation_completed).
    pub fn execute_validation(&self, id: JobId) -> TariffResult<ValidationResults> {
        let job = self
            .jobs
            .get(id)
            .ok_or_else(|| TariffError::not_found(format!("validation job {}", id)))?;
        let reader = self.store.read();
        let checker = BusinessRuleChecker::for_workbasket(&self.registry, &reader, job.workbasket);
        let report = checker.run(&reader)?;
        let violations = report.violations.clone();
        let batch = report.into_batch(&reader, &job.transactions());
        Ok(ValidationResults {
            job: id,
            batch,
            violations,
        })
    }

    /// Apply a job's results, replacing the workbasket's checks
    ///
    /// Returns the number of check rows written.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the job is unknown or was terminated
    /// - `InvalidInput` if the results belong to another job
    /// - `StaleValidation` if the workbasket's transactions or status moved
    ///   on since the job was enqueued; nothing is written
    pub fn validation_completed(&self, id: JobId, results: ValidationResults) -> TariffResult<usize> {
        if results.job != id {
            return Err(TariffError::invalid_input(format!(
                "results of job {} delivered for job {}",
                results.job, id
            )));
        }
        let job = self.jobs.remove(id).ok_or_else(|| {
            warn!(target: "tariff::jobs", job = %id, "Results for unknown validation job");
            TariffError::not_found(format!("validation job {}", id))
        })?;

        let _guard = self.sequencer.lock_workbasket(job.workbasket);
        let mut writer = self.store.write();
        let status = writer.workbasket(job.workbasket)?.status;
        if status != job.status || fingerprint(&writer, job.workbasket) != job.fingerprint {
            self.coordinator.record_stale_result();
            warn!(
                target: "tariff::jobs",
                job = %id,
                workbasket = %job.workbasket,
                enqueued_status = %job.status,
                status = %status,
                "Stale validation result discarded"
            );
            return Err(TariffError::StaleValidation {
                workbasket: job.workbasket,
            });
        }

        let removed = writer.delete_checks(job.workbasket);
        let written = writer.replace_checks(results.batch);
        self.coordinator.record_validation_applied();
        info!(
            target: "tariff::jobs",
            job = %id,
            workbasket = %job.workbasket,
            removed,
            written,
            violations = results.violations.len(),
            "Validation applied"
        );
        Ok(written)
    }

    /// Drop a pending job; its results will be refused
    ///
    /// Returns false if the job was not pending.
    pub fn terminate_validation(&self, id: JobId) -> bool {
        match self.jobs.remove(id) {
            Some(job) => {
                self.coordinator.record_validation_terminated();
                info!(target: "tariff::jobs", job = %id, workbasket = %job.workbasket, "Validation terminated");
                true
            }
            None => false,
        }
    }

    pub(crate) fn terminate_validations_for(&self, workbasket: WorkBasketId) -> usize {
        let dropped = self.jobs.remove_for_workbasket(workbasket);
        for job in &dropped {
            self.coordinator.record_validation_terminated();
            info!(target: "tariff::jobs", job = %job.id, workbasket = %workbasket, "Validation terminated");
        }
        dropped.len()
    }

    /// Enqueue, run and apply validation for a workbasket in one call
    ///
    /// Returns every violation found. Checks are persisted whether or not
    /// the run passed.
    pub fn validate_workbasket(&self, workbasket: WorkBasketId) -> TariffResult<Vec<Violation>> {
        let id = self.enqueue_validation(workbasket)?;
        let results = match self.execute_validation(id) {
            Ok(results) => results,
            Err(e) => {
                self.terminate_validation(id);
                return Err(e);
            }
        };
        let violations = results.violations.clone();
        self.validation_completed(id, results)?;
        Ok(violations)
    }

    /// Run the check set for `versions` without persisting anything
    pub fn validate(&self, versions: &[EntityVersion]) -> TariffResult<Vec<Violation>> {
        let reader = self.store.read();
        BusinessRuleChecker::new(&self.registry, &reader, versions).validate(&reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::TariffConfig;
    use chrono::NaiveDate;
    use tariff_core::{EntityKind, IdentifyingKey, RecordData, UserId, ValidityPeriod};
    use tariff_rules::{RuleRegistry, UniqueIdentifyingFields, ValidityPeriodContained};
    use tariff_storage::CheckState;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn footnote_type() -> IdentifyingKey {
        IdentifyingKey::new(EntityKind::FootnoteType).with("footnote_type_id", "TN")
    }

    fn footnote(id: &str, start: NaiveDate) -> RecordData {
        RecordData::new(
            IdentifyingKey::new(EntityKind::Footnote)
                .with("footnote_type_id", "TN")
                .with("footnote_id", id),
            ValidityPeriod::starting(start),
        )
        .link(footnote_type())
    }

    fn db() -> std::sync::Arc<Database> {
        let registry = RuleRegistry::new()
            .with_rule(EntityKind::Footnote, UniqueIdentifyingFields::new("FO2", "unique"))
            .with_rule(
                EntityKind::Footnote,
                ValidityPeriodContained::new("FO17", "within footnote type", EntityKind::FootnoteType),
            );
        Database::builder().rules(registry).ephemeral().unwrap()
    }

    /// Workbasket with a footnote type and one footnote starting on `start`
    fn seeded(db: &Database, title: &str, start: NaiveDate) -> WorkBasketId {
        let wb = db.create_workbasket(title, "", UserId::new(1)).unwrap().id;
        let mut scope = db.begin(wb).unwrap();
        scope
            .create(RecordData::new(footnote_type(), ValidityPeriod::starting(date(2020, 1, 1))))
            .unwrap();
        scope.create(footnote("001", start)).unwrap();
        scope.finish();
        wb
    }

    #[test]
    fn test_passing_run_marks_transactions_checked() {
        let db = db();
        let wb = seeded(&db, "ok", date(2021, 1, 1));
        let violations = db.validate_workbasket(wb).unwrap();
        assert!(violations.is_empty());
        assert!(db.unchecked_or_errored_transactions(wb).is_empty());
        assert!(db.pending_jobs().is_empty());
        assert_eq!(db.metrics().validations_applied, 1);
    }

    #[test]
    fn test_failing_run_is_persisted() {
        let db = db();
        let wb = seeded(&db, "early", date(2019, 1, 1));
        let violations = db.validate_workbasket(wb).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_code, "FO17");
        let errors = db.check_errors(wb);
        assert_eq!(errors.len(), 1);
        let txn = db.transactions_of(wb)[0].id;
        assert_eq!(db.check_state(txn), CheckState::Failed);
    }

    #[test]
    fn test_edit_during_run_discards_results() {
        let db = db();
        let wb = seeded(&db, "moving", date(2021, 1, 1));
        let job = db.enqueue_validation(wb).unwrap();
        let results = db.execute_validation(job).unwrap();

        let mut scope = db.begin(wb).unwrap();
        scope.create(footnote("002", date(2021, 1, 1))).unwrap();
        scope.finish();

        let err = db.validation_completed(job, results).unwrap_err();
        assert!(matches!(err, TariffError::StaleValidation { workbasket } if workbasket == wb));
        assert!(db.checks(wb).is_empty());
        assert_eq!(db.metrics().stale_results_discarded, 1);
    }

    #[test]
    fn test_status_change_during_run_discards_results() {
        let db = Database::builder()
            .config(TariffConfig {
                skip_validation: true,
                ..TariffConfig::default()
            })
            .ephemeral()
            .unwrap();
        let wb = seeded(&db, "submitted", date(2021, 1, 1));
        let job = db.enqueue_validation(wb).unwrap();
        let results = db.execute_validation(job).unwrap();
        db.submit_for_approval(wb).unwrap();
        assert!(matches!(
            db.validation_completed(job, results),
            Err(TariffError::StaleValidation { .. })
        ));
    }

    #[test]
    fn test_terminated_job_writes_nothing() {
        let db = db();
        let wb = seeded(&db, "cancelled", date(2021, 1, 1));
        let job = db.enqueue_validation(wb).unwrap();
        let results = db.execute_validation(job).unwrap();
        assert!(db.terminate_validation(job));
        assert!(!db.terminate_validation(job));
        assert!(matches!(
            db.validation_completed(job, results),
            Err(TariffError::NotFound(_))
        ));
        assert!(db.checks(wb).is_empty());
    }

    #[test]
    fn test_enqueue_supersedes_earlier_job() {
        let db = db();
        let wb = seeded(&db, "twice", date(2021, 1, 1));
        let first = db.enqueue_validation(wb).unwrap();
        let second = db.enqueue_validation(wb).unwrap();
        assert!(db.job(first).is_none());
        assert_eq!(db.pending_jobs().len(), 1);
        assert_eq!(db.job(second).unwrap().transactions().len(), 1);
    }

    #[test]
    fn test_outbox_capacity() {
        let db = db();
        db.update_config(|c| c.max_pending_jobs = 1).unwrap();
        let a = seeded(&db, "a", date(2021, 1, 1));
        let b = db.create_workbasket("b", "", UserId::new(1)).unwrap().id;
        db.enqueue_validation(a).unwrap();
        assert!(matches!(
            db.enqueue_validation(b),
            Err(TariffError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_results_for_wrong_job_rejected() {
        let db = db();
        let a = seeded(&db, "a", date(2021, 1, 1));
        let b = seeded_other(&db);
        let job_a = db.enqueue_validation(a).unwrap();
        let job_b = db.enqueue_validation(b).unwrap();
        let results_b = db.execute_validation(job_b).unwrap();
        assert!(matches!(
            db.validation_completed(job_a, results_b),
            Err(TariffError::InvalidInput(_))
        ));
        assert!(db.job(job_a).is_some());
    }

    fn seeded_other(db: &Database) -> WorkBasketId {
        let wb = db.create_workbasket("other", "", UserId::new(1)).unwrap().id;
        let mut scope = db.begin(wb).unwrap();
        scope.create(footnote("009", date(2021, 1, 1))).unwrap();
        scope.finish();
        wb
    }

    #[test]
    fn test_validate_does_not_persist() {
        let db = db();
        let wb = seeded(&db, "dry", date(2019, 1, 1));
        let versions: Vec<EntityVersion> = db
            .reader()
            .versions_in_workbasket(wb)
            .into_iter()
            .cloned()
            .collect();
        let first = db.validate(&versions).unwrap();
        let second = db.validate(&versions).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first, second);
        assert!(db.checks(wb).is_empty());
    }
}
