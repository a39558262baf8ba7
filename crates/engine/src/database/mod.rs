//! Database struct and open logic
//!
//! This module provides the main Database struct that orchestrates:
//! - The versioned record store
//! - Transaction sequencing and the RAII edit scope
//! - The rule registry used by validation jobs
//! - Configuration read from `tariff.toml`
//!
//! ## Edit API
//!
//! Every edit goes through a [`TransactionScope`] opened on an editing
//! workbasket:
//!
//! ```text
//! let wb = db.create_workbasket("Regulation 2024/17", "new duties", author)?;
//! let mut scope = db.begin(wb.id)?;
//! scope.create(data)?;
//! let txn = scope.finish();
//! ```
//!
//! The scope holds the workbasket's write lock. Workflow transitions on the
//! same workbasket wait for it, so finish or drop a scope before calling
//! them from the same thread.

mod builder;
pub mod config;

pub use builder::DatabaseBuilder;
pub use config::{TariffConfig, CONFIG_FILE_NAME};

use crate::coordinator::{WorkflowCoordinator, WorkflowMetrics};
use crate::jobs::ValidationOutbox;
use crate::publish::{NoopPublishHook, PublishHook};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tariff_concurrency::{PartitionScheme, TransactionScope, TransactionSequencer};
use tariff_core::{
    EntityVersion, IdentifyingKey, Partition, TariffError, TariffResult, TransactionId, UserId,
    VersionGroupId, WorkBasketId,
};
use tariff_rules::RuleRegistry;
use tariff_storage::{
    CheckRecord, CheckState, StoreReader, TransactionRecord, VersionQuery, VersionStore,
    WorkBasketRecord,
};
use tracing::{info, warn};

/// Tariff regulatory database
///
/// Owns the record store and everything that coordinates writes to it.
/// Shared between threads behind an `Arc`.
pub struct Database {
    /// Directory holding `tariff.toml`; empty for ephemeral databases
    data_dir: PathBuf,

    /// Versioned tables
    pub(crate) store: VersionStore,

    /// Per-workbasket write locks and commit sequencing
    pub(crate) sequencer: TransactionSequencer,

    /// Kind → rules, fixed at open
    pub(crate) registry: RuleRegistry,

    /// Unified configuration (mirrors tariff.toml)
    config: RwLock<TariffConfig>,

    /// Validation jobs awaiting results
    pub(crate) jobs: ValidationOutbox,

    /// Downstream export collaborator
    pub(crate) publish_hook: Arc<dyn PublishHook>,

    /// Transition and validation counters
    pub(crate) coordinator: WorkflowCoordinator,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("data_dir", &self.data_dir)
            .field("config", &*self.config.read())
            .field("rules", &self.registry.len())
            .field("pending_jobs", &self.jobs.len())
            .finish()
    }
}

impl Database {
    /// Open a database in `path`, creating `tariff.toml` with defaults if needed
    ///
    /// No rules are registered; use [`Database::builder`] to supply them.
    pub fn open<P: AsRef<Path>>(path: P) -> TariffResult<Arc<Self>> {
        Self::builder().path(path.as_ref()).open()
    }

    /// Open a database in `path` with an explicit configuration
    ///
    /// The configuration is written to `tariff.toml` so that later opens
    /// pick up the same settings.
    pub fn open_with_config<P: AsRef<Path>>(path: P, cfg: TariffConfig) -> TariffResult<Arc<Self>> {
        Self::builder().path(path.as_ref()).config(cfg).open()
    }

    /// In-memory database with default configuration and no rules
    pub fn ephemeral() -> TariffResult<Arc<Self>> {
        Self::builder().ephemeral()
    }

    /// Fluent builder for rules, hooks and configuration
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    pub(crate) fn assemble(
        data_dir: PathBuf,
        cfg: TariffConfig,
        registry: RuleRegistry,
        publish_hook: Option<Arc<dyn PublishHook>>,
    ) -> TariffResult<Arc<Self>> {
        cfg.validate()?;
        info!(
            target: "tariff::workbasket",
            data_dir = %data_dir.display(),
            partition_scheme = %cfg.partition_scheme,
            rules = registry.len(),
            "Database opened"
        );
        Ok(Arc::new(Self {
            data_dir,
            store: VersionStore::new(),
            sequencer: TransactionSequencer::new(),
            registry,
            jobs: ValidationOutbox::new(cfg.max_pending_jobs),
            config: RwLock::new(cfg),
            publish_hook: publish_hook.unwrap_or_else(|| Arc::new(NoopPublishHook)),
            coordinator: WorkflowCoordinator::new(),
        }))
    }

    // ========================================================================
    // Config Accessors
    // ========================================================================

    /// Data directory; empty for ephemeral databases
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Check if the database has no data directory
    pub fn is_ephemeral(&self) -> bool {
        self.data_dir.as_os_str().is_empty()
    }

    /// Return a clone of the current configuration
    pub fn config(&self) -> TariffConfig {
        self.config.read().clone()
    }

    /// Apply a mutation to the configuration
    ///
    /// The result must validate; otherwise the old configuration is kept.
    /// The partition scheme is fixed once any transaction has been committed.
    /// Disk-backed databases write the new configuration to `tariff.toml`.
    pub fn update_config<F: FnOnce(&mut TariffConfig)>(&self, f: F) -> TariffResult<()> {
        // Store before config, the order approval takes them in
        let reader = self.store.read();
        let mut guard = self.config.write();
        let mut next = guard.clone();
        f(&mut next);
        next.validate()?;
        if next.partition_scheme()? != guard.partition_scheme()?
            && (reader.has_partition(Partition::SeedFile)
                || reader.has_partition(Partition::Revision))
        {
            warn!(
                target: "tariff::workbasket",
                from = %guard.partition_scheme,
                to = %next.partition_scheme,
                "Partition scheme change refused"
            );
            return Err(TariffError::config(
                "partition_scheme cannot change once transactions are committed",
            ));
        }
        if !self.is_ephemeral() {
            next.write_to_file(&self.data_dir.join(CONFIG_FILE_NAME))?;
        }
        self.jobs.set_capacity(next.max_pending_jobs);
        *guard = next;
        Ok(())
    }

    /// Partition scheme applied by the next approval
    pub fn partition_scheme(&self) -> TariffResult<PartitionScheme> {
        self.config.read().partition_scheme()
    }

    pub(crate) fn skip_validation(&self) -> bool {
        self.config.read().skip_validation
    }

    /// Rules used by validation
    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Snapshot of workflow counters
    pub fn metrics(&self) -> WorkflowMetrics {
        self.coordinator.metrics()
    }

    // ========================================================================
    // Workbaskets and edits
    // ========================================================================

    /// Create a workbasket in `Editing`
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the title is empty or already taken.
    pub fn create_workbasket(
        &self,
        title: &str,
        reason: &str,
        author: UserId,
    ) -> TariffResult<WorkBasketRecord> {
        let record = self.store.write().create_workbasket(title, reason, author)?;
        self.coordinator.record_workbasket_created();
        info!(target: "tariff::workbasket", workbasket = %record.id, title, "Workbasket created");
        Ok(record)
    }

    /// Get a workbasket by id
    pub fn workbasket(&self, id: WorkBasketId) -> TariffResult<WorkBasketRecord> {
        self.store.workbasket(id)
    }

    /// Find a workbasket by its unique title
    pub fn workbasket_by_title(&self, title: &str) -> Option<WorkBasketRecord> {
        self.store.read().workbasket_by_title(title).cloned()
    }

    /// Transactions of a workbasket in workbasket-local order
    pub fn transactions_of(&self, workbasket: WorkBasketId) -> Vec<TransactionRecord> {
        self.store
            .read()
            .transactions_of(workbasket)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Get a transaction by id
    pub fn transaction(&self, id: TransactionId) -> TariffResult<TransactionRecord> {
        self.store.transaction(id)
    }

    /// Open an edit scope on an editing workbasket
    ///
    /// # Errors
    ///
    /// `WorkBasketNotEditable` if the workbasket is not in `Editing`.
    pub fn begin(&self, workbasket: WorkBasketId) -> TariffResult<TransactionScope<'_>> {
        TransactionScope::begin(&self.sequencer, &self.store, workbasket)
    }

    /// Reference point for reads made on behalf of a workbasket
    ///
    /// The workbasket's last transaction, or the latest approved transaction
    /// when the workbasket has none. `None` on an empty database.
    pub fn current_transaction(&self, workbasket: WorkBasketId) -> TariffResult<Option<TransactionId>> {
        let reader = self.store.read();
        reader.workbasket(workbasket)?;
        Ok(reader
            .transactions_of(workbasket)
            .last()
            .map(|t| t.id)
            .or_else(|| reader.latest_approved_transaction().map(|t| t.id)))
    }

    /// Latest approved transaction in history
    pub fn latest_approved_transaction(&self) -> Option<TransactionRecord> {
        self.store.read().latest_approved_transaction().cloned()
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Shared read guard over the whole catalog
    ///
    /// Blocks approvals and edits while held.
    pub fn reader(&self) -> StoreReader<'_> {
        self.store.read()
    }

    /// Version a group's current pointer names, hiding deletes
    pub fn resolve_latest_approved(&self, identity: &IdentifyingKey) -> Option<EntityVersion> {
        self.store.resolve_latest_approved(identity)
    }

    /// Version visible from `transaction`, drafts of its workbasket included
    pub fn resolve_as_of(
        &self,
        identity: &IdentifyingKey,
        transaction: TransactionId,
    ) -> TariffResult<Option<EntityVersion>> {
        self.store.resolve_as_of(identity, transaction)
    }

    /// Version visible from `transaction`, or its group's current version
    pub fn resolve_current(
        &self,
        identity: &IdentifyingKey,
        transaction: TransactionId,
    ) -> TariffResult<Option<EntityVersion>> {
        self.store.resolve_current(identity, transaction)
    }

    /// Current version of a deleted identity
    pub fn latest_deleted(&self, identity: &IdentifyingKey) -> Option<EntityVersion> {
        self.store.latest_deleted(identity)
    }

    /// Every version of an identity visible from `transaction`
    pub fn versions_up_to(
        &self,
        identity: &IdentifyingKey,
        transaction: TransactionId,
    ) -> TariffResult<Vec<EntityVersion>> {
        self.store.read().versions_up_to(identity, transaction)
    }

    /// The CREATE row of an identity
    pub fn first_version(&self, identity: &IdentifyingKey) -> Option<EntityVersion> {
        self.store.read().first_version(identity)
    }

    /// Every version of a group in append order
    pub fn history(&self, group: VersionGroupId) -> TariffResult<Vec<EntityVersion>> {
        self.store.read().history(group)
    }

    /// Run a query against a consistent snapshot
    pub fn query(&self, query: &VersionQuery) -> TariffResult<Vec<EntityVersion>> {
        query.fetch(&self.store.read())
    }

    // ========================================================================
    // Checks
    // ========================================================================

    /// Freshness of a transaction's latest check
    pub fn check_state(&self, transaction: TransactionId) -> CheckState {
        self.store.read().check_state(transaction)
    }

    /// Transactions blocking submission: missing, stale or failing checks
    pub fn unchecked_or_errored_transactions(&self, workbasket: WorkBasketId) -> Vec<TransactionId> {
        self.store.read().unchecked_or_errored_transactions(workbasket)
    }

    /// Every check row for a workbasket
    pub fn checks(&self, workbasket: WorkBasketId) -> Vec<CheckRecord> {
        self.store.read().checks_for_workbasket(workbasket)
    }

    /// Failing check rows for a workbasket
    pub fn check_errors(&self, workbasket: WorkBasketId) -> Vec<CheckRecord> {
        self.store.read().check_errors(workbasket)
    }
}
