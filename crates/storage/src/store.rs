//! VersionStore: thread-safe handle over the catalog
//!
//! This module wraps the `Catalog` in a `parking_lot::RwLock`:
//! - `StoreReader`: shared guard exposing every catalog read
//! - `StoreWriter`: exclusive guard adding the mutating operations
//!
//! A multi-step change (approval: re-partition, status change, pointer
//! advance) runs under one `StoreWriter`, so readers never observe a half
//! applied transition. Dropping the writer is the commit point.
//!
//! # Append invariants
//!
//! - Only draft transactions in editing workbaskets accept versions
//! - CREATE starts a new version group and fails with `IdentityConflict`
//!   if the identity is already live from the caller's point of view
//! - UPDATE/DELETE continue an existing group whose current version is
//!   live; identifying fields never change within a group
//! - Nothing follows a DELETE

use crate::catalog::Catalog;
use crate::checks::CheckBatch;
use crate::records::{GroupRef, TransactionRecord, VersionGroup, WorkBasketRecord};
use chrono::Utc;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rustc_hash::FxHashSet;
use std::ops::Deref;
use tariff_core::{
    ChangeKind, EntityVersion, IdentifyingKey, Partition, RecordData, TariffError, TariffResult,
    TransactionId, UserId, VersionGroupId, VersionId, WorkBasketId, WorkflowStatus,
};
use tracing::debug;

/// Thread-safe versioned record store
#[derive(Debug, Default)]
pub struct VersionStore {
    catalog: RwLock<Catalog>,
}

impl VersionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a shared read guard
    pub fn read(&self) -> StoreReader<'_> {
        StoreReader {
            guard: self.catalog.read(),
        }
    }

    /// Acquire the exclusive write guard
    pub fn write(&self) -> StoreWriter<'_> {
        StoreWriter {
            guard: self.catalog.write(),
        }
    }

    /// See [`Catalog::resolve_latest_approved`]
    pub fn resolve_latest_approved(&self, identity: &IdentifyingKey) -> Option<EntityVersion> {
        self.read().resolve_latest_approved(identity)
    }

    /// See [`Catalog::resolve_as_of`]
    pub fn resolve_as_of(
        &self,
        identity: &IdentifyingKey,
        transaction: TransactionId,
    ) -> TariffResult<Option<EntityVersion>> {
        self.read().resolve_as_of(identity, transaction)
    }

    /// See [`Catalog::resolve_current`]
    pub fn resolve_current(
        &self,
        identity: &IdentifyingKey,
        transaction: TransactionId,
    ) -> TariffResult<Option<EntityVersion>> {
        self.read().resolve_current(identity, transaction)
    }

    /// See [`Catalog::latest_deleted`]
    pub fn latest_deleted(&self, identity: &IdentifyingKey) -> Option<EntityVersion> {
        self.read().latest_deleted(identity)
    }

    /// Get a transaction row by value
    pub fn transaction(&self, id: TransactionId) -> TariffResult<TransactionRecord> {
        self.read().transaction(id).cloned()
    }

    /// Get a workbasket row by value
    pub fn workbasket(&self, id: WorkBasketId) -> TariffResult<WorkBasketRecord> {
        self.read().workbasket(id).cloned()
    }
}

/// Shared read access to the catalog
pub struct StoreReader<'a> {
    guard: RwLockReadGuard<'a, Catalog>,
}

impl Deref for StoreReader<'_> {
    type Target = Catalog;

    fn deref(&self) -> &Catalog {
        &self.guard
    }
}

/// Exclusive write access to the catalog
pub struct StoreWriter<'a> {
    guard: RwLockWriteGuard<'a, Catalog>,
}

impl Deref for StoreWriter<'_> {
    type Target = Catalog;

    fn deref(&self) -> &Catalog {
        &self.guard
    }
}

impl StoreWriter<'_> {
    // =========================================================================
    // Workbaskets
    // =========================================================================

    /// Create a workbasket in `Editing`; titles are unique
    pub fn create_workbasket(
        &mut self,
        title: &str,
        reason: &str,
        author: UserId,
    ) -> TariffResult<WorkBasketRecord> {
        if title.trim().is_empty() {
            return Err(TariffError::invalid_input("workbasket title is empty"));
        }
        if self.workbasket_by_title(title).is_some() {
            return Err(TariffError::invalid_input(format!(
                "workbasket title '{}' is already in use",
                title
            )));
        }
        let catalog = &mut *self.guard;
        catalog.next_workbasket += 1;
        let now = Utc::now();
        let record = WorkBasketRecord {
            id: WorkBasketId::new(catalog.next_workbasket),
            title: title.to_string(),
            reason: reason.to_string(),
            author,
            approver: None,
            status: WorkflowStatus::Editing,
            created_at: now,
            updated_at: now,
        };
        catalog.workbaskets.insert(record.id, record.clone());
        Ok(record)
    }

    /// Set a workbasket's status
    pub fn set_status(&mut self, id: WorkBasketId, status: WorkflowStatus) -> TariffResult<()> {
        let record = self.workbasket_mut(id)?;
        record.status = status;
        record.updated_at = Utc::now();
        Ok(())
    }

    /// Set or clear a workbasket's approver
    pub fn set_approver(&mut self, id: WorkBasketId, approver: Option<UserId>) -> TariffResult<()> {
        self.workbasket_mut(id)?.approver = approver;
        Ok(())
    }

    fn workbasket_mut(&mut self, id: WorkBasketId) -> TariffResult<&mut WorkBasketRecord> {
        self.guard
            .workbaskets
            .get_mut(&id)
            .ok_or_else(|| TariffError::not_found(format!("workbasket {}", id)))
    }

    fn require_editable(&self, id: WorkBasketId) -> TariffResult<()> {
        let record = self.workbasket(id)?;
        if !record.status.is_editable() {
            return Err(TariffError::WorkBasketNotEditable {
                workbasket: id,
                status: record.status,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Insert a draft transaction at `order` in an editing workbasket
    pub fn insert_transaction(
        &mut self,
        workbasket: WorkBasketId,
        order: u64,
    ) -> TariffResult<TransactionRecord> {
        self.require_editable(workbasket)?;
        if order <= self.last_order_in_workbasket(workbasket) {
            return Err(TariffError::ordering_conflict(format!(
                "order {} is not after the last order of workbasket {}",
                order, workbasket
            )));
        }
        let catalog = &mut *self.guard;
        catalog.next_transaction += 1;
        let record = TransactionRecord {
            id: TransactionId::new(catalog.next_transaction),
            workbasket,
            partition: Partition::Draft,
            order,
            created_at: Utc::now(),
        };
        catalog.transactions.insert(record.id, record.clone());
        catalog
            .workbasket_transactions
            .entry(workbasket)
            .or_default()
            .push(record.id);
        debug!(target: "tariff::store", transaction = %record.id, workbasket = %workbasket, order, "Transaction opened");
        Ok(record)
    }

    /// Remove a transaction that never received a version
    pub fn remove_empty_transaction(&mut self, id: TransactionId) -> TariffResult<bool> {
        if self.newest_version_in(id).is_some() {
            return Ok(false);
        }
        let catalog = &mut *self.guard;
        let Some(record) = catalog.transactions.remove(&id) else {
            return Ok(false);
        };
        if let Some(txns) = catalog.workbasket_transactions.get_mut(&record.workbasket) {
            txns.retain(|t| *t != id);
        }
        catalog.transaction_versions.remove(&id);
        Ok(true)
    }

    /// Move a transaction to `(partition, order)`
    ///
    /// Callers are the sequencer's commit step only.
    pub fn reassign_transaction(
        &mut self,
        id: TransactionId,
        partition: Partition,
        order: u64,
    ) -> TariffResult<()> {
        let record = self
            .guard
            .transactions
            .get_mut(&id)
            .ok_or_else(|| TariffError::not_found(format!("transaction {}", id)))?;
        record.partition = partition;
        record.order = order;
        Ok(())
    }

    // =========================================================================
    // Versions
    // =========================================================================

    /// Append a version row to `transaction`
    pub fn append_version(
        &mut self,
        group: GroupRef,
        change_kind: ChangeKind,
        data: RecordData,
        transaction: TransactionId,
    ) -> TariffResult<EntityVersion> {
        let txn = self.transaction(transaction)?.clone();
        if !txn.is_draft() {
            return Err(TariffError::invalid_input(format!(
                "transaction {} is already committed",
                transaction
            )));
        }
        self.require_editable(txn.workbasket)?;

        let group_id = match (group, change_kind) {
            (GroupRef::New, ChangeKind::Create) => {
                if self.resolve_current(&data.identity, transaction)?.is_some() {
                    return Err(TariffError::IdentityConflict {
                        identity: data.identity.clone(),
                    });
                }
                self.create_group(&data.identity)
            }
            (GroupRef::New, kind) => {
                return Err(TariffError::invalid_input(format!(
                    "{} needs an existing version group",
                    kind
                )))
            }
            (GroupRef::Existing(_), ChangeKind::Create) => {
                return Err(TariffError::invalid_input(
                    "CREATE always starts a new version group",
                ))
            }
            (GroupRef::Existing(id), kind) => {
                let existing = self.group(id)?;
                if existing.identity != data.identity {
                    return Err(TariffError::invalid_input(format!(
                        "identifying fields of group {} are {}, not {}",
                        id, existing.identity, data.identity
                    )));
                }
                let live = self
                    .group_current(id, transaction)?
                    .map_or(false, |v| !v.is_delete());
                if !live {
                    return Err(TariffError::invalid_input(format!(
                        "{} has no live version to {}",
                        data.identity, kind
                    )));
                }
                id
            }
        };

        let catalog = &mut *self.guard;
        catalog.next_version += 1;
        let version = EntityVersion {
            id: VersionId::new(catalog.next_version),
            group: group_id,
            transaction,
            change_kind,
            data,
            recorded_at: Utc::now(),
        };
        for target in &version.data.links {
            catalog.links.insert(target.clone(), group_id);
        }
        if let Some(group) = catalog.groups.get_mut(&group_id) {
            group.versions.push(version.id);
        }
        catalog
            .transaction_versions
            .entry(transaction)
            .or_default()
            .push(version.id);
        catalog.versions.insert(version.id, version.clone());

        debug!(
            target: "tariff::store",
            version = %version.id,
            group = %group_id,
            transaction = %transaction,
            change = %change_kind,
            identity = %version.data.identity,
            "Version appended"
        );
        Ok(version)
    }

    fn create_group(&mut self, identity: &IdentifyingKey) -> VersionGroupId {
        let catalog = &mut *self.guard;
        catalog.next_group += 1;
        let id = VersionGroupId::new(catalog.next_group);
        catalog.groups.insert(
            id,
            VersionGroup {
                id,
                identity: identity.clone(),
                versions: Vec::new(),
                current_version: None,
            },
        );
        catalog.identities.insert(identity.clone(), id);
        catalog.kinds.insert(identity.kind, id);
        id
    }

    // =========================================================================
    // Current version pointers
    // =========================================================================

    /// Point every group touched by `workbasket` at its newest approved version
    ///
    /// Run after the workbasket's status change: on approval this advances
    /// the pointers to the workbasket's versions, on error it rolls them
    /// back past them. Returns the groups whose pointer moved.
    pub fn refresh_current_versions(
        &mut self,
        workbasket: WorkBasketId,
    ) -> TariffResult<Vec<(VersionGroupId, Option<VersionId>)>> {
        let mut moved = Vec::new();
        for group_id in self.groups_touched_by(workbasket) {
            let newest = self.newest_approved_version(group_id)?;
            let group = self
                .guard
                .groups
                .get_mut(&group_id)
                .ok_or_else(|| TariffError::not_found(format!("version group {}", group_id)))?;
            if group.current_version != newest {
                group.current_version = newest;
                moved.push((group_id, newest));
            }
        }
        Ok(moved)
    }

    // =========================================================================
    // Checks
    // =========================================================================

    /// Replace every check for the batch's transactions in one step
    pub fn replace_checks(&mut self, batch: CheckBatch) -> usize {
        self.guard.checks.replace(batch, Utc::now())
    }

    /// Delete every check for a workbasket's transactions
    pub fn delete_checks(&mut self, workbasket: WorkBasketId) -> usize {
        let txns: FxHashSet<TransactionId> = self
            .transactions_of(workbasket)
            .into_iter()
            .map(|t| t.id)
            .collect();
        self.guard.checks.delete_for(&txns)
    }
}
