//! RAII transaction scope
//!
//! A `TransactionScope` is the only way edits reach the store: open a scope
//! on a workbasket, append through it, and every version is stamped with
//! the scope's transaction. The transaction row itself is created lazily on
//! the first append, so a scope that appends nothing leaves nothing behind.
//!
//! ```text
//! let mut scope = TransactionScope::begin(&sequencer, &store, workbasket)?;
//! let version = scope.create(data)?;
//! let txn = scope.finish();
//! ```
//!
//! The scope holds the workbasket's write lock until it is dropped. Dropping
//! on an error path removes the transaction row if no append succeeded.

use crate::sequencer::{TransactionSequencer, WorkBasketGuard};
use tariff_core::{
    ChangeKind, EntityVersion, RecordData, TariffError, TariffResult, TransactionId,
    VersionGroupId, VersionId, WorkBasketId,
};
use tariff_storage::{GroupRef, VersionStore};
use tracing::debug;

/// Scoped batch of appends that become one transaction
pub struct TransactionScope<'a> {
    sequencer: &'a TransactionSequencer,
    store: &'a VersionStore,
    workbasket: WorkBasketId,
    transaction: Option<TransactionId>,
    appended: Vec<VersionId>,
    _guard: WorkBasketGuard,
}

impl<'a> TransactionScope<'a> {
    /// Open a scope on an editing workbasket
    pub fn begin(
        sequencer: &'a TransactionSequencer,
        store: &'a VersionStore,
        workbasket: WorkBasketId,
    ) -> TariffResult<Self> {
        let guard = sequencer.lock_workbasket(workbasket);
        let record = store.workbasket(workbasket)?;
        if !record.status.is_editable() {
            return Err(TariffError::WorkBasketNotEditable {
                workbasket,
                status: record.status,
            });
        }
        Ok(Self {
            sequencer,
            store,
            workbasket,
            transaction: None,
            appended: Vec::new(),
            _guard: guard,
        })
    }

    /// Workbasket this scope writes to
    pub fn workbasket(&self) -> WorkBasketId {
        self.workbasket
    }

    /// Transaction opened by the first append, if any
    pub fn transaction(&self) -> Option<TransactionId> {
        self.transaction
    }

    /// Versions appended so far
    pub fn appended(&self) -> &[VersionId] {
        &self.appended
    }

    /// Start a new record
    pub fn create(&mut self, data: RecordData) -> TariffResult<EntityVersion> {
        self.append(GroupRef::New, ChangeKind::Create, data)
    }

    /// Append an update to an existing record
    pub fn update(
        &mut self,
        group: VersionGroupId,
        data: RecordData,
    ) -> TariffResult<EntityVersion> {
        self.append(GroupRef::Existing(group), ChangeKind::Update, data)
    }

    /// Append a delete to an existing record
    pub fn delete(
        &mut self,
        group: VersionGroupId,
        data: RecordData,
    ) -> TariffResult<EntityVersion> {
        self.append(GroupRef::Existing(group), ChangeKind::Delete, data)
    }

    /// Append a version stamped with this scope's transaction
    pub fn append(
        &mut self,
        group: GroupRef,
        change_kind: ChangeKind,
        data: RecordData,
    ) -> TariffResult<EntityVersion> {
        let mut writer = self.store.write();
        let transaction = match self.transaction {
            Some(txn) => txn,
            None => {
                let record = self.sequencer.open_transaction(&mut writer, self.workbasket)?;
                self.transaction = Some(record.id);
                record.id
            }
        };
        let version = writer.append_version(group, change_kind, data, transaction)?;
        self.appended.push(version.id);
        // Any edit invalidates every check in the workbasket
        writer.delete_checks(self.workbasket);
        Ok(version)
    }

    /// Close the scope, returning the transaction if anything was appended
    pub fn finish(mut self) -> Option<TransactionId> {
        self.release()
    }

    fn release(&mut self) -> Option<TransactionId> {
        let transaction = self.transaction.take()?;
        if !self.appended.is_empty() {
            return Some(transaction);
        }
        let removed = self
            .store
            .write()
            .remove_empty_transaction(transaction)
            .unwrap_or(false);
        debug!(
            target: "tariff::txn",
            transaction = %transaction,
            removed,
            "Empty transaction discarded"
        );
        None
    }
}

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tariff_core::{EntityKind, IdentifyingKey, UserId, ValidityPeriod, WorkflowStatus};

    fn record(id: &str) -> RecordData {
        RecordData::new(
            IdentifyingKey::new(EntityKind::Certificate).with("code", id),
            ValidityPeriod::starting(NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()),
        )
    }

    fn setup() -> (TransactionSequencer, VersionStore, WorkBasketId) {
        let store = VersionStore::new();
        let wb = store
            .write()
            .create_workbasket("wb", "", UserId::new(1))
            .unwrap()
            .id;
        (TransactionSequencer::new(), store, wb)
    }

    #[test]
    fn test_scope_stamps_every_append() {
        let (seq, store, wb) = setup();
        let mut scope = TransactionScope::begin(&seq, &store, wb).unwrap();
        let a = scope.create(record("A")).unwrap();
        let b = scope.create(record("B")).unwrap();
        let txn = scope.finish().unwrap();
        assert_eq!(a.transaction, txn);
        assert_eq!(b.transaction, txn);
        assert_eq!(store.read().versions_in_transaction(txn).len(), 2);
    }

    #[test]
    fn test_empty_scope_leaves_no_transaction() {
        let (seq, store, wb) = setup();
        let scope = TransactionScope::begin(&seq, &store, wb).unwrap();
        assert!(scope.finish().is_none());
        assert!(store.read().transactions_of(wb).is_empty());
    }

    #[test]
    fn test_failed_first_append_leaves_no_transaction() {
        let (seq, store, wb) = setup();
        {
            let mut scope = TransactionScope::begin(&seq, &store, wb).unwrap();
            let err = scope
                .append(GroupRef::New, ChangeKind::Update, record("A"))
                .unwrap_err();
            assert!(matches!(err, TariffError::InvalidInput(_)));
        }
        assert!(store.read().transactions_of(wb).is_empty());
    }

    #[test]
    fn test_scopes_get_consecutive_orders() {
        let (seq, store, wb) = setup();
        for id in ["A", "B", "C"] {
            let mut scope = TransactionScope::begin(&seq, &store, wb).unwrap();
            scope.create(record(id)).unwrap();
        }
        let orders: Vec<u64> = store
            .read()
            .transactions_of(wb)
            .iter()
            .map(|t| t.order)
            .collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[test]
    fn test_begin_rejects_non_editable() {
        let (seq, store, wb) = setup();
        store
            .write()
            .set_status(wb, WorkflowStatus::Archived)
            .unwrap();
        let err = TransactionScope::begin(&seq, &store, wb).err().unwrap();
        assert!(matches!(err, TariffError::WorkBasketNotEditable { .. }));
    }
}
