//! Transaction sequencer
//!
//! Assigns every transaction its `(partition, order)` position:
//!
//! 1. On open: draft partition, order = last order in the workbasket + 1
//! 2. On approval: the scheme's partition, order = max order in that
//!    partition + 1, preserving the workbasket-local relative order
//!
//! Both steps run under the store's exclusive write guard, which serialises
//! every read-max-then-write of an order. Per-workbasket locks additionally
//! give each workbasket a single writer for the lifetime of a
//! `TransactionScope`.

use crate::partition::PartitionScheme;
use dashmap::DashMap;
use parking_lot::{Mutex, RawMutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tariff_core::{
    TariffError, TariffResult, TransactionPosition, WorkBasketId, WorkflowStatus,
};
use tariff_storage::{Catalog, StoreWriter, TransactionRecord};
use tracing::info;

/// Owned guard over one workbasket's write lock
pub type WorkBasketGuard = parking_lot::ArcMutexGuard<RawMutex, ()>;

/// Allocates transaction positions
#[derive(Debug, Default)]
pub struct TransactionSequencer {
    workbasket_locks: DashMap<WorkBasketId, Arc<Mutex<()>>>,
    opened: AtomicU64,
    committed: AtomicU64,
}

impl TransactionSequencer {
    /// Create a sequencer
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the calling thread is the workbasket's only writer
    pub fn lock_workbasket(&self, workbasket: WorkBasketId) -> WorkBasketGuard {
        let lock = self
            .workbasket_locks
            .entry(workbasket)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_arc()
    }

    /// Drop the lock entry of a workbasket that will receive no more writes
    pub fn remove_workbasket_lock(&self, workbasket: WorkBasketId) {
        self.workbasket_locks.remove(&workbasket);
    }

    /// Order the next transaction of `workbasket` will get
    pub fn next_order(&self, catalog: &Catalog, workbasket: WorkBasketId) -> u64 {
        catalog.last_order_in_workbasket(workbasket) + 1
    }

    /// Open a draft transaction at the end of `workbasket`
    pub fn open_transaction(
        &self,
        writer: &mut StoreWriter<'_>,
        workbasket: WorkBasketId,
    ) -> TariffResult<TransactionRecord> {
        let order = self.next_order(writer, workbasket);
        let record = writer.insert_transaction(workbasket, order)?;
        self.opened.fetch_add(1, Ordering::Relaxed);
        Ok(record)
    }

    /// Move a workbasket's draft transactions into approved history
    ///
    /// Must run in the same write guard as the status change to approved.
    /// Transactions already outside the draft partition keep their position.
    /// Returns the new positions in workbasket-local order.
    pub fn commit(
        &self,
        writer: &mut StoreWriter<'_>,
        workbasket: WorkBasketId,
        scheme: PartitionScheme,
    ) -> TariffResult<Vec<TransactionPosition>> {
        let drafts: Vec<TransactionRecord> = writer
            .transactions_of(workbasket)
            .into_iter()
            .filter(|t| t.is_draft())
            .cloned()
            .collect();
        if drafts.is_empty() {
            return Ok(Vec::new());
        }

        let partition = scheme.partition_for(WorkflowStatus::Approved, writer)?;
        if !partition.is_approved() {
            return Err(TariffError::ordering_conflict(format!(
                "scheme {} resolved to the {} partition",
                scheme, partition
            )));
        }
        let base = writer.max_order(partition);

        let mut positions = Vec::with_capacity(drafts.len());
        for (offset, txn) in drafts.iter().enumerate() {
            let order = base + offset as u64 + 1;
            writer.reassign_transaction(txn.id, partition, order)?;
            positions.push(TransactionPosition::new(partition, order));
        }
        self.committed
            .fetch_add(drafts.len() as u64, Ordering::Relaxed);

        info!(
            target: "tariff::txn",
            workbasket = %workbasket,
            partition = %partition,
            first_order = base + 1,
            count = drafts.len(),
            "Transactions committed"
        );
        Ok(positions)
    }

    /// Number of transactions opened through this sequencer
    pub fn opened_count(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }

    /// Number of transactions moved into approved history
    pub fn committed_count(&self) -> u64 {
        self.committed.load(Ordering::Relaxed)
    }
}
