//! Catalog: the versioned tables and every read over them
//!
//! The catalog holds entity versions, version groups, transactions,
//! workbaskets and checks. All point-in-time resolution lives here.
//!
//! # Visibility
//!
//! A version is visible from reference transaction `T` when the
//! transaction `V` that introduced it is either:
//!
//! - approved (approved partition, workbasket in an approved status with an
//!   approver) and `V.position <= T.position`, or
//! - in the same workbasket as `T` with `V.position <= T.position`.
//!
//! Positions order by partition precedence first (seed, revision, draft),
//! so every approved transaction precedes every draft one. Among visible
//! versions the winner is the one with the greatest
//! `(position, version id)`; version ids break ties between several
//! versions of one group appended in the same transaction.

use crate::checks::{CheckRecord, CheckState, CheckTable};
use crate::index::{IdentityIndex, KindIndex, LinkIndex};
use crate::records::{TransactionRecord, VersionGroup, WorkBasketRecord};
use rustc_hash::FxHashMap;
use tariff_core::{
    EntityKind, EntityVersion, IdentifyingKey, Partition, TariffError, TariffResult,
    TransactionId, TransactionPosition, VersionGroupId, VersionId, WorkBasketId,
};

/// Ordering key of a version in history
type HistoryKey = (TransactionPosition, VersionId);

/// In-memory relational tables
#[derive(Debug, Default)]
pub struct Catalog {
    pub(crate) versions: FxHashMap<VersionId, EntityVersion>,
    pub(crate) groups: FxHashMap<VersionGroupId, VersionGroup>,
    pub(crate) transactions: FxHashMap<TransactionId, TransactionRecord>,
    pub(crate) transaction_versions: FxHashMap<TransactionId, Vec<VersionId>>,
    pub(crate) workbaskets: FxHashMap<WorkBasketId, WorkBasketRecord>,
    pub(crate) workbasket_transactions: FxHashMap<WorkBasketId, Vec<TransactionId>>,
    pub(crate) identities: IdentityIndex,
    pub(crate) kinds: KindIndex,
    pub(crate) links: LinkIndex,
    pub(crate) checks: CheckTable,
    pub(crate) next_version: u64,
    pub(crate) next_group: u64,
    pub(crate) next_transaction: u64,
    pub(crate) next_workbasket: u64,
}

impl Catalog {
    /// Create empty tables
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Row lookups
    // =========================================================================

    /// Get a transaction row
    pub fn transaction(&self, id: TransactionId) -> TariffResult<&TransactionRecord> {
        self.transactions
            .get(&id)
            .ok_or_else(|| TariffError::not_found(format!("transaction {}", id)))
    }

    /// Get a workbasket row
    pub fn workbasket(&self, id: WorkBasketId) -> TariffResult<&WorkBasketRecord> {
        self.workbaskets
            .get(&id)
            .ok_or_else(|| TariffError::not_found(format!("workbasket {}", id)))
    }

    /// Find a workbasket by its unique title
    pub fn workbasket_by_title(&self, title: &str) -> Option<&WorkBasketRecord> {
        self.workbaskets.values().find(|wb| wb.title == title)
    }

    /// Get a version row
    pub fn version(&self, id: VersionId) -> TariffResult<&EntityVersion> {
        self.versions
            .get(&id)
            .ok_or_else(|| TariffError::not_found(format!("version {}", id)))
    }

    /// Get a version group
    pub fn group(&self, id: VersionGroupId) -> TariffResult<&VersionGroup> {
        self.groups
            .get(&id)
            .ok_or_else(|| TariffError::not_found(format!("version group {}", id)))
    }

    /// Transactions of a workbasket in workbasket-local order
    pub fn transactions_of(&self, workbasket: WorkBasketId) -> Vec<&TransactionRecord> {
        let mut txns: Vec<&TransactionRecord> = self
            .workbasket_transactions
            .get(&workbasket)
            .into_iter()
            .flatten()
            .filter_map(|id| self.transactions.get(id))
            .collect();
        txns.sort_by_key(|t| (t.position(), t.id));
        txns
    }

    /// Versions introduced by a transaction, in append order
    pub fn versions_in_transaction(&self, transaction: TransactionId) -> Vec<&EntityVersion> {
        self.transaction_versions
            .get(&transaction)
            .into_iter()
            .flatten()
            .filter_map(|id| self.versions.get(id))
            .collect()
    }

    /// Versions introduced by a workbasket, in transaction order
    pub fn versions_in_workbasket(&self, workbasket: WorkBasketId) -> Vec<&EntityVersion> {
        self.transactions_of(workbasket)
            .into_iter()
            .flat_map(|t| self.versions_in_transaction(t.id))
            .collect()
    }

    /// Groups with at least one version in the workbasket, in id order
    pub fn groups_touched_by(&self, workbasket: WorkBasketId) -> Vec<VersionGroupId> {
        let mut groups: Vec<VersionGroupId> = self
            .versions_in_workbasket(workbasket)
            .into_iter()
            .map(|v| v.group)
            .collect();
        groups.sort();
        groups.dedup();
        groups
    }

    /// Newest version id in a transaction
    pub fn newest_version_in(&self, transaction: TransactionId) -> Option<VersionId> {
        self.transaction_versions
            .get(&transaction)
            .and_then(|ids| ids.iter().max().copied())
    }

    // =========================================================================
    // Ordering
    // =========================================================================

    /// Last order used by a workbasket's transactions (0 if none)
    pub fn last_order_in_workbasket(&self, workbasket: WorkBasketId) -> u64 {
        self.transactions_of(workbasket)
            .last()
            .map(|t| t.order)
            .unwrap_or(0)
    }

    /// Greatest order in an approved partition (0 if empty)
    pub fn max_order(&self, partition: Partition) -> u64 {
        self.transactions
            .values()
            .filter(|t| t.partition == partition)
            .map(|t| t.order)
            .max()
            .unwrap_or(0)
    }

    /// Orders of every transaction in a partition, ascending
    pub fn partition_orders(&self, partition: Partition) -> Vec<u64> {
        let mut orders: Vec<u64> = self
            .transactions
            .values()
            .filter(|t| t.partition == partition)
            .map(|t| t.order)
            .collect();
        orders.sort_unstable();
        orders
    }

    /// Check if any transaction is in `partition`
    pub fn has_partition(&self, partition: Partition) -> bool {
        self.transactions.values().any(|t| t.partition == partition)
    }

    /// Check if any workbasket has ever reached an approved status
    pub fn any_approved_workbasket(&self) -> bool {
        self.workbaskets.values().any(|wb| wb.status.is_approved())
    }

    /// Check if a transaction is part of approved history
    pub fn is_approved_transaction(&self, txn: &TransactionRecord) -> bool {
        txn.partition.is_approved()
            && self
                .workbaskets
                .get(&txn.workbasket)
                .map_or(false, WorkBasketRecord::is_approved)
    }

    /// The transaction most recently committed to approved history
    pub fn latest_approved_transaction(&self) -> Option<&TransactionRecord> {
        self.transactions
            .values()
            .filter(|t| self.is_approved_transaction(t))
            .max_by_key(|t| t.position())
    }

    // =========================================================================
    // Visibility
    // =========================================================================

    fn history_key(&self, version: &EntityVersion) -> Option<HistoryKey> {
        self.transactions
            .get(&version.transaction)
            .map(|t| (t.position(), version.id))
    }

    /// A restored workbasket's new drafts see its earlier committed
    /// transactions, which sit in an approved partition
    fn visible_from(&self, candidate: &TransactionRecord, reference: &TransactionRecord) -> bool {
        if candidate.workbasket == reference.workbasket {
            return candidate.position() <= reference.position();
        }
        self.approved_visible_from(candidate, reference)
    }

    fn approved_visible_from(
        &self,
        candidate: &TransactionRecord,
        reference: &TransactionRecord,
    ) -> bool {
        self.is_approved_transaction(candidate) && candidate.position() <= reference.position()
    }

    /// Newest version of `group` whose transaction passes `visible`
    fn winner<'a, F>(&'a self, group: &VersionGroup, visible: F) -> Option<&'a EntityVersion>
    where
        F: Fn(&TransactionRecord) -> bool,
    {
        group
            .versions
            .iter()
            .filter_map(|id| self.versions.get(id))
            .filter(|v| {
                self.transactions
                    .get(&v.transaction)
                    .map_or(false, &visible)
            })
            .max_by_key(|v| self.history_key(v))
    }

    /// Version of `group` visible as of `reference`, DELETE rows included
    pub fn group_as_of(
        &self,
        group: VersionGroupId,
        reference: TransactionId,
    ) -> TariffResult<Option<&EntityVersion>> {
        let group = self.group(group)?;
        let reference = self.transaction(reference)?;
        Ok(self.winner(group, |t| self.visible_from(t, reference)))
    }

    /// Version of `group` visible as of `reference`, counting approved history only
    pub fn group_approved_as_of(
        &self,
        group: VersionGroupId,
        reference: TransactionId,
    ) -> TariffResult<Option<&EntityVersion>> {
        let group = self.group(group)?;
        let reference = self.transaction(reference)?;
        Ok(self.winner(group, |t| self.approved_visible_from(t, reference)))
    }

    /// Version of `group` as of `reference`, overridden by any version in
    /// the reference transaction's workbasket
    pub fn group_current(
        &self,
        group: VersionGroupId,
        reference: TransactionId,
    ) -> TariffResult<Option<&EntityVersion>> {
        let group_row = self.group(group)?;
        let reference_row = self.transaction(reference)?;
        let pending = self.winner(group_row, |t| t.workbasket == reference_row.workbasket);
        match pending {
            Some(version) => Ok(Some(version)),
            None => self.group_as_of(group, reference),
        }
    }

    /// Newest approved version of a group, ignoring any reference point
    pub fn newest_approved_version(&self, group: VersionGroupId) -> TariffResult<Option<VersionId>> {
        let group = self.group(group)?;
        Ok(self
            .winner(group, |t| self.is_approved_transaction(t))
            .map(|v| v.id))
    }

    fn newest_live<'a>(
        &'a self,
        candidates: impl Iterator<Item = &'a EntityVersion>,
    ) -> Option<EntityVersion> {
        candidates
            .max_by_key(|v| self.history_key(v))
            .filter(|v| !v.is_delete())
            .cloned()
    }

    // =========================================================================
    // Identity resolution
    // =========================================================================

    /// Current version of the identity in approved history
    ///
    /// Reads the group's current version pointer. The newest group with a
    /// pointer decides; a DELETE there hides the identity.
    pub fn resolve_latest_approved(&self, identity: &IdentifyingKey) -> Option<EntityVersion> {
        self.newest_pointer(identity)
            .filter(|v| !v.is_delete())
            .cloned()
    }

    /// Current version of the identity when it is an approved DELETE
    pub fn latest_deleted(&self, identity: &IdentifyingKey) -> Option<EntityVersion> {
        self.newest_pointer(identity)
            .filter(|v| v.is_delete())
            .cloned()
    }

    fn newest_pointer(&self, identity: &IdentifyingKey) -> Option<&EntityVersion> {
        self.identities
            .get(identity)
            .iter()
            .rev()
            .filter_map(|id| self.groups.get(id))
            .find_map(|g| g.current_version)
            .and_then(|id| self.versions.get(&id))
    }

    /// Version of the identity visible if history stopped at `reference`
    pub fn resolve_as_of(
        &self,
        identity: &IdentifyingKey,
        reference: TransactionId,
    ) -> TariffResult<Option<EntityVersion>> {
        let reference = self.transaction(reference)?;
        let winners = self
            .identity_groups(identity)
            .filter_map(|g| self.winner(g, |t| self.visible_from(t, reference)));
        Ok(self.newest_live(winners))
    }

    /// Like `resolve_as_of`, but any version of the identity in the
    /// reference's workbasket wins even when sequenced later
    pub fn resolve_current(
        &self,
        identity: &IdentifyingKey,
        reference: TransactionId,
    ) -> TariffResult<Option<EntityVersion>> {
        let reference_row = self.transaction(reference)?;
        let pending: Vec<&EntityVersion> = self
            .identity_groups(identity)
            .filter_map(|g| self.winner(g, |t| t.workbasket == reference_row.workbasket))
            .collect();
        if pending.is_empty() {
            return self.resolve_as_of(identity, reference);
        }
        Ok(self.newest_live(pending.into_iter()))
    }

    /// Every version of the identity visible as of `reference`, oldest first
    pub fn versions_up_to(
        &self,
        identity: &IdentifyingKey,
        reference: TransactionId,
    ) -> TariffResult<Vec<EntityVersion>> {
        let reference = self.transaction(reference)?;
        let mut visible: Vec<&EntityVersion> = self
            .identity_groups(identity)
            .flat_map(|g| g.versions.iter())
            .filter_map(|id| self.versions.get(id))
            .filter(|v| {
                self.transactions
                    .get(&v.transaction)
                    .map_or(false, |t| self.visible_from(t, reference))
            })
            .collect();
        visible.sort_by_key(|v| self.history_key(v));
        Ok(visible.into_iter().cloned().collect())
    }

    /// The first version ever appended for the identity
    pub fn first_version(&self, identity: &IdentifyingKey) -> Option<EntityVersion> {
        self.identity_groups(identity)
            .flat_map(|g| g.versions.iter())
            .min()
            .and_then(|id| self.versions.get(id))
            .cloned()
    }

    /// Every version of a group in append order
    pub fn history(&self, group: VersionGroupId) -> TariffResult<Vec<EntityVersion>> {
        let group = self.group(group)?;
        Ok(group
            .versions
            .iter()
            .filter_map(|id| self.versions.get(id))
            .cloned()
            .collect())
    }

    /// Live as-of version of each group sharing `identity`
    pub fn live_groups_as_of(
        &self,
        identity: &IdentifyingKey,
        reference: TransactionId,
    ) -> TariffResult<Vec<EntityVersion>> {
        let reference = self.transaction(reference)?;
        Ok(self
            .identity_groups(identity)
            .filter_map(|g| self.winner(g, |t| self.visible_from(t, reference)))
            .filter(|v| !v.is_delete())
            .cloned()
            .collect())
    }

    /// Live as-of versions that reference `target`
    pub fn referencing_as_of(
        &self,
        target: &IdentifyingKey,
        reference: TransactionId,
    ) -> TariffResult<Vec<EntityVersion>> {
        let reference = self.transaction(reference)?;
        Ok(self
            .links
            .referencing(target)
            .into_iter()
            .filter_map(|id| self.groups.get(&id))
            .filter_map(|g| self.winner(g, |t| self.visible_from(t, reference)))
            .filter(|v| !v.is_delete() && v.links_to(target))
            .cloned()
            .collect())
    }

    /// Latest approved versions of `kind` that reference `target`
    pub fn approved_referencing(
        &self,
        target: &IdentifyingKey,
        kind: EntityKind,
    ) -> Vec<EntityVersion> {
        self.links
            .referencing(target)
            .into_iter()
            .filter_map(|id| self.groups.get(&id))
            .filter(|g| g.identity.kind == kind)
            .filter_map(|g| g.current_version)
            .filter_map(|id| self.versions.get(&id))
            .filter(|v| !v.is_delete() && v.links_to(target))
            .cloned()
            .collect()
    }

    fn identity_groups<'a>(
        &'a self,
        identity: &IdentifyingKey,
    ) -> impl Iterator<Item = &'a VersionGroup> + 'a {
        self.identities
            .get(identity)
            .to_vec()
            .into_iter()
            .filter_map(move |id| self.groups.get(&id))
    }

    pub(crate) fn groups_of_kind(&self, kind: Option<EntityKind>) -> Vec<&VersionGroup> {
        let mut groups: Vec<&VersionGroup> = match kind {
            Some(kind) => self
                .kinds
                .get(kind)
                .iter()
                .filter_map(|id| self.groups.get(id))
                .collect(),
            None => self.groups.values().collect(),
        };
        groups.sort_by_key(|g| g.id);
        groups
    }

    // =========================================================================
    // Checks
    // =========================================================================

    /// Freshness of a transaction's latest check
    pub fn check_state(&self, transaction: TransactionId) -> CheckState {
        let Some(summary) = self.checks.summary(transaction) else {
            return CheckState::Missing;
        };
        if !summary.completed {
            return CheckState::Missing;
        }
        let head = self.latest_approved_transaction().map(|t| t.id);
        if summary.head_transaction != head
            || summary.latest_version != self.newest_version_in(transaction)
        {
            return CheckState::Stale;
        }
        if summary.successful {
            CheckState::Passed
        } else {
            CheckState::Failed
        }
    }

    /// Transactions whose latest check is missing, stale or failing
    pub fn unchecked_or_errored_transactions(&self, workbasket: WorkBasketId) -> Vec<TransactionId> {
        self.transactions_of(workbasket)
            .into_iter()
            .filter(|t| !self.check_state(t.id).is_passed())
            .map(|t| t.id)
            .collect()
    }

    /// Every check row for a workbasket's transactions
    pub fn checks_for_workbasket(&self, workbasket: WorkBasketId) -> Vec<CheckRecord> {
        self.transactions_of(workbasket)
            .into_iter()
            .flat_map(|t| self.checks.rows_for(t.id))
            .cloned()
            .collect()
    }

    /// Failing check rows for a workbasket's transactions
    pub fn check_errors(&self, workbasket: WorkBasketId) -> Vec<CheckRecord> {
        self.checks_for_workbasket(workbasket)
            .into_iter()
            .filter(|c| !c.successful)
            .collect()
    }
}
