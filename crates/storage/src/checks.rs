//! Cached business rule outcomes
//!
//! A `CheckRecord` says "rule R against version V as of transaction T
//! passed/failed at time X". A `TransactionCheck` summarises one validation
//! run over one transaction and remembers what history looked like at the
//! time, so a later reader can tell whether the summary is still fresh.
//!
//! Batches are replaced whole: callers hand over every outcome of a run and
//! the table swaps them in under one write guard.

use chrono::{DateTime, Utc};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tariff_core::{TransactionId, VersionId};

/// Identifier of one check row
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CheckId(pub u64);

/// Outcome of running one rule against one version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Transaction the rule was evaluated as of
    pub transaction: TransactionId,
    /// Rule code, e.g. "FO2"
    pub rule_code: String,
    /// Version the rule ran against
    pub version: VersionId,
    /// Whether the rule passed
    pub successful: bool,
    /// Violation message when failed
    pub message: Option<String>,
}

/// Persisted check row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRecord {
    /// Row id
    pub id: CheckId,
    /// Transaction the rule was evaluated as of
    pub transaction: TransactionId,
    /// Rule code
    pub rule_code: String,
    /// Version the rule ran against
    pub version: VersionId,
    /// Whether the rule passed
    pub successful: bool,
    /// Violation message when failed
    pub message: Option<String>,
    /// When the rule ran
    pub checked_at: DateTime<Utc>,
}

/// Summary of one validation run over one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionCheck {
    /// Transaction checked
    pub transaction: TransactionId,
    /// Every rule in the check set ran
    pub completed: bool,
    /// Every rule passed
    pub successful: bool,
    /// Latest approved transaction when the check ran
    pub head_transaction: Option<TransactionId>,
    /// Newest version in the transaction when the check ran
    pub latest_version: Option<VersionId>,
    /// When the run finished
    pub checked_at: DateTime<Utc>,
}

/// Freshness of a transaction's check summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    /// Never checked
    Missing,
    /// Checked, but history or the transaction moved on since
    Stale,
    /// Fresh, with at least one failing rule
    Failed,
    /// Fresh and every rule passed
    Passed,
}

impl CheckState {
    /// Check if the transaction needs no further validation
    pub fn is_passed(&self) -> bool {
        matches!(self, CheckState::Passed)
    }
}

/// All results of one validation run, written all-or-nothing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckBatch {
    /// One summary per transaction in the run
    pub transaction_checks: Vec<TransactionCheck>,
    /// One outcome per (rule, version, transaction) evaluated
    pub outcomes: Vec<CheckOutcome>,
}

impl CheckBatch {
    /// Transactions covered by this batch
    pub fn transactions(&self) -> FxHashSet<TransactionId> {
        self.transaction_checks
            .iter()
            .map(|tc| tc.transaction)
            .chain(self.outcomes.iter().map(|o| o.transaction))
            .collect()
    }
}

/// Check rows plus per-transaction summaries
#[derive(Debug, Default)]
pub struct CheckTable {
    rows: Vec<CheckRecord>,
    summaries: FxHashMap<TransactionId, TransactionCheck>,
    next_id: u64,
}

impl CheckTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every row and summary for the batch's transactions
    pub fn replace(&mut self, batch: CheckBatch, now: DateTime<Utc>) -> usize {
        let covered = batch.transactions();
        self.delete_for(&covered);

        for summary in batch.transaction_checks {
            self.summaries.insert(summary.transaction, summary);
        }
        let written = batch.outcomes.len();
        for outcome in batch.outcomes {
            self.next_id += 1;
            self.rows.push(CheckRecord {
                id: CheckId(self.next_id),
                transaction: outcome.transaction,
                rule_code: outcome.rule_code,
                version: outcome.version,
                successful: outcome.successful,
                message: outcome.message,
                checked_at: now,
            });
        }
        written
    }

    /// Delete rows and summaries for the given transactions
    pub fn delete_for(&mut self, transactions: &FxHashSet<TransactionId>) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| !transactions.contains(&row.transaction));
        self.summaries.retain(|txn, _| !transactions.contains(txn));
        before - self.rows.len()
    }

    /// Summary for a transaction
    pub fn summary(&self, transaction: TransactionId) -> Option<&TransactionCheck> {
        self.summaries.get(&transaction)
    }

    /// Check rows for a transaction
    pub fn rows_for(&self, transaction: TransactionId) -> impl Iterator<Item = &CheckRecord> {
        self.rows.iter().filter(move |row| row.transaction == transaction)
    }
}
