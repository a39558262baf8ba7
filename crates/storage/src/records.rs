//! Row types for the version group, transaction and workbasket tables
//!
//! Entity version rows live in `tariff_core::EntityVersion`; these are the
//! tables that give them their position in history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tariff_core::{
    IdentifyingKey, Partition, TransactionId, TransactionPosition, UserId, VersionGroupId,
    VersionId, WorkBasketId, WorkflowStatus,
};

/// Logical identity of a record across time
///
/// Created on the first CREATE and never deleted. The current version
/// pointer is the one piece of cross-workbasket shared state; it only moves
/// during approval and rollback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionGroup {
    /// Group id
    pub id: VersionGroupId,
    /// Business key shared by every version in the group
    pub identity: IdentifyingKey,
    /// Version rows in append order
    pub versions: Vec<VersionId>,
    /// Version visible to "latest approved" reads
    pub current_version: Option<VersionId>,
}

/// Where a version should be appended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupRef {
    /// Start a new version group (CREATE)
    New,
    /// Continue an existing group (UPDATE / DELETE)
    Existing(VersionGroupId),
}

/// An ordered, atomic batch of entity versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Transaction id
    pub id: TransactionId,
    /// Owning workbasket
    pub workbasket: WorkBasketId,
    /// Ordering domain
    pub partition: Partition,
    /// Position within the partition (draft: within the workbasket)
    pub order: u64,
    /// When the transaction was opened
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Position of this transaction in history
    pub fn position(&self) -> TransactionPosition {
        TransactionPosition::new(self.partition, self.order)
    }

    /// Check if the transaction is still in the draft partition
    pub fn is_draft(&self) -> bool {
        self.partition == Partition::Draft
    }
}

/// A named container of transactions moving through approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkBasketRecord {
    /// Workbasket id
    pub id: WorkBasketId,
    /// Short unique name
    pub title: String,
    /// Why the changes are being made
    pub reason: String,
    /// Who created the workbasket
    pub author: UserId,
    /// Who approved it, once approved
    pub approver: Option<UserId>,
    /// Workflow state
    pub status: WorkflowStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
}

impl WorkBasketRecord {
    /// Check if the workbasket's transactions count as approved history
    pub fn is_approved(&self) -> bool {
        self.status.is_approved() && self.approver.is_some()
    }
}
