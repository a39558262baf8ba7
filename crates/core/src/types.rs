//! Core identifier and status types
//!
//! This module defines the foundational types:
//! - Row identifiers: VersionId, VersionGroupId, TransactionId, WorkBasketId, UserId
//! - ChangeKind: CREATE / UPDATE / DELETE marker on every version row
//! - Partition: ordering domain of a transaction (seed / revision / draft)
//! - WorkflowStatus: workbasket approval states
//! - TransactionPosition: the (partition, order) pair that totally orders history

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw row id
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Get the raw row id
            #[inline]
            pub const fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }
    };
}

row_id!(
    /// Identifier of one immutable entity version row
    VersionId,
    "v"
);
row_id!(
    /// Identifier of the logical identity binding versions across time
    VersionGroupId,
    "g"
);
row_id!(
    /// Identifier of a transaction row
    TransactionId,
    "t"
);
row_id!(
    /// Identifier of a workbasket
    WorkBasketId,
    "wb"
);
row_id!(
    /// Identifier of a user (author or approver)
    UserId,
    "u"
);

/// The kind of change a version row records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// First version of a logical record
    Create,
    /// Replacement of the previous version
    Update,
    /// Terminal version: the record no longer exists
    Delete,
}

impl ChangeKind {
    /// Check if this is a DELETE
    pub fn is_delete(&self) -> bool {
        matches!(self, ChangeKind::Delete)
    }

    /// TARIC update type code (1 = update, 2 = delete, 3 = create)
    pub fn update_type_code(&self) -> u8 {
        match self {
            ChangeKind::Update => 1,
            ChangeKind::Delete => 2,
            ChangeKind::Create => 3,
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Create => "CREATE",
            ChangeKind::Update => "UPDATE",
            ChangeKind::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordering domain of a transaction
///
/// Partitions encode eras of history. Declaration order is precedence order:
/// every seed transaction precedes every revision transaction, and draft
/// transactions come after all approved history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Partition {
    /// Initial load of the tariff
    SeedFile,
    /// Approved changes after the seed
    Revision,
    /// Unapproved work, visible only inside its own workbasket
    Draft,
}

impl Partition {
    /// Partitions that hold approved history
    pub const APPROVED: [Partition; 2] = [Partition::SeedFile, Partition::Revision];

    /// Check if this partition holds approved history
    pub fn is_approved(&self) -> bool {
        !matches!(self, Partition::Draft)
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::SeedFile => "SEED_FILE",
            Partition::Revision => "REVISION",
            Partition::Draft => "DRAFT",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workbasket approval workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowStatus {
    /// Open for edits
    Editing,
    /// Submitted and awaiting approval
    Proposed,
    /// Approved; transactions committed to history
    Approved,
    /// Exported downstream
    Sent,
    /// Accepted downstream
    Published,
    /// Rejected downstream after sending
    Errored,
    /// No longer in use
    Archived,
}

impl WorkflowStatus {
    /// Statuses whose transactions are part of approved history
    pub const APPROVED: [WorkflowStatus; 3] = [
        WorkflowStatus::Approved,
        WorkflowStatus::Sent,
        WorkflowStatus::Published,
    ];

    /// Check if the status is one of the approved statuses
    pub fn is_approved(&self) -> bool {
        Self::APPROVED.contains(self)
    }

    /// Check if the workbasket may gain transactions
    pub fn is_editable(&self) -> bool {
        matches!(self, WorkflowStatus::Editing)
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Editing => "EDITING",
            WorkflowStatus::Proposed => "PROPOSED",
            WorkflowStatus::Approved => "APPROVED",
            WorkflowStatus::Sent => "SENT",
            WorkflowStatus::Published => "PUBLISHED",
            WorkflowStatus::Errored => "ERRORED",
            WorkflowStatus::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a transaction in history
///
/// Ordered by partition precedence first, then by order. Draft positions
/// are only comparable with draft positions of the same workbasket; callers
/// enforce that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionPosition {
    /// Ordering domain
    pub partition: Partition,
    /// Position within the partition (1-based)
    pub order: u64,
}

impl TransactionPosition {
    /// Create a position
    pub const fn new(partition: Partition, order: u64) -> Self {
        Self { partition, order }
    }
}

impl fmt::Display for TransactionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.partition, self.order)
    }
}
