//! Error types for the tariff record store
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Business rule failures are NOT errors. They are reported as
//! `Violation` values by the rules layer so that validation can collect
//! every failure in one pass.

use crate::entity::IdentifyingKey;
use crate::types::{WorkBasketId, WorkflowStatus};
use std::io;
use thiserror::Error;

/// Result type alias for tariff store operations
pub type TariffResult<T> = std::result::Result<T, TariffError>;

/// Error types for the tariff record store
#[derive(Debug, Error)]
pub enum TariffError {
    /// A CREATE collides with an identity that already has a live version
    #[error("Identity conflict: {identity} already has a live version")]
    IdentityConflict {
        /// The identity that is already live
        identity: IdentifyingKey,
    },

    /// Partition/order assignment would break global sequencing
    #[error("Ordering conflict: {0}")]
    OrderingConflict(String),

    /// Workbasket state machine invoked from a non-source state
    #[error("Invalid transition: cannot {action} workbasket {workbasket} from status {from}")]
    InvalidTransition {
        /// Workbasket the transition was attempted on
        workbasket: WorkBasketId,
        /// Status the workbasket was in
        from: WorkflowStatus,
        /// Name of the attempted transition
        action: &'static str,
    },

    /// Submit attempted before every transaction has a passing, fresh check
    #[error("Workbasket {workbasket} is not fully checked: {unchecked} transaction(s) unchecked, stale or failing")]
    NotFullyChecked {
        /// Workbasket that was submitted
        workbasket: WorkBasketId,
        /// Number of transactions lacking a passing, fresh check
        unchecked: usize,
    },

    /// Writes attempted against a workbasket that is not in editing
    #[error("Workbasket {workbasket} is not editable (status {status})")]
    WorkBasketNotEditable {
        /// Workbasket written to
        workbasket: WorkBasketId,
        /// Its current status
        status: WorkflowStatus,
    },

    /// A validation result arrived for a workbasket that has since changed
    #[error("Stale validation result for workbasket {workbasket}")]
    StaleValidation {
        /// Workbasket whose transactions or status moved on
        workbasket: WorkBasketId,
    },

    /// Referenced record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validity period with end on or before start
    #[error("Invalid validity period: {0}")]
    InvalidPeriod(String),

    /// Invalid input or argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration could not be parsed or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error (configuration file access)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TariffError {
    /// Create a NotFound error
    pub fn not_found(what: impl Into<String>) -> Self {
        TariffError::NotFound(what.into())
    }

    /// Create an InvalidInput error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        TariffError::InvalidInput(msg.into())
    }

    /// Create an OrderingConflict error
    pub fn ordering_conflict(msg: impl Into<String>) -> Self {
        TariffError::OrderingConflict(msg.into())
    }

    /// Create a Config error
    pub fn config(msg: impl Into<String>) -> Self {
        TariffError::Config(msg.into())
    }

    /// Whether the operation may succeed if retried after other work completes
    ///
    /// Only a missing or stale check is recoverable: re-running validation
    /// can clear it. Identity, ordering and transition errors are fatal to
    /// the attempted operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TariffError::NotFullyChecked { .. } | TariffError::StaleValidation { .. }
        )
    }

    /// Whether this error reports a conflict with existing history
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            TariffError::IdentityConflict { .. } | TariffError::OrderingConflict(_)
        )
    }
}
