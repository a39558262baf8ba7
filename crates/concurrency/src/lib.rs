//! Sequencing layer for the tariff record store
//!
//! This crate places transactions in history:
//! - PartitionScheme: seed-first or fixed partition policy
//! - TransactionSequencer: workbasket-local and partition-global orders
//! - TransactionScope: RAII batch of appends stamped with one transaction
//!
//! Order allocation reads the current maximum and writes max + 1 under the
//! store's exclusive write guard, so concurrent appends and approvals never
//! produce duplicate or out-of-order positions.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod partition;
pub mod scope;
pub mod sequencer;

pub use partition::{verify_ordering, PartitionScheme};
pub use scope::TransactionScope;
pub use sequencer::{TransactionSequencer, WorkBasketGuard};
