//! Core types and traits for the tariff record store
//!
//! This crate defines the foundational types used throughout the system:
//! - ValidityPeriod: half-open date interval with containment/overlap predicates
//! - Row ids: VersionId, VersionGroupId, TransactionId, WorkBasketId, UserId
//! - ChangeKind, Partition, WorkflowStatus, TransactionPosition
//! - EntityKind: closed set of tariff record kinds with record codes
//! - IdentifyingKey, RecordData, EntityVersion: version rows
//! - Traits: HasIdentity, HasValidity
//! - Error: TariffError hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entity;
pub mod error;
pub mod traits;
pub mod types;
pub mod validity;

pub use entity::{EntityKind, EntityVersion, IdentifyingKey, RecordData};
pub use error::{TariffError, TariffResult};
pub use traits::{HasIdentity, HasValidity};
pub use types::{
    ChangeKind, Partition, TransactionId, TransactionPosition, UserId, VersionGroupId, VersionId,
    WorkBasketId, WorkflowStatus,
};
pub use validity::ValidityPeriod;
