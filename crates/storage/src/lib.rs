//! Storage layer for the tariff record store
//!
//! This crate implements the versioned tables and every read over them:
//! - Catalog: entity versions, version groups, transactions, workbaskets, checks
//! - VersionStore: RwLock-guarded catalog with reader/writer guards
//! - Point-in-time resolution (latest approved, as of, current)
//! - Secondary indices (identity, kind, link)
//! - VersionQuery: lazy, replayable query facade
//! - CheckTable: cached rule outcomes with all-or-nothing batch writes
//!
//! # Concurrency
//!
//! All mutation goes through `StoreWriter`, which holds the exclusive lock
//! for its lifetime. Multi-step transitions (approval, rollback) are applied
//! under one writer so readers see either none or all of them.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod checks;
pub mod index;
pub mod query;
pub mod records;
pub mod store;

pub use catalog::Catalog;
pub use checks::{
    CheckBatch, CheckId, CheckOutcome, CheckRecord, CheckState, CheckTable, TransactionCheck,
};
pub use index::{IdentityIndex, KindIndex, LinkIndex};
pub use query::{ReadMode, VersionQuery};
pub use records::{GroupRef, TransactionRecord, VersionGroup, WorkBasketRecord};
pub use store::{StoreReader, StoreWriter, VersionStore};
