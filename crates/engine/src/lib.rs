//! Tariff database engine
//!
//! This crate orchestrates all lower layers:
//! - Database: configuration, open, reads and the edit scope
//! - Workbasket state machine: submit, approve, export, rollback, restore
//! - Validation jobs: enqueue / execute / completed message boundaries
//! - Publish hook invoked after approval
//! - Workflow metrics
//!
//! The engine is the only component that knows about:
//! - Which partition scheme is in force
//! - Which rules apply to which kinds
//! - Cross-layer coordination (sequencer + store + checks)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coordinator;
pub mod database;
pub mod jobs;
pub mod publish;
mod workbasket;

pub use coordinator::{WorkflowCoordinator, WorkflowMetrics};
pub use database::{Database, DatabaseBuilder, TariffConfig, CONFIG_FILE_NAME};
pub use jobs::{JobId, ValidationJob, ValidationOutbox, ValidationResults};
pub use publish::{NoopPublishHook, PublishHook};
