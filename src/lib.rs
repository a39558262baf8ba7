//! tariffdb - Versioned, auditable tariff record store
//!
//! Every change to a tariff record is an immutable version row, stamped
//! with the transaction that introduced it. Transactions live in
//! workbaskets that move through an approval workflow; approval sequences
//! them into global history and advances each record's current version.
//!
//! # Quick Start
//!
//! ```ignore
//! use tariffdb::{Database, RecordData, RuleRegistry, UserId};
//!
//! let db = Database::builder().rules(registry).ephemeral()?;
//! let wb = db.create_workbasket("Regulation 2024/17", "new duties", UserId::new(1))?;
//!
//! let mut scope = db.begin(wb.id)?;
//! scope.create(data)?;
//! scope.finish();
//!
//! db.validate_workbasket(wb.id)?;
//! db.submit_for_approval(wb.id)?;
//! db.approve(wb.id, UserId::new(2))?;
//! ```
//!
//! # Architecture
//!
//! | Layer | Crate |
//! |-------|-------|
//! | Value types and errors | `tariff-core` |
//! | Versioned tables and reads | `tariff-storage` |
//! | Sequencing and edit scopes | `tariff-concurrency` |
//! | Business rules | `tariff-rules` |
//! | Database facade and workflow | `tariff-engine` |

pub use tariff_concurrency::{PartitionScheme, TransactionScope};
pub use tariff_core::*;
pub use tariff_engine::{
    Database, DatabaseBuilder, JobId, NoopPublishHook, PublishHook, TariffConfig, ValidationJob,
    ValidationResults, WorkflowMetrics, CONFIG_FILE_NAME,
};
pub use tariff_rules::{
    BusinessRule, MustExist, NoOverlapping, OnlyApplicableAfter, PreventDeleteIfInUse,
    RuleContext, RuleRegistry, UniqueIdentifyingFields, ValidityPeriodContained, Violation,
};
pub use tariff_storage::{CheckRecord, CheckState, TransactionRecord, VersionQuery, WorkBasketRecord};
