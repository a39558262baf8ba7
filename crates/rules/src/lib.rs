//! Business rule validation for the tariff record store
//!
//! This crate implements point-in-time validation:
//! - BusinessRule: pure predicate over one entity version
//! - RuleContext: explicit reference transaction for every read
//! - Base rule shapes: uniqueness, no-overlap, containment, existence,
//!   delete protection, cutoff
//! - RuleRegistry: kind → direct and indirect rules, built at startup
//! - BusinessRuleChecker: deduplicated check set, all-violations run

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod base;
pub mod checker;
pub mod registry;
pub mod rule;
pub mod violation;

pub use base::{
    MustExist, NoOverlapping, OnlyApplicableAfter, PreventDeleteIfInUse,
    UniqueIdentifyingFields, ValidityPeriodContained,
};
pub use checker::{BusinessRuleChecker, CheckReport, PlannedCheck};
pub use registry::{IndirectRule, RuleRegistry};
pub use rule::{BusinessRule, RuleContext, SharedRule};
pub use violation::Violation;
