//! Capability traits shared by record types
//!
//! Concrete record types embed `IdentifyingKey` and `ValidityPeriod` values
//! and expose them through these traits, so rules and queries can work over
//! any record without knowing its concrete shape.

use crate::entity::{EntityKind, IdentifyingKey};
use crate::validity::ValidityPeriod;
use chrono::NaiveDate;

/// A record with a stable business key
pub trait HasIdentity {
    /// Business key of the record
    fn identity(&self) -> &IdentifyingKey;

    /// Kind of record
    fn kind_of(&self) -> EntityKind {
        self.identity().kind
    }
}

/// A record with a validity period
pub trait HasValidity {
    /// When the record is live
    fn validity(&self) -> &ValidityPeriod;

    /// Check if the record is live on `date`
    fn is_live_on(&self, date: NaiveDate) -> bool {
        self.validity().contains_date(date)
    }
}
