//! The business rule trait and its evaluation context
//!
//! A rule is a pure predicate over one entity version plus whatever related
//! data it reads through the `RuleContext`. The context pins the point in
//! history the rule sees: every read goes through the reference
//! transaction, never through ambient state.

use crate::violation::Violation;
use std::fmt;
use std::sync::Arc;
use tariff_core::{
    EntityKind, EntityVersion, IdentifyingKey, TariffResult, TransactionId, VersionGroupId,
};
use tariff_storage::{Catalog, VersionQuery};

/// Shared handle to a registered rule
pub type SharedRule = Arc<dyn BusinessRule>;

/// Point-in-time view a rule is evaluated against
#[derive(Clone, Copy)]
pub struct RuleContext<'a> {
    catalog: &'a Catalog,
    transaction: TransactionId,
}

impl<'a> RuleContext<'a> {
    /// View `catalog` as of `transaction`
    pub fn new(catalog: &'a Catalog, transaction: TransactionId) -> Self {
        Self {
            catalog,
            transaction,
        }
    }

    /// Underlying tables
    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// Reference transaction
    pub fn transaction(&self) -> TransactionId {
        self.transaction
    }

    /// Version of `identity` visible as of the reference transaction
    pub fn resolve(&self, identity: &IdentifyingKey) -> TariffResult<Option<EntityVersion>> {
        self.catalog.resolve_as_of(identity, self.transaction)
    }

    /// Live versions sharing `identity` as of the reference transaction, one per version group
    pub fn live_with_identity(&self, identity: &IdentifyingKey) -> TariffResult<Vec<EntityVersion>> {
        self.catalog.live_groups_as_of(identity, self.transaction)
    }

    /// Approved version of `group` as of the reference transaction, DELETE rows included
    pub fn approved_in_group(&self, group: VersionGroupId) -> TariffResult<Option<EntityVersion>> {
        Ok(self
            .catalog
            .group_approved_as_of(group, self.transaction)?
            .cloned())
    }

    /// Live versions referencing `target` as of the reference transaction
    pub fn referencing(&self, target: &IdentifyingKey) -> TariffResult<Vec<EntityVersion>> {
        self.catalog.referencing_as_of(target, self.transaction)
    }

    /// Query over `kind` resolved as of the reference transaction
    pub fn query(&self, kind: EntityKind) -> VersionQuery {
        VersionQuery::kind(kind).as_of(self.transaction)
    }
}

impl fmt::Debug for RuleContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleContext")
            .field("transaction", &self.transaction)
            .finish()
    }
}

/// A validation predicate over one entity version
///
/// `validate` returns `Ok(None)` when the rule passes and `Ok(Some(_))`
/// when it is broken. `Err` is reserved for failures to read history.
pub trait BusinessRule: Send + Sync + fmt::Debug {
    /// Short rule code, e.g. "ME32"
    fn code(&self) -> &str;

    /// What the rule requires; the default violation message
    fn description(&self) -> &str;

    /// Evaluate the rule against `version`
    fn validate(
        &self,
        ctx: &RuleContext<'_>,
        version: &EntityVersion,
    ) -> TariffResult<Option<Violation>>;

    /// Violation of this rule with the default message
    fn violation(&self, ctx: &RuleContext<'_>, version: &EntityVersion) -> Violation {
        Violation::new(self.code(), version, ctx.transaction(), self.description())
    }
}
