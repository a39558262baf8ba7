//! Reusable rule shapes
//!
//! Most named tariff rules are instances of a handful of shapes:
//!
//! | Shape | Fails when |
//! |-------|-----------|
//! | `UniqueIdentifyingFields` | another live group shares the identifying fields |
//! | `NoOverlapping` | another version with the same identifying fields overlaps in time |
//! | `ValidityPeriodContained` | the linked container does not cover the validity period |
//! | `MustExist` | a linked record is not visible |
//! | `PreventDeleteIfInUse` | a DELETE targets a record still referenced |
//! | `OnlyApplicableAfter` | (wrapper) the inner rule fails for a version starting after a cutoff |
//!
//! Every shape reads history through the `RuleContext`, so the set of
//! "other versions" depends on where the evaluated transaction sits.

use crate::rule::{BusinessRule, RuleContext, SharedRule};
use crate::violation::Violation;
use chrono::NaiveDate;
use std::sync::Arc;
use tariff_core::{
    EntityKind, EntityVersion, HasValidity, IdentifyingKey, TariffResult,
};
use tracing::debug;

/// Values of `fields` in `identity`, in field order
fn project(identity: &IdentifyingKey, fields: &[String]) -> Vec<Option<String>> {
    fields
        .iter()
        .map(|field| identity.get(field).map(str::to_string))
        .collect()
}

/// Versions `version` is compared against by the identity rules
///
/// Every other version group sharing the identity, or its projection onto
/// `fields`, contributes its live version as of the context transaction,
/// so earlier drafts of the owning workbasket count. The version's own
/// group contributes only its approved predecessor, flagged `true`.
fn other_versions(
    ctx: &RuleContext<'_>,
    version: &EntityVersion,
    fields: Option<&[String]>,
) -> TariffResult<Vec<(EntityVersion, bool)>> {
    let matches = match fields {
        None => ctx.live_with_identity(&version.data.identity)?,
        Some(fields) => {
            let fields = fields.to_vec();
            let wanted = project(&version.data.identity, &fields);
            ctx.query(version.kind())
                .filter(move |v| project(&v.data.identity, &fields) == wanted)
                .fetch(ctx.catalog())?
        }
    };
    let mut others: Vec<(EntityVersion, bool)> = matches
        .into_iter()
        .filter(|v| v.group != version.group)
        .map(|v| (v, false))
        .collect();
    if let Some(predecessor) = ctx.approved_in_group(version.group)? {
        if predecessor.id != version.id && !predecessor.is_delete() {
            others.push((predecessor, true));
        }
    }
    Ok(others)
}

// =============================================================================
// Uniqueness
// =============================================================================

/// No other live version group shares this version's identifying fields
#[derive(Debug, Clone)]
pub struct UniqueIdentifyingFields {
    code: String,
    description: String,
    fields: Option<Vec<String>>,
}

impl UniqueIdentifyingFields {
    /// Compare on the full identifying key
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            fields: None,
        }
    }

    /// Compare on a subset of identifying fields
    pub fn on_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

impl BusinessRule for UniqueIdentifyingFields {
    fn code(&self) -> &str {
        &self.code
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn validate(
        &self,
        ctx: &RuleContext<'_>,
        version: &EntityVersion,
    ) -> TariffResult<Option<Violation>> {
        if version.is_delete() {
            return Ok(None);
        }
        let duplicated = other_versions(ctx, version, self.fields.as_deref())?
            .iter()
            .any(|(_, own_group)| !own_group);
        Ok(duplicated.then(|| self.violation(ctx, version)))
    }
}

// =============================================================================
// No overlap
// =============================================================================

/// No other version with the same identifying fields overlaps in time
///
/// Other groups count as of the evaluated transaction. The version's own
/// approved predecessor counts unless the new period lies within the
/// predecessor's, so restating or end-dating a record passes while
/// stretching it over time it did not cover fails.
#[derive(Debug, Clone)]
pub struct NoOverlapping {
    code: String,
    description: String,
    fields: Option<Vec<String>>,
}

impl NoOverlapping {
    /// Compare on the full identifying key
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            fields: None,
        }
    }

    /// Compare on a subset of identifying fields
    pub fn on_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

impl BusinessRule for NoOverlapping {
    fn code(&self) -> &str {
        &self.code
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn validate(
        &self,
        ctx: &RuleContext<'_>,
        version: &EntityVersion,
    ) -> TariffResult<Option<Violation>> {
        if version.is_delete() {
            return Ok(None);
        }
        let period = version.validity();
        let overlapping = other_versions(ctx, version, self.fields.as_deref())?
            .iter()
            .filter(|(other, own_group)| !(*own_group && other.validity().contains(period)))
            .any(|(other, _)| other.validity().overlaps(period));
        Ok(overlapping.then(|| self.violation(ctx, version)))
    }
}

// =============================================================================
// Containment
// =============================================================================

/// The linked container's validity period covers this version's
#[derive(Debug, Clone)]
pub struct ValidityPeriodContained {
    code: String,
    description: String,
    container: EntityKind,
}

impl ValidityPeriodContained {
    /// Containment by the linked record of kind `container`
    pub fn new(
        code: impl Into<String>,
        description: impl Into<String>,
        container: EntityKind,
    ) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            container,
        }
    }
}

impl BusinessRule for ValidityPeriodContained {
    fn code(&self) -> &str {
        &self.code
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn validate(
        &self,
        ctx: &RuleContext<'_>,
        version: &EntityVersion,
    ) -> TariffResult<Option<Violation>> {
        if version.is_delete() {
            return Ok(None);
        }
        let Some(link) = version.data.link_of_kind(self.container) else {
            debug!(target: "tariff::rules", rule = %self.code, version = %version.id, container = %self.container, "Skipping: no container link");
            return Ok(None);
        };
        let contained = ctx
            .resolve(link)?
            .map_or(false, |container| container.validity().contains(version.validity()));
        Ok((!contained).then(|| self.violation(ctx, version)))
    }
}

// =============================================================================
// Existence
// =============================================================================

/// The linked record of a kind is visible
#[derive(Debug, Clone)]
pub struct MustExist {
    code: String,
    description: String,
    target: EntityKind,
}

impl MustExist {
    /// Existence of the linked record of kind `target`
    pub fn new(code: impl Into<String>, description: impl Into<String>, target: EntityKind) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            target,
        }
    }
}

impl BusinessRule for MustExist {
    fn code(&self) -> &str {
        &self.code
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn validate(
        &self,
        ctx: &RuleContext<'_>,
        version: &EntityVersion,
    ) -> TariffResult<Option<Violation>> {
        if version.is_delete() {
            return Ok(None);
        }
        let Some(link) = version.data.link_of_kind(self.target) else {
            debug!(target: "tariff::rules", rule = %self.code, version = %version.id, "Skipping: no reference");
            return Ok(None);
        };
        let exists = ctx.resolve(link)?.is_some();
        Ok((!exists).then(|| self.violation(ctx, version)))
    }
}

// =============================================================================
// Delete protection
// =============================================================================

/// A DELETE may not target a record still referenced by live records
#[derive(Debug, Clone)]
pub struct PreventDeleteIfInUse {
    code: String,
    description: String,
    used_by: Vec<EntityKind>,
}

impl PreventDeleteIfInUse {
    /// Any live referencing record blocks the delete
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            used_by: Vec::new(),
        }
    }

    /// Only referencing records of these kinds block the delete
    pub fn used_by(mut self, kinds: impl IntoIterator<Item = EntityKind>) -> Self {
        self.used_by = kinds.into_iter().collect();
        self
    }
}

impl BusinessRule for PreventDeleteIfInUse {
    fn code(&self) -> &str {
        &self.code
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn validate(
        &self,
        ctx: &RuleContext<'_>,
        version: &EntityVersion,
    ) -> TariffResult<Option<Violation>> {
        if !version.is_delete() {
            return Ok(None);
        }
        let in_use = ctx
            .referencing(&version.data.identity)?
            .iter()
            .any(|v| self.used_by.is_empty() || self.used_by.contains(&v.kind()));
        Ok(in_use.then(|| self.violation(ctx, version)))
    }
}

// =============================================================================
// Cutoff
// =============================================================================

/// Applies the inner rule only to versions starting after `cutoff`
#[derive(Debug, Clone)]
pub struct OnlyApplicableAfter {
    cutoff: NaiveDate,
    inner: SharedRule,
}

impl OnlyApplicableAfter {
    /// Wrap `inner`
    pub fn new(cutoff: NaiveDate, inner: impl BusinessRule + 'static) -> Self {
        Self {
            cutoff,
            inner: Arc::new(inner),
        }
    }

    /// Versions starting on or before this date are skipped
    pub fn cutoff(&self) -> NaiveDate {
        self.cutoff
    }
}

impl BusinessRule for OnlyApplicableAfter {
    fn code(&self) -> &str {
        self.inner.code()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn validate(
        &self,
        ctx: &RuleContext<'_>,
        version: &EntityVersion,
    ) -> TariffResult<Option<Violation>> {
        if version.validity().start() <= self.cutoff {
            debug!(target: "tariff::rules", rule = %self.code(), version = %version.id, "Skipping: start date before cutoff");
            return Ok(None);
        }
        self.inner.validate(ctx, version)
    }
}
