//! Business rule checker
//!
//! Builds the check set for a batch of changed versions and runs it:
//!
//! 1. For every changed version, each direct rule of its kind, evaluated as
//!    of the version's own transaction
//! 2. For every indirect rule triggered by its kind, the rule against each
//!    approved record of the owning kind that references the changed
//!    version, evaluated as of the changed version's transaction
//!
//! The set is deduplicated on (rule code, version, transaction). Every
//! check runs; violations are collected rather than short-circuiting.

use crate::registry::RuleRegistry;
use crate::rule::{RuleContext, SharedRule};
use crate::violation::Violation;
use chrono::Utc;
use rustc_hash::FxHashSet;
use tariff_core::{EntityVersion, TariffResult, TransactionId, VersionId, WorkBasketId};
use tariff_storage::{Catalog, CheckBatch, CheckOutcome, TransactionCheck};
use tracing::{debug, info};

/// One (rule, version, transaction) evaluation in the check set
#[derive(Debug, Clone)]
pub struct PlannedCheck {
    /// Rule to run
    pub rule: SharedRule,
    /// Version to run it against
    pub version: EntityVersion,
    /// Point in history to evaluate as of
    pub transaction: TransactionId,
}

/// Outcome of a checker run
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    /// One outcome per planned check, in plan order
    pub outcomes: Vec<CheckOutcome>,
    /// Failing checks only
    pub violations: Vec<Violation>,
}

impl CheckReport {
    /// Check if every rule passed
    pub fn is_successful(&self) -> bool {
        self.violations.is_empty()
    }

    /// Persistable batch covering `transactions`
    ///
    /// Each transaction gets a summary pinned to the current head of
    /// approved history and the transaction's newest version, so later
    /// changes to either mark the summary stale.
    pub fn into_batch(self, catalog: &Catalog, transactions: &[TransactionId]) -> CheckBatch {
        let head = catalog.latest_approved_transaction().map(|t| t.id);
        let now = Utc::now();
        let transaction_checks = transactions
            .iter()
            .map(|txn| TransactionCheck {
                transaction: *txn,
                completed: true,
                successful: !self
                    .outcomes
                    .iter()
                    .any(|o| o.transaction == *txn && !o.successful),
                head_transaction: head,
                latest_version: catalog.newest_version_in(*txn),
                checked_at: now,
            })
            .collect();
        CheckBatch {
            transaction_checks,
            outcomes: self.outcomes,
        }
    }
}

/// Deduplicated check set over a batch of versions
#[derive(Debug)]
pub struct BusinessRuleChecker {
    checks: Vec<PlannedCheck>,
}

impl BusinessRuleChecker {
    /// Plan checks for `versions`
    pub fn new(registry: &RuleRegistry, catalog: &Catalog, versions: &[EntityVersion]) -> Self {
        let mut seen: FxHashSet<(String, VersionId, TransactionId)> = FxHashSet::default();
        let mut checks = Vec::new();
        let mut plan = |rule: &SharedRule, version: &EntityVersion, transaction: TransactionId| {
            if seen.insert((rule.code().to_string(), version.id, transaction)) {
                checks.push(PlannedCheck {
                    rule: rule.clone(),
                    version: version.clone(),
                    transaction,
                });
            }
        };

        for version in versions {
            for rule in registry.direct_rules(version.kind()) {
                plan(rule, version, version.transaction);
            }
            for indirect in registry.indirect_rules(version.kind()) {
                for linked in catalog.approved_referencing(&version.data.identity, indirect.owner) {
                    // Skip owners the triggering workbasket has already replaced
                    let superseded = catalog
                        .group_as_of(linked.group, version.transaction)
                        .map_or(false, |seen| seen.map(|v| v.id) != Some(linked.id));
                    if superseded {
                        continue;
                    }
                    plan(&indirect.rule, &linked, version.transaction);
                }
            }
        }
        Self { checks }
    }

    /// Plan checks for every version in a workbasket
    pub fn for_workbasket(
        registry: &RuleRegistry,
        catalog: &Catalog,
        workbasket: WorkBasketId,
    ) -> Self {
        let versions: Vec<EntityVersion> = catalog
            .versions_in_workbasket(workbasket)
            .into_iter()
            .cloned()
            .collect();
        Self::new(registry, catalog, &versions)
    }

    /// Plan checks for the versions of one transaction
    pub fn for_transaction(
        registry: &RuleRegistry,
        catalog: &Catalog,
        transaction: TransactionId,
    ) -> Self {
        let versions: Vec<EntityVersion> = catalog
            .versions_in_transaction(transaction)
            .into_iter()
            .cloned()
            .collect();
        Self::new(registry, catalog, &versions)
    }

    /// Planned checks, in plan order
    pub fn checks(&self) -> &[PlannedCheck] {
        &self.checks
    }

    /// Number of planned checks
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Check if nothing needs checking
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Run every planned check
    pub fn run(&self, catalog: &Catalog) -> TariffResult<CheckReport> {
        let mut report = CheckReport::default();
        for check in &self.checks {
            let ctx = RuleContext::new(catalog, check.transaction);
            let violation = check.rule.validate(&ctx, &check.version)?;
            debug!(
                target: "tariff::rules",
                rule = check.rule.code(),
                version = %check.version.id,
                transaction = %check.transaction,
                passed = violation.is_none(),
                "Rule evaluated"
            );
            report.outcomes.push(CheckOutcome {
                transaction: check.transaction,
                rule_code: check.rule.code().to_string(),
                version: check.version.id,
                successful: violation.is_none(),
                message: violation.as_ref().map(|v| v.message.clone()),
            });
            if let Some(violation) = violation {
                report.violations.push(violation);
            }
        }
        info!(
            target: "tariff::rules",
            checks = self.checks.len(),
            violations = report.violations.len(),
            "Validation run finished"
        );
        Ok(report)
    }

    /// Run every planned check, returning only the violations
    pub fn validate(&self, catalog: &Catalog) -> TariffResult<Vec<Violation>> {
        Ok(self.run(catalog)?.violations)
    }
}
