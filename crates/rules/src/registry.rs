//! Rule registry: entity kind → rules
//!
//! Built once at startup. Each kind has an ordered list of direct rules,
//! and a list of indirect rules: rules owned by another kind that must be
//! re-run against that kind's approved records whenever a record of this
//! kind changes.

use crate::rule::{BusinessRule, SharedRule};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tariff_core::EntityKind;

/// A rule re-run on records of `owner` that reference a changed record
#[derive(Debug, Clone)]
pub struct IndirectRule {
    /// The rule to run
    pub rule: SharedRule,
    /// Kind whose records the rule runs against
    pub owner: EntityKind,
}

/// Explicit mapping from kinds to their rules
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    direct: FxHashMap<EntityKind, Vec<SharedRule>>,
    indirect: FxHashMap<EntityKind, Vec<IndirectRule>>,
}

impl RuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a direct rule for `kind`
    pub fn register(&mut self, kind: EntityKind, rule: SharedRule) {
        self.direct.entry(kind).or_default().push(rule);
    }

    /// Add a rule owned by `owner` that also re-runs when `changed` changes
    pub fn register_indirect(&mut self, changed: EntityKind, owner: EntityKind, rule: SharedRule) {
        self.indirect
            .entry(changed)
            .or_default()
            .push(IndirectRule { rule, owner });
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_rule(mut self, kind: EntityKind, rule: impl BusinessRule + 'static) -> Self {
        self.register(kind, Arc::new(rule));
        self
    }

    /// Register `rule` directly on `owner` and indirectly on `changed`
    pub fn with_linked_rule(
        mut self,
        owner: EntityKind,
        changed: EntityKind,
        rule: impl BusinessRule + 'static,
    ) -> Self {
        let rule: SharedRule = Arc::new(rule);
        self.register(owner, Arc::clone(&rule));
        self.register_indirect(changed, owner, rule);
        self
    }

    /// Direct rules of `kind`, in registration order
    pub fn direct_rules(&self, kind: EntityKind) -> &[SharedRule] {
        self.direct.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Indirect rules triggered by changes to `kind`
    pub fn indirect_rules(&self, kind: EntityKind) -> &[IndirectRule] {
        self.indirect.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of registrations
    pub fn len(&self) -> usize {
        self.direct.values().map(Vec::len).sum::<usize>()
            + self.indirect.values().map(Vec::len).sum::<usize>()
    }

    /// Check if no rule is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
