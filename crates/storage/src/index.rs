//! Secondary indices for efficient query patterns
//!
//! This module provides secondary indices that enable efficient queries
//! without scanning every version group:
//! - IdentityIndex: Maps IdentifyingKey → groups, oldest first (resolution reads)
//! - KindIndex: Maps EntityKind → groups (query facade, indirect rules)
//! - LinkIndex: Maps a referenced identity → groups whose versions reference it

use rustc_hash::{FxHashMap, FxHashSet};
use tariff_core::{EntityKind, IdentifyingKey, VersionGroupId};

/// Secondary index: IdentifyingKey → version groups
///
/// An identity normally has one group. A CREATE after an approved DELETE
/// starts a second group for the same identity, so groups are kept in
/// creation order and readers consult the newest first.
#[derive(Debug, Default)]
pub struct IdentityIndex {
    index: FxHashMap<IdentifyingKey, Vec<VersionGroupId>>,
}

impl IdentityIndex {
    /// Create a new empty IdentityIndex
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new group for `identity`
    pub fn insert(&mut self, identity: IdentifyingKey, group: VersionGroupId) {
        self.index.entry(identity).or_default().push(group);
    }

    /// Groups for `identity`, oldest first
    pub fn get(&self, identity: &IdentifyingKey) -> &[VersionGroupId] {
        self.index.get(identity).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Secondary index: EntityKind → version groups
#[derive(Debug, Default)]
pub struct KindIndex {
    index: FxHashMap<EntityKind, Vec<VersionGroupId>>,
}

impl KindIndex {
    /// Create a new empty KindIndex
    pub fn new() -> Self {
        Self::default()
    }

    /// Add group to kind's index
    pub fn insert(&mut self, kind: EntityKind, group: VersionGroupId) {
        self.index.entry(kind).or_default().push(group);
    }

    /// Groups of `kind` in creation order
    pub fn get(&self, kind: EntityKind) -> &[VersionGroupId] {
        self.index.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Secondary index: referenced identity → referencing groups
///
/// A group is added when any of its versions links to the target. Entries
/// are never removed; readers re-check the resolved version's links.
#[derive(Debug, Default)]
pub struct LinkIndex {
    index: FxHashMap<IdentifyingKey, FxHashSet<VersionGroupId>>,
}

impl LinkIndex {
    /// Create a new empty LinkIndex
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `group` references `target`
    pub fn insert(&mut self, target: IdentifyingKey, group: VersionGroupId) {
        self.index.entry(target).or_default().insert(group);
    }

    /// Groups that have ever referenced `target`, in id order
    pub fn referencing(&self, target: &IdentifyingKey) -> Vec<VersionGroupId> {
        let mut groups: Vec<VersionGroupId> = self
            .index
            .get(target)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        groups.sort();
        groups
    }
}
