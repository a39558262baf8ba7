//! Query facade over version groups
//!
//! A `VersionQuery` is a description of what to read, not a cursor: build it
//! once, then run it against any catalog guard as often as needed. Each run
//! resolves against the catalog state it is given, so replaying a query
//! after further writes reflects those writes.
//!
//! ```text
//! let measures = VersionQuery::kind(EntityKind::Measure)
//!     .as_of(txn)
//!     .links_to(measure_type.clone())
//!     .fetch(&store.read())?;
//! ```

use crate::catalog::Catalog;
use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;
use tariff_core::{
    EntityKind, EntityVersion, HasValidity, IdentifyingKey, TariffResult, TransactionId,
    VersionGroupId,
};

type Predicate = Arc<dyn Fn(&EntityVersion) -> bool + Send + Sync>;

/// Which version of each group a query yields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// The group's current version pointer
    LatestApproved,
    /// The version visible as of a transaction
    AsOf(TransactionId),
    /// As of a transaction, counting approved history only
    ApprovedAsOf(TransactionId),
    /// As of a transaction, overridden by that transaction's workbasket
    Current(TransactionId),
    /// Every version ever appended, DELETE rows included
    AllVersions,
}

/// Lazy, replayable query over entity versions
#[derive(Clone)]
pub struct VersionQuery {
    kind: Option<EntityKind>,
    mode: ReadMode,
    live_on: Option<NaiveDate>,
    links_to: Option<IdentifyingKey>,
    excluding_group: Option<VersionGroupId>,
    predicate: Option<Predicate>,
    by_record_code: bool,
}

impl fmt::Debug for VersionQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionQuery")
            .field("kind", &self.kind)
            .field("mode", &self.mode)
            .field("live_on", &self.live_on)
            .field("links_to", &self.links_to)
            .field("excluding_group", &self.excluding_group)
            .field("predicate", &self.predicate.is_some())
            .field("by_record_code", &self.by_record_code)
            .finish()
    }
}

impl Default for VersionQuery {
    fn default() -> Self {
        Self::all()
    }
}

impl VersionQuery {
    /// Latest approved versions of every kind
    pub fn all() -> Self {
        Self {
            kind: None,
            mode: ReadMode::LatestApproved,
            live_on: None,
            links_to: None,
            excluding_group: None,
            predicate: None,
            by_record_code: false,
        }
    }

    /// Latest approved versions of one kind
    pub fn kind(kind: EntityKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::all()
        }
    }

    /// Resolve each group as of `transaction`
    pub fn as_of(mut self, transaction: TransactionId) -> Self {
        self.mode = ReadMode::AsOf(transaction);
        self
    }

    /// Resolve each group as of `transaction`, ignoring drafts
    pub fn approved_as_of(mut self, transaction: TransactionId) -> Self {
        self.mode = ReadMode::ApprovedAsOf(transaction);
        self
    }

    /// Resolve each group as of `transaction`, previewing its workbasket
    pub fn current(mut self, transaction: TransactionId) -> Self {
        self.mode = ReadMode::Current(transaction);
        self
    }

    /// Yield full history instead of one version per group
    pub fn all_versions(mut self) -> Self {
        self.mode = ReadMode::AllVersions;
        self
    }

    /// Keep versions whose validity period contains `date`
    pub fn live_on(mut self, date: NaiveDate) -> Self {
        self.live_on = Some(date);
        self
    }

    /// Keep versions that reference `target`
    pub fn links_to(mut self, target: IdentifyingKey) -> Self {
        self.links_to = Some(target);
        self
    }

    /// Skip one version group
    pub fn excluding_group(mut self, group: VersionGroupId) -> Self {
        self.excluding_group = Some(group);
        self
    }

    /// Keep versions matching an arbitrary predicate
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&EntityVersion) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Order results by record code, then identity
    pub fn order_by_record_code(mut self) -> Self {
        self.by_record_code = true;
        self
    }

    /// Read mode of this query
    pub fn mode(&self) -> ReadMode {
        self.mode
    }

    // =========================================================================
    // Terminals
    // =========================================================================

    /// Run the query
    pub fn fetch(&self, catalog: &Catalog) -> TariffResult<Vec<EntityVersion>> {
        let mut results = Vec::new();
        for group in catalog.groups_of_kind(self.kind) {
            if self.excluding_group == Some(group.id) {
                continue;
            }
            match self.mode {
                ReadMode::AllVersions => {
                    for version in catalog.history(group.id)? {
                        if self.matches(&version) {
                            results.push(version);
                        }
                    }
                }
                mode => {
                    let resolved = match mode {
                        ReadMode::LatestApproved => group
                            .current_version
                            .map(|id| catalog.version(id))
                            .transpose()?,
                        ReadMode::AsOf(txn) => catalog.group_as_of(group.id, txn)?,
                        ReadMode::ApprovedAsOf(txn) => {
                            catalog.group_approved_as_of(group.id, txn)?
                        }
                        ReadMode::Current(txn) => catalog.group_current(group.id, txn)?,
                        ReadMode::AllVersions => None,
                    };
                    if let Some(version) = resolved {
                        if !version.is_delete() && self.matches(version) {
                            results.push(version.clone());
                        }
                    }
                }
            }
        }
        if self.by_record_code {
            results.sort_by(|a, b| {
                let key_a = (a.kind().record_code(), a.kind().subrecord_code());
                let key_b = (b.kind().record_code(), b.kind().subrecord_code());
                key_a
                    .cmp(&key_b)
                    .then_with(|| a.data.identity.cmp(&b.data.identity))
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
        Ok(results)
    }

    /// Check if the query yields anything
    pub fn exists(&self, catalog: &Catalog) -> TariffResult<bool> {
        Ok(!self.fetch(catalog)?.is_empty())
    }

    /// Number of results
    pub fn count(&self, catalog: &Catalog) -> TariffResult<usize> {
        Ok(self.fetch(catalog)?.len())
    }

    /// First result in query order
    pub fn first(&self, catalog: &Catalog) -> TariffResult<Option<EntityVersion>> {
        Ok(self.fetch(catalog)?.into_iter().next())
    }

    fn matches(&self, version: &EntityVersion) -> bool {
        if let Some(date) = self.live_on {
            if !version.is_live_on(date) {
                return false;
            }
        }
        if let Some(target) = &self.links_to {
            if !version.links_to(target) {
                return false;
            }
        }
        self.predicate.as_ref().map_or(true, |p| p(version))
    }
}
