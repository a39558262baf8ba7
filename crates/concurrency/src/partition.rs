//! Partition schemes
//!
//! A scheme decides which approved partition a workbasket's transactions
//! land in when it is approved. It is chosen once per deployment.
//!
//! Partition precedence is fixed: every seed transaction precedes every
//! revision transaction, and both precede all drafts.

use serde::{Deserialize, Serialize};
use std::fmt;
use tariff_core::{Partition, TariffError, TariffResult, WorkflowStatus};
use tariff_storage::Catalog;

/// Policy mapping approved workbaskets to partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartitionScheme {
    /// First approval goes to the seed partition, later ones to revision
    SeedFirst,
    /// Every approval goes to one partition
    Fixed(Partition),
}

impl Default for PartitionScheme {
    fn default() -> Self {
        PartitionScheme::SeedFirst
    }
}

impl PartitionScheme {
    /// Parse a configured scheme name
    ///
    /// Accepts `SEED_FIRST`, `SEED_ONLY` and `REVISION_ONLY`.
    pub fn from_name(name: &str) -> TariffResult<Self> {
        match name {
            "SEED_FIRST" => Ok(PartitionScheme::SeedFirst),
            "SEED_ONLY" => Ok(PartitionScheme::Fixed(Partition::SeedFile)),
            "REVISION_ONLY" => Ok(PartitionScheme::Fixed(Partition::Revision)),
            other => Err(TariffError::config(format!(
                "unknown partition scheme '{}'",
                other
            ))),
        }
    }

    /// Configured name of the scheme
    pub fn name(&self) -> &'static str {
        match self {
            PartitionScheme::SeedFirst => "SEED_FIRST",
            PartitionScheme::Fixed(Partition::SeedFile) => "SEED_ONLY",
            PartitionScheme::Fixed(Partition::Revision) => "REVISION_ONLY",
            PartitionScheme::Fixed(Partition::Draft) => "DRAFT",
        }
    }

    /// Partition for transactions of a workbasket in `status`
    ///
    /// Non-approved statuses always map to draft. Fails with
    /// `OrderingConflict` when the result would place a seed transaction
    /// after an existing revision, or when a fixed scheme names the draft
    /// partition.
    pub fn partition_for(
        &self,
        status: WorkflowStatus,
        catalog: &Catalog,
    ) -> TariffResult<Partition> {
        if !status.is_approved() {
            return Ok(Partition::Draft);
        }
        match self {
            PartitionScheme::SeedFirst => {
                if Partition::APPROVED.iter().any(|p| catalog.has_partition(*p)) {
                    Ok(Partition::Revision)
                } else {
                    Ok(Partition::SeedFile)
                }
            }
            PartitionScheme::Fixed(Partition::Draft) => Err(TariffError::ordering_conflict(
                "a fixed partition scheme cannot approve into the draft partition",
            )),
            PartitionScheme::Fixed(Partition::SeedFile) => {
                if catalog.has_partition(Partition::Revision) {
                    return Err(TariffError::ordering_conflict(
                        "seed transactions cannot be approved after revision transactions",
                    ));
                }
                Ok(Partition::SeedFile)
            }
            PartitionScheme::Fixed(Partition::Revision) => Ok(Partition::Revision),
        }
    }
}

impl fmt::Display for PartitionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Check that each approved partition's orders are exactly `1..=n`
pub fn verify_ordering(catalog: &Catalog) -> TariffResult<()> {
    for partition in Partition::APPROVED {
        for (index, order) in catalog.partition_orders(partition).into_iter().enumerate() {
            let expected = index as u64 + 1;
            if order != expected {
                return Err(TariffError::ordering_conflict(format!(
                    "{} partition has order {} at position {}",
                    partition, order, expected
                )));
            }
        }
    }
    Ok(())
}
