//! Export hook invoked after a successful approval
//!
//! The substrate only guarantees that the status change and the current
//! version pointer update are applied together. What happens downstream
//! (building an export envelope, sending it on) belongs to a collaborator
//! that implements [`PublishHook`].

use tariff_core::{TariffResult, TransactionPosition};
use tariff_storage::WorkBasketRecord;

/// Receives approved workbaskets
///
/// Called after the approval write guard is released, so implementations
/// may read the store. A failing hook does not undo the approval.
pub trait PublishHook: Send + Sync + 'static {
    /// Handle a freshly approved workbasket and its committed positions
    fn on_approved(
        &self,
        workbasket: &WorkBasketRecord,
        positions: &[TransactionPosition],
    ) -> TariffResult<()>;
}

/// Hook that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublishHook;

impl PublishHook for NoopPublishHook {
    fn on_approved(&self, _: &WorkBasketRecord, _: &[TransactionPosition]) -> TariffResult<()> {
        Ok(())
    }
}
