//! Workbasket state machine
//!
//! ```text
//! editing ──submit──▶ proposed ──approve──▶ approved ──export──▶ sent ──confirm──▶ published
//!    ▲  │               │                                         │                  │
//!    │  └──archive──▶ archived                                    └──mark_errored───┤
//!    │      ◀──unarchive──┘                                                          ▼
//!    ├──────────────withdraw──────────────────────────────────────────────────── errored
//!    └──────────────────────────────────restore─────────────────────────────────────┘
//! ```
//!
//! Every transition takes the workbasket's write lock, then the store's
//! write guard, checks the source status and applies all of its effects
//! under that guard. A transition from any other status fails with
//! `InvalidTransition` and changes nothing.
//!
//! Approval is the only transition that moves transactions: the sequencer
//! re-partitions the drafts, the approver is set, and every touched version
//! group's current pointer advances, all under one guard. `mark_errored`
//! moves the pointers back by recomputing each group's newest approved
//! version once the workbasket no longer counts as approved.

use crate::database::Database;
use tariff_core::{
    TariffError, TariffResult, TransactionPosition, UserId, WorkBasketId, WorkflowStatus,
};
use tariff_storage::{StoreWriter, WorkBasketRecord};
use tracing::{info, warn};

impl Database {
    /// Fail with `InvalidTransition` unless `record` is in one of `allowed`
    fn require_status(
        &self,
        record: &WorkBasketRecord,
        action: &'static str,
        allowed: &[WorkflowStatus],
    ) -> TariffResult<()> {
        if allowed.contains(&record.status) {
            return Ok(());
        }
        self.coordinator.record_rejected_transition();
        warn!(
            target: "tariff::workbasket",
            workbasket = %record.id,
            status = %record.status,
            action,
            "Transition rejected"
        );
        Err(TariffError::InvalidTransition {
            workbasket: record.id,
            from: record.status,
            action,
        })
    }

    /// Status-only transition
    fn transition(
        &self,
        workbasket: WorkBasketId,
        action: &'static str,
        allowed: &[WorkflowStatus],
        to: WorkflowStatus,
    ) -> TariffResult<WorkBasketRecord> {
        let _guard = self.sequencer.lock_workbasket(workbasket);
        let mut writer = self.store.write();
        let record = writer.workbasket(workbasket)?.clone();
        self.require_status(&record, action, allowed)?;
        writer.set_status(workbasket, to)?;
        info!(target: "tariff::workbasket", workbasket = %workbasket, from = %record.status, to = %to, "{}", action);
        Ok(writer.workbasket(workbasket)?.clone())
    }

    /// Submit an editing workbasket for approval
    ///
    /// Every transaction needs a fresh, passing check unless
    /// `skip_validation` is configured. A workbasket without transactions
    /// needs none.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` unless the workbasket is editing
    /// - `NotFullyChecked` if a check is missing, stale or failing
    pub fn submit_for_approval(&self, workbasket: WorkBasketId) -> TariffResult<WorkBasketRecord> {
        let _guard = self.sequencer.lock_workbasket(workbasket);
        let mut writer = self.store.write();
        let record = writer.workbasket(workbasket)?.clone();
        self.require_status(&record, "submit", &[WorkflowStatus::Editing])?;

        if !self.skip_validation() {
            let unchecked = writer.unchecked_or_errored_transactions(workbasket);
            if !unchecked.is_empty() {
                warn!(
                    target: "tariff::workbasket",
                    workbasket = %workbasket,
                    unchecked = unchecked.len(),
                    "Submission refused: not fully checked"
                );
                return Err(TariffError::NotFullyChecked {
                    workbasket,
                    unchecked: unchecked.len(),
                });
            }
        }

        writer.set_status(workbasket, WorkflowStatus::Proposed)?;
        self.coordinator.record_submission();
        info!(target: "tariff::workbasket", workbasket = %workbasket, "Workbasket submitted for approval");
        Ok(writer.workbasket(workbasket)?.clone())
    }

    /// Return a proposed workbasket to editing
    ///
    /// Pending validation jobs are dropped and the workbasket's checks
    /// deleted, so it must be validated again before resubmitting.
    pub fn withdraw(&self, workbasket: WorkBasketId) -> TariffResult<WorkBasketRecord> {
        let _guard = self.sequencer.lock_workbasket(workbasket);
        let mut writer = self.store.write();
        let record = writer.workbasket(workbasket)?.clone();
        self.require_status(&record, "withdraw", &[WorkflowStatus::Proposed])?;

        let terminated = self.terminate_validations_for(workbasket);
        let removed = writer.delete_checks(workbasket);
        writer.set_status(workbasket, WorkflowStatus::Editing)?;
        info!(
            target: "tariff::workbasket",
            workbasket = %workbasket,
            terminated,
            checks_removed = removed,
            "Workbasket withdrawn"
        );
        Ok(writer.workbasket(workbasket)?.clone())
    }

    /// Approve a proposed workbasket
    ///
    /// Commits its draft transactions under the configured partition
    /// scheme, records the approver and advances every touched version
    /// group's current pointer, in one write guard. The publish hook runs
    /// afterwards; its failure is logged and counted, not returned.
    ///
    /// Returns the committed positions in workbasket order.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` unless the workbasket is proposed
    /// - `OrderingConflict` if the scheme cannot place the transactions;
    ///   the workbasket stays proposed
    pub fn approve(
        &self,
        workbasket: WorkBasketId,
        approver: UserId,
    ) -> TariffResult<Vec<TransactionPosition>> {
        let (record, positions) = {
            let _guard = self.sequencer.lock_workbasket(workbasket);
            let mut writer = self.store.write();
            let record = writer.workbasket(workbasket)?.clone();
            self.require_status(&record, "approve", &[WorkflowStatus::Proposed])?;
            let scheme = self.partition_scheme()?;

            let positions = self.sequencer.commit(&mut writer, workbasket, scheme)?;
            writer.set_approver(workbasket, Some(approver))?;
            writer.set_status(workbasket, WorkflowStatus::Approved)?;
            let moved = Self::refresh_pointers(&mut writer, workbasket)?;
            self.coordinator.record_approval();
            info!(
                target: "tariff::workbasket",
                workbasket = %workbasket,
                approver = %approver,
                scheme = %scheme,
                transactions = positions.len(),
                groups_advanced = moved,
                "Workbasket approved"
            );
            (writer.workbasket(workbasket)?.clone(), positions)
        };

        if let Err(e) = self.publish_hook.on_approved(&record, &positions) {
            self.coordinator.record_publish_failure();
            warn!(target: "tariff::workbasket", workbasket = %workbasket, error = %e, "Publish hook failed");
        }
        Ok(positions)
    }

    /// Mark an approved workbasket as exported downstream
    pub fn export_to_cds(&self, workbasket: WorkBasketId) -> TariffResult<WorkBasketRecord> {
        self.transition(
            workbasket,
            "export",
            &[WorkflowStatus::Approved],
            WorkflowStatus::Sent,
        )
    }

    /// Mark a sent workbasket as accepted downstream
    pub fn cds_confirmed(&self, workbasket: WorkBasketId) -> TariffResult<WorkBasketRecord> {
        self.transition(
            workbasket,
            "confirm",
            &[WorkflowStatus::Sent],
            WorkflowStatus::Published,
        )
    }

    /// Take an exported workbasket's changes back out of current history
    ///
    /// Allowed from sent or published. Every version group the workbasket
    /// touched falls back to its newest version still approved, or to none.
    /// Versions and transactions stay in place for audit.
    pub fn mark_errored(&self, workbasket: WorkBasketId) -> TariffResult<WorkBasketRecord> {
        let _guard = self.sequencer.lock_workbasket(workbasket);
        let mut writer = self.store.write();
        let record = writer.workbasket(workbasket)?.clone();
        self.require_status(
            &record,
            "mark errored",
            &[WorkflowStatus::Sent, WorkflowStatus::Published],
        )?;

        writer.set_status(workbasket, WorkflowStatus::Errored)?;
        let moved = Self::refresh_pointers(&mut writer, workbasket)?;
        self.coordinator.record_rollback();
        info!(
            target: "tariff::workbasket",
            workbasket = %workbasket,
            from = %record.status,
            groups_rolled_back = moved,
            "Workbasket marked errored"
        );
        Ok(writer.workbasket(workbasket)?.clone())
    }

    /// Reopen an errored workbasket for editing
    ///
    /// Current version pointers are left as they are.
    pub fn restore(&self, workbasket: WorkBasketId) -> TariffResult<WorkBasketRecord> {
        self.transition(
            workbasket,
            "restore",
            &[WorkflowStatus::Errored],
            WorkflowStatus::Editing,
        )
    }

    /// Put an editing workbasket aside
    pub fn archive(&self, workbasket: WorkBasketId) -> TariffResult<WorkBasketRecord> {
        self.transition(
            workbasket,
            "archive",
            &[WorkflowStatus::Editing],
            WorkflowStatus::Archived,
        )
    }

    /// Bring an archived workbasket back to editing
    pub fn unarchive(&self, workbasket: WorkBasketId) -> TariffResult<WorkBasketRecord> {
        self.transition(
            workbasket,
            "unarchive",
            &[WorkflowStatus::Archived],
            WorkflowStatus::Editing,
        )
    }

    fn refresh_pointers(writer: &mut StoreWriter<'_>, workbasket: WorkBasketId) -> TariffResult<usize> {
        Ok(writer.refresh_current_versions(workbasket)?.len())
    }
}
