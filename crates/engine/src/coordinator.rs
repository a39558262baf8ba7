//! Workflow coordinator metrics
//!
//! Counts what the workbasket state machine and the validation outbox did:
//! - Transitions applied, per kind of interest (approvals, rollbacks)
//! - Transitions rejected from a non-source state
//! - Validation runs applied and stale results discarded
//!
//! # Memory Ordering
//!
//! Every counter uses Relaxed ordering. They are observational only and do
//! not synchronize any other memory operation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of workflow counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkflowMetrics {
    /// Workbaskets created
    pub workbaskets_created: u64,
    /// Workbaskets submitted for approval
    pub submissions: u64,
    /// Workbaskets approved
    pub approvals: u64,
    /// Workbaskets marked errored (pointer rollbacks)
    pub rollbacks: u64,
    /// Transitions attempted from a non-source state
    pub rejected_transitions: u64,
    /// Validation jobs enqueued
    pub validations_enqueued: u64,
    /// Validation results written to the check table
    pub validations_applied: u64,
    /// Validation results discarded as stale
    pub stale_results_discarded: u64,
    /// Validation jobs terminated before completion
    pub validations_terminated: u64,
    /// Publish hook failures after approval
    pub publish_failures: u64,
}

/// Workflow counters shared by every `Database` operation
#[derive(Debug, Default)]
pub struct WorkflowCoordinator {
    workbaskets_created: AtomicU64,
    submissions: AtomicU64,
    approvals: AtomicU64,
    rollbacks: AtomicU64,
    rejected_transitions: AtomicU64,
    validations_enqueued: AtomicU64,
    validations_applied: AtomicU64,
    stale_results_discarded: AtomicU64,
    validations_terminated: AtomicU64,
    publish_failures: AtomicU64,
}

impl WorkflowCoordinator {
    /// Create a coordinator with every counter at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new workbasket
    pub fn record_workbasket_created(&self) {
        self.workbaskets_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a submission
    pub fn record_submission(&self) {
        self.submissions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an approval
    pub fn record_approval(&self) {
        self.approvals.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rollback
    pub fn record_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a transition rejected from a non-source state
    pub fn record_rejected_transition(&self) {
        self.rejected_transitions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a job enqueued
    pub fn record_validation_enqueued(&self) {
        self.validations_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a job result written
    pub fn record_validation_applied(&self) {
        self.validations_applied.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a job result discarded
    pub fn record_stale_result(&self) {
        self.stale_results_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a job terminated
    pub fn record_validation_terminated(&self) {
        self.validations_terminated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a publish hook failure
    pub fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot every counter
    pub fn metrics(&self) -> WorkflowMetrics {
        WorkflowMetrics {
            workbaskets_created: self.workbaskets_created.load(Ordering::Relaxed),
            submissions: self.submissions.load(Ordering::Relaxed),
            approvals: self.approvals.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            rejected_transitions: self.rejected_transitions.load(Ordering::Relaxed),
            validations_enqueued: self.validations_enqueued.load(Ordering::Relaxed),
            validations_applied: self.validations_applied.load(Ordering::Relaxed),
            stale_results_discarded: self.stale_results_discarded.load(Ordering::Relaxed),
            validations_terminated: self.validations_terminated.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
        }
    }
}
