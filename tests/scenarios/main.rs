//! Scenario Test Suite
//!
//! End-to-end tests through the public `tariffdb` API.
//!
//! ## Test Tier Structure
//!
//! - **Tier 1: Workflow scenarios** (must pass)
//!   Create, approve, overlap, recheck, rollback: the life of a record.
//!
//! - **Tier 2: Rules and reads**
//!   Indirect rules, delete protection, idempotent validation, query facade,
//!   configuration on disk.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test scenarios
//! ```

// Test utilities
mod test_utils;

// Tier 1: Workflow scenarios
mod workflow_scenarios;

// Tier 2: Rules and reads
mod config_tests;
mod query_tests;
mod rule_tests;
