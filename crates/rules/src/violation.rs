//! Rule violations
//!
//! A `Violation` is a result value, not an error: validation collects every
//! violation in one pass and hands them back together.

use serde::{Deserialize, Serialize};
use std::fmt;
use tariff_core::{EntityVersion, IdentifyingKey, TransactionId, VersionId};

/// One failing (rule, version) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Violation {
    /// Code of the rule broken, e.g. "ME32"
    pub rule_code: String,
    /// Version the rule ran against
    pub version: VersionId,
    /// Identity of that version
    pub identity: IdentifyingKey,
    /// Transaction the rule was evaluated as of
    pub transaction: TransactionId,
    /// What was broken
    pub message: String,
}

impl Violation {
    /// Create a violation against `version` as of `transaction`
    pub fn new(
        rule_code: impl Into<String>,
        version: &EntityVersion,
        transaction: TransactionId,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_code: rule_code.into(),
            version: version.id,
            identity: version.data.identity.clone(),
            transaction,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({} as of {})",
            self.rule_code, self.message, self.identity, self.transaction
        )
    }
}
