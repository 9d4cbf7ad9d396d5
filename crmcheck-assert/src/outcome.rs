//! Step outcomes reported back to the automation host.

use crmcheck_core::{CrmError, CrmResult};
use serde::{Deserialize, Serialize};

use crate::engine::AssertionResult;

/// Pass, fail or error, each with a message for the host to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum StepOutcome {
    Passed(String),
    Failed(String),
    /// The step could not be evaluated: a remote failure or a usage mistake.
    Error(String),
}

impl StepOutcome {
    /// Map an assertion result onto an outcome.
    ///
    /// Assertion input errors keep their own message, which lists the valid
    /// operators for an unknown name.
    pub fn from_assertion(result: CrmResult<AssertionResult>) -> Self {
        match result {
            Ok(AssertionResult { valid: true, message }) => StepOutcome::Passed(message),
            Ok(AssertionResult { valid: false, message }) => StepOutcome::Failed(message),
            Err(CrmError::Assertion(e)) => StepOutcome::Error(e.to_string()),
            Err(e) => StepOutcome::Error(e.to_string()),
        }
    }

    /// Outcome for a validation step whose record lookup came back empty.
    pub fn record_not_found(object_type: &str, lookup: &str) -> Self {
        StepOutcome::Failed(format!("No {object_type} was found with {lookup}."))
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, StepOutcome::Passed(_))
    }

    pub fn message(&self) -> &str {
        match self {
            StepOutcome::Passed(m) | StepOutcome::Failed(m) | StepOutcome::Error(m) => m,
        }
    }
}

impl From<CrmResult<AssertionResult>> for StepOutcome {
    fn from(result: CrmResult<AssertionResult>) -> Self {
        Self::from_assertion(result)
    }
}
