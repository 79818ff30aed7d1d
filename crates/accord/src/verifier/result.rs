//! Per-interaction verification outcomes.

use crate::error::ErrorKind;
use crate::matching::Mismatch;
use serde::Serialize;
use std::fmt;

/// Replay state of one interaction.
///
/// `Pending -> Requesting -> Comparing -> Passed | Failed`. A network error
/// moves straight from `Requesting` to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationState {
    Pending,
    Requesting,
    Comparing,
    Passed,
    Failed,
}

impl VerificationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, VerificationState::Passed | VerificationState::Failed)
    }
}

impl fmt::Display for VerificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerificationState::Pending => "pending",
            VerificationState::Requesting => "requesting",
            VerificationState::Comparing => "comparing",
            VerificationState::Passed => "passed",
            VerificationState::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionResult {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_state: Option<String>,
    pub state: VerificationState,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mismatches: Vec<Mismatch>,
    /// Set when the exchange itself failed (provider unreachable, state setup
    /// rejected)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub error_kind: Option<ErrorKind>,
    pub duration_ms: u128,
}

impl InteractionResult {
    pub fn passed(&self) -> bool {
        self.state == VerificationState::Passed
    }

    pub fn label(&self) -> String {
        match &self.provider_state {
            Some(state) => format!("{} [given {state}]", self.description),
            None => self.description.clone(),
        }
    }
}

/// Results of replaying one contract.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub consumer: String,
    pub provider: String,
    pub results: Vec<InteractionResult>,
}

impl VerificationReport {
    /// True when every interaction passed.
    pub fn passed(&self) -> bool {
        self.results.iter().all(InteractionResult::passed)
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.passed_count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &InteractionResult> {
        self.results.iter().filter(|r| !r.passed())
    }
}
