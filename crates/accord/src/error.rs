//! Error types shared by the matching engine, the consumer session and the
//! provider verifier.

use crate::matching::MismatchReport;

/// Broad classification of a [`ContractError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed expectation, duplicate interaction, invalid regex. Fatal at
    /// registration or load time.
    Configuration,
    /// Provider or mock unreachable. Fatal for the current interaction only.
    Network,
    /// The comparator found structural differences.
    Mismatch,
    /// Reading or writing a contract file failed.
    Io,
}

#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("Invalid regex pattern '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Example '{example}' does not match its own pattern '{pattern}'")]
    ExampleDoesNotMatch { example: String, pattern: String },
    #[error("Malformed expectation: {0}")]
    MalformedExpectation(String),
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),
    #[error("Interaction '{description}'{} is already registered", state_suffix(.provider_state))]
    DuplicateInteraction {
        description: String,
        provider_state: Option<String>,
    },
    #[error("Session for {consumer} -> {provider} is finalized; no further interactions can be registered")]
    SessionFinalized { consumer: String, provider: String },
    #[error("Unsupported contract specification version {found} (supported: {supported})")]
    UnsupportedVersion { found: String, supported: String },
    #[error("Mock response for '{description}' does not satisfy its own expectation:\n{report}")]
    FixtureMismatch {
        description: String,
        report: MismatchReport,
    },
    #[error("{count} request(s) reached the mock server without matching any interaction")]
    UnexpectedRequests { count: usize },
    #[error("Failed to bind mock server to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Broker rejected {url}: {status} {body}")]
    Broker {
        url: String,
        status: u16,
        body: String,
    },
    #[error("Provider state setup for '{state}' returned {status}: {body}")]
    ProviderState {
        state: String,
        status: u16,
        body: String,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid contract JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn state_suffix(state: &Option<String>) -> String {
    state
        .as_ref()
        .map(|s| format!(" given '{s}'"))
        .unwrap_or_default()
}

impl ContractError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContractError::InvalidRegex { .. }
            | ContractError::ExampleDoesNotMatch { .. }
            | ContractError::MalformedExpectation(_)
            | ContractError::InvalidMethod(_)
            | ContractError::DuplicateInteraction { .. }
            | ContractError::SessionFinalized { .. }
            | ContractError::UnsupportedVersion { .. }
            | ContractError::Json(_) => ErrorKind::Configuration,
            ContractError::FixtureMismatch { .. } | ContractError::UnexpectedRequests { .. } => {
                ErrorKind::Mismatch
            }
            ContractError::Bind { .. }
            | ContractError::Http(_)
            | ContractError::Broker { .. }
            | ContractError::ProviderState { .. } => ErrorKind::Network,
            ContractError::Io(_) => ErrorKind::Io,
        }
    }
}
