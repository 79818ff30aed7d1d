// Library exports for the binaries, integration tests and benchmarks

// ===== Matching engine =====
pub mod matching;

// ===== Contract model =====
pub mod contract;
pub mod error;
pub mod interaction;

// ===== Consumer side =====
pub mod mock;
pub mod session;

// ===== Provider side =====
pub mod broker;
pub mod config;
pub mod verifier;

pub use broker::BrokerClient;
pub use config::{SessionConfig, VerifierConfig};
pub use contract::{ContractArtifact, ContractMetadata, Participant, SPECIFICATION_VERSION};
pub use error::{ContractError, ErrorKind};
pub use interaction::{
    Interaction, InteractionBuilder, ObservedRequest, ObservedResponse, RequestExpectation,
    ResponseExpectation,
};
pub use matching::{
    compare, ExpectationNode, JsonType, MatchResult, MatchRule, Mismatch, MismatchKind,
    MismatchReport,
};
pub use mock::{MockServer, PROVIDER_STATES_PATH};
pub use session::{Session, SessionState};
pub use verifier::{InteractionResult, VerificationReport, VerificationState, Verifier};
