//! Provider-side replay.
//!
//! Each interaction of a contract is replayed against a live provider in
//! artifact order: its example request is sent, the response is captured and
//! compared against the response expectation. Failures are recorded per
//! interaction and never stop the run.

pub mod report;
mod result;

pub use result::{InteractionResult, VerificationReport, VerificationState};

use crate::config::{ReadinessConfig, VerifierConfig};
use crate::contract::ContractArtifact;
use crate::error::ContractError;
use crate::interaction::{Interaction, ObservedResponse};
use crate::matching::match_response;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Replays contracts against one provider base URL.
pub struct Verifier {
    base_url: String,
    client: reqwest::Client,
    readiness: ReadinessConfig,
    provider_states_setup_url: Option<String>,
    request_headers: BTreeMap<String, String>,
}

impl Verifier {
    pub fn new(base_url: impl Into<String>, config: &VerifierConfig) -> Result<Self, ContractError> {
        let client = reqwest::Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            readiness: config.readiness.clone(),
            provider_states_setup_url: config.provider_states_setup_url.clone(),
            request_headers: config.request_headers.clone(),
        })
    }

    pub fn with_defaults(base_url: impl Into<String>) -> Result<Self, ContractError> {
        Self::new(base_url, &VerifierConfig::default())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Poll the provider until it answers any HTTP response, at most
    /// `readiness.attempts` times. Returns whether it became ready; an
    /// unready provider still gets verified and fails per interaction.
    pub async fn wait_for_provider(&self) -> bool {
        let url = format!("{}{}", self.base_url, self.readiness.path);
        let attempts = self.readiness.attempts.max(1);
        for attempt in 1..=attempts {
            match self.client.get(&url).send().await {
                Ok(response) => {
                    debug!(
                        "Provider at {} ready after {} attempt(s) (status {})",
                        self.base_url,
                        attempt,
                        response.status()
                    );
                    return true;
                }
                Err(e) => {
                    warn!(
                        "Provider at {} not ready (attempt {}/{}): {}",
                        self.base_url, attempt, attempts, e
                    );
                    if attempt < attempts {
                        tokio::time::sleep(self.readiness.interval()).await;
                    }
                }
            }
        }
        warn!(
            "Provider at {} did not become ready after {} attempts",
            self.base_url, attempts
        );
        false
    }

    /// Wait for the provider, then replay one contract.
    pub async fn verify(&self, artifact: &ContractArtifact) -> VerificationReport {
        self.wait_for_provider().await;
        self.replay(artifact).await
    }

    /// Wait for the provider once, then replay every contract in order.
    pub async fn verify_all(&self, artifacts: &[ContractArtifact]) -> Vec<VerificationReport> {
        self.wait_for_provider().await;
        let mut reports = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            reports.push(self.replay(artifact).await);
        }
        reports
    }

    async fn replay(&self, artifact: &ContractArtifact) -> VerificationReport {
        info!(
            "Verifying {} interaction(s) of {} -> {} against {}",
            artifact.interactions.len(),
            artifact.consumer.name,
            artifact.provider.name,
            self.base_url
        );
        let mut results = Vec::with_capacity(artifact.interactions.len());
        for interaction in &artifact.interactions {
            results.push(
                self.verify_interaction(&artifact.consumer.name, interaction)
                    .await,
            );
        }
        VerificationReport {
            consumer: artifact.consumer.name.clone(),
            provider: artifact.provider.name.clone(),
            results,
        }
    }

    /// Replay a single interaction.
    pub async fn verify_interaction(
        &self,
        consumer: &str,
        interaction: &Interaction,
    ) -> InteractionResult {
        let start = Instant::now();
        let label = interaction.label();
        let mut result = InteractionResult {
            description: interaction.description.clone(),
            provider_state: interaction.provider_state.clone(),
            state: VerificationState::Pending,
            mismatches: Vec::new(),
            error: None,
            error_kind: None,
            duration_ms: 0,
        };

        if let Some(state) = &interaction.provider_state {
            if let Err(e) = self.setup_provider_state(consumer, state).await {
                fail(&label, &mut result, e);
                result.duration_ms = start.elapsed().as_millis();
                return result;
            }
        }

        transition(&label, &mut result.state, VerificationState::Requesting);
        let observed = match self.send(interaction).await {
            Ok(observed) => observed,
            Err(e) => {
                fail(&label, &mut result, e);
                result.duration_ms = start.elapsed().as_millis();
                return result;
            }
        };

        transition(&label, &mut result.state, VerificationState::Comparing);
        result.mismatches = match_response(&interaction.response, &observed);
        let outcome = if result.mismatches.is_empty() {
            VerificationState::Passed
        } else {
            VerificationState::Failed
        };
        transition(&label, &mut result.state, outcome);
        result.duration_ms = start.elapsed().as_millis();
        result
    }

    async fn send(&self, interaction: &Interaction) -> Result<ObservedResponse, ContractError> {
        let request = &interaction.request;
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| ContractError::InvalidMethod(request.method.clone()))?;
        let url = format!("{}{}", self.base_url, request.example_path_and_query());
        debug!("{} {}", request.method, url);

        let mut headers: BTreeMap<String, String> = request.example_headers().into_iter().collect();
        for (name, value) in &self.request_headers {
            headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
            headers.insert(name.clone(), value.clone());
        }

        let mut builder = self.client.request(method, url);
        let body = request.example_body();
        if body.is_some() && !headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
            builder = builder.header("Content-Type", "application/json");
        }
        for (name, value) in &headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        Ok(ObservedResponse::from_reqwest(response).await?)
    }

    async fn setup_provider_state(&self, consumer: &str, state: &str) -> Result<(), ContractError> {
        let Some(url) = &self.provider_states_setup_url else {
            return Ok(());
        };
        debug!("Setting up provider state '{}' via {}", state, url);
        let response = self
            .client
            .post(url)
            .json(&json!({"consumer": consumer, "state": state, "action": "setup"}))
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(ContractError::ProviderState {
            state: state.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

fn transition(label: &str, state: &mut VerificationState, next: VerificationState) {
    debug!("'{}': {} -> {}", label, state, next);
    *state = next;
}

fn fail(label: &str, result: &mut InteractionResult, err: ContractError) {
    warn!("'{}' failed: {}", label, err);
    result.error_kind = Some(err.kind());
    result.error = Some(err.to_string());
    transition(label, &mut result.state, VerificationState::Failed);
}

/// Replay `artifact` against `base_url` with default settings.
pub async fn verify(
    artifact: &ContractArtifact,
    base_url: &str,
) -> Result<Vec<InteractionResult>, ContractError> {
    let verifier = Verifier::with_defaults(base_url)?;
    Ok(verifier.verify(artifact).await.results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::interaction::{RequestExpectation, ResponseExpectation};
    use crate::mock::MockServer;
    use serde_json::json;
    use tracing_test::traced_test;

    fn artifact() -> ContractArtifact {
        ContractArtifact::new(
            "Car Consumer",
            "Car Provider",
            vec![
                Interaction {
                    description: "A GET request".to_string(),
                    provider_state: None,
                    request: RequestExpectation::new("GET", "/cars"),
                    response: ResponseExpectation::new(200).body(json!([{"id": "1"}])),
                },
                Interaction {
                    description: "A GET request with invalid ID".to_string(),
                    provider_state: Some("Validate error message".to_string()),
                    request: RequestExpectation::new("GET", "/cars/999"),
                    response: ResponseExpectation::new(404)
                        .body(json!({"message": "Requested car is not found"})),
                },
            ],
        )
    }

    fn fast_config() -> VerifierConfig {
        VerifierConfig {
            readiness: ReadinessConfig {
                attempts: 2,
                interval_ms: 10,
                path: "/".to_string(),
            },
            timeout_ms: 1000,
            ..Default::default()
        }
    }

    async fn unused_port() -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_replay_against_echoing_mock_passes() {
        let artifact = artifact();
        let provider = MockServer::with_interactions("127.0.0.1", 0, artifact.interactions.clone())
            .await
            .unwrap();

        let results = verify(&artifact, &provider.base_url()).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.passed()), "{results:?}");
        assert_eq!(results[1].provider_state.as_deref(), Some("Validate error message"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_unreachable_provider_fails_each_interaction() {
        let base_url = format!("http://127.0.0.1:{}", unused_port().await);
        let verifier = Verifier::new(&base_url, &fast_config()).unwrap();

        let report = verifier.verify(&artifact()).await;
        assert!(logs_contain("not ready (attempt 1/2)"));
        assert!(logs_contain("did not become ready after 2 attempts"));

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.failed_count(), 2);
        for result in &report.results {
            assert_eq!(result.state, VerificationState::Failed);
            assert_eq!(result.error_kind, Some(ErrorKind::Network));
            assert!(result.mismatches.is_empty());
        }
    }

    #[tokio::test]
    async fn test_status_mismatch_fails_only_that_interaction() {
        let artifact = artifact();
        let mut served = artifact.interactions.clone();
        served[1].response = ResponseExpectation::new(200).body(json!({"message": "ok"}));
        let provider = MockServer::with_interactions("127.0.0.1", 0, served).await.unwrap();

        let report = Verifier::new(provider.base_url(), &fast_config())
            .unwrap()
            .verify(&artifact)
            .await;
        assert!(report.results[0].passed());
        assert!(!report.results[1].passed());
        assert_eq!(report.results[1].mismatches[0].path, "status");
        assert!(!report.passed());
    }

    #[tokio::test]
    async fn test_provider_state_setup_is_posted() {
        let states = MockServer::with_interactions(
            "127.0.0.1",
            0,
            vec![Interaction {
                description: "state setup".to_string(),
                provider_state: None,
                request: RequestExpectation::new("POST", "/_states").body(json!({
                    "consumer": "Car Consumer",
                    "state": "Validate error message",
                    "action": "setup"
                })),
                response: ResponseExpectation::new(200),
            }],
        )
        .await
        .unwrap();
        let artifact = artifact();
        let provider = MockServer::with_interactions("127.0.0.1", 0, artifact.interactions.clone())
            .await
            .unwrap();

        let config = VerifierConfig {
            provider_states_setup_url: Some(format!("{}/_states", states.base_url())),
            ..fast_config()
        };
        let report = Verifier::new(provider.base_url(), &config)
            .unwrap()
            .verify(&artifact)
            .await;
        assert!(report.passed(), "{report:?}");
        assert_eq!(states.received_requests().len(), 1);
        assert!(states.unmatched_requests().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_state_setup_fails_interaction() {
        let states = MockServer::start("127.0.0.1", 0).await.unwrap();
        let artifact = artifact();
        let provider = MockServer::with_interactions("127.0.0.1", 0, artifact.interactions.clone())
            .await
            .unwrap();
        let config = VerifierConfig {
            provider_states_setup_url: Some(format!("{}/_states", states.base_url())),
            ..fast_config()
        };

        let report = Verifier::new(provider.base_url(), &config)
            .unwrap()
            .verify(&artifact)
            .await;
        assert!(report.results[0].passed());
        let failed = &report.results[1];
        assert_eq!(failed.state, VerificationState::Failed);
        assert!(failed.error.as_deref().unwrap_or_default().contains("500"));
    }
}
