//! Consumer-side session: registers interactions against a local mock and
//! turns them into a contract artifact.

use crate::config::SessionConfig;
use crate::contract::ContractArtifact;
use crate::error::ContractError;
use crate::interaction::{validate_method, Interaction, ObservedResponse};
use crate::matching::{match_response, MismatchReport};
use crate::mock::MockServer;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Session lifecycle: `Open` until finalized, `TornDown` once the mock is
/// stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Finalized,
    TornDown,
}

/// Ordered interactions for one consumer/provider pair plus the mock that
/// serves them.
pub struct Session {
    config: SessionConfig,
    mock: MockServer,
    client: reqwest::Client,
    interactions: Vec<Interaction>,
    state: SessionState,
}

impl Session {
    /// Start the mock server and open the session.
    pub async fn start(config: SessionConfig) -> Result<Self, ContractError> {
        let mock = MockServer::start(&config.mock_host, config.mock_port).await?;
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        info!(
            "Session {} -> {} started, mock at {}",
            config.consumer,
            config.provider,
            mock.base_url()
        );
        Ok(Self {
            config,
            mock,
            client,
            interactions: Vec::new(),
            state: SessionState::Open,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn consumer(&self) -> &str {
        &self.config.consumer
    }

    pub fn provider(&self) -> &str {
        &self.config.provider
    }

    /// Base URL of the session's mock server.
    pub fn mock_url(&self) -> String {
        self.mock.base_url()
    }

    pub fn mock(&self) -> &MockServer {
        &self.mock
    }

    /// Registered interactions, in registration order.
    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    /// Register an interaction.
    ///
    /// The mock is programmed with it and switched to its provider state,
    /// then the example request is sent to the mock. The answer must satisfy
    /// the response expectation; otherwise the interaction is dropped again
    /// and a [`ContractError::FixtureMismatch`] is returned.
    pub async fn register(&mut self, interaction: Interaction) -> Result<(), ContractError> {
        if self.state != SessionState::Open {
            return Err(ContractError::SessionFinalized {
                consumer: self.config.consumer.clone(),
                provider: self.config.provider.clone(),
            });
        }
        if self.interactions.iter().any(|i| i.key() == interaction.key()) {
            return Err(ContractError::DuplicateInteraction {
                description: interaction.description,
                provider_state: interaction.provider_state,
            });
        }
        validate_method(&interaction.request.method)?;

        debug!("Registering '{}'", interaction.label());
        self.mock.program(interaction.clone());
        self.mock
            .set_provider_state(interaction.provider_state.clone());

        let outcome = self.exercise(&interaction).await;
        let failure = match outcome {
            Ok(observed) => {
                let mismatches = match_response(&interaction.response, &observed);
                if mismatches.is_empty() {
                    None
                } else {
                    Some(ContractError::FixtureMismatch {
                        description: interaction.label(),
                        report: MismatchReport::from(mismatches),
                    })
                }
            }
            Err(e) => Some(e),
        };

        if let Some(err) = failure {
            warn!("Rejected '{}': {}", interaction.label(), err);
            self.mock
                .unprogram(&interaction.description, interaction.provider_state.as_deref());
            return Err(err);
        }

        self.interactions.push(interaction);
        Ok(())
    }

    /// Register several interactions in order, stopping at the first error.
    pub async fn register_all<I>(&mut self, interactions: I) -> Result<(), ContractError>
    where
        I: IntoIterator<Item = Interaction>,
    {
        for interaction in interactions {
            self.register(interaction).await?;
        }
        Ok(())
    }

    async fn exercise(&self, interaction: &Interaction) -> Result<ObservedResponse, ContractError> {
        let request = &interaction.request;
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| ContractError::InvalidMethod(request.method.clone()))?;
        let url = format!("{}{}", self.mock.base_url(), request.example_path_and_query());

        let mut builder = self.client.request(method, url);
        for (name, value) in request.example_headers() {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.example_body() {
            let declares_content_type = request
                .headers
                .keys()
                .any(|k| k.eq_ignore_ascii_case("content-type"));
            if !declares_content_type {
                builder = builder.header("Content-Type", "application/json");
            }
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        Ok(ObservedResponse::from_reqwest(response).await?)
    }

    /// Fail if any request reached the mock without matching an interaction.
    pub fn verify_mock_usage(&self) -> Result<(), ContractError> {
        let unmatched = self.mock.unmatched_requests();
        if unmatched.is_empty() {
            return Ok(());
        }
        for request in &unmatched {
            warn!("Unmatched mock request: {}", request);
        }
        Err(ContractError::UnexpectedRequests {
            count: unmatched.len(),
        })
    }

    /// Freeze the session and build its artifact. Later calls return the
    /// same artifact; later registrations fail.
    pub fn finalize(&mut self) -> ContractArtifact {
        if self.state == SessionState::Open {
            info!(
                "Session {} -> {} finalized with {} interactions",
                self.config.consumer,
                self.config.provider,
                self.interactions.len()
            );
            self.state = SessionState::Finalized;
        }
        ContractArtifact::new(
            self.config.consumer.clone(),
            self.config.provider.clone(),
            self.interactions.clone(),
        )
    }

    /// Finalize and write the artifact into the configured contract
    /// directory.
    pub fn write_contract(&mut self) -> Result<PathBuf, ContractError> {
        let artifact = self.finalize();
        artifact.save(&self.config.contract_dir)
    }

    /// Stop the mock server. Registration is no longer possible.
    pub fn teardown(&mut self) {
        self.mock.shutdown();
        self.state = SessionState::TornDown;
        debug!(
            "Session {} -> {} torn down",
            self.config.consumer, self.config.provider
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::interaction::{InteractionBuilder, RequestExpectation, ResponseExpectation};
    use crate::matching::{MatchRule, MismatchKind};
    use serde_json::json;

    async fn session() -> Session {
        Session::start(SessionConfig::new("Car Consumer", "Car Provider"))
            .await
            .unwrap()
    }

    fn not_found() -> Interaction {
        InteractionBuilder::new()
            .given("Validate error message")
            .upon_receiving("A GET request with invalid ID")
            .with_request(RequestExpectation::new(
                "GET",
                MatchRule::regex("/cars/999", "/cars/[0-9]+").unwrap(),
            ))
            .will_respond_with(
                ResponseExpectation::new(404)
                    .body(json!({"message": "Requested car is not found"})),
            )
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_register_exercises_mock() {
        let mut session = session().await;
        session.register(not_found()).await.unwrap();
        assert_eq!(session.interactions().len(), 1);
        assert_eq!(session.mock().received_requests()[0].path, "/cars/999");
        session.verify_mock_usage().unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_is_rejected() {
        let mut session = session().await;
        session.register(not_found()).await.unwrap();
        let err = session.register(not_found()).await.unwrap_err();
        assert!(matches!(err, ContractError::DuplicateInteraction { .. }));
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let mut other_state = not_found();
        other_state.provider_state = Some("Another state".to_string());
        session.register(other_state).await.unwrap();
        assert_eq!(session.interactions().len(), 2);
    }

    #[tokio::test]
    async fn test_fixture_that_cannot_be_served_fails_fast() {
        let mut session = session().await;
        let no_content_with_body = InteractionBuilder::new()
            .upon_receiving("A DELETE request")
            .with_request(RequestExpectation::new("DELETE", "/cars/1"))
            .will_respond_with(ResponseExpectation::new(204).body(json!({"deleted": true})))
            .build()
            .unwrap();

        let err = session.register(no_content_with_body).await.unwrap_err();
        let ContractError::FixtureMismatch { report, .. } = &err else {
            panic!("expected fixture mismatch, got {err}");
        };
        assert_eq!(report.iter().next().unwrap().kind, MismatchKind::MissingBody);
        assert_eq!(err.kind(), ErrorKind::Mismatch);
        assert!(session.interactions().is_empty());
        assert!(session.mock().interactions().is_empty());
    }

    #[tokio::test]
    async fn test_register_plain_text_bodies_that_look_like_json() {
        let mut session = session().await;
        let count = InteractionBuilder::new()
            .upon_receiving("count as text")
            .with_request(
                RequestExpectation::new("POST", "/cars/flags").body(MatchRule::literal("true")),
            )
            .will_respond_with(
                ResponseExpectation::new(200).body(MatchRule::regex("42", r"\d+").unwrap()),
            )
            .build()
            .unwrap();

        session.register(count).await.unwrap();
        assert_eq!(
            session.mock().received_requests()[0].body.as_deref(),
            Some("true")
        );
        session.verify_mock_usage().unwrap();
    }

    #[tokio::test]
    async fn test_finalize_blocks_registration() {
        let mut session = session().await;
        session.register(not_found()).await.unwrap();
        let artifact = session.finalize();
        assert_eq!(artifact.interactions.len(), 1);
        assert_eq!(session.state(), SessionState::Finalized);

        let err = session.register(not_found()).await.unwrap_err();
        assert!(matches!(err, ContractError::SessionFinalized { .. }));
        assert_eq!(session.finalize(), artifact);
    }

    #[tokio::test]
    async fn test_mock_usage_reports_unexpected_requests() {
        let session = session().await;
        let response = reqwest::get(format!("{}/trucks", session.mock_url()))
            .await
            .unwrap();
        assert_eq!(response.status(), 500);

        let err = session.verify_mock_usage().unwrap_err();
        assert!(matches!(err, ContractError::UnexpectedRequests { count: 1 }));
    }

    #[tokio::test]
    async fn test_write_contract() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::new("Car Consumer", "Car Provider").contract_dir(dir.path());
        let mut session = Session::start(config).await.unwrap();
        session.register(not_found()).await.unwrap();
        let path = session.write_contract().unwrap();
        assert_eq!(path, dir.path().join("car_consumer-car_provider.json"));
        session.teardown();
        assert_eq!(session.state(), SessionState::TornDown);

        let artifact = ContractArtifact::load(&path).unwrap();
        assert_eq!(artifact.interactions[0].description, "A GET request with invalid ID");
    }
}
