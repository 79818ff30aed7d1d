//! Fluent construction of [`Interaction`]s.

use super::types::{Interaction, RequestExpectation, ResponseExpectation};
use crate::error::ContractError;
use crate::matching::MatchRule;
use hyper::Method;

/// Builds and validates an [`Interaction`].
///
/// ```
/// use accord::{InteractionBuilder, RequestExpectation, ResponseExpectation};
/// use serde_json::json;
///
/// let interaction = InteractionBuilder::new()
///     .given("Validate error message")
///     .upon_receiving("A GET request with invalid ID")
///     .with_request(RequestExpectation::new("GET", "/cars/999"))
///     .will_respond_with(
///         ResponseExpectation::new(404).body(json!({"message": "Requested car is not found"})),
///     )
///     .build()
///     .unwrap();
/// assert_eq!(interaction.request.method, "GET");
/// ```
#[derive(Debug, Default, Clone)]
pub struct InteractionBuilder {
    description: Option<String>,
    provider_state: Option<String>,
    request: Option<RequestExpectation>,
    response: Option<ResponseExpectation>,
}

impl InteractionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn given(mut self, state: impl Into<String>) -> Self {
        self.provider_state = Some(state.into());
        self
    }

    pub fn upon_receiving(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_request(mut self, request: RequestExpectation) -> Self {
        self.request = Some(request);
        self
    }

    pub fn will_respond_with(mut self, response: ResponseExpectation) -> Self {
        self.response = Some(response);
        self
    }

    pub fn build(self) -> Result<Interaction, ContractError> {
        let description = self
            .description
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| {
                ContractError::MalformedExpectation("interaction has no description".to_string())
            })?;
        let request = self.request.ok_or_else(|| {
            ContractError::MalformedExpectation(format!("'{description}' has no request"))
        })?;
        let response = self.response.ok_or_else(|| {
            ContractError::MalformedExpectation(format!("'{description}' has no response"))
        })?;

        validate_method(&request.method)?;
        require_string_example(&description, "path", &request.path)?;
        for (name, rule) in &request.query {
            require_string_example(&description, &format!("query.{name}"), rule)?;
        }
        for (name, rule) in request.headers.iter().chain(&response.headers) {
            require_string_example(&description, &format!("headers.{name}"), rule)?;
        }
        if !(100..=599).contains(&response.status) {
            return Err(ContractError::MalformedExpectation(format!(
                "'{description}' declares status {} outside 100-599",
                response.status
            )));
        }

        Ok(Interaction {
            description,
            provider_state: self.provider_state.filter(|s| !s.is_empty()),
            request,
            response,
        })
    }
}

/// Paths, headers and query parameters are always received as strings.
fn require_string_example(
    description: &str,
    field: &str,
    rule: &MatchRule,
) -> Result<(), ContractError> {
    if rule.example().is_string() {
        return Ok(());
    }
    Err(ContractError::MalformedExpectation(format!(
        "'{description}' {field} must be matched against a string, got {}",
        rule.describe()
    )))
}

/// Accept standard methods and syntactically valid extension methods.
pub(crate) fn validate_method(method: &str) -> Result<Method, ContractError> {
    if method.is_empty() {
        return Err(ContractError::InvalidMethod(method.to_string()));
    }
    Method::from_bytes(method.as_bytes()).map_err(|_| ContractError::InvalidMethod(method.to_string()))
}
