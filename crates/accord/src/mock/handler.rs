//! Request handling for the mock server.

use super::response::{example_response, json_response};
use super::{MockState, PROVIDER_STATES_PATH};
use crate::interaction::{parse_query_string, Interaction, ObservedRequest};
use crate::matching::{match_request, Mismatch};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, warn};

/// A request that no programmed interaction accepted, with the mismatches
/// against the closest candidate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmatchedRequest {
    pub request: ObservedRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closest_interaction: Option<String>,
    pub mismatches: Vec<Mismatch>,
}

impl std::fmt::Display for UnmatchedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.request.method, self.request.path)?;
        match &self.closest_interaction {
            Some(label) => {
                write!(f, " (closest: {label})")?;
                for m in &self.mismatches {
                    write!(f, "\n    {m}")?;
                }
                Ok(())
            }
            None => write!(f, " (no interactions programmed)"),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UnmatchedBody<'a> {
    error: &'static str,
    #[serde(flatten)]
    unmatched: &'a UnmatchedRequest,
}

/// Body of a provider-state change request.
#[derive(Debug, Deserialize)]
struct StateChange {
    state: Option<String>,
    #[serde(default)]
    action: Option<String>,
}

/// Handle one request: record it, serve the first matching interaction's
/// example response, or answer 500 with the closest mismatches.
///
/// Interactions declared for the current provider state are tried before
/// all others.
pub(crate) async fn handle_mock_request(
    req: Request<Incoming>,
    state: Arc<MockState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let observed = observe(req).await;
    if observed.path == PROVIDER_STATES_PATH && observed.method == "POST" {
        return Ok(change_provider_state(&state, &observed));
    }
    state.received.write().push(observed.clone());

    let current = state.provider_state.read().clone();
    let interactions = state.interactions.read().clone();
    let (preferred, others): (Vec<&Interaction>, Vec<&Interaction>) = interactions
        .iter()
        .partition(|i| i.provider_state == current);
    let mut closest: Option<(String, Vec<Mismatch>)> = None;

    for interaction in preferred.into_iter().chain(others) {
        let mismatches = match_request(&interaction.request, &observed);
        if mismatches.is_empty() {
            debug!(
                "{} {} matched interaction '{}'",
                observed.method,
                observed.path,
                interaction.label()
            );
            return Ok(example_response(&interaction.response));
        }
        if closest
            .as_ref()
            .map_or(true, |(_, best)| mismatches.len() < best.len())
        {
            closest = Some((interaction.label(), mismatches));
        }
    }

    let (closest_interaction, mismatches) = match closest {
        Some((label, mismatches)) => (Some(label), mismatches),
        None => (None, Vec::new()),
    };
    let unmatched = UnmatchedRequest {
        request: observed,
        closest_interaction,
        mismatches,
    };
    warn!("Unexpected request to mock server: {}", unmatched);

    let response = json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &UnmatchedBody {
            error: "No interaction matched the request",
            unmatched: &unmatched,
        },
    );
    state.unmatched.write().push(unmatched);
    Ok(response)
}

fn change_provider_state(state: &MockState, observed: &ObservedRequest) -> Response<Full<Bytes>> {
    let change = observed
        .body
        .as_deref()
        .map(serde_json::from_str::<StateChange>);
    match change {
        Some(Ok(change)) => {
            let next = match change.action.as_deref() {
                Some("teardown") => None,
                _ => change.state.filter(|s| !s.is_empty()),
            };
            debug!("Mock provider state set to {:?}", next);
            *state.provider_state.write() = next.clone();
            json_response(StatusCode::OK, &json!({ "state": next }))
        }
        Some(Err(e)) => json_response(
            StatusCode::BAD_REQUEST,
            &json!({ "error": format!("Invalid provider state body: {e}") }),
        ),
        None => json_response(
            StatusCode::BAD_REQUEST,
            &json!({ "error": "Missing provider state body" }),
        ),
    }
}

async fn observe(req: Request<Incoming>) -> ObservedRequest {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let query = parse_query_string(req.uri().query().unwrap_or(""));

    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in req.headers() {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    let body = match req.into_body().collect().await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            if bytes.is_empty() {
                None
            } else {
                Some(String::from_utf8_lossy(&bytes).to_string())
            }
        }
        Err(e) => {
            debug!("Failed to read mock request body: {}", e);
            None
        }
    };

    ObservedRequest {
        method,
        path,
        query,
        headers,
        body,
        timestamp: Some(chrono::Utc::now().to_rfc3339()),
    }
}
