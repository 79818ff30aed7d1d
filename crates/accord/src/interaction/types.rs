//! Request/response expectations and the interaction record.

use crate::matching::{ExpectationNode, MatchRule};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// What the consumer will send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestExpectation {
    /// Upper-case HTTP method
    pub method: String,
    pub path: MatchRule,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, MatchRule>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, MatchRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<ExpectationNode>,
}

impl RequestExpectation {
    pub fn new(method: impl Into<String>, path: impl Into<MatchRule>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            path: path.into(),
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn query(mut self, name: impl Into<String>, rule: impl Into<MatchRule>) -> Self {
        self.query.insert(name.into(), rule.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, rule: impl Into<MatchRule>) -> Self {
        self.headers.insert(name.into(), rule.into());
        self
    }

    pub fn body(mut self, body: impl Into<ExpectationNode>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Path plus encoded query string, with every rule replaced by its example.
    pub fn example_path_and_query(&self) -> String {
        let path = self.path.example_string();
        if self.query.is_empty() {
            return path;
        }
        let query = self
            .query
            .iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    urlencoding::encode(k),
                    urlencoding::encode(&v.example_string())
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        format!("{path}?{query}")
    }

    /// Header values to send, taken from the rule examples.
    pub fn example_headers(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .map(|(k, v)| (k.clone(), v.example_string()))
            .collect()
    }

    /// Serialized body to send, if any.
    pub fn example_body(&self) -> Option<String> {
        self.body.as_ref().map(|b| example_text(&b.example()))
    }
}

/// What the provider must answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseExpectation {
    pub status: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, MatchRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<ExpectationNode>,
}

impl ResponseExpectation {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, rule: impl Into<MatchRule>) -> Self {
        self.headers.insert(name.into(), rule.into());
        self
    }

    pub fn body(mut self, body: impl Into<ExpectationNode>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn example_headers(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .map(|(k, v)| (k.clone(), v.example_string()))
            .collect()
    }

    pub fn example_body(&self) -> Option<String> {
        self.body.as_ref().map(|b| example_text(&b.example()))
    }
}

/// A string body example is sent verbatim; anything else as JSON.
fn example_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One request/response expectation pair with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_state: Option<String>,
    pub request: RequestExpectation,
    pub response: ResponseExpectation,
}

impl Interaction {
    /// Identity used for duplicate detection.
    pub fn key(&self) -> (&str, Option<&str>) {
        (&self.description, self.provider_state.as_deref())
    }

    /// `description` or `description [given state]`, for logs and reports.
    pub fn label(&self) -> String {
        match &self.provider_state {
            Some(state) => format!("{} [given {state}]", self.description),
            None => self.description.clone(),
        }
    }
}
