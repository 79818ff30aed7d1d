//! Request and response level matching.
//!
//! Used by the mock server (incoming request vs. request expectation) and by
//! the consumer fixture check and provider replay (observed response vs.
//! response expectation).

use super::compare::compare_body;
use super::mismatch::{Mismatch, MismatchKind};
use super::node::ExpectationNode;
use super::rule::{MatchResult, MatchRule};
use crate::interaction::{ObservedRequest, ObservedResponse, RequestExpectation, ResponseExpectation};
use serde_json::Value;
use std::collections::BTreeMap;

/// Compare an incoming request against a request expectation.
pub fn match_request(expected: &RequestExpectation, observed: &ObservedRequest) -> Vec<Mismatch> {
    let mut out = Vec::new();

    if !expected.method.eq_ignore_ascii_case(&observed.method) {
        out.push(Mismatch::new(
            "method",
            expected.method.clone(),
            observed.method.clone(),
            MismatchKind::MethodMismatch,
        ));
    }

    if let MatchResult::Mismatched(kind) = expected.path.evaluate_str(&observed.path) {
        out.push(Mismatch::new(
            "path",
            expected.path.describe(),
            format!("\"{}\"", observed.path),
            kind,
        ));
    }

    for (name, rule) in &expected.query {
        let path = format!("query.{name}");
        match observed.query.get(name) {
            Some(value) => push_string_mismatch(rule, value, path, &mut out),
            None => out.push(Mismatch::new(
                path,
                rule.describe(),
                "<missing>",
                MismatchKind::MissingQuery,
            )),
        }
    }

    match_headers(&expected.headers, |name| observed.header(name), &mut out);
    match_body(
        expected.body.as_ref(),
        observed.body.as_deref(),
        &mut out,
    );
    out
}

/// Compare an observed response against a response expectation: status,
/// then headers, then body.
pub fn match_response(
    expected: &ResponseExpectation,
    observed: &ObservedResponse,
) -> Vec<Mismatch> {
    let mut out = Vec::new();

    if expected.status != observed.status {
        out.push(Mismatch::new(
            "status",
            expected.status.to_string(),
            observed.status.to_string(),
            MismatchKind::StatusMismatch,
        ));
    }

    match_headers(&expected.headers, |name| observed.header(name), &mut out);
    match_body(
        expected.body.as_ref(),
        observed.body.as_deref(),
        &mut out,
    );
    out
}

fn match_headers<'a, F>(expected: &BTreeMap<String, MatchRule>, lookup: F, out: &mut Vec<Mismatch>)
where
    F: Fn(&str) -> Option<&'a str>,
{
    for (name, rule) in expected {
        let path = format!("headers.{name}");
        match lookup(name) {
            Some(value) => push_string_mismatch(rule, value, path, out),
            None => out.push(Mismatch::new(
                path,
                rule.describe(),
                "<missing>",
                MismatchKind::MissingHeader,
            )),
        }
    }
}

fn push_string_mismatch(rule: &MatchRule, value: &str, path: String, out: &mut Vec<Mismatch>) {
    if let MatchResult::Mismatched(kind) = rule.evaluate_str(value) {
        out.push(Mismatch::new(path, rule.describe(), format!("\"{value}\""), kind));
    }
}

fn match_body(expected: Option<&ExpectationNode>, actual: Option<&str>, out: &mut Vec<Mismatch>) {
    let Some(node) = expected else {
        return;
    };

    let text = match actual.map(str::trim) {
        Some(text) if !text.is_empty() => text,
        _ => {
            out.push(Mismatch::new(
                "$",
                super::mismatch::render(&node.example()),
                "<empty body>",
                MismatchKind::MissingBody,
            ));
            return;
        }
    };

    // String examples are served verbatim, so "42" or "true" must not be
    // reread as a number or boolean
    if let ExpectationNode::Rule(rule) = node {
        if rule.example().is_string() {
            let raw = compare_body(node, &Value::String(text.to_string()));
            if raw.is_empty() {
                return;
            }
            if let Ok(decoded @ Value::String(_)) = serde_json::from_str::<Value>(text) {
                if compare_body(node, &decoded).is_empty() {
                    return;
                }
            }
            out.extend(raw);
            return;
        }
    }

    match serde_json::from_str::<Value>(text) {
        Ok(json) => out.extend(compare_body(node, &json)),
        // Plain-text bodies can still satisfy a string rule
        Err(_) if matches!(node, ExpectationNode::Rule(_)) => {
            out.extend(compare_body(node, &Value::String(text.to_string())))
        }
        Err(e) => out.push(Mismatch::new(
            "$",
            "a JSON body",
            format!("{text:?} ({e})"),
            MismatchKind::UnparseableBody,
        )),
    }
}
