//! Recursive comparison of expectation trees against observed JSON.

use super::mismatch::{render, Mismatch, MismatchKind};
use super::node::ExpectationNode;
use super::rule::{JsonType, MatchResult, MatchRule};
use serde_json::Value;

/// Root path for body comparisons.
pub const BODY_ROOT: &str = "$";

/// Compare `node` against `actual`, starting at `path`.
///
/// Objects are subset-matched (extra actual keys are ignored), arrays are
/// positional and report a length difference as its own mismatch. The result
/// order follows the expectation's declaration order, so repeated comparisons
/// of the same pair produce identical reports.
pub fn compare(node: &ExpectationNode, actual: &Value, path: &str) -> Vec<Mismatch> {
    let mut out = Vec::new();
    compare_into(node, actual, path, &mut out);
    out
}

/// Compare a body expectation from the [`BODY_ROOT`].
pub fn compare_body(node: &ExpectationNode, actual: &Value) -> Vec<Mismatch> {
    compare(node, actual, BODY_ROOT)
}

fn compare_into(node: &ExpectationNode, actual: &Value, path: &str, out: &mut Vec<Mismatch>) {
    match node {
        ExpectationNode::Rule(rule) => compare_rule(rule, actual, path, out),
        ExpectationNode::Array(items) => {
            let Value::Array(actual_items) = actual else {
                out.push(type_mismatch(JsonType::Array, actual, path));
                return;
            };
            if items.len() != actual_items.len() {
                out.push(Mismatch::new(
                    path,
                    format!("length {}", items.len()),
                    format!("length {}", actual_items.len()),
                    MismatchKind::LengthMismatch,
                ));
            }
            for (i, (item, actual_item)) in items.iter().zip(actual_items).enumerate() {
                compare_into(item, actual_item, &format!("{path}[{i}]"), out);
            }
        }
        ExpectationNode::Object(entries) => {
            let Value::Object(actual_map) = actual else {
                out.push(type_mismatch(JsonType::Object, actual, path));
                return;
            };
            for (key, child) in entries {
                let child_path = format!("{path}.{key}");
                match actual_map.get(key) {
                    Some(actual_child) => compare_into(child, actual_child, &child_path, out),
                    None => out.push(Mismatch::new(
                        child_path,
                        render(&child.example()),
                        "<missing>",
                        MismatchKind::MissingKey,
                    )),
                }
            }
        }
    }
}

fn compare_rule(rule: &MatchRule, actual: &Value, path: &str, out: &mut Vec<Mismatch>) {
    if let MatchRule::Like(example) = rule {
        out.extend(like_mismatches(example, actual, path));
        return;
    }
    if let MatchResult::Mismatched(kind) = rule.evaluate(actual) {
        let expected = match rule {
            MatchRule::Literal(value) => render(value),
            other => other.describe(),
        };
        out.push(Mismatch::new(path, expected, render(actual), kind));
    }
}

/// Structural type matching used by `Like` rules: the category must match at
/// every level, declared object keys must be present, arrays are compared
/// positionally without a length requirement.
pub(crate) fn like_mismatches(example: &Value, actual: &Value, path: &str) -> Vec<Mismatch> {
    let mut out = Vec::new();
    like_into(example, actual, path, &mut out);
    out
}

fn like_into(example: &Value, actual: &Value, path: &str, out: &mut Vec<Mismatch>) {
    let expected_type = JsonType::of(example);
    if expected_type != JsonType::of(actual) {
        out.push(type_mismatch(expected_type, actual, path));
        return;
    }
    match (example, actual) {
        (Value::Object(expected), Value::Object(actual_map)) => {
            for (key, expected_child) in expected {
                let child_path = format!("{path}.{key}");
                match actual_map.get(key) {
                    Some(actual_child) => like_into(expected_child, actual_child, &child_path, out),
                    None => out.push(Mismatch::new(
                        child_path,
                        format!("any {}", JsonType::of(expected_child)),
                        "<missing>",
                        MismatchKind::MissingKey,
                    )),
                }
            }
        }
        (Value::Array(expected), Value::Array(actual_items)) => {
            for (i, (e, a)) in expected.iter().zip(actual_items).enumerate() {
                like_into(e, a, &format!("{path}[{i}]"), out);
            }
        }
        _ => {}
    }
}

fn type_mismatch(expected: JsonType, actual: &Value, path: &str) -> Mismatch {
    Mismatch::new(
        path,
        format!("any {expected}"),
        format!("{} {}", JsonType::of(actual), render(actual)),
        MismatchKind::TypeMismatch,
    )
}
