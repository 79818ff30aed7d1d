//! Core validation logic for contract files.
//!
//! Issue codes:
//!
//! | Code | Meaning |
//! |------|---------|
//! | E001 | File could not be read |
//! | E002 | Invalid JSON |
//! | E003 | Missing or malformed required field |
//! | E004 | Unsupported specification version |
//! | E005 | Invalid HTTP method |
//! | E006 | Status code outside 100-599 |
//! | E007 | Unknown rule kind, incomplete rule or object node |
//! | E008 | Regex rule pattern does not compile |
//! | E009 | Regex rule example does not match its pattern |
//! | E010 | Duplicate `(description, providerState)` pair |
//! | E011 | Same consumer/provider pair in several files |
//! | W001 | Interaction without a provider state |
//! | W002 | No specification version, current version assumed |
//! | W003 | Contract has no interactions |
//! | W004 | Request path example does not start with `/` |

use crate::types::{LintIssue, LintOptions, LintResult};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;

/// Key that marks a JSON object as a serialized match rule.
pub const RULE_TAG: &str = "$match";

/// Specification major version this linter understands.
pub const SUPPORTED_MAJOR: &str = "1";

/// Tag of an object node whose own keys include [`RULE_TAG`].
pub const OBJECT_TAG: &str = "object";

const RULE_KINDS: [&str; 4] = ["literal", "regex", "type", "like"];

/// Validate a complete contract document.
pub fn validate_contract(
    file: &Path,
    contract: &Value,
    result: &mut LintResult,
    options: &LintOptions,
) {
    let Some(obj) = contract.as_object() else {
        result.add_issue(
            LintIssue::error("E003", "Contract must be a JSON object", file.to_path_buf())
                .with_suggestion("Wrap the contract in { ... }"),
        );
        return;
    };

    check_participants(file, obj, result);
    check_specification_version(file, contract, result);

    match obj.get("interactions") {
        None => result.add_issue(
            LintIssue::error("E003", "Missing required field: interactions", file.to_path_buf())
                .with_suggestion("Add \"interactions\": [] to the contract"),
        ),
        Some(Value::Array(interactions)) => {
            if interactions.is_empty() {
                result.add_issue(
                    LintIssue::warning("W003", "Contract has no interactions", file.to_path_buf())
                        .with_location("interactions"),
                );
            }
            for (idx, interaction) in interactions.iter().enumerate() {
                validate_interaction(file, interaction, idx, result, options);
            }
            check_duplicates(file, interactions, result);
        }
        Some(_) => result.add_issue(
            LintIssue::error("E003", "'interactions' must be an array", file.to_path_buf())
                .with_location("interactions"),
        ),
    }
}

fn check_participants(file: &Path, obj: &Map<String, Value>, result: &mut LintResult) {
    for field in ["consumer", "provider"] {
        let name = obj
            .get(field)
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str);
        match name {
            Some(name) if !name.trim().is_empty() => {}
            _ => result.add_issue(
                LintIssue::error(
                    "E003",
                    format!("Missing required field: {field}.name"),
                    file.to_path_buf(),
                )
                .with_location(field)
                .with_suggestion(format!("Add \"{field}\": {{\"name\": \"...\"}}")),
            ),
        }
    }
}

fn check_specification_version(file: &Path, contract: &Value, result: &mut LintResult) {
    const LOCATION: &str = "metadata.contractSpecification.version";

    match contract.pointer("/metadata/contractSpecification/version") {
        None => result.add_issue(
            LintIssue::warning(
                "W002",
                "No specification version declared, 1.0.0 is assumed",
                file.to_path_buf(),
            )
            .with_location(LOCATION),
        ),
        Some(Value::String(version))
            if version.split('.').next() == Some(SUPPORTED_MAJOR) => {}
        Some(other) => result.add_issue(
            LintIssue::error(
                "E004",
                format!("Unsupported specification version: {other}"),
                file.to_path_buf(),
            )
            .with_location(LOCATION)
            .with_suggestion(format!("Record the contract with a {SUPPORTED_MAJOR}.x writer")),
        ),
    }
}

/// Validate a single interaction.
pub fn validate_interaction(
    file: &Path,
    interaction: &Value,
    idx: usize,
    result: &mut LintResult,
    options: &LintOptions,
) {
    let location = format!("interactions[{idx}]");

    let Some(obj) = interaction.as_object() else {
        result.add_issue(
            LintIssue::error("E003", "Interaction must be an object", file.to_path_buf())
                .with_location(location),
        );
        return;
    };

    match obj.get("description").and_then(Value::as_str) {
        Some(d) if !d.trim().is_empty() => {}
        _ => result.add_issue(
            LintIssue::error(
                "E003",
                "Interaction is missing a description",
                file.to_path_buf(),
            )
            .with_location(format!("{location}.description")),
        ),
    }

    match obj.get("providerState") {
        None | Some(Value::Null) if options.require_provider_state => result.add_issue(
            LintIssue::warning(
                "W001",
                "Interaction has no provider state",
                file.to_path_buf(),
            )
            .with_location(&location)
            .with_suggestion("Name the provider state the interaction depends on"),
        ),
        None | Some(Value::Null) | Some(Value::String(_)) => {}
        Some(_) => result.add_issue(
            LintIssue::error("E003", "'providerState' must be a string", file.to_path_buf())
                .with_location(format!("{location}.providerState")),
        ),
    }

    match obj.get("request") {
        Some(request) => validate_request(file, request, &format!("{location}.request"), result),
        None => result.add_issue(
            LintIssue::error("E003", "Interaction is missing 'request'", file.to_path_buf())
                .with_location(&location),
        ),
    }

    match obj.get("response") {
        Some(response) => {
            validate_response(file, response, &format!("{location}.response"), result)
        }
        None => result.add_issue(
            LintIssue::error("E003", "Interaction is missing 'response'", file.to_path_buf())
                .with_location(&location),
        ),
    }
}

/// Validate a request expectation.
pub fn validate_request(file: &Path, request: &Value, location: &str, result: &mut LintResult) {
    match request.get("method").and_then(Value::as_str) {
        None => result.add_issue(
            LintIssue::error("E003", "Request is missing 'method'", file.to_path_buf())
                .with_location(location),
        ),
        Some(method) if !is_valid_method(method) => result.add_issue(
            LintIssue::error(
                "E005",
                format!("Invalid HTTP method: {method:?}"),
                file.to_path_buf(),
            )
            .with_location(format!("{location}.method"))
            .with_suggestion("Use a method such as GET, POST, PUT or DELETE"),
        ),
        Some(_) => {}
    }

    match request.get("path") {
        None => result.add_issue(
            LintIssue::error("E003", "Request is missing 'path'", file.to_path_buf())
                .with_location(location),
        ),
        Some(path) => {
            let path_location = format!("{location}.path");
            validate_node(file, path, &path_location, result);
            if let Some(example) = path_example(path) {
                if !example.starts_with('/') {
                    result.add_issue(
                        LintIssue::warning(
                            "W004",
                            format!("Request path {example:?} does not start with '/'"),
                            file.to_path_buf(),
                        )
                        .with_location(path_location),
                    );
                }
            }
        }
    }

    validate_fields(file, request, "query", location, result);
    validate_fields(file, request, "headers", location, result);
    if let Some(body) = request.get("body") {
        validate_node(file, body, &format!("{location}.body"), result);
    }
}

/// Validate a response expectation.
pub fn validate_response(file: &Path, response: &Value, location: &str, result: &mut LintResult) {
    match response.get("status") {
        None => result.add_issue(
            LintIssue::error("E003", "Response is missing 'status'", file.to_path_buf())
                .with_location(location),
        ),
        Some(status) => {
            if !status.as_u64().is_some_and(|s| (100..=599).contains(&s)) {
                result.add_issue(
                    LintIssue::error(
                        "E006",
                        format!("Status {status} is out of valid range (100-599)"),
                        file.to_path_buf(),
                    )
                    .with_location(format!("{location}.status")),
                );
            }
        }
    }

    validate_fields(file, response, "headers", location, result);
    if let Some(body) = response.get("body") {
        validate_node(file, body, &format!("{location}.body"), result);
    }
}

/// Validate a `query` or `headers` map: an object of rules.
fn validate_fields(
    file: &Path,
    parent: &Value,
    field: &str,
    location: &str,
    result: &mut LintResult,
) {
    let Some(value) = parent.get(field) else {
        return;
    };
    let location = format!("{location}.{field}");
    match value.as_object() {
        Some(entries) => {
            for (name, rule) in entries {
                validate_node(file, rule, &format!("{location}.{name}"), result);
            }
        }
        None => result.add_issue(
            LintIssue::error("E003", format!("'{field}' must be an object"), file.to_path_buf())
                .with_location(location),
        ),
    }
}

/// Walk an expectation tree and validate every tagged rule in it.
pub fn validate_node(file: &Path, node: &Value, location: &str, result: &mut LintResult) {
    match node {
        Value::Object(obj)
            if obj.get(RULE_TAG).and_then(Value::as_str) == Some(OBJECT_TAG) =>
        {
            match obj.get("entries") {
                Some(Value::Object(entries)) => {
                    for (key, child) in entries {
                        validate_node(file, child, &format!("{location}.{key}"), result);
                    }
                }
                _ => result.add_issue(
                    LintIssue::error(
                        "E007",
                        "object node is missing 'entries'",
                        file.to_path_buf(),
                    )
                    .with_location(location),
                ),
            }
        }
        Value::Object(obj) if obj.contains_key(RULE_TAG) => {
            validate_rule(file, obj, location, result)
        }
        Value::Object(obj) => {
            for (key, child) in obj {
                validate_node(file, child, &format!("{location}.{key}"), result);
            }
        }
        Value::Array(items) => {
            for (idx, child) in items.iter().enumerate() {
                validate_node(file, child, &format!("{location}[{idx}]"), result);
            }
        }
        _ => {}
    }
}

/// Validate one tagged rule object.
pub fn validate_rule(
    file: &Path,
    rule: &Map<String, Value>,
    location: &str,
    result: &mut LintResult,
) {
    let kind = match rule.get(RULE_TAG).and_then(Value::as_str) {
        Some(kind) if RULE_KINDS.contains(&kind) => kind,
        other => {
            result.add_issue(
                LintIssue::error(
                    "E007",
                    format!("Unknown rule kind: {}", other.unwrap_or("<not a string>")),
                    file.to_path_buf(),
                )
                .with_location(location)
                .with_suggestion(format!("Use one of: {}", RULE_KINDS.join(", "))),
            );
            return;
        }
    };

    let required: &[&str] = match kind {
        "literal" => &["value"],
        "regex" => &["example", "pattern"],
        _ => &["example"],
    };
    let mut complete = true;
    for field in required {
        if !rule.contains_key(*field) {
            complete = false;
            result.add_issue(
                LintIssue::error(
                    "E007",
                    format!("{kind} rule is missing '{field}'"),
                    file.to_path_buf(),
                )
                .with_location(location),
            );
        }
    }
    if !complete || kind != "regex" {
        return;
    }

    let (Some(example), Some(pattern)) = (
        rule.get("example").and_then(Value::as_str),
        rule.get("pattern").and_then(Value::as_str),
    ) else {
        result.add_issue(
            LintIssue::error(
                "E007",
                "regex rule 'example' and 'pattern' must be strings",
                file.to_path_buf(),
            )
            .with_location(location),
        );
        return;
    };

    match Regex::new(pattern) {
        Err(e) => result.add_issue(
            LintIssue::error(
                "E008",
                format!("Invalid regex pattern /{pattern}/: {e}"),
                file.to_path_buf(),
            )
            .with_location(location),
        ),
        Ok(regex) if !regex.is_match(example) => result.add_issue(
            LintIssue::error(
                "E009",
                format!("Example {example:?} does not match /{pattern}/"),
                file.to_path_buf(),
            )
            .with_location(location)
            .with_suggestion("Record an example the pattern accepts"),
        ),
        Ok(_) => {}
    }
}

fn check_duplicates(file: &Path, interactions: &[Value], result: &mut LintResult) {
    let mut seen = HashSet::new();
    for (idx, interaction) in interactions.iter().enumerate() {
        let Some(description) = interaction.get("description").and_then(Value::as_str) else {
            continue;
        };
        let state = interaction.get("providerState").and_then(Value::as_str);
        if !seen.insert((description, state)) {
            let label = match state {
                Some(state) => format!("{description:?} given {state:?}"),
                None => format!("{description:?}"),
            };
            result.add_issue(
                LintIssue::error(
                    "E010",
                    format!("Duplicate interaction {label}"),
                    file.to_path_buf(),
                )
                .with_location(format!("interactions[{idx}]"))
                .with_suggestion("Give the interaction a distinct description or provider state"),
            );
        }
    }
}

/// An HTTP method is a non-empty token (RFC 9110).
fn is_valid_method(method: &str) -> bool {
    !method.is_empty()
        && method
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c))
}

/// The string used to generate requests for a path expectation.
fn path_example(path: &Value) -> Option<&str> {
    match path {
        Value::String(s) => Some(s),
        Value::Object(obj) => obj
            .get("example")
            .or_else(|| obj.get("value"))
            .and_then(Value::as_str),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_contract() -> Value {
        json!({
            "consumer": {"name": "Car Consumer"},
            "provider": {"name": "Car Provider"},
            "interactions": [{
                "description": "A GET request",
                "providerState": "Validate title and color",
                "request": {
                    "method": "GET",
                    "path": {"$match": "regex", "example": "/cars/1", "pattern": "/cars/[0-9]+"},
                    "headers": {
                        "Content-Type": {
                            "$match": "regex",
                            "example": "application/json; charset=utf-8",
                            "pattern": "application\\/json"
                        }
                    }
                },
                "response": {
                    "status": 200,
                    "body": {
                        "title": "BMW",
                        "color": {"$match": "regex", "example": "Black", "pattern": "\\w+"}
                    }
                }
            }],
            "metadata": {"contractSpecification": {"version": "1.0.0"}}
        })
    }

    fn lint(contract: &Value) -> LintResult {
        let mut result = LintResult::new();
        validate_contract(
            Path::new("contract.json"),
            contract,
            &mut result,
            &LintOptions::default(),
        );
        result
    }

    fn first_interaction(contract: &mut Value) -> &mut Value {
        &mut contract["interactions"][0]
    }

    #[test]
    fn test_valid_contract_has_no_issues() {
        let result = lint(&valid_contract());
        assert!(result.issues.is_empty(), "{:?}", result.issues);
        assert!(result.is_valid());
    }

    #[test]
    fn test_missing_required_fields() {
        let result = lint(&json!({"metadata": {"contractSpecification": {"version": "1.0.0"}}}));
        assert_eq!(result.codes(), vec!["E003", "E003", "E003"]);
        let locations: Vec<_> = result.issues.iter().map(|i| i.location.as_deref()).collect();
        assert_eq!(locations, vec![Some("consumer"), Some("provider"), None]);
    }

    #[test]
    fn test_non_object_contract() {
        assert_eq!(lint(&json!([1, 2])).codes(), vec!["E003"]);
    }

    #[test]
    fn test_unsupported_version() {
        let mut contract = valid_contract();
        contract["metadata"]["contractSpecification"]["version"] = json!("2.0.0");
        let result = lint(&contract);
        assert_eq!(result.codes(), vec!["E004"]);
        assert!(result.issues[0].message.contains("2.0.0"));
    }

    #[test]
    fn test_missing_version_is_a_warning() {
        let mut contract = valid_contract();
        contract.as_object_mut().unwrap().remove("metadata");
        let result = lint(&contract);
        assert_eq!(result.codes(), vec!["W002"]);
        assert!(result.is_valid());
    }

    #[test]
    fn test_invalid_method() {
        let mut contract = valid_contract();
        first_interaction(&mut contract)["request"]["method"] = json!("GE T");
        let result = lint(&contract);
        assert_eq!(result.codes(), vec!["E005"]);
        assert_eq!(
            result.issues[0].location.as_deref(),
            Some("interactions[0].request.method")
        );
    }

    #[test]
    fn test_status_out_of_range() {
        for status in [json!(99), json!(600), json!("200")] {
            let mut contract = valid_contract();
            first_interaction(&mut contract)["response"]["status"] = status;
            assert_eq!(lint(&contract).codes(), vec!["E006"]);
        }
    }

    #[test]
    fn test_unknown_rule_kind() {
        let mut contract = valid_contract();
        first_interaction(&mut contract)["response"]["body"]["color"] =
            json!({"$match": "eachLike", "example": "Black"});
        let result = lint(&contract);
        assert_eq!(result.codes(), vec!["E007"]);
        assert_eq!(
            result.issues[0].location.as_deref(),
            Some("interactions[0].response.body.color")
        );
    }

    #[test]
    fn test_escaped_object_nodes() {
        let mut contract = valid_contract();
        first_interaction(&mut contract)["response"]["body"] = json!({
            "$match": "object",
            "entries": {
                "$match": {"title": "BMW"},
                "color": {"$match": "regex", "example": "Black", "pattern": "\\d"}
            }
        });
        let result = lint(&contract);
        assert_eq!(result.codes(), vec!["E009"]);
        assert_eq!(
            result.issues[0].location.as_deref(),
            Some("interactions[0].response.body.color")
        );

        first_interaction(&mut contract)["response"]["body"] = json!({"$match": "object"});
        assert_eq!(lint(&contract).codes(), vec!["E007"]);
    }

    #[test]
    fn test_incomplete_rules() {
        let mut contract = valid_contract();
        first_interaction(&mut contract)["response"]["body"] = json!([
            {"$match": "literal"},
            {"$match": "type"},
            {"$match": "regex", "example": "Black"},
            {"$match": "regex", "example": 1, "pattern": "\\d"}
        ]);
        let result = lint(&contract);
        assert_eq!(result.codes(), vec!["E007", "E007", "E007", "E007"]);
        assert_eq!(
            result.issues[2].location.as_deref(),
            Some("interactions[0].response.body[2]")
        );
    }

    #[test]
    fn test_invalid_regex() {
        let mut contract = valid_contract();
        first_interaction(&mut contract)["request"]["path"] =
            json!({"$match": "regex", "example": "/cars/1", "pattern": "/cars/[0-9"});
        assert_eq!(lint(&contract).codes(), vec!["E008"]);
    }

    #[test]
    fn test_regex_example_must_match_pattern() {
        let mut contract = valid_contract();
        first_interaction(&mut contract)["request"]["headers"]["Content-Type"]["example"] =
            json!("text/plain");
        let result = lint(&contract);
        assert_eq!(result.codes(), vec!["E009"]);
        assert_eq!(
            result.issues[0].location.as_deref(),
            Some("interactions[0].request.headers.Content-Type")
        );
    }

    #[test]
    fn test_duplicate_interactions() {
        let mut contract = valid_contract();
        let copy = contract["interactions"][0].clone();
        let mut other_state = copy.clone();
        other_state["providerState"] = json!("Validate the whole response body");
        let interactions = contract["interactions"].as_array_mut().unwrap();
        interactions.push(other_state);
        interactions.push(copy);

        let result = lint(&contract);
        assert_eq!(result.codes(), vec!["E010"]);
        assert_eq!(result.issues[0].location.as_deref(), Some("interactions[2]"));
    }

    #[test]
    fn test_missing_provider_state_warning() {
        let mut contract = valid_contract();
        first_interaction(&mut contract)
            .as_object_mut()
            .unwrap()
            .remove("providerState");
        assert_eq!(lint(&contract).codes(), vec!["W001"]);

        let mut result = LintResult::new();
        let options = LintOptions {
            require_provider_state: false,
        };
        validate_contract(Path::new("contract.json"), &contract, &mut result, &options);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_empty_interactions_warning() {
        let mut contract = valid_contract();
        contract["interactions"] = json!([]);
        assert_eq!(lint(&contract).codes(), vec!["W003"]);
    }

    #[test]
    fn test_relative_path_warning() {
        let mut contract = valid_contract();
        first_interaction(&mut contract)["request"]["path"] = json!("cars");
        assert_eq!(lint(&contract).codes(), vec!["W004"]);
    }

    #[test]
    fn test_malformed_query_map() {
        let mut contract = valid_contract();
        first_interaction(&mut contract)["request"]["query"] = json!("color=Black");
        let result = lint(&contract);
        assert_eq!(result.codes(), vec!["E003"]);
        assert_eq!(
            result.issues[0].location.as_deref(),
            Some("interactions[0].request.query")
        );
    }

    #[test]
    fn test_method_tokens() {
        assert!(is_valid_method("GET"));
        assert!(is_valid_method("PROPFIND"));
        assert!(!is_valid_method(""));
        assert!(!is_valid_method("GET\n"));
    }
}
