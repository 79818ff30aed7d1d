//! Leaf match rules and their evaluation.
//!
//! A rule describes how strictly a single JSON value is compared. Rules are
//! validated when they are built (a regex rule always holds a compiled,
//! valid pattern whose example satisfies it), so evaluation never fails.

use super::mismatch::MismatchKind;
use crate::error::ContractError;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Key that marks a JSON object as a serialized match rule.
pub const RULE_TAG: &str = "$match";

/// JSON type category used by type-only rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl JsonType {
    /// Category of a JSON value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonType::Null,
            Value::Bool(_) => JsonType::Bool,
            Value::Number(_) => JsonType::Number,
            Value::String(_) => JsonType::String,
            Value::Array(_) => JsonType::Array,
            Value::Object(_) => JsonType::Object,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JsonType::Null => "null",
            JsonType::Bool => "boolean",
            JsonType::Number => "number",
            JsonType::String => "string",
            JsonType::Array => "array",
            JsonType::Object => "object",
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule kind, as written in the `$match` tag of a contract file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Literal,
    Regex,
    Type,
    Like,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Literal => "literal",
            RuleKind::Regex => "regex",
            RuleKind::Type => "type",
            RuleKind::Like => "like",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "literal" => Some(RuleKind::Literal),
            "regex" => Some(RuleKind::Regex),
            "type" => Some(RuleKind::Type),
            "like" => Some(RuleKind::Like),
            _ => None,
        }
    }
}

/// How one field of a request or response is compared.
#[derive(Debug, Clone)]
pub enum MatchRule {
    /// Deep equality: same type, same value.
    Literal(Value),
    /// A string matched by an unanchored regex search. The example is only
    /// used to generate concrete requests and mock responses.
    Regex { example: String, regex: Arc<Regex> },
    /// Same JSON type category as the example.
    Type(Value),
    /// Same shape as the example: type matching cascades into the example's
    /// object keys and positional array elements.
    Like(Value),
}

/// Outcome of evaluating one rule against one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    Matched,
    Mismatched(MismatchKind),
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchResult::Matched)
    }
}

impl MatchRule {
    /// Exact match against `value`.
    pub fn literal(value: impl Into<Value>) -> Self {
        MatchRule::Literal(value.into())
    }

    /// Regex match. Fails if the pattern does not compile or the example does
    /// not satisfy it.
    pub fn regex(example: impl Into<String>, pattern: &str) -> Result<Self, ContractError> {
        let example = example.into();
        let regex = Regex::new(pattern).map_err(|source| ContractError::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        })?;
        if !regex.is_match(&example) {
            return Err(ContractError::ExampleDoesNotMatch {
                example,
                pattern: pattern.to_string(),
            });
        }
        Ok(MatchRule::Regex {
            example,
            regex: Arc::new(regex),
        })
    }

    /// Type-only match against the category of `example`.
    pub fn type_of(example: impl Into<Value>) -> Self {
        MatchRule::Type(example.into())
    }

    /// Structural type match against `example`.
    pub fn like(example: impl Into<Value>) -> Self {
        MatchRule::Like(example.into())
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            MatchRule::Literal(_) => RuleKind::Literal,
            MatchRule::Regex { .. } => RuleKind::Regex,
            MatchRule::Type(_) => RuleKind::Type,
            MatchRule::Like(_) => RuleKind::Like,
        }
    }

    /// Regex source, for regex rules.
    pub fn pattern(&self) -> Option<&str> {
        match self {
            MatchRule::Regex { regex, .. } => Some(regex.as_str()),
            _ => None,
        }
    }

    /// Concrete value to send or serve in place of this rule.
    pub fn example(&self) -> Value {
        match self {
            MatchRule::Literal(value) | MatchRule::Type(value) | MatchRule::Like(value) => {
                value.clone()
            }
            MatchRule::Regex { example, .. } => Value::String(example.clone()),
        }
    }

    /// Example rendered for places that only carry strings (paths, headers,
    /// query parameters).
    pub fn example_string(&self) -> String {
        match self.example() {
            Value::String(s) => s,
            other => other.to_string(),
        }
    }

    /// Evaluate this rule against an observed value.
    pub fn evaluate(&self, actual: &Value) -> MatchResult {
        match self {
            MatchRule::Literal(expected) => {
                if expected == actual {
                    MatchResult::Matched
                } else if JsonType::of(expected) != JsonType::of(actual) {
                    MatchResult::Mismatched(MismatchKind::TypeMismatch)
                } else {
                    MatchResult::Mismatched(MismatchKind::ValueMismatch)
                }
            }
            MatchRule::Regex { regex, .. } => match actual {
                Value::String(s) if regex.is_match(s) => MatchResult::Matched,
                Value::String(_) => MatchResult::Mismatched(MismatchKind::PatternMismatch),
                _ => MatchResult::Mismatched(MismatchKind::TypeMismatch),
            },
            MatchRule::Type(example) => {
                if JsonType::of(example) == JsonType::of(actual) {
                    MatchResult::Matched
                } else {
                    MatchResult::Mismatched(MismatchKind::TypeMismatch)
                }
            }
            MatchRule::Like(example) => {
                match super::compare::like_mismatches(example, actual, "$").first() {
                    Some(first) => MatchResult::Mismatched(first.kind),
                    None => MatchResult::Matched,
                }
            }
        }
    }

    /// Evaluate against a string-valued field (path, header, query parameter).
    pub fn evaluate_str(&self, actual: &str) -> MatchResult {
        self.evaluate(&Value::String(actual.to_string()))
    }

    /// Human-readable description of what this rule accepts.
    pub fn describe(&self) -> String {
        match self {
            MatchRule::Literal(value) => value.to_string(),
            MatchRule::Regex { regex, .. } => format!("a string matching /{}/", regex.as_str()),
            MatchRule::Type(example) => format!("any {} (e.g. {example})", JsonType::of(example)),
            MatchRule::Like(example) => format!("a value shaped like {example}"),
        }
    }

    /// Contract-file representation. Scalar literals are written bare, every
    /// other rule as an object tagged with [`RULE_TAG`].
    pub fn to_json(&self) -> Value {
        let mut tagged = Map::new();
        match self {
            MatchRule::Literal(value) if !value.is_object() && !value.is_array() => {
                return value.clone();
            }
            MatchRule::Literal(value) => {
                tagged.insert("value".to_string(), value.clone());
            }
            MatchRule::Regex { example, regex } => {
                tagged.insert("example".to_string(), Value::String(example.clone()));
                tagged.insert(
                    "pattern".to_string(),
                    Value::String(regex.as_str().to_string()),
                );
            }
            MatchRule::Type(example) | MatchRule::Like(example) => {
                tagged.insert("example".to_string(), example.clone());
            }
        }
        tagged.insert(
            RULE_TAG.to_string(),
            Value::String(self.kind().as_str().to_string()),
        );
        Value::Object(tagged)
    }

    /// Rehydrate a rule written by [`MatchRule::to_json`]. Untagged values
    /// become literals.
    pub fn from_json(value: &Value) -> Result<Self, ContractError> {
        let Some(obj) = value.as_object().filter(|o| o.contains_key(RULE_TAG)) else {
            return Ok(MatchRule::Literal(value.clone()));
        };

        let tag = obj
            .get(RULE_TAG)
            .and_then(|t| t.as_str())
            .ok_or_else(|| {
                ContractError::MalformedExpectation(format!("'{RULE_TAG}' must be a string"))
            })?;
        let kind = RuleKind::parse(tag).ok_or_else(|| {
            ContractError::MalformedExpectation(format!("unknown rule kind '{tag}'"))
        })?;

        let field = |name: &str| {
            obj.get(name).cloned().ok_or_else(|| {
                ContractError::MalformedExpectation(format!("{tag} rule is missing '{name}'"))
            })
        };

        match kind {
            RuleKind::Literal => Ok(MatchRule::Literal(field("value")?)),
            RuleKind::Type => Ok(MatchRule::Type(field("example")?)),
            RuleKind::Like => Ok(MatchRule::Like(field("example")?)),
            RuleKind::Regex => {
                let example = field("example")?;
                let pattern = field("pattern")?;
                match (example.as_str(), pattern.as_str()) {
                    (Some(example), Some(pattern)) => MatchRule::regex(example, pattern),
                    _ => Err(ContractError::MalformedExpectation(
                        "regex rule 'example' and 'pattern' must be strings".to_string(),
                    )),
                }
            }
        }
    }
}

impl PartialEq for MatchRule {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MatchRule::Literal(a), MatchRule::Literal(b)) => a == b,
            (MatchRule::Type(a), MatchRule::Type(b)) => a == b,
            (MatchRule::Like(a), MatchRule::Like(b)) => a == b,
            (
                MatchRule::Regex {
                    example: ea,
                    regex: ra,
                },
                MatchRule::Regex {
                    example: eb,
                    regex: rb,
                },
            ) => ea == eb && ra.as_str() == rb.as_str(),
            _ => false,
        }
    }
}

impl From<&str> for MatchRule {
    fn from(value: &str) -> Self {
        MatchRule::literal(value)
    }
}

impl From<String> for MatchRule {
    fn from(value: String) -> Self {
        MatchRule::literal(value)
    }
}

impl Serialize for MatchRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MatchRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        MatchRule::from_json(&value).map_err(serde::de::Error::custom)
    }
}
