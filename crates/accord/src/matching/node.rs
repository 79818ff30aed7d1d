//! Expectation trees.

use super::rule::{MatchRule, RULE_TAG};
use crate::error::ContractError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// `$match` value of an object node whose own keys include `$match`.
pub const OBJECT_TAG: &str = "object";

const OBJECT_ENTRIES: &str = "entries";

/// A JSON-like tree in which every leaf is a [`MatchRule`].
///
/// The comparator visits object entries in the node's order. Nodes built with
/// [`ExpectationNode::object`] keep their declaration order; nodes converted
/// from a `serde_json::Value` take the map's iteration order, which is sorted
/// by key. Plain values become trees with literal leaves: objects become
/// subset-matched `Object` nodes and arrays become positional `Array` nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectationNode {
    Rule(MatchRule),
    Array(Vec<ExpectationNode>),
    Object(Vec<(String, ExpectationNode)>),
}

impl ExpectationNode {
    /// Build an object node. A repeated key replaces the earlier entry in
    /// place.
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ExpectationNode)>,
    {
        let mut out: Vec<(String, ExpectationNode)> = Vec::new();
        for (key, node) in entries {
            let key = key.into();
            match out.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = node,
                None => out.push((key, node)),
            }
        }
        ExpectationNode::Object(out)
    }

    pub fn array<I>(items: I) -> Self
    where
        I: IntoIterator<Item = ExpectationNode>,
    {
        ExpectationNode::Array(items.into_iter().collect())
    }

    /// Look up a direct child of an object node.
    pub fn get(&self, key: &str) -> Option<&ExpectationNode> {
        match self {
            ExpectationNode::Object(entries) => {
                entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// Concrete JSON with every rule replaced by its example. This is what the
    /// mock serves and what the replayer sends.
    pub fn example(&self) -> Value {
        match self {
            ExpectationNode::Rule(rule) => rule.example(),
            ExpectationNode::Array(items) => {
                Value::Array(items.iter().map(ExpectationNode::example).collect())
            }
            ExpectationNode::Object(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.example()))
                    .collect(),
            ),
        }
    }

    /// Visit every rule in the tree with its path.
    pub fn for_each_rule<F>(&self, path: &str, f: &mut F)
    where
        F: FnMut(&str, &MatchRule),
    {
        match self {
            ExpectationNode::Rule(rule) => f(path, rule),
            ExpectationNode::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    item.for_each_rule(&format!("{path}[{i}]"), f);
                }
            }
            ExpectationNode::Object(entries) => {
                for (key, node) in entries {
                    node.for_each_rule(&format!("{path}.{key}"), f);
                }
            }
        }
    }

    /// Contract-file representation.
    pub fn to_json(&self) -> Value {
        match self {
            ExpectationNode::Rule(rule) => rule.to_json(),
            ExpectationNode::Array(items) => {
                Value::Array(items.iter().map(ExpectationNode::to_json).collect())
            }
            ExpectationNode::Object(entries) => {
                let mut map = Map::new();
                for (key, node) in entries {
                    map.insert(key.clone(), node.to_json());
                }
                if !map.contains_key(RULE_TAG) {
                    return Value::Object(map);
                }
                // A real "$match" key would read back as a rule, so wrap it
                let mut escaped = Map::new();
                escaped.insert(RULE_TAG.to_string(), Value::String(OBJECT_TAG.to_string()));
                escaped.insert(OBJECT_ENTRIES.to_string(), Value::Object(map));
                Value::Object(escaped)
            }
        }
    }

    /// Rehydrate a tree written by [`ExpectationNode::to_json`].
    pub fn from_json(value: &Value) -> Result<Self, ContractError> {
        match value {
            Value::Object(obj)
                if obj.get(RULE_TAG).and_then(Value::as_str) == Some(OBJECT_TAG) =>
            {
                match obj.get(OBJECT_ENTRIES) {
                    Some(Value::Object(entries)) => Self::object_from_json(entries),
                    _ => Err(ContractError::MalformedExpectation(format!(
                        "{OBJECT_TAG} node is missing '{OBJECT_ENTRIES}'"
                    ))),
                }
            }
            Value::Object(obj) if obj.contains_key(RULE_TAG) => {
                Ok(ExpectationNode::Rule(MatchRule::from_json(value)?))
            }
            Value::Object(obj) => Self::object_from_json(obj),
            Value::Array(items) => Ok(ExpectationNode::Array(
                items
                    .iter()
                    .map(ExpectationNode::from_json)
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            scalar => Ok(ExpectationNode::Rule(MatchRule::Literal(scalar.clone()))),
        }
    }

    fn object_from_json(obj: &Map<String, Value>) -> Result<Self, ContractError> {
        let entries = obj
            .iter()
            .map(|(k, v)| Ok((k.clone(), ExpectationNode::from_json(v)?)))
            .collect::<Result<Vec<_>, ContractError>>()?;
        Ok(ExpectationNode::Object(entries))
    }
}

impl From<MatchRule> for ExpectationNode {
    fn from(rule: MatchRule) -> Self {
        ExpectationNode::Rule(rule)
    }
}

impl From<Value> for ExpectationNode {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(obj) => ExpectationNode::Object(
                obj.into_iter()
                    .map(|(k, v)| (k, ExpectationNode::from(v)))
                    .collect(),
            ),
            Value::Array(items) => {
                ExpectationNode::Array(items.into_iter().map(ExpectationNode::from).collect())
            }
            scalar => ExpectationNode::Rule(MatchRule::Literal(scalar)),
        }
    }
}

impl From<&str> for ExpectationNode {
    fn from(value: &str) -> Self {
        ExpectationNode::Rule(MatchRule::literal(value))
    }
}

impl Serialize for ExpectationNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ExpectationNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ExpectationNode::from_json(&value).map_err(serde::de::Error::custom)
    }
}
