//! Contract matching engine.
//!
//! An expectation is a tree of JSON-like nodes where every leaf is a
//! [`MatchRule`]. The comparator walks that tree alongside an observed JSON
//! value and collects every structural difference instead of stopping at the
//! first one, so reports show the whole picture.
//!
//! # Module Structure
//!
//! - `rule` - Leaf match rules (literal, regex, type, like) and their evaluation
//! - `node` - Expectation tree and example generation
//! - `compare` - Recursive comparator
//! - `mismatch` - Mismatch records and report rendering
//! - `http` - Request/response level matching built on the comparator

mod compare;
mod http;
mod mismatch;
mod node;
mod rule;

pub use compare::{compare, compare_body, BODY_ROOT};
pub use http::{match_request, match_response};
pub use mismatch::{Mismatch, MismatchKind, MismatchReport};
pub use node::{ExpectationNode, OBJECT_TAG};
pub use rule::{JsonType, MatchResult, MatchRule, RuleKind, RULE_TAG};
