//! Mismatch records produced by the comparator.

use serde::Serialize;
use similar::TextDiff;
use std::fmt;

/// Why a comparison failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MismatchKind {
    /// Same type, different value
    ValueMismatch,
    /// Different JSON type category
    TypeMismatch,
    /// String does not satisfy the regex
    PatternMismatch,
    /// Expected object key is absent
    MissingKey,
    /// Array lengths differ
    LengthMismatch,
    /// HTTP status differs
    StatusMismatch,
    /// HTTP method differs
    MethodMismatch,
    /// Expected header is absent
    MissingHeader,
    /// Expected query parameter is absent
    MissingQuery,
    /// Expected a body, got none
    MissingBody,
    /// Body is not valid JSON
    UnparseableBody,
}

impl MismatchKind {
    pub fn reason(&self) -> &'static str {
        match self {
            MismatchKind::ValueMismatch => "value mismatch",
            MismatchKind::TypeMismatch => "type mismatch",
            MismatchKind::PatternMismatch => "pattern mismatch",
            MismatchKind::MissingKey => "missing key",
            MismatchKind::LengthMismatch => "length mismatch",
            MismatchKind::StatusMismatch => "status mismatch",
            MismatchKind::MethodMismatch => "method mismatch",
            MismatchKind::MissingHeader => "missing header",
            MismatchKind::MissingQuery => "missing query parameter",
            MismatchKind::MissingBody => "missing body",
            MismatchKind::UnparseableBody => "body is not JSON",
        }
    }
}

/// One structural difference between an expectation and an observed value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    /// Location, e.g. `$.cars[0].color`, `status`, `headers.Content-Type`
    pub path: String,
    /// What the expectation accepts
    pub expected: String,
    /// What was observed
    pub actual: String,
    pub kind: MismatchKind,
}

impl Mismatch {
    pub fn new(
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
        kind: MismatchKind,
    ) -> Self {
        Self {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
            kind,
        }
    }

    /// Unified diff of expected vs actual, when either side spans several
    /// lines (pretty-printed objects and arrays).
    pub fn diff(&self) -> Option<String> {
        if !self.expected.contains('\n') && !self.actual.contains('\n') {
            return None;
        }
        let diff = TextDiff::from_lines(&self.expected, &self.actual);
        Some(
            diff.unified_diff()
                .context_radius(3)
                .header("expected", "actual")
                .to_string(),
        )
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.diff() {
            Some(diff) => write!(f, "{}: {}\n{}", self.path, self.kind.reason(), diff),
            None => write!(
                f,
                "{}: {}: expected {}, got {}",
                self.path,
                self.kind.reason(),
                self.expected,
                self.actual
            ),
        }
    }
}

/// Ordered list of mismatches from one comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MismatchReport(Vec<Mismatch>);

impl MismatchReport {
    pub fn new(mismatches: Vec<Mismatch>) -> Self {
        Self(mismatches)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Mismatch> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<Mismatch> {
        self.0
    }
}

impl From<Vec<Mismatch>> for MismatchReport {
    fn from(mismatches: Vec<Mismatch>) -> Self {
        Self(mismatches)
    }
}

impl fmt::Display for MismatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, mismatch) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {}. {mismatch}", i + 1)?;
        }
        Ok(())
    }
}

/// Render a JSON value for a mismatch: compact for scalars, pretty for
/// containers so that [`Mismatch::diff`] has lines to work with.
pub(crate) fn render(value: &serde_json::Value) -> String {
    if value.is_object() || value.is_array() {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    } else {
        value.to_string()
    }
}
