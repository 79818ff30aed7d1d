//! Contract file linter for Accord.
//!
//! Validates recorded contract files (syntax, required fields, match rules,
//! duplicate interactions) without loading them into the engine. Usable as a
//! library or through the `accord-lint` CLI binary.
//!
//! # Example
//!
//! ```no_run
//! use accord_lint::{lint_directory, lint_file, LintOptions};
//! use std::path::Path;
//!
//! let result = lint_file(
//!     Path::new("pacts/car_consumer-car_provider.json"),
//!     &LintOptions::default(),
//! );
//!
//! let result = lint_directory(Path::new("./pacts"), &LintOptions::default());
//!
//! if result.has_errors() {
//!     eprintln!("Found {} errors", result.errors);
//! }
//! ```

mod types;
mod validator;

use std::path::Path;

pub use types::{LintIssue, LintOptions, LintResult, LoadError, Severity};

pub use validator::{
    validate_contract, validate_interaction, validate_node, validate_request, validate_response,
    validate_rule, OBJECT_TAG, RULE_TAG,
};

/// Read and parse a contract file as JSON.
pub fn load_contract(path: &Path) -> Result<serde_json::Value, LoadError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Lint a single contract file.
pub fn lint_file(path: &Path, options: &LintOptions) -> LintResult {
    let mut result = LintResult::new();
    result.files_checked = 1;

    match load_contract(path) {
        Ok(value) => validate_contract(path, &value, &mut result, options),
        Err(e) => result.add_issue(e.into_issue(path)),
    }
    result
}

/// Lint all JSON files in a directory (non-recursive).
pub fn lint_directory(path: &Path, options: &LintOptions) -> LintResult {
    let mut result = LintResult::new();

    let entries = match std::fs::read_dir(path) {
        Ok(e) => e,
        Err(e) => {
            result.add_issue(LintIssue::error(
                "E001",
                format!("Failed to read directory: {e}"),
                path.to_path_buf(),
            ));
            return result;
        }
    };

    let mut files: Vec<_> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.extension().is_some_and(|e| e == "json"))
        .collect();
    files.sort();

    for file in files {
        result.merge(lint_file(&file, options));
    }
    result
}

/// Lint a JSON string directly.
pub fn lint_json(json: &str, source_name: &str, options: &LintOptions) -> LintResult {
    let path = Path::new(source_name);
    match serde_json::from_str::<serde_json::Value>(json) {
        Ok(value) => lint_value(&value, source_name, options),
        Err(e) => {
            let mut result = LintResult::new();
            result.files_checked = 1;
            result.add_issue(LoadError::from(e).into_issue(path));
            result
        }
    }
}

/// Lint an already parsed contract document.
pub fn lint_value(
    value: &serde_json::Value,
    source_name: &str,
    options: &LintOptions,
) -> LintResult {
    let mut result = LintResult::new();
    result.files_checked = 1;
    validate_contract(Path::new(source_name), value, &mut result, options);
    result
}
