//! Contract artifacts: the persisted, versioned record of a consumer's
//! interactions with one provider.

use crate::error::ContractError;
use crate::interaction::{validate_method, Interaction};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Version written into every artifact. Artifacts with a different major
/// version are rejected on load.
pub const SPECIFICATION_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
}

impl Participant {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractMetadata {
    pub contract_specification: SpecificationVersion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecificationVersion {
    pub version: String,
}

impl Default for ContractMetadata {
    fn default() -> Self {
        Self {
            contract_specification: SpecificationVersion {
                version: SPECIFICATION_VERSION.to_string(),
            },
        }
    }
}

/// A self-contained contract between one consumer and one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractArtifact {
    pub consumer: Participant,
    pub provider: Participant,
    pub interactions: Vec<Interaction>,
    #[serde(default)]
    pub metadata: ContractMetadata,
}

impl ContractArtifact {
    pub fn new(
        consumer: impl Into<String>,
        provider: impl Into<String>,
        interactions: Vec<Interaction>,
    ) -> Self {
        Self {
            consumer: Participant::new(consumer),
            provider: Participant::new(provider),
            interactions,
            metadata: ContractMetadata::default(),
        }
    }

    /// File name for this pair, `<consumer>-<provider>.json`.
    pub fn file_name(&self) -> String {
        file_name(&self.consumer.name, &self.provider.name)
    }

    /// Stable pretty JSON with a trailing newline. Equal artifacts always
    /// produce identical bytes.
    pub fn to_json(&self) -> Result<String, ContractError> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }

    /// Parse and validate an artifact: the specification version must be
    /// supported, every method valid and every `(description, providerState)`
    /// pair unique.
    pub fn from_json(text: &str) -> Result<Self, ContractError> {
        let raw: Value = serde_json::from_str(text)?;
        let found = raw
            .pointer("/metadata/contractSpecification/version")
            .and_then(Value::as_str)
            .unwrap_or(SPECIFICATION_VERSION);
        if !is_supported_version(found) {
            return Err(ContractError::UnsupportedVersion {
                found: found.to_string(),
                supported: SPECIFICATION_VERSION.to_string(),
            });
        }

        let artifact: ContractArtifact = serde_json::from_value(raw)?;
        let mut seen = HashSet::new();
        for interaction in &artifact.interactions {
            validate_method(&interaction.request.method)?;
            if !seen.insert(interaction.key()) {
                return Err(ContractError::DuplicateInteraction {
                    description: interaction.description.clone(),
                    provider_state: interaction.provider_state.clone(),
                });
            }
        }
        Ok(artifact)
    }

    pub fn load(path: &Path) -> Result<Self, ContractError> {
        let text = fs::read_to_string(path)?;
        let artifact = Self::from_json(&text)?;
        debug!(
            "Loaded contract {} -> {} ({} interactions) from {:?}",
            artifact.consumer.name,
            artifact.provider.name,
            artifact.interactions.len(),
            path
        );
        Ok(artifact)
    }

    /// Write the artifact into `dir` (created if missing) and return the
    /// file path.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, ContractError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        fs::write(&path, self.to_json()?)?;
        info!(
            "Saved {} interactions to {:?}",
            self.interactions.len(),
            path
        );
        Ok(path)
    }
}

/// `<consumer>-<provider>.json`, lower-cased with spaces replaced by `_`.
pub fn file_name(consumer: &str, provider: &str) -> String {
    fn normalize(name: &str) -> String {
        name.trim().to_lowercase().replace(' ', "_")
    }
    format!("{}-{}.json", normalize(consumer), normalize(provider))
}

fn is_supported_version(version: &str) -> bool {
    let major = |v: &str| v.split('.').next().map(str::to_string);
    major(version).is_some_and(|m| Some(m) == major(SPECIFICATION_VERSION))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::interaction::{RequestExpectation, ResponseExpectation};
    use crate::matching::MatchRule;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    fn sample() -> ContractArtifact {
        let interaction = Interaction {
            description: "A GET request".to_string(),
            provider_state: Some("Validate title and color".to_string()),
            request: RequestExpectation::new(
                "GET",
                MatchRule::regex("/cars/1", "/cars/[0-9]+").unwrap(),
            ),
            response: ResponseExpectation::new(200)
                .header(
                    "Content-Type",
                    MatchRule::regex("application/json; charset=utf-8", r"application\/json")
                        .unwrap(),
                )
                .body(json!({"title": "BMW", "color": "Black"})),
        };
        ContractArtifact::new("Car Consumer", "Car Provider", vec![interaction])
    }

    #[test]
    fn test_file_name() {
        assert_eq!(sample().file_name(), "car_consumer-car_provider.json");
        assert_eq!(file_name(" Web App ", "API"), "web_app-api.json");
    }

    #[test]
    fn test_artifact_shape() {
        let json: Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        assert_json_eq!(
            json,
            json!({
                "consumer": {"name": "Car Consumer"},
                "provider": {"name": "Car Provider"},
                "interactions": [{
                    "description": "A GET request",
                    "providerState": "Validate title and color",
                    "request": {
                        "method": "GET",
                        "path": {"$match": "regex", "example": "/cars/1", "pattern": "/cars/[0-9]+"}
                    },
                    "response": {
                        "status": 200,
                        "headers": {
                            "Content-Type": {
                                "$match": "regex",
                                "example": "application/json; charset=utf-8",
                                "pattern": "application\\/json"
                            }
                        },
                        "body": {"color": "Black", "title": "BMW"}
                    }
                }],
                "metadata": {"contractSpecification": {"version": "1.0.0"}}
            })
        );
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let first = sample().to_json().unwrap();
        let restored = ContractArtifact::from_json(&first).unwrap();
        let second = restored.to_json().unwrap();
        assert_eq!(first, second);
        assert!(first.ends_with("}\n"));
        assert_eq!(
            restored.interactions[0].request.path.pattern(),
            Some("/cars/[0-9]+")
        );
    }

    #[test]
    fn test_round_trip_body_with_rule_tag_key() {
        let mut artifact = sample();
        artifact.interactions[0].request = RequestExpectation::new("POST", "/cars")
            .body(json!({"$match": {"title": "BMW"}}));

        let first = artifact.to_json().unwrap();
        let restored = ContractArtifact::from_json(&first).unwrap();
        assert_eq!(restored.to_json().unwrap(), first);
        assert_eq!(
            restored.interactions[0].request.example_body().as_deref(),
            Some(r#"{"$match":{"title":"BMW"}}"#)
        );
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let mut json: Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        json["metadata"]["contractSpecification"]["version"] = json!("2.0.0");
        let err = ContractArtifact::from_json(&json.to_string()).unwrap_err();
        assert!(matches!(err, ContractError::UnsupportedVersion { ref found, .. } if found == "2.0.0"));
        assert_eq!(err.kind(), ErrorKind::Configuration);

        json["metadata"]["contractSpecification"]["version"] = json!("1.4.0");
        assert!(ContractArtifact::from_json(&json.to_string()).is_ok());
    }

    #[test]
    fn test_rejects_duplicates_and_bad_rules() {
        let mut artifact = sample();
        artifact.interactions.push(artifact.interactions[0].clone());
        let err = ContractArtifact::from_json(&artifact.to_json().unwrap()).unwrap_err();
        assert!(matches!(err, ContractError::DuplicateInteraction { .. }));

        let mut json: Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        json["interactions"][0]["request"]["path"]["pattern"] = json!("/cars/[");
        let err = ContractArtifact::from_json(&json.to_string()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = sample();
        let path = artifact.save(&dir.path().join("pacts")).unwrap();
        assert!(path.ends_with("car_consumer-car_provider.json"));
        assert_eq!(ContractArtifact::load(&path).unwrap(), artifact);
    }
}
