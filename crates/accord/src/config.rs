//! Configuration for the consumer session and the provider verifier.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound for readiness attempts.
pub const MAX_READINESS_ATTEMPTS: u32 = 50;

/// Provider verification settings, usually loaded from YAML. The `broker`
/// section is read by `accord-publish`:
///
/// ```yaml
/// provider_base_url: http://localhost:3000
/// contracts:
///   - pacts/car_consumer-car_provider.json
/// timeout_ms: 5000
/// readiness:
///   attempts: 10
///   interval_ms: 100
///   path: /cars
/// provider_states_setup_url: http://localhost:3000/_states
/// request_headers:
///   Authorization: Bearer test
/// broker:
///   url: http://broker.local
///   token: secret
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifierConfig {
    #[serde(default)]
    pub provider_base_url: Option<String>,
    #[serde(default)]
    pub contracts: Vec<PathBuf>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    #[serde(default)]
    pub provider_states_setup_url: Option<String>,
    /// Sent with every replayed request, overriding contract headers of the
    /// same name
    #[serde(default)]
    pub request_headers: BTreeMap<String, String>,
    #[serde(default)]
    pub broker: Option<BrokerConfig>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            provider_base_url: None,
            contracts: Vec::new(),
            timeout_ms: default_timeout_ms(),
            readiness: ReadinessConfig::default(),
            provider_states_setup_url: None,
            request_headers: BTreeMap::new(),
            broker: None,
        }
    }
}

impl VerifierConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: VerifierConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if let Some(ref url) = self.provider_base_url {
            validate_http_url("provider_base_url", url)?;
        }
        if let Some(ref url) = self.provider_states_setup_url {
            validate_http_url("provider_states_setup_url", url)?;
        }
        if let Some(ref broker) = self.broker {
            validate_http_url("broker.url", &broker.url)?;
        }
        if self.timeout_ms == 0 {
            anyhow::bail!("timeout_ms must be greater than zero");
        }
        if !(1..=MAX_READINESS_ATTEMPTS).contains(&self.readiness.attempts) {
            anyhow::bail!(
                "readiness.attempts must be between 1 and {}, got {}",
                MAX_READINESS_ATTEMPTS,
                self.readiness.attempts
            );
        }
        if !self.readiness.path.starts_with('/') {
            anyhow::bail!(
                "readiness.path must start with '/', got '{}'",
                self.readiness.path
            );
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Bounded provider readiness poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessConfig {
    #[serde(default = "default_readiness_attempts")]
    pub attempts: u32,
    #[serde(default = "default_readiness_interval_ms")]
    pub interval_ms: u64,
    /// Any HTTP response on this path counts as ready
    #[serde(default = "default_readiness_path")]
    pub path: String,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            attempts: default_readiness_attempts(),
            interval_ms: default_readiness_interval_ms(),
            path: default_readiness_path(),
        }
    }
}

impl ReadinessConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Broker used by `accord-publish`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
}

impl BrokerConfig {
    /// Merge command-line settings over the `broker` section of a config
    /// file. Each field falls back to the file separately.
    pub fn resolve(
        url: Option<String>,
        token: Option<String>,
        file: Option<&BrokerConfig>,
    ) -> Result<Self, anyhow::Error> {
        let Some(url) = url.or_else(|| file.map(|b| b.url.clone())) else {
            anyhow::bail!("no broker URL: pass --broker-url or set broker.url in the config file");
        };
        validate_http_url("broker.url", &url)?;
        Ok(Self {
            url,
            token: token.or_else(|| file.and_then(|b| b.token.clone())),
        })
    }
}

/// Consumer session settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub consumer: String,
    pub provider: String,
    /// Where `write_contract` puts the artifact
    pub contract_dir: PathBuf,
    pub mock_host: String,
    /// 0 picks an ephemeral port
    pub mock_port: u16,
    pub timeout: Duration,
}

impl SessionConfig {
    pub fn new(consumer: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            consumer: consumer.into(),
            provider: provider.into(),
            contract_dir: PathBuf::from("pacts"),
            mock_host: "127.0.0.1".to_string(),
            mock_port: 0,
            timeout: Duration::from_millis(default_timeout_ms()),
        }
    }

    pub fn contract_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.contract_dir = dir.into();
        self
    }

    pub fn mock_host(mut self, host: impl Into<String>) -> Self {
        self.mock_host = host.into();
        self
    }

    pub fn mock_port(mut self, port: u16) -> Self {
        self.mock_port = port;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn validate_http_url(field: &str, url: &str) -> Result<(), anyhow::Error> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!("{} must be an http(s) URL, got '{}'", field, url);
    }
    Ok(())
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_readiness_attempts() -> u32 {
    10
}

fn default_readiness_interval_ms() -> u64 {
    100
}

fn default_readiness_path() -> String {
    "/".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config: VerifierConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, VerifierConfig::default());
        assert_eq!(config.readiness.attempts, 10);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        config.validate().unwrap();
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
provider_base_url: http://localhost:3000
contracts:
  - pacts/car_consumer-car_provider.json
readiness:
  attempts: 3
  path: /cars
request_headers:
  Authorization: Bearer test
broker:
  url: http://broker.local
"#
        )
        .unwrap();

        let config = VerifierConfig::from_file(file.path()).unwrap();
        assert_eq!(config.provider_base_url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.contracts.len(), 1);
        assert_eq!(config.readiness.attempts, 3);
        assert_eq!(config.readiness.interval_ms, 100);
        assert_eq!(config.request_headers["Authorization"], "Bearer test");
        assert!(config.broker.unwrap().token.is_none());
    }

    #[test]
    fn test_validate_rejects_out_of_range_attempts() {
        let mut config = VerifierConfig::default();
        config.readiness.attempts = 0;
        assert!(config.validate().is_err());
        config.readiness.attempts = MAX_READINESS_ATTEMPTS + 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("between 1 and 50"));
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        let config = VerifierConfig {
            provider_base_url: Some("localhost:3000".to_string()),
            ..Default::default()
        };
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("provider_base_url"));
    }

    #[test]
    fn test_broker_resolution() {
        let file = BrokerConfig {
            url: "http://broker.local".to_string(),
            token: Some("secret".to_string()),
        };

        let resolved = BrokerConfig::resolve(None, None, Some(&file)).unwrap();
        assert_eq!(resolved, file);

        let resolved =
            BrokerConfig::resolve(Some("https://other.local".to_string()), None, Some(&file))
                .unwrap();
        assert_eq!(resolved.url, "https://other.local");
        assert_eq!(resolved.token.as_deref(), Some("secret"));

        let resolved = BrokerConfig::resolve(
            Some("http://broker.local".to_string()),
            Some("override".to_string()),
            None,
        )
        .unwrap();
        assert_eq!(resolved.token.as_deref(), Some("override"));

        let err = BrokerConfig::resolve(None, None, None).unwrap_err();
        assert!(err.to_string().contains("--broker-url"));
        assert!(BrokerConfig::resolve(Some("broker.local".to_string()), None, None).is_err());
    }

    #[test]
    fn test_session_config_builder() {
        let config = SessionConfig::new("Car Consumer", "Car Provider")
            .contract_dir("/tmp/pacts")
            .mock_port(0);
        assert_eq!(config.mock_host, "127.0.0.1");
        assert_eq!(config.contract_dir, PathBuf::from("/tmp/pacts"));
    }
}
