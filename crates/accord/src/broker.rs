//! Publishing contracts to a contract broker.

use crate::contract::ContractArtifact;
use crate::error::ContractError;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// HTTP client for a pact-style broker.
pub struct BrokerClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl BrokerClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, ContractError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            client,
        })
    }

    /// `{broker}/pacts/provider/{provider}/consumer/{consumer}/version/{version}`
    pub fn contract_url(&self, artifact: &ContractArtifact, version: &str) -> String {
        format!(
            "{}/pacts/provider/{}/consumer/{}/version/{}",
            self.base_url,
            urlencoding::encode(&artifact.provider.name),
            urlencoding::encode(&artifact.consumer.name),
            urlencoding::encode(version)
        )
    }

    /// `{broker}/pacticipants/{consumer}/versions/{version}/tags/{tag}`
    pub fn tag_url(&self, consumer: &str, version: &str, tag: &str) -> String {
        format!(
            "{}/pacticipants/{}/versions/{}/tags/{}",
            self.base_url,
            urlencoding::encode(consumer),
            urlencoding::encode(version),
            urlencoding::encode(tag)
        )
    }

    /// Upload the artifact under `version`, then apply each tag to that
    /// consumer version.
    pub async fn publish(
        &self,
        artifact: &ContractArtifact,
        version: &str,
        tags: &[String],
    ) -> Result<(), ContractError> {
        let url = self.contract_url(artifact, version);
        self.put(&url, Some(artifact.to_json()?)).await?;
        info!(
            "Published {} -> {} version {} to {}",
            artifact.consumer.name, artifact.provider.name, version, self.base_url
        );

        for tag in tags {
            let url = self.tag_url(&artifact.consumer.name, version, tag);
            self.put(&url, None).await?;
            debug!("Tagged {} version {} as '{}'", artifact.consumer.name, version, tag);
        }
        Ok(())
    }

    async fn put(&self, url: &str, body: Option<String>) -> Result<(), ContractError> {
        let mut request = self
            .client
            .put(url)
            .header("Content-Type", "application/json");
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(ContractError::Broker {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_are_encoded() {
        let client = BrokerClient::new("http://broker.local/", None).unwrap();
        let artifact = ContractArtifact::new("Car Consumer", "Car Provider", Vec::new());
        assert_eq!(
            client.contract_url(&artifact, "1.0.0"),
            "http://broker.local/pacts/provider/Car%20Provider/consumer/Car%20Consumer/version/1.0.0"
        );
        assert_eq!(
            client.tag_url("Car Consumer", "1.0.0", "main"),
            "http://broker.local/pacticipants/Car%20Consumer/versions/1.0.0/tags/main"
        );
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let client = BrokerClient::new("http://broker.local", Some(String::new())).unwrap();
        assert!(client.token.is_none());
    }
}
