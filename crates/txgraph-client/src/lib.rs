//! Client for the Transaction Graph API.
//!
//! [`GraphSource`] is the seam between the view and wherever graph payloads
//! come from. [`TransactionGraphClient`] is the HTTP implementation; tests
//! and hosts with their own transport plug in through the same trait.

pub mod loader;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use txgraph_core::GraphQuery;

pub use loader::{LoadOutcome, load_graph};

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Graph API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Graph API returned invalid JSON: {0}")]
    Decode(String),

    #[error("Invalid graph API URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            timeout_ms: 15_000,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }
}

/// Anything that can answer a [`GraphQuery`] with a raw graph payload.
#[async_trait]
pub trait GraphSource: Send + Sync {
    async fn fetch(&self, query: &GraphQuery) -> ClientResult<Value>;
}

#[derive(Clone)]
pub struct TransactionGraphClient {
    config: ClientConfig,
    http: reqwest::Client,
}

impl TransactionGraphClient {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `{base}/graph?address=&chain=&depth=&limit=`
    pub fn graph_url(&self, query: &GraphQuery) -> ClientResult<reqwest::Url> {
        let base = self.config.base_url.trim_end_matches('/');
        let depth = query.depth.to_string();
        let limit = query.limit.to_string();
        reqwest::Url::parse_with_params(
            &format!("{base}/graph"),
            [
                ("address", query.address.as_str()),
                ("chain", query.chain.as_str()),
                ("depth", depth.as_str()),
                ("limit", limit.as_str()),
            ],
        )
        .map_err(|e| ClientError::InvalidUrl(e.to_string()))
    }
}

#[async_trait]
impl GraphSource for TransactionGraphClient {
    async fn fetch(&self, query: &GraphQuery) -> ClientResult<Value> {
        let url = self.graph_url(query)?;
        tracing::debug!("GET {}", url);

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Graph API error {}: {}", status, body);
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_url_carries_every_query_field() {
        let client =
            TransactionGraphClient::new(ClientConfig::new("https://graph.example.com/api/"))
                .unwrap();
        let query = GraphQuery::new("0xAbC", "ethereum").with_depth(3).with_limit(250);

        let url = client.graph_url(&query).unwrap();
        assert_eq!(
            url.as_str(),
            "https://graph.example.com/api/graph?address=0xAbC&chain=ethereum&depth=3&limit=250"
        );
    }

    #[test]
    fn test_query_values_are_encoded() {
        let client = TransactionGraphClient::new(ClientConfig::default()).unwrap();
        let url = client
            .graph_url(&GraphQuery::new("a b&c", "bsc"))
            .unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(pairs[0], ("address".to_string(), "a b&c".to_string()));
        assert_eq!(pairs.len(), 4);
    }

    #[test]
    fn test_bad_base_url_is_reported() {
        let client = TransactionGraphClient::new(ClientConfig::new("not a url")).unwrap();
        let err = client
            .graph_url(&GraphQuery::new("0xA", "ethereum"))
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl(_)));
    }

    #[test]
    fn test_config_defaults_fill_partial_json() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"baseUrl": "http://10.0.0.2:8080"}"#).unwrap();
        assert_eq!(config.base_url, "http://10.0.0.2:8080");
        assert_eq!(config.timeout_ms, 15_000);
        assert_eq!(
            ClientConfig::default()
                .with_timeout(Duration::from_secs(2))
                .timeout_ms,
            2_000
        );
    }

    #[test]
    fn test_status_error_message() {
        let err = ClientError::Status {
            status: 503,
            body: "upstream down".to_string(),
        };
        assert_eq!(err.to_string(), "Graph API returned HTTP 503: upstream down");
    }
}
