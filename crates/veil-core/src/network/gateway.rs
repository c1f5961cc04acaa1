//! HTTP gateway client for the threshold network.
//!
//! Speaks a small JSON protocol: `GET /v1/handshake`, `GET /v1/blockhash` and
//! `POST /v1/encrypt`. Non-2xx responses surface the body as the error message.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{EncryptRequest, EncryptResponse, Handshake, ThresholdNetwork};
use crate::config::{NetworkConfig, NetworkTier};
use crate::error::{PipelineError, PipelineResult};

const SERVICE: &str = "threshold network";

/// Threshold network reached through an HTTP gateway.
pub struct GatewayClient {
    endpoint: String,
    tier: NetworkTier,
    client: Client,
}

#[derive(Deserialize)]
struct BlockhashResponse {
    blockhash: String,
}

/// Error body shape; the gateway relays the provider's short message.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    short_message: Option<String>,
    message: Option<String>,
}

fn remote(message: String, status_code: Option<u16>) -> PipelineError {
    PipelineError::Remote {
        service: SERVICE.to_string(),
        message,
        status_code,
    }
}

impl GatewayClient {
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            tier: config.tier,
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.endpoint, path)
    }

    async fn read<T: DeserializeOwned>(&self, resp: reqwest::Response) -> PipelineResult<T> {
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|b| b.short_message.or(b.message))
                .unwrap_or(text);
            return Err(remote(
                format!("HTTP {status}: {message}"),
                Some(status.as_u16()),
            ));
        }
        resp.json()
            .await
            .map_err(|e| remote(format!("Failed to parse response: {e}"), None))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> PipelineResult<T> {
        let resp = self
            .client
            .get(self.url(path))
            .query(&[("network", self.tier.to_string())])
            .send()
            .await
            .map_err(|e| remote(format!("Request failed: {e}"), None))?;
        self.read(resp).await
    }
}

#[async_trait]
impl ThresholdNetwork for GatewayClient {
    fn name(&self) -> &str {
        "gateway"
    }

    async fn connect(&self) -> PipelineResult<Handshake> {
        let handshake: Handshake = self.get("handshake").await?;
        tracing::debug!(
            "Connected to {} ({} node(s))",
            self.tier,
            handshake.nodes.len()
        );
        Ok(handshake)
    }

    async fn latest_blockhash(&self) -> PipelineResult<String> {
        let resp: BlockhashResponse = self.get("blockhash").await?;
        if resp.blockhash.is_empty() {
            return Err(remote("Empty block hash".to_string(), None));
        }
        Ok(resp.blockhash)
    }

    async fn encrypt(&self, request: &EncryptRequest) -> PipelineResult<EncryptResponse> {
        let resp = self
            .client
            .post(self.url("encrypt"))
            .query(&[("network", self.tier.to_string())])
            .json(request)
            .send()
            .await
            .map_err(|e| remote(format!("Request failed: {e}"), None))?;
        self.read(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_strips_trailing_slash() {
        let config = NetworkConfig {
            endpoint: "https://gateway.example/".to_string(),
            ..NetworkConfig::default()
        };
        let client = GatewayClient::new(&config);
        assert_eq!(client.url("encrypt"), "https://gateway.example/v1/encrypt");
    }

    #[test]
    fn test_error_body_prefers_short_message() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"shortMessage":"quota exceeded","message":"long"}"#).unwrap();
        assert_eq!(body.short_message.or(body.message).unwrap(), "quota exceeded");
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_remote_error() {
        let config = NetworkConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            ..NetworkConfig::default()
        };
        let client = GatewayClient::new(&config);
        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, PipelineError::Remote { .. }));
    }
}
