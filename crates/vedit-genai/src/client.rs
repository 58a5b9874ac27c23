//! HTTP client for the generateContent endpoint.

use std::time::Duration;

use tracing::debug;

use crate::error::{classify_api_error, GenAiError, GenAiResult};
use crate::types::{GenerateRequest, ModelResponse, WireRequest, WireResponse};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Configuration for the model client.
#[derive(Debug, Clone)]
pub struct GenAiConfig {
    /// API key
    pub api_key: String,
    /// Service base URL (overridable for tests)
    pub base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl GenAiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> GenAiResult<Self> {
        Ok(Self {
            api_key: std::env::var("GEMINI_API_KEY")
                .map_err(|_| GenAiError::config_error("GEMINI_API_KEY not set"))?,
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            request_timeout: Duration::from_secs(
                std::env::var("GEMINI_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
        })
    }
}

/// Generative multimodal model client.
#[derive(Clone)]
pub struct GenAiClient {
    config: GenAiConfig,
    client: reqwest::Client,
}

impl GenAiClient {
    /// Create a new client from configuration.
    pub fn new(config: GenAiConfig) -> GenAiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { config, client })
    }

    /// Create from environment variables.
    pub fn from_env() -> GenAiResult<Self> {
        Self::new(GenAiConfig::from_env()?)
    }

    /// Issue one generateContent call and decode the first candidate.
    pub async fn generate(&self, request: &GenerateRequest) -> GenAiResult<ModelResponse> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.base_url, request.model, self.config.api_key
        );
        debug!(model = %request.model, contents = request.contents.len(), "Calling model");

        let wire = WireRequest::from(request);
        let response = self.client.post(&url).json(&wire).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_api_error(status, &body));
        }

        let wire_response: WireResponse = response
            .json()
            .await
            .map_err(|e| GenAiError::invalid_response(format!("undecodable reply: {}", e)))?;

        ModelResponse::try_from(wire_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GenAiClient {
        GenAiClient::new(GenAiConfig {
            api_key: "test-key".to_string(),
            base_url: server.uri(),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_generate_decodes_text_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/test-model:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "[{\"imageIndex\":0,\"imagePrompt\":\"p\"}]"}]}}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = GenerateRequest::new("test-model");
        let response = client.generate(&request).await.unwrap();
        assert!(response.text().contains("imageIndex"));
    }

    #[tokio::test]
    async fn test_generate_classifies_429_as_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .generate(&GenerateRequest::new("test-model"))
            .await
            .unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn test_generate_surfaces_other_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad schema"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .generate(&GenerateRequest::new("test-model"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenAiError::Api { status: 400, .. }));
    }
}
