//! Cloudflare Workers AI provider, via the REST `ai/run` endpoint.
//!
//! Chat models take `{"messages": [...]}` and answer in `result.response`
//! (some models use `result.text`). Embedding models take `{"text": ...}` and
//! answer with `result.data`, one vector per input.

use async_trait::async_trait;
use concierge_core::error::ProviderError;
use concierge_core::provider::{Provider, ProviderRequest, ProviderResponse};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

pub struct WorkersAiProvider {
    base_url: String,
    account_id: String,
    api_token: String,
    client: reqwest::Client,
}

impl WorkersAiProvider {
    pub fn new(account_id: impl Into<String>, api_token: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Workers AI HTTP client build failed; using defaults");
                reqwest::Client::default()
            });

        Self {
            base_url: DEFAULT_BASE_URL.into(),
            account_id: account_id.into(),
            api_token: api_token.into(),
            client,
        }
    }

    /// Override the API base URL (for gateways or tests).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn run_url(&self, model: &str) -> String {
        format!(
            "{}/accounts/{}/ai/run/{}",
            self.base_url, self.account_id, model
        )
    }

    async fn run<T: DeserializeOwned>(
        &self,
        model: &str,
        body: serde_json::Value,
    ) -> Result<T, ProviderError> {
        if self.account_id.is_empty() {
            return Err(ProviderError::NotConfigured(
                "Workers AI requires llm.account_id".into(),
            ));
        }

        let response = self
            .client
            .post(self.run_url(model))
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Workers AI rejected the API token".into(),
            ));
        }
        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }
        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Workers AI returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let envelope: Envelope<T> = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: status,
            message: format!("Failed to parse Workers AI response: {e}"),
        })?;

        envelope.result.ok_or_else(|| ProviderError::ApiError {
            status_code: status,
            message: "Workers AI response has no result".into(),
        })
    }
}

#[async_trait]
impl Provider for WorkersAiProvider {
    fn name(&self) -> &str {
        "workers-ai"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|t| serde_json::json!({ "role": t.role().as_str(), "content": t.content() }))
            .collect();

        let mut body = serde_json::json!({
            "messages": messages,
            "temperature": request.temperature,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        debug!(model = %request.model, "Sending Workers AI chat request");
        let result: ChatResult = self.run(&request.model, body).await?;

        Ok(ProviderResponse {
            content: result.into_text(),
            model: request.model,
            usage: None,
        })
    }

    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, ProviderError> {
        debug!(model = %model, "Sending Workers AI embedding request");
        let result: EmbeddingResult = self.run(model, serde_json::json!({ "text": text })).await?;

        result
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "Workers AI returned no embedding".into(),
            })
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ChatResult {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl ChatResult {
    fn into_text(self) -> String {
        self.response
            .filter(|r| !r.is_empty())
            .or(self.text)
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResult {
    data: Vec<Vec<f32>>,
}
