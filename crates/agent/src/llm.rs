//! Never-failing model client.
//!
//! `generate` always yields text. Provider errors, timeouts and empty
//! completions degrade to `FALLBACK_REPLY`.

use concierge_config::AppConfig;
use concierge_core::message::Turn;
use concierge_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::outcome::StepOutcome;

/// Returned in place of a model reply when the call fails.
pub const FALLBACK_REPLY: &str = "Hi! (Fallback reply) The language model call failed, so real \
generation is not available yet. Check the model credentials and try again.";

pub struct LlmClient {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl LlmClient {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self::new(provider, &config.llm.model)
            .with_temperature(config.llm.temperature)
            .with_max_tokens(config.llm.max_tokens)
            .with_timeout(Duration::from_millis(config.timeouts.llm_ms))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Generate a reply for `[system, ...history, user]`.
    pub async fn generate(&self, messages: Vec<Turn>) -> StepOutcome<String> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        match tokio::time::timeout(self.timeout, self.provider.complete(request)).await {
            Ok(Ok(response)) if !response.content.trim().is_empty() => {
                debug!(
                    model = %response.model,
                    reply_len = response.content.len(),
                    "Model replied"
                );
                StepOutcome::Ready(response.content)
            }
            Ok(Ok(_)) => StepOutcome::degraded(FALLBACK_REPLY.to_string(), "empty completion"),
            Ok(Err(e)) => StepOutcome::degraded(FALLBACK_REPLY.to_string(), e.to_string()),
            Err(_) => StepOutcome::degraded(
                FALLBACK_REPLY.to_string(),
                format!("model call timed out after {}ms", self.timeout.as_millis()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use concierge_core::error::ProviderError;
    use concierge_core::provider::ProviderResponse;

    struct FixedProvider(Result<String, ProviderError>);

    #[async_trait]
    impl Provider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            self.0.clone().map(|content| ProviderResponse {
                content,
                model: request.model,
                usage: None,
            })
        }
    }

    struct StalledProvider;

    #[async_trait]
    impl Provider for StalledProvider {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(ProviderError::Timeout("stalled".into()))
        }
    }

    fn client(provider: impl Provider + 'static) -> LlmClient {
        LlmClient::new(Arc::new(provider), "test-model")
    }

    #[tokio::test]
    async fn passes_reply_through() {
        let outcome = client(FixedProvider(Ok("Hello!".into())))
            .generate(vec![Turn::user("Hi")])
            .await;
        assert_eq!(outcome, StepOutcome::Ready("Hello!".to_string()));
    }

    #[tokio::test]
    async fn auth_failure_yields_fallback() {
        let outcome = client(FixedProvider(Err(ProviderError::AuthenticationFailed(
            "bad key".into(),
        ))))
        .generate(vec![Turn::user("Hi")])
        .await;
        assert!(outcome.is_degraded());
        assert_eq!(outcome.into_value(), FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn empty_completion_yields_fallback() {
        let outcome = client(FixedProvider(Ok("  ".into())))
            .generate(vec![Turn::user("Hi")])
            .await;
        assert_eq!(outcome.into_value(), FALLBACK_REPLY);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_yields_fallback() {
        let outcome = client(StalledProvider)
            .with_timeout(Duration::from_millis(50))
            .generate(vec![Turn::user("Hi")])
            .await;
        match outcome {
            StepOutcome::Degraded { value, reason } => {
                assert_eq!(value, FALLBACK_REPLY);
                assert!(reason.contains("timed out"));
            }
            other => panic!("expected degraded outcome, got {other:?}"),
        }
    }

    #[test]
    fn fallback_mentions_failure() {
        assert!(FALLBACK_REPLY.contains("failed"));
        assert!(FALLBACK_REPLY.chars().count() > 80);
    }
}
