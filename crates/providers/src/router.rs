//! Provider selection from configuration.

use std::sync::Arc;

use concierge_config::AppConfig;
use concierge_core::provider::Provider;

use crate::openai_compat::OpenAiCompatProvider;
use crate::workers_ai::WorkersAiProvider;

/// Build the configured provider. The same handle serves text generation and
/// embeddings; the model names come from `llm.model` / `llm.embedding_model`.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn Provider> {
    let llm = &config.llm;
    let api_key = llm.api_key.clone().unwrap_or_default();

    if llm.provider == "workers-ai" {
        let mut provider =
            WorkersAiProvider::new(llm.account_id.clone().unwrap_or_default(), api_key);
        if let Some(url) = &llm.api_url {
            provider = provider.with_base_url(url);
        }
        return Arc::new(provider);
    }

    let base_url = llm
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(&llm.provider));
    Arc::new(OpenAiCompatProvider::new(&llm.provider, base_url, api_key))
}

/// Get the default base URL for well-known OpenAI-compatible providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
