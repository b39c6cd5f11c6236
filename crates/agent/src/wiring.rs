//! Build a ready-to-run orchestrator from configuration.

use concierge_config::AppConfig;
use concierge_core::memory::MemoryIndex;
use concierge_core::provider::Provider;
use concierge_memory::{EmbeddingMemoryIndex, NoopMemoryIndex, open_session_store, open_vector_store};
use concierge_tools::WeatherInvoker;
use std::sync::Arc;
use tracing::info;

use crate::llm::LlmClient;
use crate::orchestrator::{ConversationOrchestrator, CyclePolicy};

/// Wire stores, memory, tool and the configured provider.
pub async fn build_orchestrator(
    config: &AppConfig,
) -> Result<ConversationOrchestrator, concierge_core::Error> {
    let provider = concierge_providers::build_from_config(config);
    build_orchestrator_with_provider(config, provider).await
}

/// Same as [`build_orchestrator`] with an explicit provider (used by tests).
pub async fn build_orchestrator_with_provider(
    config: &AppConfig,
    provider: Arc<dyn Provider>,
) -> Result<ConversationOrchestrator, concierge_core::Error> {
    let sessions =
        open_session_store(&config.session.backend, config.session.path.as_deref()).await?;

    let memory: Arc<dyn MemoryIndex> = if config.memory.enabled && config.memory.backend != "none"
    {
        let store = open_vector_store(&config.memory.backend, config.memory.path.as_deref()).await?;
        Arc::new(EmbeddingMemoryIndex::new(
            Arc::clone(&provider),
            &config.llm.embedding_model,
            store,
        ))
    } else {
        Arc::new(NoopMemoryIndex)
    };

    info!(
        provider = %provider.name(),
        model = %config.llm.model,
        sessions = %sessions.name(),
        memory = %memory.name(),
        tool = config.tool.enabled,
        "Orchestrator wired"
    );

    let llm = LlmClient::from_config(provider, config);
    let mut orchestrator = ConversationOrchestrator::new(sessions, memory, llm)
        .with_policy(CyclePolicy::from_config(config));

    if config.tool.enabled {
        let weather = WeatherInvoker::new(&config.tool.location)
            .with_base_url(&config.tool.base_url)
            .with_keywords(config.tool.keywords.clone());
        orchestrator = orchestrator.with_tool(Arc::new(weather));
    }

    Ok(orchestrator)
}
