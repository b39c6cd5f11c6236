//! Embedding-backed memory index.
//!
//! Text goes through the provider's embedding endpoint; vectors are stored
//! and ranked by a `VectorStore`.

use async_trait::async_trait;
use concierge_core::error::MemoryError;
use concierge_core::memory::{MemoryIndex, MemoryMatch, MemoryRecord, VectorStore};
use concierge_core::provider::Provider;
use std::sync::Arc;
use tracing::debug;

pub struct EmbeddingMemoryIndex {
    provider: Arc<dyn Provider>,
    model: String,
    store: Arc<dyn VectorStore>,
}

impl EmbeddingMemoryIndex {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }
}

#[async_trait]
impl MemoryIndex for EmbeddingMemoryIndex {
    fn name(&self) -> &str {
        "embedding"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let vector = self
            .provider
            .embed(&self.model, text)
            .await
            .map_err(|e| MemoryError::EmbeddingFailed(e.to_string()))?;
        if vector.is_empty() {
            return Err(MemoryError::EmbeddingFailed(
                "provider returned an empty vector".into(),
            ));
        }
        debug!(model = %self.model, dims = vector.len(), "Embedded text");
        Ok(vector)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<MemoryMatch>, MemoryError> {
        self.store.query(vector, top_k).await
    }

    async fn upsert(&self, record: MemoryRecord) -> Result<(), MemoryError> {
        self.store.upsert(record).await
    }
}
