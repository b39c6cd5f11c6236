//! No-op memory index, used when memory is disabled.

use async_trait::async_trait;
use concierge_core::error::MemoryError;
use concierge_core::memory::{MemoryIndex, MemoryMatch, MemoryRecord};

/// Embeds to an empty vector, never matches, and drops writes.
pub struct NoopMemoryIndex;

#[async_trait]
impl MemoryIndex for NoopMemoryIndex {
    fn name(&self) -> &str {
        "none"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, MemoryError> {
        Ok(Vec::new())
    }

    async fn query(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<MemoryMatch>, MemoryError> {
        Ok(Vec::new())
    }

    async fn upsert(&self, _record: MemoryRecord) -> Result<(), MemoryError> {
        Ok(())
    }
}
