//! In-memory vector store, useful for testing and single-process deployments.

use async_trait::async_trait;
use concierge_core::error::MemoryError;
use concierge_core::memory::{MemoryMatch, MemoryRecord, VectorStore};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::vector::rank_by_similarity;

/// Stores records in a Vec and ranks them by brute-force cosine similarity.
pub struct InMemoryVectorStore {
    records: Arc<RwLock<Vec<MemoryRecord>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// All records, in insertion order.
    pub async fn records(&self) -> Vec<MemoryRecord> {
        self.records.read().await.clone()
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<MemoryMatch>, MemoryError> {
        let records = self.records.read().await;
        Ok(rank_by_similarity(records.iter(), vector, top_k))
    }

    async fn upsert(&self, record: MemoryRecord) -> Result<(), MemoryError> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        Ok(())
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        Ok(self.records.read().await.len())
    }
}
