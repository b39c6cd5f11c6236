//! Session stores and similarity memory for Concierge.

pub mod in_memory;
pub mod index;
pub mod noop;
pub mod session;
pub mod vector;

#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::sync::Arc;

use concierge_core::error::MemoryError;
use concierge_core::memory::VectorStore;

pub use in_memory::InMemoryVectorStore;
pub use index::EmbeddingMemoryIndex;
pub use noop::NoopMemoryIndex;
pub use session::{InMemorySessionStore, open_session_store};
pub use vector::{cosine_similarity, rank_by_similarity};

#[cfg(feature = "sqlite")]
pub use session::SqliteSessionStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteVectorStore;

/// Open the vector store named by `backend` ("memory" or "sqlite").
pub async fn open_vector_store(
    backend: &str,
    path: Option<&str>,
) -> Result<Arc<dyn VectorStore>, MemoryError> {
    match backend {
        "memory" => Ok(Arc::new(InMemoryVectorStore::new())),
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = path.ok_or_else(|| {
                MemoryError::Storage("memory.path is required for the sqlite backend".into())
            })?;
            Ok(Arc::new(SqliteVectorStore::new(path).await?))
        }
        other => {
            let _ = path;
            Err(MemoryError::Storage(format!(
                "Unknown memory backend: {other}"
            )))
        }
    }
}
