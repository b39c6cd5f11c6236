//! Session store implementations.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::sync::Arc;

use concierge_core::error::SessionError;
use concierge_core::session::SessionStore;

pub use in_memory::InMemorySessionStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSessionStore;

/// Open the session store named by `backend` ("memory" or "sqlite").
///
/// The SQLite backend needs a database path; `":memory:"` is accepted.
pub async fn open_session_store(
    backend: &str,
    path: Option<&str>,
) -> Result<Arc<dyn SessionStore>, SessionError> {
    match backend {
        "memory" => Ok(Arc::new(InMemorySessionStore::new())),
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = path.ok_or_else(|| {
                SessionError::Storage("session.path is required for the sqlite backend".into())
            })?;
            Ok(Arc::new(SqliteSessionStore::new(path).await?))
        }
        other => {
            let _ = path;
            Err(SessionError::Storage(format!(
                "Unknown session backend: {other}"
            )))
        }
    }
}
