//! In-process session store with per-entry expiry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concierge_core::error::SessionError;
use concierge_core::message::{ConversationId, Turn};
use concierge_core::session::SessionStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

struct Entry {
    turns: Vec<Turn>,
    expires_at: DateTime<Utc>,
}

/// Sessions held in a map keyed by `hist:<conversation id>`.
///
/// Expired entries load as empty and are dropped by `purge_expired`.
pub struct InMemorySessionStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Remove every expired session. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "Purged expired sessions");
        }
        removed
    }

    /// Number of stored sessions, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn expiry_from_now(retention: Duration) -> DateTime<Utc> {
    let retention = chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::MAX);
    Utc::now()
        .checked_add_signed(retention)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self, id: &ConversationId) -> Result<Vec<Turn>, SessionError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&id.session_key())
            .filter(|e| e.expires_at > Utc::now())
            .map(|e| e.turns.clone())
            .unwrap_or_default())
    }

    async fn save(
        &self,
        id: &ConversationId,
        turns: &[Turn],
        retention: Duration,
    ) -> Result<(), SessionError> {
        let entry = Entry {
            turns: turns.to_vec(),
            expires_at: expiry_from_now(retention),
        };
        self.entries.write().await.insert(id.session_key(), entry);
        Ok(())
    }
}
