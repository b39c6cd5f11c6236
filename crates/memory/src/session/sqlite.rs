//! SQLite session store.
//!
//! One row per conversation: the key, the full turn history as JSON and the
//! expiry as epoch milliseconds. Saves replace the whole row.

use async_trait::async_trait;
use chrono::Utc;
use concierge_core::error::SessionError;
use concierge_core::message::{ConversationId, Turn};
use concierge_core::session::SessionStore;
use sqlx::{Row, SqlitePool};
use std::time::Duration;
use tracing::{debug, info};

use super::in_memory::expiry_from_now;

pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Open (or create) the session database at `path`.
    pub async fn new(path: &str) -> Result<Self, SessionError> {
        let pool = crate::sqlite::connect(path)
            .await
            .map_err(|e| SessionError::Storage(format!("Failed to open SQLite: {e}")))?;
        let store = Self::from_pool(pool).await?;
        info!("SQLite session store initialized at {path}");
        Ok(store)
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, SessionError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                key         TEXT PRIMARY KEY NOT NULL,
                turns       TEXT NOT NULL,
                expires_at  INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| SessionError::Storage(format!("sessions table: {e}")))?;

        Ok(Self { pool })
    }

    /// Delete every expired session. Returns how many rows were removed.
    pub async fn purge_expired(&self) -> Result<u64, SessionError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?1")
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| SessionError::Storage(e.to_string()))?;

        let removed = result.rows_affected();
        if removed > 0 {
            debug!(removed, "Purged expired sessions");
        }
        Ok(removed)
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn load(&self, id: &ConversationId) -> Result<Vec<Turn>, SessionError> {
        let row = sqlx::query("SELECT turns FROM sessions WHERE key = ?1 AND expires_at > ?2")
            .bind(id.session_key())
            .bind(Utc::now().timestamp_millis())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SessionError::Storage(e.to_string()))?;

        match row {
            Some(row) => {
                let raw: String = row.get("turns");
                serde_json::from_str(&raw).map_err(|e| SessionError::Serialization(e.to_string()))
            }
            None => Ok(Vec::new()),
        }
    }

    async fn save(
        &self,
        id: &ConversationId,
        turns: &[Turn],
        retention: Duration,
    ) -> Result<(), SessionError> {
        let raw =
            serde_json::to_string(turns).map_err(|e| SessionError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO sessions (key, turns, expires_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                turns = excluded.turns,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(id.session_key())
        .bind(raw)
        .bind(expiry_from_now(retention).timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::Storage(e.to_string()))?;

        Ok(())
    }
}
