//! Session store trait: durable, bounded turn history per conversation.
//!
//! The store maps a conversation to its ordered turns (newest last). Expiry
//! is the store's job; the orchestrator only passes the retention period on
//! every save. Saves overwrite the full history, so two cycles racing on the
//! same conversation resolve as last-write-wins.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::SessionError;
use crate::message::{ConversationId, Turn};

/// Maximum number of turns kept per conversation.
pub const MAX_HISTORY_TURNS: usize = 12;

/// How long an untouched session is retained (7 days).
pub const SESSION_RETENTION: Duration = Duration::from_secs(60 * 60 * 24 * 7);

/// The core SessionStore trait.
///
/// Implementations: in-memory TTL map, SQLite.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The backend name (e.g., "memory", "sqlite").
    fn name(&self) -> &str;

    /// Load the history for a conversation. Missing or expired sessions load
    /// as an empty sequence, never as an error.
    async fn load(&self, id: &ConversationId) -> Result<Vec<Turn>, SessionError>;

    /// Replace the full history for a conversation and reset its expiry.
    async fn save(
        &self,
        id: &ConversationId,
        turns: &[Turn],
        retention: Duration,
    ) -> Result<(), SessionError>;
}

/// Append the completed exchange to `history` and keep only the newest
/// `max_turns` entries, in their original order.
pub fn append_exchange(
    mut history: Vec<Turn>,
    user: Turn,
    assistant: Turn,
    max_turns: usize,
) -> Vec<Turn> {
    history.push(user);
    history.push(assistant);
    if history.len() > max_turns {
        history.drain(..history.len() - max_turns);
    }
    history
}
