//! Memory traits: long-lived snippets retrieved by embedding similarity.
//!
//! `MemoryIndex` is what the orchestrator talks to (embed, query, upsert).
//! `VectorStore` is the physical index behind it; `concierge-memory` wires a
//! provider's embedding endpoint and a vector store into one `MemoryIndex`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

/// Number of matches requested per retrieval in the reference policy.
pub const DEFAULT_TOP_K: usize = 4;

/// A reply must be longer than this (in chars) to be written back.
pub const WRITEBACK_MIN_CHARS: usize = 80;

/// Stored snippets are cut to at most this many chars.
pub const SNIPPET_MAX_CHARS: usize = 500;

/// A single durable memory. Created once, never updated by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Globally unique, generated per write
    pub id: String,

    /// Embedding of `text`
    pub vector: Vec<f32>,

    /// Conversation the memory came from
    pub owner_id: String,

    /// The snippet itself
    pub text: String,
}

/// A ranked retrieval result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMatch {
    pub text: String,
    pub score: f32,
}

/// The memory index used by the orchestrator.
///
/// Implementations: embedding-backed index, no-op (memory disabled).
#[async_trait]
pub trait MemoryIndex: Send + Sync {
    /// The backend name (e.g., "embedding", "none").
    fn name(&self) -> &str;

    /// Embed text. Deterministic for identical input under one model version.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError>;

    /// Return up to `top_k` matches ranked by similarity, highest first.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<MemoryMatch>, MemoryError>;

    /// Best-effort write of a new record.
    async fn upsert(&self, record: MemoryRecord) -> Result<(), MemoryError>;
}

/// The physical vector index behind an embedding-backed `MemoryIndex`.
///
/// Implementations: in-memory, SQLite.
#[async_trait]
pub trait VectorStore: Send + Sync {
    fn name(&self) -> &str;

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<MemoryMatch>, MemoryError>;

    async fn upsert(&self, record: MemoryRecord) -> Result<(), MemoryError>;

    async fn count(&self) -> Result<usize, MemoryError>;
}

/// Cut `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Join matched snippets with newlines, preserving rank order.
pub fn join_snippets(matches: &[MemoryMatch]) -> String {
    matches
        .iter()
        .map(|m| m.text.as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_chars_not_bytes() {
        let text = "é".repeat(10);
        let cut = truncate_chars(&text, 4);
        assert_eq!(cut.chars().count(), 4);
        assert_eq!(cut, "éééé");
    }

    #[test]
    fn truncate_short_text_is_unchanged() {
        assert_eq!(truncate_chars("short", 500), "short");
    }

    #[test]
    fn truncate_at_snippet_limit() {
        let long = "x".repeat(SNIPPET_MAX_CHARS + 37);
        assert_eq!(truncate_chars(&long, SNIPPET_MAX_CHARS).len(), SNIPPET_MAX_CHARS);
    }

    #[test]
    fn join_keeps_rank_order_and_skips_blanks() {
        let matches = vec![
            MemoryMatch { text: "first".into(), score: 0.9 },
            MemoryMatch { text: String::new(), score: 0.8 },
            MemoryMatch { text: "second".into(), score: 0.5 },
        ];
        assert_eq!(join_snippets(&matches), "first\nsecond");
    }

    #[test]
    fn record_serialization() {
        let record = MemoryRecord {
            id: "mem_001".into(),
            vector: vec![0.1, 0.2],
            owner_id: "u1".into(),
            text: "The user prefers window seats".into(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("window seats"));
        assert!(json.contains("owner_id"));
    }
}
