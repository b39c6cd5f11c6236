//! Error types for the Concierge domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator has its own error enum; whether a failure is fatal or
//! degrades the cycle is decided by the orchestrator, not here.

use thiserror::Error;

/// The top-level error type for Concierge operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Collaborator errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Session store failures. Always fatal for a cycle.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Stored session is not valid JSON: {0}")]
    Serialization(String),

    #[error("Session store timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

#[derive(Debug, Clone, Error)]
pub enum MemoryError {
    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Memory index timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool returned an unusable response: {0}")]
    InvalidResponse(String),

    #[error("Tool timed out: {tool_name} after {timeout_ms}ms")]
    Timeout { tool_name: String, timeout_ms: u64 },
}
