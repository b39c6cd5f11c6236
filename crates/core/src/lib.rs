//! # Concierge Core
//!
//! Domain types, collaborator traits, and error definitions for the Concierge
//! chat service. This crate has **zero framework dependencies**: it defines the
//! model that the stores, providers, tools and the orchestrator implement
//! against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (session store, memory index, tool, model) is a
//! trait here. Implementations live in their respective crates and are injected
//! into the orchestrator at construction time. This enables:
//! - Swapping implementations via configuration
//! - Testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod memory;
pub mod message;
pub mod provider;
pub mod session;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, MemoryError, ProviderError, Result, SessionError, ToolError};
pub use memory::{MemoryIndex, MemoryMatch, MemoryRecord, VectorStore};
pub use message::{ChatRequest, ChatResponse, ConversationId, Role, Turn};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use session::SessionStore;
pub use tool::{ToolInvoker, ToolNote};
