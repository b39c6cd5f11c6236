//! Conversation cycle for Concierge.
//!
//! The [`ConversationOrchestrator`] answers one chat request by combining
//! bounded session history, similarity-retrieved memory and an optional tool
//! note into a single prompt, calling the model, then persisting history and
//! writing back a memory snippet.

pub mod llm;
pub mod orchestrator;
pub mod outcome;
pub mod prompt;
pub mod wiring;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use llm::{FALLBACK_REPLY, LlmClient};
pub use orchestrator::{ConversationOrchestrator, Cycle, CycleError, CyclePolicy};
pub use outcome::{Degradation, Step, StepOutcome};
pub use prompt::{EMPTY_MEMORY, compose_messages, compose_system_prompt};
pub use wiring::{build_orchestrator, build_orchestrator_with_provider};
