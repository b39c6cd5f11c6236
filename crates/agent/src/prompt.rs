//! Prompt composition.
//!
//! The system prompt has a fixed section order: persona, then the tool note
//! (when a tool ran), then the `Memory:` label followed by the retrieved
//! snippets or `(none)`.

use concierge_core::message::Turn;
use concierge_core::tool::ToolNote;

/// Placeholder used when no memory was retrieved.
pub const EMPTY_MEMORY: &str = "(none)";

/// Build the system instruction. Pure and deterministic.
pub fn compose_system_prompt(persona: &str, tool_note: Option<&ToolNote>, memory: &str) -> String {
    let mut prompt = String::with_capacity(persona.len() + memory.len() + 64);
    prompt.push_str(persona);
    prompt.push('\n');

    if let Some(note) = tool_note {
        prompt.push_str(&note.to_string());
        prompt.push('\n');
    }

    prompt.push_str("Memory:\n");
    if memory.trim().is_empty() {
        prompt.push_str(EMPTY_MEMORY);
    } else {
        prompt.push_str(memory);
    }
    prompt
}

/// `[system, ...history, user]`, the exact sequence sent to the model.
pub fn compose_messages(system: String, history: &[Turn], user: &str) -> Vec<Turn> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Turn::system(system));
    messages.extend_from_slice(history);
    messages.push(Turn::user(user));
    messages
}
