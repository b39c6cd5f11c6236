//! Turn and conversation domain types.
//!
//! These are the value objects that flow through one request/response cycle:
//! a `ChatRequest` comes in, history is loaded as `Turn`s, the model sees
//! `[system, ...history, user]`, and a `ChatResponse` goes out.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a conversation (the caller's `userId`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage key for this conversation's history: `hist:<userId>`.
    pub fn session_key(&self) -> String {
        format!("hist:{}", self.0)
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a turn's speaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (persona, tool note, memory)
    System,
    /// The end user
    User,
    /// The model
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message in a conversation.
///
/// Fields are private: a turn never changes after it is created. The JSON
/// form is `{"role": "...", "content": "..."}`, which is exactly what the
/// session store persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// An incoming chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub user_id: ConversationId,
    pub message: String,
}

impl ChatRequest {
    pub fn new(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id: ConversationId(user_id.into()),
            message: message.into(),
        }
    }

    /// The message with surrounding whitespace removed, or `None` if nothing is left.
    pub fn trimmed_message(&self) -> Option<&str> {
        let trimmed = self.message.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// The reply sent back to the caller. Always populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}
