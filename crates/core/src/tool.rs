//! Tool invoker trait: keyword-triggered lookup against one external source.
//!
//! At most one tool runs per cycle and tools never chain. The invoker decides
//! whether a message triggers it; the orchestrator decides what a failure
//! means (the note is simply omitted).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ToolError;

/// Keywords that trigger the weather lookup.
pub const WEATHER_KEYWORDS: [&str; 3] = ["weather", "forecast", "temperature"];

/// The one-line output of a tool, placed in the system prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolNote {
    /// Tool that produced the note (e.g., "weather")
    pub tool: String,

    /// Single-line summary
    pub summary: String,
}

impl fmt::Display for ToolNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tool ({}): {}", self.tool, self.summary)
    }
}

/// The core ToolInvoker trait.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// The tool name (e.g., "weather").
    fn name(&self) -> &str;

    /// Whether this message should run the tool.
    fn is_triggered(&self, message: &str) -> bool;

    /// Run the tool for this message and summarize the result.
    async fn invoke(&self, message: &str) -> Result<ToolNote, ToolError>;
}

/// Case-insensitive substring match of `message` against `keywords`.
pub fn matches_keywords<S: AsRef<str>>(message: &str, keywords: &[S]) -> bool {
    let lower = message.to_lowercase();
    keywords
        .iter()
        .any(|k| !k.as_ref().is_empty() && lower.contains(&k.as_ref().to_lowercase()))
}
