//! Per-step outcomes for the optional stages of a cycle.
//!
//! An optional step never fails the cycle. It either produces its value or
//! degrades to a declared substitute, and the substitute is what flows into
//! the next step.

use std::fmt;

/// The optional stages of a conversation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    MemoryRetrieval,
    ToolInvocation,
    ModelInference,
    MemoryWriteback,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MemoryRetrieval => "memory_retrieval",
            Self::ToolInvocation => "tool_invocation",
            Self::ModelInference => "model_inference",
            Self::MemoryWriteback => "memory_writeback",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded degradation: which step fell back and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Degradation {
    pub step: Step,
    pub reason: String,
}

/// Result of an optional step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome<T> {
    Ready(T),
    Degraded { value: T, reason: String },
}

impl<T> StepOutcome<T> {
    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Self::Degraded {
            value,
            reason: reason.into(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Ready(value) | Self::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Ready(value) | Self::Degraded { value, .. } => value,
        }
    }

    /// Separate the value from its degradation record, if any.
    pub fn split(self, step: Step) -> (T, Option<Degradation>) {
        match self {
            Self::Ready(value) => (value, None),
            Self::Degraded { value, reason } => (value, Some(Degradation { step, reason })),
        }
    }
}
