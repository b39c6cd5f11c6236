//! The conversation cycle.
//!
//! One request runs validate, load history, retrieve memory and invoke the
//! tool (concurrently), compose, generate, persist history, then write back a
//! memory snippet on a detached task. Only validation and session store
//! failures abort a cycle; every other step degrades.

use concierge_config::AppConfig;
use concierge_core::error::{MemoryError, SessionError, ToolError};
use concierge_core::memory::{
    DEFAULT_TOP_K, MemoryIndex, MemoryRecord, SNIPPET_MAX_CHARS, WRITEBACK_MIN_CHARS,
    join_snippets, truncate_chars,
};
use concierge_core::message::{ChatRequest, ChatResponse, ConversationId, Turn};
use concierge_core::session::{MAX_HISTORY_TURNS, SESSION_RETENTION, SessionStore, append_exchange};
use concierge_core::tool::{ToolInvoker, ToolNote};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::llm::LlmClient;
use crate::outcome::{Degradation, Step, StepOutcome};
use crate::prompt::{compose_messages, compose_system_prompt};

/// Why a cycle produced no reply.
#[derive(Debug, Error)]
pub enum CycleError {
    /// Bad request; nothing was read or written.
    #[error("{0}")]
    Validation(String),

    /// Session history could not be loaded or saved.
    #[error("Session store failure: {0}")]
    Store(#[from] SessionError),

    /// The caller went away before the model replied; nothing was persisted.
    #[error("Cycle cancelled before the model replied")]
    Cancelled,
}

/// Limits and timeouts applied to every cycle.
#[derive(Debug, Clone)]
pub struct CyclePolicy {
    pub persona: String,
    pub max_turns: usize,
    pub retention: Duration,
    pub top_k: usize,
    pub writeback_min_chars: usize,
    pub snippet_max_chars: usize,
    pub session_timeout: Duration,
    pub memory_timeout: Duration,
    pub tool_timeout: Duration,
}

impl Default for CyclePolicy {
    fn default() -> Self {
        Self {
            persona: concierge_config::DEFAULT_PERSONA.into(),
            max_turns: MAX_HISTORY_TURNS,
            retention: SESSION_RETENTION,
            top_k: DEFAULT_TOP_K,
            writeback_min_chars: WRITEBACK_MIN_CHARS,
            snippet_max_chars: SNIPPET_MAX_CHARS,
            session_timeout: Duration::from_secs(2),
            memory_timeout: Duration::from_secs(3),
            tool_timeout: Duration::from_secs(3),
        }
    }
}

impl CyclePolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            persona: config.persona.clone(),
            max_turns: config.session.max_turns,
            retention: config.session.retention(),
            top_k: config.memory.top_k,
            writeback_min_chars: config.memory.writeback_min_chars,
            snippet_max_chars: config.memory.snippet_max_chars,
            session_timeout: Duration::from_millis(config.timeouts.session_ms),
            memory_timeout: Duration::from_millis(config.timeouts.memory_ms),
            tool_timeout: Duration::from_millis(config.timeouts.tool_ms),
        }
    }
}

/// Everything a completed cycle produced.
#[derive(Debug)]
pub struct Cycle {
    /// The reply returned to the caller
    pub reply: String,

    /// The exact messages sent to the model: `[system, ...history, user]`
    pub prompt: Vec<Turn>,

    /// History as persisted after this cycle
    pub history: Vec<Turn>,

    /// Optional steps that fell back to their substitute value
    pub degradations: Vec<Degradation>,

    /// Detached memory write-back, present only when the reply qualified
    pub writeback: Option<JoinHandle<()>>,
}

impl Cycle {
    pub fn degraded(&self, step: Step) -> bool {
        self.degradations.iter().any(|d| d.step == step)
    }
}

/// Intermediate state of a cycle once the model has replied.
struct Generated {
    history: Vec<Turn>,
    prompt: Vec<Turn>,
    reply: String,
    degradations: Vec<Degradation>,
}

/// Runs conversation cycles against injected collaborators.
pub struct ConversationOrchestrator {
    sessions: Arc<dyn SessionStore>,
    memory: Arc<dyn MemoryIndex>,
    tool: Option<Arc<dyn ToolInvoker>>,
    llm: LlmClient,
    policy: CyclePolicy,
}

impl ConversationOrchestrator {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        memory: Arc<dyn MemoryIndex>,
        llm: LlmClient,
    ) -> Self {
        Self {
            sessions,
            memory,
            tool: None,
            llm,
            policy: CyclePolicy::default(),
        }
    }

    pub fn with_tool(mut self, tool: Arc<dyn ToolInvoker>) -> Self {
        self.tool = Some(tool);
        self
    }

    pub fn with_policy(mut self, policy: CyclePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &CyclePolicy {
        &self.policy
    }

    pub fn llm(&self) -> &LlmClient {
        &self.llm
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Run one cycle and return just the reply.
    pub async fn handle(&self, request: &ChatRequest) -> Result<ChatResponse, CycleError> {
        let cycle = self.run_cycle(request).await?;
        Ok(ChatResponse { reply: cycle.reply })
    }

    pub async fn run_cycle(&self, request: &ChatRequest) -> Result<Cycle, CycleError> {
        self.run_cycle_cancellable(request, &CancellationToken::new())
            .await
    }

    /// Run one cycle. If `cancel` fires before the model replies, the cycle
    /// stops with `CycleError::Cancelled` and persists nothing.
    pub async fn run_cycle_cancellable(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<Cycle, CycleError> {
        if request.trimmed_message().is_none() {
            return Err(CycleError::Validation("message required".into()));
        }

        let user_id = &request.user_id;
        info!(user_id = %user_id, "Starting conversation cycle");

        let generated = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.generate(request) => Some(result),
        };
        let Some(generated) = generated else {
            info!(user_id = %user_id, "Cycle cancelled before the model replied");
            return Err(CycleError::Cancelled);
        };
        let Generated {
            history,
            prompt,
            reply,
            degradations,
        } = generated?;

        let history = append_exchange(
            history,
            Turn::user(&request.message),
            Turn::assistant(&reply),
            self.policy.max_turns,
        );
        self.save_history(user_id, &history).await?;

        let writeback = self.spawn_writeback(user_id, &reply);

        info!(
            user_id = %user_id,
            turns = history.len(),
            reply_len = reply.chars().count(),
            degraded = degradations.len(),
            "Conversation cycle complete"
        );

        Ok(Cycle {
            reply,
            prompt,
            history,
            degradations,
            writeback,
        })
    }

    /// Load history, gather context, compose and call the model.
    async fn generate(&self, request: &ChatRequest) -> Result<Generated, CycleError> {
        let message = request.message.as_str();
        let history = self.load_history(&request.user_id).await?;
        debug!(user_id = %request.user_id, turns = history.len(), "Loaded history");

        let (memory, tool_note) =
            tokio::join!(self.retrieve_memory(message), self.invoke_tool(message));

        let mut degradations = Vec::new();
        let memory = record(memory, Step::MemoryRetrieval, &mut degradations);
        let tool_note = record(tool_note, Step::ToolInvocation, &mut degradations);

        let system = compose_system_prompt(&self.policy.persona, tool_note.as_ref(), &memory);
        let prompt = compose_messages(system, &history, message);

        let reply = self.llm.generate(prompt.clone()).await;
        let reply = record(reply, Step::ModelInference, &mut degradations);

        Ok(Generated {
            history,
            prompt,
            reply,
            degradations,
        })
    }

    async fn load_history(&self, id: &ConversationId) -> Result<Vec<Turn>, SessionError> {
        let timeout_ms = self.policy.session_timeout.as_millis() as u64;
        let result = tokio::time::timeout(self.policy.session_timeout, self.sessions.load(id))
            .await
            .unwrap_or(Err(SessionError::Timeout { timeout_ms }));
        if let Err(e) = &result {
            error!(user_id = %id, error = %e, "Failed to load session history");
        }
        result
    }

    async fn save_history(&self, id: &ConversationId, turns: &[Turn]) -> Result<(), SessionError> {
        let timeout_ms = self.policy.session_timeout.as_millis() as u64;
        let save = self.sessions.save(id, turns, self.policy.retention);
        let result = tokio::time::timeout(self.policy.session_timeout, save)
            .await
            .unwrap_or(Err(SessionError::Timeout { timeout_ms }));
        if let Err(e) = &result {
            error!(user_id = %id, error = %e, "Failed to save session history");
        }
        result
    }

    /// Embed the message and join the ranked snippets. Empty on any failure.
    async fn retrieve_memory(&self, message: &str) -> StepOutcome<String> {
        let timeout_ms = self.policy.memory_timeout.as_millis() as u64;
        let lookup = async {
            let vector = self.memory.embed(message).await?;
            self.memory.query(&vector, self.policy.top_k).await
        };

        match tokio::time::timeout(self.policy.memory_timeout, lookup)
            .await
            .unwrap_or(Err(MemoryError::Timeout { timeout_ms }))
        {
            Ok(matches) => {
                debug!(matches = matches.len(), "Retrieved memory");
                StepOutcome::Ready(join_snippets(&matches))
            }
            Err(e) => StepOutcome::degraded(String::new(), e.to_string()),
        }
    }

    /// Run the tool when the message triggers it. No note on any failure.
    async fn invoke_tool(&self, message: &str) -> StepOutcome<Option<ToolNote>> {
        let Some(tool) = &self.tool else {
            return StepOutcome::Ready(None);
        };
        if !tool.is_triggered(message) {
            return StepOutcome::Ready(None);
        }

        let timeout_ms = self.policy.tool_timeout.as_millis() as u64;
        match tokio::time::timeout(self.policy.tool_timeout, tool.invoke(message))
            .await
            .unwrap_or_else(|_| {
                Err(ToolError::Timeout {
                    tool_name: tool.name().to_string(),
                    timeout_ms,
                })
            }) {
            Ok(note) => {
                debug!(tool = %note.tool, "Tool produced a note");
                StepOutcome::Ready(Some(note))
            }
            Err(e) => StepOutcome::degraded(None, e.to_string()),
        }
    }

    /// Spawn the memory write-back if the reply is long enough.
    fn spawn_writeback(&self, owner: &ConversationId, reply: &str) -> Option<JoinHandle<()>> {
        if reply.chars().count() <= self.policy.writeback_min_chars {
            return None;
        }

        let memory = Arc::clone(&self.memory);
        let text = truncate_chars(reply, self.policy.snippet_max_chars);
        let owner_id = owner.as_str().to_string();
        let limit = self.policy.memory_timeout;

        Some(tokio::spawn(async move {
            let timeout_ms = limit.as_millis() as u64;
            let write = async {
                let vector = memory.embed(&text).await?;
                let record = MemoryRecord {
                    id: Uuid::new_v4().to_string(),
                    vector,
                    owner_id: owner_id.clone(),
                    text,
                };
                let id = record.id.clone();
                memory.upsert(record).await.map(|()| id)
            };

            match tokio::time::timeout(limit, write)
                .await
                .unwrap_or(Err(MemoryError::Timeout { timeout_ms }))
            {
                Ok(id) => debug!(user_id = %owner_id, memory_id = %id, "Wrote memory"),
                Err(e) => warn!(
                    user_id = %owner_id,
                    step = %Step::MemoryWriteback,
                    reason = %e,
                    "Step degraded"
                ),
            }
        }))
    }
}

/// Unwrap a step outcome, logging and recording any degradation.
fn record<T>(outcome: StepOutcome<T>, step: Step, trace: &mut Vec<Degradation>) -> T {
    let (value, degradation) = outcome.split(step);
    if let Some(d) = degradation {
        warn!(step = %d.step, reason = %d.reason, "Step degraded");
        trace.push(d);
    }
    value
}
