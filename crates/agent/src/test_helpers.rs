//! Shared test doubles for the collaborator traits.

use async_trait::async_trait;
use concierge_core::error::{MemoryError, ProviderError, SessionError, ToolError};
use concierge_core::memory::{MemoryIndex, MemoryMatch, MemoryRecord};
use concierge_core::message::{ConversationId, Role, Turn};
use concierge_core::provider::{Provider, ProviderRequest, ProviderResponse};
use concierge_core::session::SessionStore;
use concierge_core::tool::{ToolInvoker, ToolNote, WEATHER_KEYWORDS, matches_keywords};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Session store backed by a map, with optional injected failures.
#[derive(Default)]
pub struct MockSessionStore {
    sessions: Mutex<HashMap<String, Vec<Turn>>>,
    fail_load: bool,
    fail_save: bool,
    loads: AtomicUsize,
    saves: AtomicUsize,
}

impl MockSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_load() -> Self {
        Self {
            fail_load: true,
            ..Self::default()
        }
    }

    pub fn failing_save() -> Self {
        Self {
            fail_save: true,
            ..Self::default()
        }
    }

    pub fn seed(&self, id: &str, turns: Vec<Turn>) {
        self.sessions.lock().unwrap().insert(id.to_string(), turns);
    }

    pub fn stored(&self, id: &str) -> Option<Vec<Turn>> {
        self.sessions.lock().unwrap().get(id).cloned()
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionStore for MockSessionStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn load(&self, id: &ConversationId) -> Result<Vec<Turn>, SessionError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_load {
            return Err(SessionError::Storage("load refused".into()));
        }
        Ok(self.stored(id.as_str()).unwrap_or_default())
    }

    async fn save(
        &self,
        id: &ConversationId,
        turns: &[Turn],
        _retention: Duration,
    ) -> Result<(), SessionError> {
        if self.fail_save {
            return Err(SessionError::Storage("save refused".into()));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.seed(id.as_str(), turns.to_vec());
        Ok(())
    }
}

enum MemoryMode {
    Working,
    Failing,
    Stalled,
}

/// Memory index returning canned matches and recording upserts.
pub struct MockMemoryIndex {
    mode: MemoryMode,
    matches: Vec<MemoryMatch>,
    upserts: Mutex<Vec<MemoryRecord>>,
}

impl MockMemoryIndex {
    fn with_mode(mode: MemoryMode) -> Self {
        Self {
            mode,
            matches: Vec::new(),
            upserts: Mutex::new(Vec::new()),
        }
    }

    pub fn new() -> Self {
        Self::with_mode(MemoryMode::Working)
    }

    pub fn failing() -> Self {
        Self::with_mode(MemoryMode::Failing)
    }

    pub fn stalled() -> Self {
        Self::with_mode(MemoryMode::Stalled)
    }

    pub fn with_matches(matches: &[(&str, f32)]) -> Self {
        Self {
            matches: matches
                .iter()
                .map(|(text, score)| MemoryMatch {
                    text: text.to_string(),
                    score: *score,
                })
                .collect(),
            ..Self::new()
        }
    }

    pub fn upserts(&self) -> Vec<MemoryRecord> {
        self.upserts.lock().unwrap().clone()
    }
}

#[async_trait]
impl MemoryIndex for MockMemoryIndex {
    fn name(&self) -> &str {
        "mock"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        match self.mode {
            MemoryMode::Working => Ok(vec![text.chars().count() as f32, 1.0]),
            MemoryMode::Failing => Err(MemoryError::EmbeddingFailed("index offline".into())),
            MemoryMode::Stalled => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(vec![1.0])
            }
        }
    }

    async fn query(&self, _vector: &[f32], top_k: usize) -> Result<Vec<MemoryMatch>, MemoryError> {
        Ok(self.matches.iter().take(top_k).cloned().collect())
    }

    async fn upsert(&self, record: MemoryRecord) -> Result<(), MemoryError> {
        self.upserts.lock().unwrap().push(record);
        Ok(())
    }
}

enum Script {
    Always(String),
    Echo,
    Failing,
    Slow(String, Duration),
}

/// Provider that answers from a script and records requests.
pub struct ScriptedProvider {
    script: Script,
    calls: AtomicUsize,
    last_request: Mutex<Option<ProviderRequest>>,
}

impl ScriptedProvider {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn always(reply: &str) -> Self {
        Self::with_script(Script::Always(reply.to_string()))
    }

    /// Replies `echo: <last user message>`.
    pub fn echo() -> Self {
        Self::with_script(Script::Echo)
    }

    pub fn failing() -> Self {
        Self::with_script(Script::Failing)
    }

    pub fn slow(reply: &str, delay: Duration) -> Self {
        Self::with_script(Script::Slow(reply.to_string(), delay))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());

        let content = match &self.script {
            Script::Always(reply) => reply.clone(),
            Script::Echo => {
                let last = request
                    .messages
                    .iter()
                    .rev()
                    .find(|t| t.role() == Role::User)
                    .map(|t| t.content().to_string())
                    .unwrap_or_default();
                format!("echo: {last}")
            }
            Script::Failing => {
                return Err(ProviderError::AuthenticationFailed("no credentials".into()));
            }
            Script::Slow(reply, delay) => {
                tokio::time::sleep(*delay).await;
                reply.clone()
            }
        };

        Ok(ProviderResponse {
            content,
            model: request.model,
            usage: None,
        })
    }
}

/// Weather-keyword tool returning a fixed summary.
pub struct MockTool {
    summary: Option<String>,
    calls: AtomicUsize,
}

impl MockTool {
    pub fn new(summary: &str) -> Self {
        Self {
            summary: Some(summary.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            summary: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolInvoker for MockTool {
    fn name(&self) -> &str {
        "weather"
    }

    fn is_triggered(&self, message: &str) -> bool {
        matches_keywords(message, &WEATHER_KEYWORDS)
    }

    async fn invoke(&self, _message: &str) -> Result<ToolNote, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.summary {
            Some(summary) => Ok(ToolNote {
                tool: "weather".into(),
                summary: summary.clone(),
            }),
            None => Err(ToolError::ExecutionFailed {
                tool_name: "weather".into(),
                reason: "service unavailable".into(),
            }),
        }
    }
}
