//! Configuration loading, validation, and management for Concierge.
//!
//! Loads configuration from `~/.concierge/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use concierge_core::memory::{DEFAULT_TOP_K, SNIPPET_MAX_CHARS, WRITEBACK_MIN_CHARS};
use concierge_core::session::{MAX_HISTORY_TURNS, SESSION_RETENTION};
use concierge_core::tool::WEATHER_KEYWORDS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.concierge/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Persona instruction placed first in every system prompt
    #[serde(default = "default_persona")]
    pub persona: String,

    /// Text generation and embedding models
    #[serde(default)]
    pub llm: LlmConfig,

    /// Short-term conversation history
    #[serde(default)]
    pub session: SessionConfig,

    /// Long-term similarity memory
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Keyword-triggered weather lookup
    #[serde(default)]
    pub tool: ToolConfig,

    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Per-upstream time bounds
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Persona line used when the config does not set one.
pub const DEFAULT_PERSONA: &str =
    "You are Edge Concierge, concise and helpful. Use memory only if relevant.";

fn default_persona() -> String {
    DEFAULT_PERSONA.into()
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name: "openai", "openrouter", "ollama", "workers-ai", ...
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Override the provider's base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Cloudflare account (Workers AI only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,

    /// Text generation model
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding model
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_temperature() -> f32 {
    0.7
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_url: None,
            api_key: None,
            account_id: None,
            model: default_model(),
            embedding_model: default_embedding_model(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("account_id", &self.account_id)
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// "memory" or "sqlite"
    #[serde(default = "default_session_backend")]
    pub backend: String,

    /// SQLite database path (sqlite backend only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_session_backend() -> String {
    "memory".into()
}
fn default_max_turns() -> usize {
    MAX_HISTORY_TURNS
}
fn default_ttl_secs() -> u64 {
    SESSION_RETENTION.as_secs()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: default_session_backend(),
            path: None,
            max_turns: default_max_turns(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl SessionConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// "memory", "sqlite" or "none"
    #[serde(default = "default_memory_backend")]
    pub backend: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Replies must be longer than this to be remembered
    #[serde(default = "default_writeback_min_chars")]
    pub writeback_min_chars: usize,

    #[serde(default = "default_snippet_max_chars")]
    pub snippet_max_chars: usize,
}

fn default_memory_backend() -> String {
    "memory".into()
}
fn default_top_k() -> usize {
    DEFAULT_TOP_K
}
fn default_writeback_min_chars() -> usize {
    WRITEBACK_MIN_CHARS
}
fn default_snippet_max_chars() -> usize {
    SNIPPET_MAX_CHARS
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: default_memory_backend(),
            path: None,
            top_k: default_top_k(),
            writeback_min_chars: default_writeback_min_chars(),
            snippet_max_chars: default_snippet_max_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,

    /// Fixed lookup location; not parsed from the message
    #[serde(default = "default_location")]
    pub location: String,

    #[serde(default = "default_weather_url")]
    pub base_url: String,
}

fn default_keywords() -> Vec<String> {
    WEATHER_KEYWORDS.iter().map(|k| k.to_string()).collect()
}
fn default_location() -> String {
    "San Francisco".into()
}
fn default_weather_url() -> String {
    "https://wttr.in".into()
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            keywords: default_keywords(),
            location: default_location(),
            base_url: default_weather_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Used when a request omits `userId`
    #[serde(default = "default_user_id")]
    pub default_user_id: String,

    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_port() -> u16 {
    8787
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_user_id() -> String {
    "demo-user".into()
}
fn default_body_limit() -> usize {
    64 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            default_user_id: default_user_id(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

/// Time bounds in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_session_timeout")]
    pub session_ms: u64,

    #[serde(default = "default_memory_timeout")]
    pub memory_ms: u64,

    #[serde(default = "default_tool_timeout")]
    pub tool_ms: u64,

    #[serde(default = "default_llm_timeout")]
    pub llm_ms: u64,
}

fn default_session_timeout() -> u64 {
    2_000
}
fn default_memory_timeout() -> u64 {
    3_000
}
fn default_tool_timeout() -> u64 {
    3_000
}
fn default_llm_timeout() -> u64 {
    60_000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            session_ms: default_session_timeout(),
            memory_ms: default_memory_timeout(),
            tool_ms: default_tool_timeout(),
            llm_ms: default_llm_timeout(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.concierge/config.toml).
    ///
    /// Also checks environment variables:
    /// - `CONCIERGE_API_KEY`, then `OPENAI_API_KEY`, then `CLOUDFLARE_API_TOKEN`
    /// - `CONCIERGE_PROVIDER`, `CONCIERGE_MODEL`, `CONCIERGE_EMBEDDING_MODEL`
    /// - `CONCIERGE_ACCOUNT_ID`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using the given lookup.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if self.llm.api_key.is_none() {
            self.llm.api_key = var("CONCIERGE_API_KEY")
                .or_else(|| var("OPENAI_API_KEY"))
                .or_else(|| var("CLOUDFLARE_API_TOKEN"));
        }
        if let Some(provider) = var("CONCIERGE_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Some(model) = var("CONCIERGE_MODEL") {
            self.llm.model = model;
        }
        if let Some(model) = var("CONCIERGE_EMBEDDING_MODEL") {
            self.llm.embedding_model = model;
        }
        if let Some(account) = var("CONCIERGE_ACCOUNT_ID") {
            self.llm.account_id = Some(account);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".concierge")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::ValidationError(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.session.max_turns == 0 || self.session.max_turns > MAX_HISTORY_TURNS {
            return Err(ConfigError::ValidationError(format!(
                "session.max_turns must be between 1 and {MAX_HISTORY_TURNS}"
            )));
        }
        if self.memory.top_k == 0 {
            return Err(ConfigError::ValidationError("memory.top_k must be > 0".into()));
        }
        if self.memory.snippet_max_chars == 0 {
            return Err(ConfigError::ValidationError(
                "memory.snippet_max_chars must be > 0".into(),
            ));
        }
        let t = &self.timeouts;
        if [t.session_ms, t.memory_ms, t.tool_ms, t.llm_ms].contains(&0) {
            return Err(ConfigError::ValidationError(
                "timeouts must all be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            persona: default_persona(),
            llm: LlmConfig::default(),
            session: SessionConfig::default(),
            memory: MemoryConfig::default(),
            tool: ToolConfig::default(),
            gateway: GatewayConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
