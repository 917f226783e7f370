//! Configuration loading, validation, and management for ferrocode.
//!
//! Loads configuration from `~/.ferrocode/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use ferrocode_core::provider::SamplingParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Credential variables, highest priority first.
const API_KEY_VARS: [&str; 2] = ["FERROCODE_API_KEY", "GROQ_API_KEY"];

/// The root configuration structure.
///
/// Maps directly to `~/.ferrocode/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion service credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Completion provider ("groq" or "openai")
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Override the provider's base URL (any OpenAI-compatible endpoint)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Model used for new sessions
    #[serde(default = "default_model")]
    pub model: String,

    /// Base system prompt; `ferrocode agents use` writes the chosen agent's prompt here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Sampling parameters sent with every request
    #[serde(default)]
    pub sampling: SamplingParams,

    /// Workspace indexing
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Context retrieval
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Tool execution
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Chat history persistence
    #[serde(default)]
    pub history: HistoryConfig,
}

fn default_provider() -> String {
    "groq".into()
}
fn default_model() -> String {
    "llama3-70b-8192".into()
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt)
            .field("sampling", &self.sampling)
            .field("workspace", &self.workspace)
            .field("retrieval", &self.retrieval)
            .field("tools", &self.tools)
            .field("history", &self.history)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Workspace root. `None` means no workspace is open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Files read concurrently per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Files larger than this are not indexed
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Approximate token ceiling for the whole index
    #[serde(default = "default_token_ceiling")]
    pub token_ceiling: usize,

    /// Emit a progress event every N files
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,

    /// File extensions (without the dot) that get indexed
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory names that are never descended into
    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,
}

fn default_batch_size() -> usize {
    50
}
fn default_max_file_bytes() -> u64 {
    500 * 1024
}
fn default_token_ceiling() -> usize {
    12_000_000
}
fn default_progress_interval() -> usize {
    500
}
fn default_extensions() -> Vec<String> {
    [
        "ts", "js", "py", "java", "c", "cpp", "h", "cs", "php", "html", "css", "json", "md", "sql", "rs", "go", "rb",
        "kt", "swift", "scala", "sh", "yaml", "xml",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_excluded_dirs() -> Vec<String> {
    ["node_modules", "vendor", "target", ".git", "dist", "build", "__pycache__", ".venv"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: None,
            batch_size: default_batch_size(),
            max_file_bytes: default_max_file_bytes(),
            token_ceiling: default_token_ceiling(),
            progress_interval: default_progress_interval(),
            extensions: default_extensions(),
            excluded_dirs: default_excluded_dirs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Files injected into the system prompt per turn
    #[serde(default = "default_retrieval_limit")]
    pub limit: usize,
}

fn default_retrieval_limit() -> usize {
    3
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            limit: default_retrieval_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// `run_command` timeout in seconds; 0 disables it
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

fn default_command_timeout() -> u64 {
    120
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: default_command_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Stored sessions beyond this are evicted, oldest first
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_max_sessions() -> usize {
    50
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.ferrocode/config.toml).
    ///
    /// Environment overrides:
    /// - `FERROCODE_API_KEY`, then `GROQ_API_KEY` (only when the file has no key)
    /// - `FERROCODE_MODEL`
    /// - `FERROCODE_WORKSPACE`
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env(|key| std::env::var(key).ok());
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

    /// Apply overrides from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.api_key.is_none() {
            self.api_key = API_KEY_VARS.iter().find_map(|key| non_empty(key));
        }
        if let Some(model) = non_empty("FERROCODE_MODEL") {
            self.model = model;
        }
        if let Some(root) = non_empty("FERROCODE_WORKSPACE") {
            self.workspace.root = Some(PathBuf::from(root));
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ferrocode")
    }

    /// The config file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Set `system_prompt` in the config file at `path`, keeping every other
    /// key as written. Creates the file when it does not exist.
    pub fn store_system_prompt(path: &Path, prompt: &str) -> Result<(), ConfigError> {
        let mut table: toml::Table = match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => toml::Table::new(),
            Err(e) => {
                return Err(ConfigError::ReadError {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        };
        table.insert("system_prompt".into(), toml::Value::String(prompt.to_string()));

        let write_err = |reason: String| ConfigError::WriteError {
            path: path.to_path_buf(),
            reason,
        };
        let content = toml::to_string_pretty(&table).map_err(|e| write_err(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| write_err(e.to_string()))?;
        tracing::debug!(path = %path.display(), "Stored system prompt");
        Ok(())
    }

    /// Where chat sessions are persisted.
    pub fn sessions_path() -> PathBuf {
        Self::config_dir().join("sessions.json")
    }

    /// Where agent profiles are persisted.
    pub fn profiles_path() -> PathBuf {
        Self::config_dir().join("agents.json")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.sampling.temperature) {
            return Err(ConfigError::ValidationError(
                "sampling.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.sampling.top_p) {
            return Err(ConfigError::ValidationError(
                "sampling.top_p must be between 0.0 and 1.0".into(),
            ));
        }
        if self.sampling.max_tokens == 0 {
            return Err(ConfigError::ValidationError("sampling.max_tokens must be > 0".into()));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError("model must not be empty".into()));
        }
        if self.workspace.batch_size == 0 {
            return Err(ConfigError::ValidationError("workspace.batch_size must be > 0".into()));
        }
        if self.workspace.progress_interval == 0 {
            return Err(ConfigError::ValidationError(
                "workspace.progress_interval must be > 0".into(),
            ));
        }
        if self.history.max_sessions == 0 {
            return Err(ConfigError::ValidationError("history.max_sessions must be > 0".into()));
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            api_url: None,
            model: default_model(),
            system_prompt: None,
            sampling: SamplingParams::default(),
            workspace: WorkspaceConfig::default(),
            retrieval: RetrievalConfig::default(),
            tools: ToolsConfig::default(),
            history: HistoryConfig::default(),
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

    #[error("Failed to write config file at {path}: {reason}")]
    WriteError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
