//! The agent orchestrator: one conversation, many sinks.

use ferrocode_config::AppConfig;
use ferrocode_core::event::{AgentEvent, OutputSink, SinkId, SinkRegistry};
use ferrocode_core::message::{ChatMessage, ChatSession, Role};
use ferrocode_core::provider::{Provider, ProviderRequest, SamplingParams};
use ferrocode_core::store::{AgentProfile, ProfileStore, SessionStore};
use ferrocode_core::tool::{ToolCall, ToolOutcome};
use ferrocode_core::error::StorageError;
use ferrocode_memory::{IndexLimits, IndexStatus, InMemorySessionStore, RetrievalEngine, WorkspaceIndex};
use ferrocode_tools::{ShellTool, ToolCallProtocol, ToolExecutor};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::ambient::{self, AmbientContext, NoAmbient};
use crate::error::AgentError;
use crate::prompt::{DEFAULT_SYSTEM_PROMPT, build_system_prompt};

/// Settings the orchestrator reads at the start of every turn.
#[derive(Clone)]
pub struct OrchestratorConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub sampling: SamplingParams,
    /// Base system prompt; the built-in default when unset or blank.
    /// Activating an agent profile writes its prompt here.
    pub system_prompt: Option<String>,
    pub retrieval_limit: usize,
    pub workspace_root: Option<PathBuf>,
    pub command_timeout_secs: u64,
}

impl OrchestratorConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            sampling: config.sampling,
            system_prompt: config.system_prompt.clone(),
            retrieval_limit: config.retrieval.limit,
            workspace_root: config.workspace.root.clone(),
            command_timeout_secs: config.tools.command_timeout_secs,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}

impl std::fmt::Debug for OrchestratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestratorConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("sampling", &self.sampling)
            .field("retrieval_limit", &self.retrieval_limit)
            .field("workspace_root", &self.workspace_root)
            .field("command_timeout_secs", &self.command_timeout_secs)
            .finish()
    }
}

/// What one turn produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The full assistant reply.
    pub response: String,
    /// Tool calls found in the reply, now awaiting confirmation.
    pub tool_calls: Vec<ToolCall>,
}

/// Clears the busy flag however the turn exits.
struct TurnGuard<'a>(&'a AtomicBool);

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct AgentOrchestrator {
    provider: RwLock<Arc<dyn Provider>>,
    config: RwLock<OrchestratorConfig>,
    sinks: Arc<SinkRegistry>,
    sessions: Arc<dyn SessionStore>,
    profiles: Option<Arc<dyn ProfileStore>>,
    ambient: Arc<dyn AmbientContext>,
    retrieval: RetrievalEngine,
    executor: Arc<ToolExecutor>,
    protocol: ToolCallProtocol,
    session: Mutex<ChatSession>,
    busy: AtomicBool,
}

impl AgentOrchestrator {
    /// An orchestrator with in-memory history, no agent profiles, no
    /// ambient context, and an empty index over the configured root.
    pub fn new(provider: Arc<dyn Provider>, config: OrchestratorConfig) -> Self {
        let sinks = Arc::new(SinkRegistry::new());
        let index = WorkspaceIndex::new(config.workspace_root.clone(), IndexLimits::default())
            .with_sinks(Arc::clone(&sinks));
        let executor = Arc::new(ToolExecutor::new(
            config.workspace_root.clone(),
            ShellTool::from_secs(config.command_timeout_secs),
        ));
        let protocol = ToolCallProtocol::new(Arc::clone(&executor), Arc::clone(&sinks));

        Self {
            provider: RwLock::new(provider),
            session: Mutex::new(ChatSession::new(None, config.model.clone())),
            config: RwLock::new(config),
            sessions: Arc::new(InMemorySessionStore::default()),
            profiles: None,
            ambient: Arc::new(NoAmbient),
            retrieval: RetrievalEngine::new(Arc::new(index)),
            executor,
            protocol,
            sinks,
            busy: AtomicBool::new(false),
        }
    }

    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.sessions = store;
        self
    }

    /// Profiles that [`activate_profile`](Self::activate_profile) switches between.
    pub fn with_profile_store(mut self, store: Arc<dyn ProfileStore>) -> Self {
        self.profiles = Some(store);
        self
    }

    pub fn with_ambient(mut self, ambient: Arc<dyn AmbientContext>) -> Self {
        self.ambient = ambient;
        self
    }

    /// Replace the workspace index. Its progress is reported to this
    /// orchestrator's sinks.
    pub fn with_index(mut self, index: WorkspaceIndex) -> Self {
        let index = index.with_sinks(Arc::clone(&self.sinks));
        self.retrieval = RetrievalEngine::new(Arc::new(index));
        self
    }

    pub fn register_sink(&self, sink: Arc<dyn OutputSink>) -> SinkId {
        self.sinks.register(sink)
    }

    pub fn unregister_sink(&self, id: SinkId) -> bool {
        self.sinks.unregister(id)
    }

    pub fn config(&self) -> OrchestratorConfig {
        self.config.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn provider(&self) -> Arc<dyn Provider> {
        Arc::clone(&self.provider.read().unwrap_or_else(|p| p.into_inner()))
    }

    pub fn set_provider(&self, provider: Arc<dyn Provider>) {
        *self.provider.write().unwrap_or_else(|p| p.into_inner()) = provider;
    }

    /// Apply new settings. Takes effect from the next turn; a changed
    /// workspace root takes effect for the index on the next scan.
    pub fn update_config(&self, config: OrchestratorConfig) {
        let previous = self.config();
        self.executor.configure(
            config.workspace_root.clone(),
            ShellTool::from_secs(config.command_timeout_secs),
        );
        if previous.workspace_root != config.workspace_root {
            self.retrieval.index().set_root(config.workspace_root.clone());
        }
        let model_changed = previous.model != config.model;
        let model = config.model.clone();
        *self.config.write().unwrap_or_else(|p| p.into_inner()) = config;

        if model_changed {
            info!(model = %model, "Model changed");
            self.sinks.broadcast(&AgentEvent::ModelChanged { model });
        }
    }

    /// Make `id` the active agent. Its prompt replaces the configured
    /// system prompt from the next turn on.
    pub async fn activate_profile(&self, id: &str) -> Result<AgentProfile, AgentError> {
        let profiles = self
            .profiles
            .as_ref()
            .ok_or_else(|| StorageError::NotFound("agent profile store".into()))?;
        let profile = profiles.set_active(id).await?;

        let mut config = self.config();
        config.system_prompt = Some(profile.system_prompt.clone());
        self.update_config(config);
        info!(agent = %profile.id, "Agent profile activated");
        Ok(profile)
    }

    /// Snapshot of the current session.
    pub async fn session(&self) -> ChatSession {
        self.session.lock().await.clone()
    }

    pub async fn pending_tools(&self) -> Vec<ToolCall> {
        self.protocol.pending().await
    }

    pub fn memory_status(&self) -> IndexStatus {
        self.retrieval.index().status()
    }

    /// Rescan the workspace. Returns once the new index is in place.
    pub async fn reindex(&self) -> IndexStatus {
        self.retrieval.index().scan().await;
        self.memory_status()
    }

    pub async fn available_models(&self) -> Result<Vec<String>, AgentError> {
        self.provider().list_models().await.map_err(AgentError::Provider)
    }

    /// Start an empty session. Pending tool calls are dropped.
    pub async fn new_session(&self) -> ChatSession {
        let fresh = ChatSession::new(None, self.config().model);
        *self.session.lock().await = fresh.clone();
        let dropped = self.protocol.clear().await;
        if dropped > 0 {
            debug!(dropped, "Dropped pending tool calls");
        }
        self.sinks.broadcast(&AgentEvent::Cleared);
        fresh
    }

    /// Make a stored session current and replay it to the sinks.
    pub async fn load_session(&self, id: &str) -> Result<ChatSession, AgentError> {
        let session = self
            .sessions
            .get(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("session '{id}'")))?;

        *self.session.lock().await = session.clone();
        self.protocol.clear().await;

        self.sinks.broadcast(&AgentEvent::Cleared);
        for message in session.messages.iter().filter(|m| m.role != Role::System) {
            self.sinks.broadcast(&AgentEvent::Message {
                role: message.role,
                content: message.content.clone(),
            });
        }
        info!(session_id = %session.id, messages = session.messages.len(), "Session loaded");
        Ok(session)
    }

    async fn persist(&self, session: &ChatSession) {
        if let Err(e) = self.sessions.save(session).await {
            warn!(session_id = %session.id, error = %e, "Failed to persist session");
        }
    }

    /// Append to the current session, unless it was replaced since
    /// `session_id`. Returns whether the message was kept.
    async fn append_to(&self, session_id: &str, message: ChatMessage) -> bool {
        let snapshot = {
            let mut session = self.session.lock().await;
            if session.id != session_id {
                debug!(session_id, "Session changed, dropping message");
                return false;
            }
            session.append(message);
            session.clone()
        };
        self.persist(&snapshot).await;
        true
    }

    fn fail(&self, message: impl Into<String>) {
        self.sinks.broadcast(&AgentEvent::Error { message: message.into() });
    }

    /// Run one conversational turn for `text`.
    pub async fn send_message(&self, text: &str) -> Result<TurnOutcome, AgentError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(AgentError::TurnInProgress);
        }
        let _guard = TurnGuard(&self.busy);
        let config = self.config();

        let (session_id, history) = {
            let mut session = self.session.lock().await;
            session.model = config.model.clone();
            session.append(ChatMessage::user(text));
            (session.id.clone(), session.clone())
        };
        self.persist(&history).await;

        if !config.has_api_key() {
            let err = AgentError::MissingCredential;
            self.fail(err.to_string());
            return Err(err);
        }

        let editor = self.ambient.active_editor();
        let ambient = ambient::render(editor.as_ref(), config.workspace_root.as_deref());

        self.sinks.broadcast(&AgentEvent::Status {
            message: "Searching workspace memory...".into(),
        });
        let retrieved = self.retrieval.retrieve(text, config.retrieval_limit);
        let base = config
            .system_prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);
        let system = build_system_prompt(base, &ambient, &retrieved);

        let mut messages = Vec::with_capacity(history.messages.len() + 1);
        messages.push(ChatMessage::system(system));
        messages.extend(history.messages.iter().cloned());

        info!(
            session_id = %session_id,
            model = %config.model,
            messages = messages.len(),
            context_chars = retrieved.len(),
            "Starting turn"
        );

        let request = ProviderRequest::new(config.model.clone(), messages, config.sampling).streaming();
        let mut rx = match self.provider().stream(request).await {
            Ok(rx) => rx,
            Err(e) => {
                warn!(error = %e, "Failed to start stream");
                self.fail(e.to_string());
                return Err(AgentError::Stream(e));
            }
        };

        let mut response = String::new();
        while let Some(item) = rx.recv().await {
            match item {
                Ok(chunk) => {
                    if let Some(content) = chunk.content.filter(|c| !c.is_empty()) {
                        response.push_str(&content);
                        self.sinks.broadcast(&AgentEvent::Chunk { content });
                    }
                    if chunk.done {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, received = response.len(), "Stream failed mid-turn");
                    self.fail(e.to_string());
                    return Err(AgentError::Stream(e));
                }
            }
        }

        let kept = self.append_to(&session_id, ChatMessage::assistant(response.clone())).await;

        // A reply to a replaced session must not leave calls pending in the new one.
        let tool_calls = if kept {
            self.protocol.detect(&response).await
        } else {
            Vec::new()
        };
        debug!(chars = response.len(), tool_calls = tool_calls.len(), "Turn complete");
        Ok(TurnOutcome { response, tool_calls })
    }

    /// Confirm or reject a pending tool call.
    pub async fn resolve_tool(&self, id: &str, confirmed: bool) -> ToolOutcome {
        let session_id = self.session.lock().await.id.clone();
        let outcome = self.protocol.resolve(id, confirmed).await;

        match &outcome {
            ToolOutcome::Executed { call, output } => {
                self.sinks.broadcast(&AgentEvent::ToolResult {
                    id: call.id.clone(),
                    tool: call.tool_name().to_string(),
                    output: output.clone(),
                });
                self.append_to(&session_id, ChatMessage::assistant(outcome.transcript())).await;
            }
            ToolOutcome::Cancelled { .. } => {
                let transcript = outcome.transcript();
                self.sinks.broadcast(&AgentEvent::Message {
                    role: Role::Assistant,
                    content: transcript.clone(),
                });
                self.append_to(&session_id, ChatMessage::assistant(transcript)).await;
            }
            ToolOutcome::Expired { .. } => self.fail(outcome.transcript()),
        }
        outcome
    }
}
