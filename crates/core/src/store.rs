//! Persistence boundaries: chat sessions and agent profiles.
//!
//! The orchestrator only sees these traits. Implementations live in
//! `ferrocode-memory` (in-memory for tests, JSON files for the CLI).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::message::ChatSession;

/// Id of the profile seeded into every empty profile store.
pub const DEFAULT_PROFILE_ID: &str = "default";

/// A named persona: a system prompt the user can switch to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    pub system_prompt: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl AgentProfile {
    /// The "General Assistant" profile.
    pub fn general_assistant() -> Self {
        Self {
            id: DEFAULT_PROFILE_ID.into(),
            name: "General Assistant".into(),
            description: "The default coding assistant.".into(),
            system_prompt: "You are an expert AI coding partner.\n\
                            You help developers write, debug, and understand code in their workspace.\n\
                            Be concise and accurate, and tag code blocks with their language.\n\
                            When asked to edit code, provide the full corrected block."
                .into(),
            icon: Some("robot".into()),
        }
    }
}

/// Persisted collection of chat sessions.
///
/// `save` is an upsert: the session moves to the front of the list, and
/// once the collection exceeds its cap the least-recently-modified
/// sessions are evicted.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// All sessions, most recently modified first.
    async fn list(&self) -> Result<Vec<ChatSession>, StorageError>;

    async fn get(&self, id: &str) -> Result<Option<ChatSession>, StorageError>;

    async fn save(&self, session: &ChatSession) -> Result<(), StorageError>;

    /// Returns whether a session was removed.
    async fn delete(&self, id: &str) -> Result<bool, StorageError>;

    async fn clear(&self) -> Result<(), StorageError>;
}

/// Agent profiles plus the currently active one.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn list(&self) -> Result<Vec<AgentProfile>, StorageError>;

    async fn get(&self, id: &str) -> Result<Option<AgentProfile>, StorageError>;

    /// Insert or replace by id.
    async fn save(&self, profile: AgentProfile) -> Result<(), StorageError>;

    async fn delete(&self, id: &str) -> Result<bool, StorageError>;

    async fn active_id(&self) -> Result<String, StorageError>;

    /// Fails with `NotFound` for an unknown id.
    async fn set_active(&self, id: &str) -> Result<AgentProfile, StorageError>;

    /// The active profile, falling back to the default one.
    async fn active(&self) -> Result<AgentProfile, StorageError> {
        let id = self.active_id().await?;
        Ok(self.get(&id).await?.unwrap_or_else(AgentProfile::general_assistant))
    }
}
