//! Agent profile store.
//!
//! Profiles are kept with the id of the active one in a single JSON
//! document. An empty store is seeded with the "General Assistant" profile,
//! which also becomes active.

use async_trait::async_trait;
use ferrocode_core::error::StorageError;
use ferrocode_core::store::{AgentProfile, ProfileStore, DEFAULT_PROFILE_ID};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::history::{set_aside, write_file};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProfileBook {
    #[serde(default)]
    active_id: Option<String>,

    #[serde(default)]
    agents: Vec<AgentProfile>,
}

impl ProfileBook {
    fn seeded(mut self) -> Self {
        if self.agents.is_empty() {
            self.agents.push(AgentProfile::general_assistant());
            self.active_id = Some(DEFAULT_PROFILE_ID.to_string());
        }
        self
    }

    fn upsert(&mut self, profile: AgentProfile) {
        match self.agents.iter_mut().find(|a| a.id == profile.id) {
            Some(existing) => *existing = profile,
            None => self.agents.push(profile),
        }
    }
}

/// Profile store backed by a JSON file, or by nothing at all.
pub struct FileProfileStore {
    path: Option<PathBuf>,
    book: RwLock<ProfileBook>,
}

impl FileProfileStore {
    /// Open the store at `path`. Missing or corrupted files start from the
    /// seed; a corrupted file is first moved to `<path>.corrupt`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let book = load_book(&path).seeded();
        debug!(path = %path.display(), count = book.agents.len(), "Profile store loaded");
        Self {
            path: Some(path),
            book: RwLock::new(book),
        }
    }

    /// A store that never touches the disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            book: RwLock::new(ProfileBook::default().seeded()),
        }
    }

    async fn flush(&self, book: &ProfileBook) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(book).map_err(|e| StorageError::Encode(e.to_string()))?;
        write_file(path, json.as_bytes()).await
    }
}

fn load_book(path: &Path) -> ProfileBook {
    let Ok(content) = std::fs::read_to_string(path) else {
        return ProfileBook::default();
    };
    serde_json::from_str(&content).unwrap_or_else(|e| {
        let backup = set_aside(path);
        warn!(path = %path.display(), backup = ?backup, error = %e, "Agent profiles are corrupted, starting from defaults");
        ProfileBook::default()
    })
}

#[async_trait]
impl ProfileStore for FileProfileStore {
    async fn list(&self) -> Result<Vec<AgentProfile>, StorageError> {
        Ok(self.book.read().await.agents.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<AgentProfile>, StorageError> {
        Ok(self.book.read().await.agents.iter().find(|a| a.id == id).cloned())
    }

    async fn save(&self, profile: AgentProfile) -> Result<(), StorageError> {
        let mut book = self.book.write().await;
        book.upsert(profile);
        self.flush(&book).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let mut book = self.book.write().await;
        let before = book.agents.len();
        book.agents.retain(|a| a.id != id);
        let removed = book.agents.len() < before;
        if removed {
            self.flush(&book).await?;
        }
        Ok(removed)
    }

    async fn active_id(&self) -> Result<String, StorageError> {
        Ok(self
            .book
            .read()
            .await
            .active_id
            .clone()
            .unwrap_or_else(|| DEFAULT_PROFILE_ID.to_string()))
    }

    async fn set_active(&self, id: &str) -> Result<AgentProfile, StorageError> {
        let mut book = self.book.write().await;
        let profile = book
            .agents
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("agent profile '{id}'")))?;
        book.active_id = Some(id.to_string());
        self.flush(&book).await?;
        Ok(profile)
    }
}
