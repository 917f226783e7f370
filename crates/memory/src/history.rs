//! Chat history stores.
//!
//! Both stores keep a capped [`SessionCollection`]: saving upserts by id,
//! the list is ordered most recently modified first, and sessions past the
//! cap are evicted oldest first.
//!
//! `FileSessionStore` keeps the collection as one JSON array on disk,
//! loaded on open and rewritten on every mutation.

use async_trait::async_trait;
use ferrocode_core::error::StorageError;
use ferrocode_core::message::ChatSession;
use ferrocode_core::store::SessionStore;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Sessions kept unless configured otherwise.
pub const DEFAULT_MAX_SESSIONS: usize = 50;

/// An ordered, capped set of sessions.
#[derive(Debug, Clone)]
pub struct SessionCollection {
    sessions: Vec<ChatSession>,
    cap: usize,
}

impl SessionCollection {
    pub fn new(cap: usize) -> Self {
        Self::from_sessions(Vec::new(), cap)
    }

    pub fn from_sessions(mut sessions: Vec<ChatSession>, cap: usize) -> Self {
        let cap = cap.max(1);
        sessions.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        sessions.truncate(cap);
        Self { sessions, cap }
    }

    /// Insert or replace by id. Returns the ids evicted to honour the cap.
    pub fn upsert(&mut self, session: ChatSession) -> Vec<String> {
        match self.sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session,
            None => self.sessions.push(session),
        }
        self.sessions.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));

        if self.sessions.len() <= self.cap {
            return Vec::new();
        }
        self.sessions.split_off(self.cap).into_iter().map(|s| s.id).collect()
    }

    pub fn get(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != id);
        self.sessions.len() < before
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    /// Most recently modified first.
    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Sessions held in memory only. Used by tests and `--ephemeral` runs.
pub struct InMemorySessionStore {
    inner: RwLock<SessionCollection>,
}

impl InMemorySessionStore {
    pub fn new(cap: usize) -> Self {
        Self {
            inner: RwLock::new(SessionCollection::new(cap)),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SESSIONS)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn list(&self) -> Result<Vec<ChatSession>, StorageError> {
        Ok(self.inner.read().await.sessions().to_vec())
    }

    async fn get(&self, id: &str) -> Result<Option<ChatSession>, StorageError> {
        Ok(self.inner.read().await.get(id).cloned())
    }

    async fn save(&self, session: &ChatSession) -> Result<(), StorageError> {
        let evicted = self.inner.write().await.upsert(session.clone());
        if !evicted.is_empty() {
            debug!(?evicted, "Evicted old sessions");
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.inner.write().await.remove(id))
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.inner.write().await.clear();
        Ok(())
    }
}

/// Sessions persisted as a JSON array.
pub struct FileSessionStore {
    path: PathBuf,
    inner: RwLock<SessionCollection>,
}

impl FileSessionStore {
    /// Open the store at `path`.
    ///
    /// A missing file starts empty. A corrupted one is moved aside to
    /// `<path>.corrupt` and the store also starts empty.
    pub fn open(path: impl Into<PathBuf>, cap: usize) -> Self {
        let path = path.into();
        let sessions = load_sessions(&path);
        debug!(path = %path.display(), count = sessions.len(), "Session store loaded");
        Self {
            inner: RwLock::new(SessionCollection::from_sessions(sessions, cap)),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, collection: &SessionCollection) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(collection.sessions())
            .map_err(|e| StorageError::Encode(e.to_string()))?;
        write_file(&self.path, json.as_bytes()).await
    }
}

fn load_sessions(path: &Path) -> Vec<ChatSession> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return Vec::new(), // not created yet
    };
    if content.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Vec<ChatSession>>(&content) {
        Ok(sessions) => sessions,
        Err(e) => {
            let backup = set_aside(path);
            warn!(path = %path.display(), backup = ?backup, error = %e, "Session history is corrupted, starting empty");
            Vec::new()
        }
    }
}

/// Move an unreadable store file out of the way so the next write cannot
/// destroy it. Returns where it went.
pub(crate) fn set_aside(path: &Path) -> Option<PathBuf> {
    let mut backup = path.as_os_str().to_owned();
    backup.push(".corrupt");
    let backup = PathBuf::from(backup);
    match std::fs::rename(path, &backup) {
        Ok(()) => Some(backup),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not move corrupted file aside");
            None
        }
    }
}

/// Replace `path` with `bytes`, creating parent directories.
///
/// The bytes go to a sibling temp file that is renamed over `path`, so a
/// crash mid-write leaves the previous contents intact.
pub(crate) async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let write_err = |e: std::io::Error| StorageError::Write {
        path: path.display().to_string(),
        reason: e.to_string(),
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut temp = path.as_os_str().to_owned();
    temp.push(format!(".tmp.{}.{}", std::process::id(), chrono::Utc::now().timestamp_micros()));
    let temp = PathBuf::from(temp);

    let result = async {
        let mut file = tokio::fs::File::create(&temp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&temp, path).await
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&temp).await;
    }
    result.map_err(write_err)
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn list(&self) -> Result<Vec<ChatSession>, StorageError> {
        Ok(self.inner.read().await.sessions().to_vec())
    }

    async fn get(&self, id: &str) -> Result<Option<ChatSession>, StorageError> {
        Ok(self.inner.read().await.get(id).cloned())
    }

    async fn save(&self, session: &ChatSession) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        let evicted = inner.upsert(session.clone());
        if !evicted.is_empty() {
            debug!(?evicted, "Evicted old sessions");
        }
        self.flush(&inner).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let mut inner = self.inner.write().await;
        let removed = inner.remove(id);
        if removed {
            self.flush(&inner).await?;
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        inner.clear();
        self.flush(&inner).await
    }
}
