//! Workspace index: an in-memory snapshot of the workspace's source files.
//!
//! A scan walks the workspace root (honouring `.gitignore`), reads matching
//! files in concurrent batches, and builds a fresh generation of
//! [`IndexedFile`]s. The new generation replaces the old one in a single
//! swap, so readers always see a complete index.

use chrono::{DateTime, Utc};
use ferrocode_config::WorkspaceConfig;
use ferrocode_core::event::{AgentEvent, SinkRegistry};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

use crate::keywords::index_keywords;

/// One file as seen by retrieval.
#[derive(Debug, Clone)]
pub struct IndexedFile {
    /// Workspace-relative, `/`-separated
    pub path: String,
    pub content: String,
    pub keywords: HashSet<String>,
    pub last_modified: DateTime<Utc>,
}

impl IndexedFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            path: path.into(),
            keywords: index_keywords(&content),
            content,
            last_modified: Utc::now(),
        }
    }

    pub fn approx_tokens(&self) -> usize {
        approx_tokens(&self.content)
    }
}

/// `ceil(chars / 4)`
pub fn approx_tokens(content: &str) -> usize {
    content.chars().count().div_ceil(4)
}

/// Scan limits.
#[derive(Debug, Clone)]
pub struct IndexLimits {
    pub batch_size: usize,
    pub max_file_bytes: u64,
    pub token_ceiling: usize,
    pub progress_interval: usize,
    pub extensions: Vec<String>,
    pub excluded_dirs: Vec<String>,
}

impl Default for IndexLimits {
    fn default() -> Self {
        Self::from(&WorkspaceConfig::default())
    }
}

impl From<&WorkspaceConfig> for IndexLimits {
    fn from(config: &WorkspaceConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            max_file_bytes: config.max_file_bytes,
            token_ceiling: config.token_ceiling,
            progress_interval: config.progress_interval.max(1),
            extensions: config.extensions.clone(),
            excluded_dirs: config.excluded_dirs.clone(),
        }
    }
}

/// Snapshot of index health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStatus {
    pub documents: usize,
    pub approx_tokens: usize,
    pub indexing: bool,
}

impl fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Indexed Documents: {}\nApprox. Tokens: {}",
            self.documents,
            group_thousands(self.approx_tokens)
        )
    }
}

fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// The workspace index.
pub struct WorkspaceIndex {
    root: RwLock<Option<PathBuf>>,
    limits: IndexLimits,
    files: RwLock<Arc<Vec<IndexedFile>>>,
    approx_tokens: AtomicUsize,
    indexing: AtomicBool,
    sinks: Option<Arc<SinkRegistry>>,
}

/// Clears the indexing flag however the scan exits.
struct IndexingGuard<'a>(&'a AtomicBool);

impl Drop for IndexingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl WorkspaceIndex {
    pub fn new(root: Option<PathBuf>, limits: IndexLimits) -> Self {
        Self {
            root: RwLock::new(root),
            limits,
            files: RwLock::new(Arc::new(Vec::new())),
            approx_tokens: AtomicUsize::new(0),
            indexing: AtomicBool::new(false),
            sinks: None,
        }
    }

    /// An index with no workspace and no files.
    pub fn empty() -> Self {
        Self::new(None, IndexLimits::default())
    }

    /// An index preloaded with files, without touching the filesystem.
    pub fn from_files(files: Vec<IndexedFile>) -> Self {
        let index = Self::empty();
        index.install(files);
        index
    }

    /// Report progress through these sinks as well as the log.
    pub fn with_sinks(mut self, sinks: Arc<SinkRegistry>) -> Self {
        self.sinks = Some(sinks);
        self
    }

    pub fn root(&self) -> Option<PathBuf> {
        self.root.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Point the index at a different workspace. Takes effect on the next scan.
    pub fn set_root(&self, root: Option<PathBuf>) {
        *self.root.write().unwrap_or_else(|p| p.into_inner()) = root;
    }

    pub fn is_indexing(&self) -> bool {
        self.indexing.load(Ordering::Acquire)
    }

    /// The current complete generation.
    pub fn snapshot(&self) -> Arc<Vec<IndexedFile>> {
        Arc::clone(&self.files.read().unwrap_or_else(|p| p.into_inner()))
    }

    pub fn status(&self) -> IndexStatus {
        IndexStatus {
            documents: self.snapshot().len(),
            approx_tokens: self.approx_tokens.load(Ordering::Acquire),
            indexing: self.is_indexing(),
        }
    }

    fn install(&self, files: Vec<IndexedFile>) {
        let tokens = files.iter().map(IndexedFile::approx_tokens).sum();
        *self.files.write().unwrap_or_else(|p| p.into_inner()) = Arc::new(files);
        self.approx_tokens.store(tokens, Ordering::Release);
    }

    fn emit(&self, event: AgentEvent) {
        if let Some(sinks) = &self.sinks {
            sinks.broadcast(&event);
        }
    }

    /// Rebuild the index from the workspace root.
    ///
    /// Does nothing when no root is set or a scan is already running.
    /// Never fails: per-file problems are logged and the file is skipped.
    pub async fn scan(&self) {
        let Some(root) = self.root() else {
            debug!("No workspace root, skipping scan");
            return;
        };

        if self
            .indexing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Scan already in progress");
            return;
        }
        let _guard = IndexingGuard(&self.indexing);

        info!(root = %root.display(), "Starting workspace scan");

        let walk_root = root.clone();
        let walk_limits = self.limits.clone();
        let paths = match tokio::task::spawn_blocking(move || enumerate(&walk_root, &walk_limits)).await {
            Ok(paths) => paths,
            Err(e) => {
                warn!(error = %e, "Workspace walk failed");
                return;
            }
        };

        let total = paths.len();
        let batch_size = self.limits.batch_size.max(1);
        let interval = self.limits.progress_interval.max(1);
        let mut files = Vec::new();
        let mut tokens = 0usize;
        let mut processed = 0usize;
        let mut skipped_for_ceiling = 0usize;

        for batch in paths.chunks(batch_size) {
            let reads = batch.iter().map(|path| read_candidate(path, self.limits.max_file_bytes));
            let results = futures::future::join_all(reads).await;

            for (path, result) in batch.iter().zip(results) {
                match result {
                    Ok(Some((content, last_modified))) => {
                        if tokens > self.limits.token_ceiling {
                            skipped_for_ceiling += 1;
                            continue;
                        }
                        tokens += approx_tokens(&content);
                        files.push(IndexedFile {
                            path: relative_path(&root, path),
                            keywords: index_keywords(&content),
                            content,
                            last_modified,
                        });
                    }
                    Ok(None) => {}
                    Err(e) => debug!(path = %path.display(), error = %e, "Skipping unreadable file"),
                }
            }

            let before = processed;
            processed += batch.len();
            if processed / interval > before / interval {
                info!(indexed = processed, total, "Indexing workspace");
                self.emit(AgentEvent::IndexProgress { indexed: processed, total });
            }

            tokio::task::yield_now().await;
        }

        if skipped_for_ceiling > 0 {
            warn!(
                skipped = skipped_for_ceiling,
                ceiling = self.limits.token_ceiling,
                "Token ceiling reached, remaining files not indexed"
            );
        }

        let documents = files.len();
        self.install(files);
        info!(documents, approx_tokens = tokens, "Workspace index ready");
        self.emit(AgentEvent::IndexReady {
            documents,
            approx_tokens: tokens,
        });
    }
}

/// Candidate files under `root`, sorted for a stable index order.
fn enumerate(root: &Path, limits: &IndexLimits) -> Vec<PathBuf> {
    let excluded: HashSet<String> = limits.excluded_dirs.iter().cloned().collect();
    let extensions: HashSet<String> = limits.extensions.iter().map(|e| e.to_ascii_lowercase()).collect();

    let walker = ignore::WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_exclude(true)
        .require_git(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            !(is_dir && excluded.contains(entry.file_name().to_string_lossy().as_ref()))
        })
        .build();

    let mut paths: Vec<PathBuf> = walker
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(error = %e, "Walk error");
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .map(ignore::DirEntry::into_path)
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.contains(&ext.to_ascii_lowercase()))
        })
        .collect();
    paths.sort();
    paths
}

/// Read a file if it is small enough. `Ok(None)` means skipped for size.
async fn read_candidate(path: &Path, max_bytes: u64) -> std::io::Result<Option<(String, DateTime<Utc>)>> {
    let meta = tokio::fs::metadata(path).await?;
    if meta.len() > max_bytes {
        debug!(path = %path.display(), size = meta.len(), "Skipping large file");
        return Ok(None);
    }
    let content = tokio::fs::read_to_string(path).await?;
    let last_modified = meta.modified().map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now());
    Ok(Some((content, last_modified)))
}

fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrocode_core::event::ChannelSink;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn paths(index: &WorkspaceIndex) -> Vec<String> {
        index.snapshot().iter().map(|f| f.path.clone()).collect()
    }

    #[test]
    fn approx_tokens_rounds_up() {
        assert_eq!(approx_tokens(""), 0);
        assert_eq!(approx_tokens("abc"), 1);
        assert_eq!(approx_tokens("abcd"), 1);
        assert_eq!(approx_tokens("abcde"), 2);
    }

    #[test]
    fn status_display() {
        let status = IndexStatus {
            documents: 12,
            approx_tokens: 1_234_567,
            indexing: false,
        };
        assert_eq!(status.to_string(), "Indexed Documents: 12\nApprox. Tokens: 1,234,567");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
    }

    #[tokio::test]
    async fn scan_without_root_is_noop() {
        let index = WorkspaceIndex::empty();
        index.scan().await;
        assert_eq!(index.status().documents, 0);
        assert!(!index.is_indexing());
    }

    #[tokio::test]
    async fn scan_filters_by_extension_and_excluded_dirs() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/main.rs", "fn main() { println!(\"hello\"); }");
        write(dir.path(), "auth/login.ts", "export function login() {}");
        write(dir.path(), "notes.txt", "not indexed");
        write(dir.path(), "node_modules/pkg/index.js", "module.exports = {}");
        write(dir.path(), "target/debug/build.rs", "fn build() {}");

        let index = WorkspaceIndex::new(Some(dir.path().to_path_buf()), IndexLimits::default());
        index.scan().await;

        assert_eq!(paths(&index), vec!["auth/login.ts", "src/main.rs"]);
        let status = index.status();
        assert_eq!(status.documents, 2);
        assert!(status.approx_tokens > 0);
        assert!(!status.indexing);
    }

    #[tokio::test]
    async fn scan_honours_gitignore() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".gitignore", "generated/\n");
        write(dir.path(), "generated/schema.json", "{}");
        write(dir.path(), "lib.py", "def handler(): pass");

        let index = WorkspaceIndex::new(Some(dir.path().to_path_buf()), IndexLimits::default());
        index.scan().await;

        assert_eq!(paths(&index), vec!["lib.py"]);
    }

    #[tokio::test]
    async fn oversized_and_non_utf8_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "small.md", "# readme");
        write(dir.path(), "big.md", &"x".repeat(2048));
        fs::write(dir.path().join("binary.json"), [0xff, 0xfe, 0x00, 0x81]).unwrap();

        let limits = IndexLimits {
            max_file_bytes: 1024,
            ..IndexLimits::default()
        };
        let index = WorkspaceIndex::new(Some(dir.path().to_path_buf()), limits);
        index.scan().await;

        assert_eq!(paths(&index), vec!["small.md"]);
    }

    #[tokio::test]
    async fn token_ceiling_stops_adding_files() {
        let dir = TempDir::new().unwrap();
        for i in 0..5 {
            write(dir.path(), &format!("f{i}.rs"), &"a".repeat(40)); // 10 tokens each
        }

        let limits = IndexLimits {
            token_ceiling: 15,
            batch_size: 2,
            ..IndexLimits::default()
        };
        let index = WorkspaceIndex::new(Some(dir.path().to_path_buf()), limits);
        index.scan().await;

        // 10 is under the ceiling, 20 is over it: the third file is skipped.
        let status = index.status();
        assert_eq!(status.documents, 2);
        assert_eq!(status.approx_tokens, 20);
    }

    #[tokio::test]
    async fn rescan_replaces_previous_generation() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.rs", "fn alpha() {}");

        let index = WorkspaceIndex::new(Some(dir.path().to_path_buf()), IndexLimits::default());
        index.scan().await;
        let first = index.snapshot();
        assert_eq!(first.len(), 1);

        write(dir.path(), "b.rs", "fn beta() {}");
        index.scan().await;

        assert_eq!(first.len(), 1, "old snapshot is untouched");
        assert_eq!(paths(&index), vec!["a.rs", "b.rs"]);
    }

    #[tokio::test]
    async fn overlapping_scans_build_one_generation() {
        let dir = TempDir::new().unwrap();
        for i in 0..8 {
            write(dir.path(), &format!("s{i}.rs"), "fn step() {}");
        }

        let sinks = Arc::new(SinkRegistry::new());
        let (sink, mut rx) = ChannelSink::pair();
        sinks.register(sink);

        let limits = IndexLimits {
            batch_size: 1,
            ..IndexLimits::default()
        };
        let index = WorkspaceIndex::new(Some(dir.path().to_path_buf()), limits).with_sinks(sinks);

        let watch = async {
            let mut seen_busy = false;
            while !seen_busy {
                seen_busy = index.is_indexing();
                tokio::task::yield_now().await;
            }
            seen_busy
        };
        let ((), (), seen_busy) = tokio::join!(index.scan(), index.scan(), watch);

        assert!(seen_busy);
        assert!(!index.is_indexing());
        assert_eq!(index.status().documents, 8);

        let mut ready = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, AgentEvent::IndexReady { .. }) {
                ready += 1;
            }
        }
        assert_eq!(ready, 1);
    }

    #[tokio::test]
    async fn scan_reports_progress_and_ready() {
        let dir = TempDir::new().unwrap();
        for i in 0..6 {
            write(dir.path(), &format!("m{i}.go"), "package main");
        }

        let sinks = Arc::new(SinkRegistry::new());
        let (sink, mut rx) = ChannelSink::pair();
        sinks.register(sink);

        let limits = IndexLimits {
            batch_size: 2,
            progress_interval: 4,
            ..IndexLimits::default()
        };
        let index = WorkspaceIndex::new(Some(dir.path().to_path_buf()), limits).with_sinks(sinks);
        index.scan().await;

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                AgentEvent::IndexProgress { indexed: 4, total: 6 },
                AgentEvent::IndexReady {
                    documents: 6,
                    approx_tokens: 18
                },
            ]
        );
    }

    #[test]
    fn indexed_file_keywords() {
        let file = IndexedFile::new("src/session.rs", "pub struct Session { messages: Vec<Message> }");
        assert!(file.keywords.contains("session"));
        assert!(file.keywords.contains("messages"));
        assert!(!file.keywords.contains("pub"));
    }
}
