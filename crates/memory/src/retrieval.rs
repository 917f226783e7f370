//! Keyword retrieval over the workspace index.
//!
//! Deterministic and model-free: a file scores one point per query keyword
//! found in its keyword set, plus five per query keyword found in its path.

use std::sync::Arc;

use crate::index::{IndexedFile, WorkspaceIndex};
use crate::keywords::query_keywords;

/// Files injected per turn unless configured otherwise.
pub const DEFAULT_LIMIT: usize = 3;

/// Weight of a path match relative to a content match.
pub const PATH_WEIGHT: usize = 5;

const CONTEXT_HEADER: &str = "\n\nRelevant Workspace Files (Auto-Retrieved):\n";

/// A ranked retrieval hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredFile {
    pub path: String,
    pub score: usize,
    pub content: String,
}

/// Score one file against already-extracted query keywords.
///
/// Each distinct keyword counts once: [`query_keywords`] deduplicates, so
/// "render render" scores the same as "render". Repeating a word in the
/// question does not weight it.
pub fn score(file: &IndexedFile, keywords: &[String]) -> usize {
    let path = file.path.to_lowercase();
    keywords
        .iter()
        .map(|kw| {
            let content_hit = usize::from(file.keywords.contains(kw));
            let path_hit = usize::from(path.contains(kw.as_str()));
            content_hit + PATH_WEIGHT * path_hit
        })
        .sum()
}

/// Render hits as the block appended to the system prompt.
pub fn format_context(hits: &[ScoredFile]) -> String {
    if hits.is_empty() {
        return String::new();
    }
    let mut out = String::from(CONTEXT_HEADER);
    for hit in hits {
        out.push_str(&format!(
            "\nFile: {} (Relevance: {})\n```\n{}\n```\n",
            hit.path, hit.score, hit.content
        ));
    }
    out
}

pub struct RetrievalEngine {
    index: Arc<WorkspaceIndex>,
}

impl RetrievalEngine {
    pub fn new(index: Arc<WorkspaceIndex>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &Arc<WorkspaceIndex> {
        &self.index
    }

    /// Top `limit` files with a positive score, best first.
    ///
    /// Ties keep index order.
    pub fn rank(&self, query: &str, limit: usize) -> Vec<ScoredFile> {
        let files = self.index.snapshot();
        if files.is_empty() {
            return Vec::new();
        }
        let keywords = query_keywords(query);
        if keywords.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, &IndexedFile)> = files
            .iter()
            .map(|file| (score(file, &keywords), file))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        scored
            .into_iter()
            .take(limit)
            .map(|(score, file)| ScoredFile {
                path: file.path.clone(),
                score,
                content: file.content.clone(),
            })
            .collect()
    }

    /// Context block for `query`, or an empty string when nothing matches.
    pub fn retrieve(&self, query: &str, limit: usize) -> String {
        let hits = self.rank(query, limit);
        tracing::debug!(hits = hits.len(), "Retrieved workspace context");
        format_context(&hits)
    }
}
