//! `ferrocode index`: scan the workspace and report the result.

use ferrocode_core::event::SinkRegistry;
use ferrocode_memory::{IndexLimits, RetrievalEngine, WorkspaceIndex};
use std::path::PathBuf;
use std::sync::Arc;

use crate::sink::TerminalSink;

pub async fn run(workspace: Option<PathBuf>, query: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(workspace)?;
    let root = config.workspace.root.clone().ok_or("No workspace root")?;

    println!("🔍 Indexing {}", root.display());

    let sinks = Arc::new(SinkRegistry::new());
    sinks.register(Arc::new(TerminalSink));
    let index = Arc::new(
        WorkspaceIndex::new(Some(root), IndexLimits::from(&config.workspace)).with_sinks(sinks),
    );
    index.scan().await;

    println!();
    println!("{}", index.status());

    if let Some(query) = query {
        let hits = RetrievalEngine::new(index).rank(&query, config.retrieval.limit);
        println!();
        if hits.is_empty() {
            println!("  No files match \"{query}\".");
        }
        for (i, hit) in hits.iter().enumerate() {
            println!("  {:>2}. {} (relevance {})", i + 1, hit.path, hit.score);
        }
    }

    Ok(())
}
