pub mod agents;
pub mod chat;
pub mod index;
pub mod init;
pub mod models;
pub mod sessions;
pub mod status;

use ferrocode_config::AppConfig;
use std::path::PathBuf;

/// Load the config, with `--workspace` (or the current directory) filling
/// in the workspace root.
pub fn load_config(workspace: Option<PathBuf>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(root) = workspace {
        config.workspace.root = Some(root);
    }
    if config.workspace.root.is_none() {
        config.workspace.root = std::env::current_dir().ok();
    }
    config.workspace.root = config
        .workspace
        .root
        .take()
        .map(|root| std::fs::canonicalize(&root).unwrap_or(root));
    Ok(config)
}
