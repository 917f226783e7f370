//! `ferrocode status`: show configuration and storage status.

use ferrocode_config::AppConfig;
use ferrocode_core::store::{ProfileStore, SessionStore};
use ferrocode_memory::{FileProfileStore, FileSessionStore};
use std::path::PathBuf;

pub async fn run(workspace: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(workspace)?;
    let sessions = FileSessionStore::open(AppConfig::sessions_path(), config.history.max_sessions);
    let profiles = FileProfileStore::open(AppConfig::profiles_path());

    println!("ferrocode Status");
    println!("================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Provider:     {}", config.provider);
    println!("  Model:        {}", config.model);
    println!("  API key:      {}", if config.has_api_key() { "set" } else { "missing" });
    println!("  Temperature:  {}", config.sampling.temperature);
    println!("  Max tokens:   {}", config.sampling.max_tokens);
    match &config.workspace.root {
        Some(root) => println!("  Workspace:    {}", root.display()),
        None => println!("  Workspace:    (none)"),
    }
    println!("  Retrieval:    top {} files", config.retrieval.limit);
    match config.tools.command_timeout_secs {
        0 => println!("  Cmd timeout:  none"),
        secs => println!("  Cmd timeout:  {secs}s"),
    }
    println!(
        "  Sessions:     {} saved (max {})",
        sessions.list().await?.len(),
        config.history.max_sessions
    );
    println!("  Agent:        {}", profiles.active().await?.name);

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file. Run `ferrocode init` first");
    }

    Ok(())
}
