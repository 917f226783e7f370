//! `ferrocode sessions`: browse and prune chat history.

use clap::Subcommand;
use ferrocode_config::AppConfig;
use ferrocode_core::store::SessionStore;
use ferrocode_memory::FileSessionStore;

#[derive(Subcommand)]
pub enum SessionsAction {
    /// List saved sessions, most recent first
    List,

    /// Print a session's messages
    Show { id: String },

    /// Delete one session
    Delete { id: String },

    /// Delete every session
    Clear {
        /// Required to actually delete
        #[arg(long)]
        confirm: bool,
    },
}

pub async fn run(action: SessionsAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = FileSessionStore::open(AppConfig::sessions_path(), config.history.max_sessions);

    match action {
        SessionsAction::List => {
            let sessions = store.list().await?;
            if sessions.is_empty() {
                println!("  No saved sessions.");
            }
            for s in sessions {
                println!(
                    "  {}  {}  {:<33} ({} messages)",
                    s.id,
                    s.last_modified.format("%Y-%m-%d %H:%M"),
                    s.title,
                    s.messages.len()
                );
            }
        }
        SessionsAction::Show { id } => {
            let session = store.get(&id).await?.ok_or_else(|| format!("No session with id {id}"))?;
            println!("{} [{}]\n", session.title, session.model);
            for m in &session.messages {
                println!("  {} > {}\n", m.role.as_str(), m.content);
            }
        }
        SessionsAction::Delete { id } => {
            if store.delete(&id).await? {
                println!("🗑️  Deleted session {id}");
            } else {
                println!("  No session with id {id}");
            }
        }
        SessionsAction::Clear { confirm } => {
            if !confirm {
                println!("⚠️  This will delete ALL saved sessions permanently.");
                println!("   Run with --confirm to proceed:");
                println!("   ferrocode sessions clear --confirm");
                return Ok(());
            }
            store.clear().await?;
            println!("✅ All sessions cleared.");
        }
    }

    Ok(())
}
