//! `ferrocode agents`: manage agent profiles.

use clap::Subcommand;
use ferrocode_config::AppConfig;
use ferrocode_core::store::{AgentProfile, ProfileStore};
use ferrocode_memory::FileProfileStore;

#[derive(Subcommand)]
pub enum AgentsAction {
    /// List profiles; the active one is marked
    List,

    /// Make a profile active and copy its prompt into the config
    Use { id: String },

    /// Create or replace a profile
    Add {
        id: String,

        #[arg(short, long)]
        name: String,

        /// System prompt for this agent
        #[arg(short, long)]
        prompt: String,

        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Delete a profile
    Delete { id: String },
}

pub async fn run(action: AgentsAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileProfileStore::open(AppConfig::profiles_path());

    match action {
        AgentsAction::List => {
            let active = store.active_id().await?;
            for agent in store.list().await? {
                let marker = if agent.id == active { "*" } else { " " };
                println!("  {marker} {:<16} {}", agent.id, agent.name);
                if !agent.description.is_empty() {
                    println!("      {}", agent.description);
                }
            }
        }
        AgentsAction::Use { id } => {
            let agent = store.set_active(&id).await?;
            AppConfig::store_system_prompt(&AppConfig::config_path(), &agent.system_prompt)?;
            println!("✅ Active agent: {}", agent.name);
            println!("   Its prompt is now `system_prompt` in {}", AppConfig::config_path().display());
        }
        AgentsAction::Add {
            id,
            name,
            prompt,
            description,
        } => {
            store
                .save(AgentProfile {
                    id: id.clone(),
                    name,
                    description,
                    system_prompt: prompt,
                    icon: None,
                })
                .await?;
            println!("✅ Saved agent {id}");
        }
        AgentsAction::Delete { id } => {
            if store.delete(&id).await? {
                println!("🗑️  Deleted agent {id}");
            } else {
                println!("  No agent with id {id}");
            }
        }
    }

    Ok(())
}
