//! ferrocode CLI: the main entry point.
//!
//! Commands:
//! - `init`     : Create the config directory and a default config
//! - `chat`     : Interactive or single-message chat over the workspace
//! - `index`    : Scan the workspace and report what was indexed
//! - `sessions` : Browse and prune chat history
//! - `agents`   : Manage agent profiles
//! - `models`   : List models offered by the provider
//! - `status`   : Show configuration and storage status

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod sink;

#[derive(Parser)]
#[command(
    name = "ferrocode",
    about = "ferrocode: a workspace-aware coding assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Workspace root (defaults to the configured root, then the current directory)
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Init,

    /// Chat with the assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Run every requested tool without asking
        #[arg(short, long)]
        yes: bool,

        /// Keep this conversation out of the saved history
        #[arg(long)]
        ephemeral: bool,

        /// Treat this file as the open editor
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Continue a saved session
        #[arg(short, long)]
        resume: Option<String>,

        /// Skip the workspace scan on startup
        #[arg(long)]
        no_index: bool,
    },

    /// Scan the workspace
    Index {
        /// Show which files a query would retrieve
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Manage saved chat sessions
    Sessions {
        #[command(subcommand)]
        action: commands::sessions::SessionsAction,
    },

    /// Manage agent profiles
    Agents {
        #[command(subcommand)]
        action: commands::agents::AgentsAction,
    },

    /// List models available from the provider
    Models,

    /// Show system status
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so they never interleave with streamed replies.
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let workspace = cli.workspace;
    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Chat {
            message,
            yes,
            ephemeral,
            file,
            resume,
            no_index,
        } => {
            let options = commands::chat::ChatOptions {
                workspace,
                message,
                auto_confirm: yes,
                ephemeral,
                editor_file: file,
                resume,
                index: !no_index,
            };
            commands::chat::run(options).await?
        }
        Commands::Index { query } => commands::index::run(workspace, query).await?,
        Commands::Sessions { action } => commands::sessions::run(action).await?,
        Commands::Agents { action } => commands::agents::run(action).await?,
        Commands::Models => commands::models::run().await?,
        Commands::Status => commands::status::run(workspace).await?,
    }

    Ok(())
}
