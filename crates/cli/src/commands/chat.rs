//! `ferrocode chat`: interactive or single-message chat mode.

use ferrocode_agent::{AgentOrchestrator, FileContext, OrchestratorConfig};
use ferrocode_config::AppConfig;
use ferrocode_core::store::SessionStore;
use ferrocode_core::tool::ToolCall;
use ferrocode_memory::{FileProfileStore, FileSessionStore, InMemorySessionStore, IndexLimits, WorkspaceIndex};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::sink::TerminalSink;

/// Lines of a file body shown when asking to confirm a write.
const PREVIEW_LINES: usize = 12;

pub struct ChatOptions {
    pub workspace: Option<PathBuf>,
    pub message: Option<String>,
    pub auto_confirm: bool,
    pub ephemeral: bool,
    pub editor_file: Option<PathBuf>,
    pub resume: Option<String>,
    pub index: bool,
}

type Input = Lines<BufReader<Stdin>>;

pub async fn run(options: ChatOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(options.workspace.clone())?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    FERROCODE_API_KEY=...");
        eprintln!("    GROQ_API_KEY=gsk_...");
        eprintln!();
        eprintln!("  Or add `api_key` to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = ferrocode_providers::build_from_config(&config)?;
    let sessions: Arc<dyn SessionStore> = if options.ephemeral {
        Arc::new(InMemorySessionStore::new(config.history.max_sessions))
    } else {
        Arc::new(FileSessionStore::open(AppConfig::sessions_path(), config.history.max_sessions))
    };
    let profiles = Arc::new(FileProfileStore::open(AppConfig::profiles_path()));
    let index = WorkspaceIndex::new(config.workspace.root.clone(), IndexLimits::from(&config.workspace));

    let mut agent = AgentOrchestrator::new(provider, OrchestratorConfig::from_app_config(&config))
        .with_session_store(sessions)
        .with_profile_store(profiles)
        .with_index(index);
    if let Some(file) = &options.editor_file {
        agent = agent.with_ambient(Arc::new(FileContext::new(file)));
    }
    agent.register_sink(Arc::new(TerminalSink));

    if let Some(id) = &options.resume {
        agent.load_session(id).await?;
    }
    if options.index {
        agent.reindex().await;
    }

    let mut input = BufReader::new(tokio::io::stdin()).lines();

    if let Some(message) = options.message {
        let ok = turn(&agent, &message, options.auto_confirm, &mut input).await?;
        return if ok { Ok(()) } else { Err("The request failed".into()) };
    }

    println!();
    println!("  ferrocode: Interactive Mode");
    println!();
    println!("  Provider:  {}", config.provider);
    println!("  Model:     {}", config.model);
    if let Some(root) = &config.workspace.root {
        println!("  Workspace: {}", root.display());
    }
    println!("  Memory:    {} files", agent.memory_status().documents);
    println!();
    println!("  Type your message and press Enter.");
    println!("  Commands: /new, /status, /reindex, /agent <id>, exit");
    println!();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = input.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "exit" | "quit" => break,
            "/new" => {
                agent.new_session().await;
                println!("  Started a new chat.\n");
            }
            "/status" => println!("\n{}\n", agent.memory_status()),
            "/reindex" => {
                let status = agent.reindex().await;
                println!("\n{status}\n");
            }
            command if command.starts_with("/agent ") => {
                let id = command.trim_start_matches("/agent ").trim();
                match agent.activate_profile(id).await {
                    Ok(profile) => {
                        if let Err(e) = AppConfig::store_system_prompt(&AppConfig::config_path(), &profile.system_prompt) {
                            tracing::warn!(error = %e, "Could not save the agent prompt to the config file");
                        }
                        println!("  Active agent: {}\n", profile.name);
                    }
                    Err(e) => println!("  {e}\n"),
                }
            }
            text => {
                turn(&agent, text, options.auto_confirm, &mut input).await?;
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

/// One turn plus confirmation of every tool call it produced.
///
/// Returns whether the turn succeeded. Turn errors are already shown by
/// the terminal sink.
async fn turn(
    agent: &AgentOrchestrator,
    text: &str,
    auto_confirm: bool,
    input: &mut Input,
) -> Result<bool, Box<dyn std::error::Error>> {
    println!();
    print!("  Assistant > ");
    std::io::stdout().flush()?;

    let outcome = match agent.send_message(text).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::debug!(error = %e, "Turn failed");
            return Ok(false);
        }
    };
    println!("\n");

    for call in &outcome.tool_calls {
        let confirmed = auto_confirm || confirm(call, input).await?;
        agent.resolve_tool(&call.id, confirmed).await;
    }
    Ok(true)
}

async fn confirm(call: &ToolCall, input: &mut Input) -> Result<bool, Box<dyn std::error::Error>> {
    println!("  The assistant wants to run `{}`:", call.tool_name());
    for (key, value) in call.action.params() {
        let mut lines = value.lines();
        println!("    {key}: {}", lines.next().unwrap_or_default());
        for line in lines.by_ref().take(PREVIEW_LINES) {
            println!("      {line}");
        }
        if lines.next().is_some() {
            println!("      ...");
        }
    }
    print!("  Run it? [y/N] ");
    std::io::stdout().flush()?;

    let answer = input.next_line().await?.unwrap_or_default();
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
