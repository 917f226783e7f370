//! Terminal rendering of agent events.

use ferrocode_core::event::{AgentEvent, OutputSink};
use ferrocode_core::message::Role;
use std::io::Write;

/// Prints events as they arrive. Replies stream to stdout, everything
/// else goes to stderr.
pub struct TerminalSink;

impl OutputSink for TerminalSink {
    fn send(&self, event: &AgentEvent) {
        match event {
            AgentEvent::Chunk { content } => {
                print!("{content}");
                let _ = std::io::stdout().flush();
            }
            AgentEvent::Message { role, content } => {
                let label = match role {
                    Role::User => "You",
                    Role::Assistant => "Assistant",
                    Role::System => "System",
                };
                println!("  {label} > {content}\n");
            }
            AgentEvent::Status { message } => eprintln!("  … {message}"),
            // The chat loop asks for confirmation itself.
            AgentEvent::ConfirmationRequested { .. } => {}
            AgentEvent::ToolResult { tool, output, .. } => {
                println!("  [{tool}]");
                for line in output.lines() {
                    println!("  │ {line}");
                }
                println!();
            }
            AgentEvent::IndexProgress { indexed, total } => {
                eprint!("\r  Indexing {indexed}/{total} files...");
            }
            AgentEvent::IndexReady { documents, approx_tokens } => {
                eprintln!("\r  Indexed {documents} files (~{approx_tokens} tokens)      ");
            }
            AgentEvent::Cleared => {}
            AgentEvent::ModelChanged { model } => eprintln!("  Model: {model}"),
            AgentEvent::Error { message } => eprintln!("\n  [Error] {message}\n"),
        }
    }
}
