//! Dispatch of confirmed tool calls.

use ferrocode_config::AppConfig;
use ferrocode_core::error::ToolError;
use ferrocode_core::tool::{ToolAction, ToolCall};
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::{info, warn};

use crate::shell::ShellTool;
use crate::workspace::Workspace;
use crate::{file_read, file_write, list_files};

#[derive(Debug, Clone, Default)]
struct Settings {
    workspace: Workspace,
    shell: ShellTool,
}

/// Runs tool actions against the workspace.
///
/// `execute` always yields text: failures are folded into an
/// `Error executing <tool>: ...` line so the conversation can show them.
#[derive(Debug, Default)]
pub struct ToolExecutor {
    settings: RwLock<Settings>,
}

impl ToolExecutor {
    pub fn new(root: Option<PathBuf>, shell: ShellTool) -> Self {
        Self {
            settings: RwLock::new(Settings {
                workspace: Workspace::new(root),
                shell,
            }),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.workspace.root.clone(),
            ShellTool::from_secs(config.tools.command_timeout_secs),
        )
    }

    /// Swap in a new root and command timeout.
    pub fn configure(&self, root: Option<PathBuf>, shell: ShellTool) {
        let mut settings = self.settings.write().unwrap_or_else(|e| e.into_inner());
        *settings = Settings {
            workspace: Workspace::new(root),
            shell,
        };
    }

    fn settings(&self) -> Settings {
        self.settings.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub async fn execute(&self, call: &ToolCall) -> String {
        let tool = call.tool_name();
        if let ToolAction::Unknown { .. } = call.action {
            warn!(tool = %tool, "Unknown tool requested");
            return format!("Error: Unknown tool '{tool}'");
        }

        info!(tool = %tool, id = %call.id, "Executing tool");
        match self.dispatch(&call.action).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = %tool, error = %e, "Tool execution failed");
                format!("Error executing {tool}: {e}")
            }
        }
    }

    async fn dispatch(&self, action: &ToolAction) -> Result<String, ToolError> {
        let Settings { workspace, shell } = self.settings();
        match action {
            ToolAction::CreateFile { path, content } | ToolAction::EditFile { path, content } => {
                file_write::write_file(&workspace, path, content).await
            }
            ToolAction::ReadFile { path } => file_read::read_file(&workspace, path).await,
            ToolAction::ListFiles { path } => list_files::list_files(&workspace, path).await,
            ToolAction::RunCommand { command } => shell.run(workspace.root()?, command).await,
            ToolAction::Unknown { tool, .. } => Ok(format!("Error: Unknown tool '{tool}'")),
        }
    }
}
