//! Shell tool: run a command in the workspace root.
//!
//! Non-zero exits and timeouts are reported in the output text. Only a
//! failure to spawn the shell surfaces as an error.

use ferrocode_core::error::ToolError;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Default bound on a single command.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct ShellTool {
    timeout: Option<Duration>,
}

impl ShellTool {
    /// `None` lets commands run until they exit.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Zero seconds disables the bound.
    pub fn from_secs(secs: u64) -> Self {
        Self::new((secs > 0).then(|| Duration::from_secs(secs)))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub async fn run(&self, root: &Path, command: &str) -> Result<String, ToolError> {
        debug!(command = %command, cwd = %root.display(), "Executing shell command");

        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };
        let child = cmd
            .current_dir(root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Dropping the future on timeout drops the child, which kills it.
        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(output) => output?,
                Err(_) => {
                    warn!(command = %command, secs = limit.as_secs(), "Command timed out");
                    return Ok(format!("Command failed: timed out after {}s", limit.as_secs()));
                }
            },
            None => child.wait_with_output().await?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if output.status.success() {
            let mut text = format!("Output:\n{stdout}\n");
            if !stderr.is_empty() {
                text.push_str(&format!("Stderr: {stderr}"));
            }
            return Ok(text);
        }

        let status = match output.status.code() {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        };
        warn!(command = %command, %status, "Command failed");
        Ok(format!("Command failed: {status}\nStderr: {stderr}"))
    }
}

impl Default for ShellTool {
    fn default() -> Self {
        Self::new(Some(DEFAULT_TIMEOUT))
    }
}
