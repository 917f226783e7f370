//! File read tool.

use ferrocode_core::error::ToolError;

use crate::workspace::Workspace;

/// Contents of `path`, or a "not found" message when it is not a readable file.
pub async fn read_file(ws: &Workspace, path: &str) -> Result<String, ToolError> {
    let target = ws.resolve(path)?;
    if !tokio::fs::metadata(&target).await.is_ok_and(|m| m.is_file()) {
        return Ok(format!("File not found: {path}"));
    }
    Ok(tokio::fs::read_to_string(&target).await?)
}
