//! Directory listing tool.

use ferrocode_core::error::ToolError;

use crate::workspace::Workspace;

/// Sorted entry names of the directory at `path`.
pub async fn list_files(ws: &Workspace, path: &str) -> Result<String, ToolError> {
    let target = ws.resolve(path)?;
    if !tokio::fs::metadata(&target).await.is_ok_and(|m| m.is_dir()) {
        return Ok(format!("Directory not found: {path}"));
    }

    let mut entries = Vec::new();
    let mut dir = tokio::fs::read_dir(&target).await?;
    while let Some(entry) = dir.next_entry().await? {
        entries.push(entry.file_name().to_string_lossy().into_owned());
    }
    entries.sort();

    Ok(format!("Files in {path}:\n{}", entries.join("\n")))
}
