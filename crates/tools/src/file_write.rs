//! File write tool: create or overwrite a file inside the workspace.

use ferrocode_core::error::ToolError;
use tracing::debug;

use crate::workspace::Workspace;

/// Write `content` to `path`, creating parent directories as needed.
///
/// Also backs `edit_file`, which replaces the whole file rather than
/// patching it.
pub async fn write_file(ws: &Workspace, path: &str, content: &str) -> Result<String, ToolError> {
    let target = ws.resolve(path)?;
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&target, content).await?;
    debug!(path = %target.display(), bytes = content.len(), "File written");
    Ok(format!("Successfully created/updated file: {path}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn creates_parents_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::new(Some(dir.path().to_path_buf()));

        let out = write_file(&ws, "src/deep/hello.rs", "fn main() {}").await.unwrap();
        assert_eq!(out, "Successfully created/updated file: src/deep/hello.rs");

        write_file(&ws, "src/deep/hello.rs", "// replaced").await.unwrap();
        let on_disk = std::fs::read_to_string(dir.path().join("src/deep/hello.rs")).unwrap();
        assert_eq!(on_disk, "// replaced");
    }

    #[tokio::test]
    async fn refuses_paths_outside_workspace() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::new(Some(dir.path().join("inner")));
        let err = write_file(&ws, "../escaped.txt", "x").await.unwrap_err();
        assert!(matches!(err, ToolError::OutsideWorkspace(_)));
        assert!(!dir.path().join("escaped.txt").exists());
    }

    #[tokio::test]
    async fn no_workspace_is_an_error() {
        let err = write_file(&Workspace::default(), "a.txt", "x").await.unwrap_err();
        assert_eq!(err.to_string(), "No workspace open");
    }
}
