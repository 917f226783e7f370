//! Workspace confinement for path-taking tools.
//!
//! Every path a tool receives is resolved against the workspace root and
//! must stay inside it, both lexically (`..` cannot climb above the root)
//! and physically (an existing symlink cannot point outside it).

use ferrocode_core::error::ToolError;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct Workspace {
    root: Option<PathBuf>,
}

impl Workspace {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    pub fn root(&self) -> Result<&Path, ToolError> {
        self.root.as_deref().ok_or(ToolError::NoWorkspace)
    }

    /// Absolute path for `requested`, refused if it leaves the workspace.
    pub fn resolve(&self, requested: &str) -> Result<PathBuf, ToolError> {
        let root = normalize(self.root()?);
        let resolved = normalize(&root.join(requested));

        if !resolved.starts_with(&root) {
            return Err(ToolError::OutsideWorkspace(requested.to_string()));
        }

        // The nearest existing ancestor decides where a symlink really points.
        if let Some(existing) = resolved.ancestors().find(|p| p.exists())
            && let (Ok(real), Ok(real_root)) = (existing.canonicalize(), root.canonicalize())
            && !real.starts_with(&real_root)
        {
            return Err(ToolError::OutsideWorkspace(requested.to_string()));
        }

        Ok(resolved)
    }
}

/// Lexically resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
