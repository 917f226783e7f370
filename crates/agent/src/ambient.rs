//! Ambient context: what the user is looking at when they send a message.
//!
//! Best-effort. A source that has nothing to offer returns `None` and the
//! turn goes ahead without it.

use std::path::{Path, PathBuf};
use tracing::debug;

/// The active editor's text (selection or whole document) and its language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorContext {
    pub language: String,
    pub text: String,
}

pub trait AmbientContext: Send + Sync {
    fn active_editor(&self) -> Option<EditorContext>;
}

/// No editor attached.
pub struct NoAmbient;

impl AmbientContext for NoAmbient {
    fn active_editor(&self) -> Option<EditorContext> {
        None
    }
}

/// Treats a file on disk as the open editor. Re-read on every turn.
pub struct FileContext {
    path: PathBuf,
}

impl FileContext {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AmbientContext for FileContext {
    fn active_editor(&self) -> Option<EditorContext> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Some(EditorContext {
                language: language_for(&self.path).to_string(),
                text,
            }),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "Editor context unavailable");
                None
            }
        }
    }
}

/// Editor language id for a path, from its extension.
pub fn language_for(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    match ext.to_ascii_lowercase().as_str() {
        "rs" => "rust",
        "ts" | "tsx" => "typescript",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "py" => "python",
        "go" => "go",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "cc" | "hpp" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "json" => "json",
        "toml" => "toml",
        "yaml" | "yml" => "yaml",
        "md" => "markdown",
        "html" => "html",
        "css" => "css",
        "sh" => "shellscript",
        _ => "plaintext",
    }
}

/// The ambient block appended to the system prompt.
pub fn render(editor: Option<&EditorContext>, root: Option<&Path>) -> String {
    let mut out = String::new();
    if let Some(editor) = editor {
        out.push_str(&format!(
            "\n\nActive Editor Context:\n```{}\n{}\n```",
            editor.language, editor.text
        ));
    }
    if let Some(root) = root {
        out.push_str(&format!("\n\nWorkspace Root: {}", root.display()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn renders_editor_then_root() {
        let editor = EditorContext {
            language: "rust".into(),
            text: "fn main() {}".into(),
        };
        let out = render(Some(&editor), Some(Path::new("/work")));
        assert_eq!(
            out,
            "\n\nActive Editor Context:\n```rust\nfn main() {}\n```\n\nWorkspace Root: /work"
        );
    }

    #[test]
    fn nothing_to_render() {
        assert_eq!(render(None, None), "");
    }

    #[test]
    fn file_context_reads_and_detects_language() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.py");
        std::fs::write(&path, "print('hi')").unwrap();

        let editor = FileContext::new(&path).active_editor().unwrap();
        assert_eq!(editor.language, "python");
        assert_eq!(editor.text, "print('hi')");

        assert!(FileContext::new(dir.path().join("gone.rs")).active_editor().is_none());
    }

    #[test]
    fn unknown_extension_is_plaintext() {
        assert_eq!(language_for(Path::new("LICENSE")), "plaintext");
        assert_eq!(language_for(Path::new("Main.RS")), "rust");
    }
}
