//! Local tools for ferrocode.
//!
//! The model asks for actions by embedding `<tool_code>` blocks in its
//! reply. [`ToolCallProtocol`] turns those blocks into pending calls and
//! hands confirmed ones to [`ToolExecutor`], which runs them confined to
//! the workspace root:
//!
//! - `create_file` / `edit_file`: write a file
//! - `read_file`: read a file
//! - `list_files`: list a directory
//! - `run_command`: run a shell command with a timeout

pub mod executor;
pub mod file_read;
pub mod file_write;
pub mod list_files;
pub mod protocol;
pub mod shell;
pub mod workspace;

pub use executor::ToolExecutor;
pub use protocol::{ToolCallProtocol, parse_actions};
pub use shell::ShellTool;
pub use workspace::Workspace;
