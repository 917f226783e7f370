//! The conversation orchestrator.
//!
//! One turn runs **Retrieve → Stream → Detect**:
//!
//! 1. **Record** the user message in the session
//! 2. **Retrieve** relevant workspace files and ambient editor context
//! 3. **Stream** the completion to every registered sink
//! 4. **Detect** `<tool_code>` blocks in the reply and queue them for
//!    confirmation
//!
//! Tool calls never run inside the turn. Each one waits for
//! [`AgentOrchestrator::resolve_tool`], and its result is appended to the
//! conversation as a new assistant message.

pub mod ambient;
pub mod error;
pub mod orchestrator;
pub mod prompt;

#[cfg(test)]
mod test_helpers;

pub use ambient::{AmbientContext, EditorContext, FileContext, NoAmbient};
pub use error::AgentError;
pub use orchestrator::{AgentOrchestrator, OrchestratorConfig, TurnOutcome};
pub use prompt::{DEFAULT_SYSTEM_PROMPT, build_system_prompt};
