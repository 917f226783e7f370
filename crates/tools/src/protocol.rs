//! The tool-call protocol.
//!
//! Model output requests actions through blocks of the form
//!
//! ```text
//! <tool_code>{"tool": "read_file", "params": {"path": "src/main.rs"}}</tool_code>
//! ```
//!
//! Each valid block becomes a pending [`ToolCall`] and a confirmation
//! request for the sinks. Nothing runs until the call is resolved.

use ferrocode_core::event::{AgentEvent, SinkRegistry};
use ferrocode_core::tool::{ToolAction, ToolCall, ToolOutcome};
use regex_lite::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::{Arc, LazyLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::executor::ToolExecutor;

static TOOL_BLOCK: LazyLock<Result<Regex, regex_lite::Error>> =
    LazyLock::new(|| Regex::new(r"(?s)<tool_code>(.*?)</tool_code>"));

#[derive(Deserialize)]
struct ToolBlock {
    tool: String,
    #[serde(default)]
    params: Map<String, Value>,
}

/// Parse one block body. `None` when it is not a usable call.
fn parse_block(body: &str) -> Option<ToolAction> {
    let block: ToolBlock = match serde_json::from_str(body.trim()) {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, "Skipping malformed tool block");
            return None;
        }
    };
    match ToolAction::from_wire(&block.tool, &block.params) {
        Ok(action) => Some(action),
        Err(e) => {
            warn!(tool = %block.tool, error = %e, "Skipping tool block");
            None
        }
    }
}

/// Every well-formed action in `text`, in source order.
pub fn parse_actions(text: &str) -> Vec<ToolAction> {
    let re = match &*TOOL_BLOCK {
        Ok(re) => re,
        Err(e) => {
            warn!(error = %e, "Tool block pattern failed to compile");
            return Vec::new();
        }
    };
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter_map(|body| parse_block(body.as_str()))
        .collect()
}

pub struct ToolCallProtocol {
    executor: Arc<ToolExecutor>,
    /// In detection order.
    pending: Mutex<Vec<ToolCall>>,
    sinks: Arc<SinkRegistry>,
}

impl ToolCallProtocol {
    pub fn new(executor: Arc<ToolExecutor>, sinks: Arc<SinkRegistry>) -> Self {
        Self {
            executor,
            pending: Mutex::new(Vec::new()),
            sinks,
        }
    }

    pub fn executor(&self) -> &Arc<ToolExecutor> {
        &self.executor
    }

    /// Register every tool call in `text` as pending and ask the sinks to
    /// confirm each one.
    pub async fn detect(&self, text: &str) -> Vec<ToolCall> {
        let calls: Vec<ToolCall> = parse_actions(text)
            .into_iter()
            .map(|action| ToolCall::new(uuid::Uuid::new_v4().to_string(), action))
            .collect();
        if calls.is_empty() {
            return calls;
        }

        self.pending.lock().await.extend(calls.iter().cloned());
        for call in &calls {
            debug!(id = %call.id, tool = %call.tool_name(), "Tool call awaiting confirmation");
            self.sinks.broadcast(&AgentEvent::ConfirmationRequested { call: call.clone() });
        }
        calls
    }

    /// Settle a pending call. Each id resolves at most once.
    pub async fn resolve(&self, id: &str, confirmed: bool) -> ToolOutcome {
        let call = {
            let mut pending = self.pending.lock().await;
            match pending.iter().position(|c| c.id == id) {
                Some(pos) => pending.remove(pos),
                None => {
                    warn!(id = %id, "Tool call expired or unknown");
                    return ToolOutcome::Expired { id: id.to_string() };
                }
            }
        };

        if !confirmed {
            info!(id = %id, tool = %call.tool_name(), "Tool call rejected");
            return ToolOutcome::Cancelled { call };
        }

        self.sinks.broadcast(&AgentEvent::Status {
            message: format!("Executing tool: {}...", call.tool_name()),
        });
        let output = self.executor.execute(&call).await;
        ToolOutcome::Executed { call, output }
    }

    pub async fn pending(&self) -> Vec<ToolCall> {
        self.pending.lock().await.clone()
    }

    /// Drop every pending call, e.g. when the session changes.
    pub async fn clear(&self) -> usize {
        let mut pending = self.pending.lock().await;
        let dropped = pending.len();
        pending.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::ShellTool;
    use ferrocode_core::event::ChannelSink;
    use tempfile::TempDir;

    fn protocol(root: Option<&TempDir>) -> (ToolCallProtocol, tokio::sync::mpsc::UnboundedReceiver<AgentEvent>) {
        let sinks = Arc::new(SinkRegistry::new());
        let (sink, rx) = ChannelSink::pair();
        sinks.register(sink);
        let executor = ToolExecutor::new(root.map(|d| d.path().to_path_buf()), ShellTool::default());
        (ToolCallProtocol::new(Arc::new(executor), sinks), rx)
    }

    #[test]
    fn parses_blocks_in_order_and_skips_bad_ones() {
        let text = r#"First I'll look around.
<tool_code>{"tool": "list_files", "params": {}}</tool_code>
<tool_code>{not json}</tool_code>
<tool_code>{"tool": "read_file", "params": {}}</tool_code>
<tool_code>
{"tool": "create_file", "params": {"path": "a.txt", "content": "x"}}
</tool_code>"#;
        let actions = parse_actions(text);
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0], ToolAction::ListFiles { path: ".".into() });
        assert_eq!(actions[1].tool_name(), "create_file");
    }

    #[test]
    fn text_without_blocks_yields_nothing() {
        assert!(parse_actions("Just an explanation, no tools.").is_empty());
        assert!(parse_actions("<tool_code>{\"tool\":\"read_file\"").is_empty());
    }

    #[tokio::test]
    async fn detect_registers_and_broadcasts_each_call() {
        let (protocol, mut rx) = protocol(None);
        let text = r#"<tool_code>{"tool":"run_command","params":{"command":"ls"}}</tool_code>
<tool_code>{"tool":"read_file","params":{"path":"a"}}</tool_code>"#;

        let calls = protocol.detect(text).await;
        assert_eq!(calls.len(), 2);
        assert_ne!(calls[0].id, calls[1].id);
        assert_eq!(protocol.pending().await, calls);

        for expected in &calls {
            match rx.try_recv().unwrap() {
                AgentEvent::ConfirmationRequested { call } => assert_eq!(&call, expected),
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn confirmed_call_executes_once() {
        let dir = TempDir::new().unwrap();
        let (protocol, _rx) = protocol(Some(&dir));
        let calls = protocol
            .detect(r#"<tool_code>{"tool":"create_file","params":{"path":"hello.txt","content":"Hi"}}</tool_code>"#)
            .await;

        let outcome = protocol.resolve(&calls[0].id, true).await;
        assert_eq!(
            outcome.transcript(),
            "*Tool Result:*\n```\nSuccessfully created/updated file: hello.txt\n```"
        );
        assert_eq!(std::fs::read_to_string(dir.path().join("hello.txt")).unwrap(), "Hi");

        let again = protocol.resolve(&calls[0].id, true).await;
        assert!(again.is_expired());
        assert_eq!(again.transcript(), "Error: Tool call expired or invalid.");
    }

    #[tokio::test]
    async fn rejected_call_does_not_run() {
        let dir = TempDir::new().unwrap();
        let (protocol, _rx) = protocol(Some(&dir));
        let calls = protocol
            .detect(r#"<tool_code>{"tool":"create_file","params":{"path":"nope.txt","content":""}}</tool_code>"#)
            .await;

        let outcome = protocol.resolve(&calls[0].id, false).await;
        assert!(matches!(outcome, ToolOutcome::Cancelled { .. }));
        assert!(!dir.path().join("nope.txt").exists());
        assert!(protocol.pending().await.is_empty());
    }

    #[tokio::test]
    async fn calls_resolve_independently() {
        let dir = TempDir::new().unwrap();
        let (protocol, _rx) = protocol(Some(&dir));
        let calls = protocol
            .detect(
                r#"<tool_code>{"tool":"list_files","params":{}}</tool_code>
<tool_code>{"tool":"list_files","params":{"path":"."}}</tool_code>"#,
            )
            .await;

        protocol.resolve(&calls[1].id, false).await;
        let remaining = protocol.pending().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, calls[0].id);
    }

    #[tokio::test]
    async fn unknown_id_is_expired() {
        let (protocol, _rx) = protocol(None);
        assert_eq!(
            protocol.resolve("missing", true).await,
            ToolOutcome::Expired { id: "missing".into() }
        );
    }
}
