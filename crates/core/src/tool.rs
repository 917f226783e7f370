//! Tool calls: structured requests, embedded in model output, to perform a
//! side-effecting local action.
//!
//! The vocabulary is closed: five known tools plus an explicit `Unknown`
//! variant. Required parameters are checked when a call is parsed, so a
//! [`ToolAction`] that exists is always executable.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ToolError;

/// The known tool kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    CreateFile,
    EditFile,
    ReadFile,
    ListFiles,
    RunCommand,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::CreateFile,
        ToolKind::EditFile,
        ToolKind::ReadFile,
        ToolKind::ListFiles,
        ToolKind::RunCommand,
    ];

    /// Wire name used inside `<tool_code>` blocks.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::CreateFile => "create_file",
            ToolKind::EditFile => "edit_file",
            ToolKind::ReadFile => "read_file",
            ToolKind::ListFiles => "list_files",
            ToolKind::RunCommand => "run_command",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolKind::ALL.into_iter().find(|k| k.as_str() == s).ok_or(())
    }
}

/// A typed tool request.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolAction {
    CreateFile { path: String, content: String },
    /// Same overwrite semantics as `CreateFile`; no patching.
    EditFile { path: String, content: String },
    ReadFile { path: String },
    ListFiles { path: String },
    RunCommand { command: String },
    /// A tool name outside the vocabulary. Kept so the user sees an explicit
    /// "unknown tool" result instead of a silently dropped block.
    Unknown { tool: String, params: BTreeMap<String, String> },
}

impl ToolAction {
    /// Build a typed action from the wire `{tool, params}` pair.
    pub fn from_wire(tool: &str, params: &Map<String, Value>) -> Result<Self, ToolError> {
        let Ok(kind) = tool.parse::<ToolKind>() else {
            return Ok(ToolAction::Unknown {
                tool: tool.to_string(),
                params: stringify_params(params),
            });
        };

        let action = match kind {
            ToolKind::CreateFile => ToolAction::CreateFile {
                path: required(params, "path")?,
                content: required(params, "content")?,
            },
            ToolKind::EditFile => ToolAction::EditFile {
                path: required(params, "path")?,
                content: required(params, "content")?,
            },
            ToolKind::ReadFile => ToolAction::ReadFile {
                path: required(params, "path")?,
            },
            ToolKind::ListFiles => ToolAction::ListFiles {
                path: optional(params, "path").unwrap_or_else(|| ".".to_string()),
            },
            ToolKind::RunCommand => ToolAction::RunCommand {
                command: required(params, "command")?,
            },
        };
        Ok(action)
    }

    pub fn kind(&self) -> Option<ToolKind> {
        match self {
            ToolAction::CreateFile { .. } => Some(ToolKind::CreateFile),
            ToolAction::EditFile { .. } => Some(ToolKind::EditFile),
            ToolAction::ReadFile { .. } => Some(ToolKind::ReadFile),
            ToolAction::ListFiles { .. } => Some(ToolKind::ListFiles),
            ToolAction::RunCommand { .. } => Some(ToolKind::RunCommand),
            ToolAction::Unknown { .. } => None,
        }
    }

    /// The wire name of the tool.
    pub fn tool_name(&self) -> &str {
        match self {
            ToolAction::Unknown { tool, .. } => tool.as_str(),
            other => other.kind().map(|k| k.as_str()).unwrap_or_default(),
        }
    }

    /// Flat string view of the parameters, as shown in confirmation prompts.
    pub fn params(&self) -> BTreeMap<String, String> {
        let pairs: Vec<(&str, &str)> = match self {
            ToolAction::CreateFile { path, content } | ToolAction::EditFile { path, content } => {
                vec![("path", path.as_str()), ("content", content.as_str())]
            }
            ToolAction::ReadFile { path } | ToolAction::ListFiles { path } => vec![("path", path.as_str())],
            ToolAction::RunCommand { command } => vec![("command", command.as_str())],
            ToolAction::Unknown { params, .. } => return params.clone(),
        };
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

fn param_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn required(params: &Map<String, Value>, key: &str) -> Result<String, ToolError> {
    params
        .get(key)
        .and_then(param_as_string)
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

fn optional(params: &Map<String, Value>, key: &str) -> Option<String> {
    params.get(key).and_then(param_as_string)
}

fn stringify_params(params: &Map<String, Value>) -> BTreeMap<String, String> {
    params
        .iter()
        .map(|(k, v)| (k.clone(), param_as_string(v).unwrap_or_else(|| v.to_string())))
        .collect()
}

/// A detected tool call awaiting (or past) confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireToolCall", try_from = "WireToolCall")]
pub struct ToolCall {
    /// Unique per request
    pub id: String,
    pub action: ToolAction,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, action: ToolAction) -> Self {
        Self { id: id.into(), action }
    }

    pub fn tool_name(&self) -> &str {
        self.action.tool_name()
    }
}

/// `{ id, tool, params }`, the shape sinks and stores see.
#[derive(Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    tool: String,
    #[serde(default)]
    params: Map<String, Value>,
}

impl From<ToolCall> for WireToolCall {
    fn from(call: ToolCall) -> Self {
        let params = call
            .action
            .params()
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        Self {
            tool: call.action.tool_name().to_string(),
            id: call.id,
            params,
        }
    }
}

impl TryFrom<WireToolCall> for ToolCall {
    type Error = ToolError;

    fn try_from(wire: WireToolCall) -> Result<Self, Self::Error> {
        Ok(ToolCall {
            action: ToolAction::from_wire(&wire.tool, &wire.params)?,
            id: wire.id,
        })
    }
}

/// How a pending tool call was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// Confirmed and executed; `output` is the executor's result text.
    Executed { call: ToolCall, output: String },
    /// Rejected by the user.
    Cancelled { call: ToolCall },
    /// The id was never pending or has already been resolved.
    Expired { id: String },
}

impl ToolOutcome {
    /// Text surfaced to the user and recorded in the conversation.
    pub fn transcript(&self) -> String {
        match self {
            ToolOutcome::Executed { output, .. } => format!("*Tool Result:*\n```\n{output}\n```"),
            ToolOutcome::Cancelled { .. } => "*Tool execution cancelled.*".to_string(),
            ToolOutcome::Expired { .. } => "Error: Tool call expired or invalid.".to_string(),
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, ToolOutcome::Expired { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn parses_known_tools() {
        let action = ToolAction::from_wire("create_file", &params(json!({"path": "a.txt", "content": "hi"}))).unwrap();
        assert_eq!(
            action,
            ToolAction::CreateFile {
                path: "a.txt".into(),
                content: "hi".into()
            }
        );

        let action = ToolAction::from_wire("run_command", &params(json!({"command": "ls"}))).unwrap();
        assert_eq!(action.kind(), Some(ToolKind::RunCommand));
    }

    #[test]
    fn list_files_defaults_to_root() {
        let action = ToolAction::from_wire("list_files", &Map::new()).unwrap();
        assert_eq!(action, ToolAction::ListFiles { path: ".".into() });
    }

    #[test]
    fn missing_required_param_is_rejected() {
        let err = ToolAction::from_wire("read_file", &Map::new()).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));

        let err = ToolAction::from_wire("create_file", &params(json!({"path": "a"}))).unwrap_err();
        assert!(err.to_string().contains("content"));
    }

    #[test]
    fn unknown_tool_is_kept_explicitly() {
        let action = ToolAction::from_wire("delete_everything", &params(json!({"force": true}))).unwrap();
        assert_eq!(action.tool_name(), "delete_everything");
        assert_eq!(action.kind(), None);
        assert_eq!(action.params().get("force").map(String::as_str), Some("true"));
    }

    #[test]
    fn tool_kind_round_trips_through_names() {
        for kind in ToolKind::ALL {
            assert_eq!(kind.as_str().parse::<ToolKind>(), Ok(kind));
        }
        assert!("shell".parse::<ToolKind>().is_err());
    }

    #[test]
    fn tool_call_serializes_in_wire_shape() {
        let call = ToolCall::new("abc", ToolAction::ReadFile { path: "src/lib.rs".into() });
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["id"], "abc");
        assert_eq!(json["tool"], "read_file");
        assert_eq!(json["params"]["path"], "src/lib.rs");

        let back: ToolCall = serde_json::from_value(json).unwrap();
        assert_eq!(back, call);
    }

    #[test]
    fn outcome_transcripts() {
        let call = ToolCall::new("1", ToolAction::ListFiles { path: ".".into() });
        let executed = ToolOutcome::Executed {
            call: call.clone(),
            output: "Files in .:\na".into(),
        };
        assert!(executed.transcript().contains("Files in .:"));
        assert!(ToolOutcome::Cancelled { call }.transcript().contains("cancelled"));
        let expired = ToolOutcome::Expired { id: "1".into() };
        assert!(expired.is_expired());
        assert!(expired.transcript().contains("expired or invalid"));
    }
}
