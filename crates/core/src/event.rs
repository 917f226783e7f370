//! Output sinks: how the orchestrator talks to whatever is displaying it.
//!
//! One orchestrator may feed several views at once (a terminal, a panel, a
//! test harness). Each view registers an [`OutputSink`] with the
//! [`SinkRegistry`]; every event is fanned out to all registered sinks.
//! Sinks come and go independently of the session lifecycle.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

use crate::message::Role;
use crate::tool::ToolCall;

/// Events emitted by the agent. Purely informational for the sinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Partial text token from the model.
    Chunk { content: String },

    /// A complete message to display (history replay, tool results).
    Message { role: Role, content: String },

    /// Transient progress text ("Searching workspace memory...").
    Status { message: String },

    /// A tool call needs an explicit confirm/reject decision.
    ConfirmationRequested { call: ToolCall },

    /// A tool call finished executing.
    ToolResult { id: String, tool: String, output: String },

    /// Workspace indexing progress.
    IndexProgress { indexed: usize, total: usize },

    /// Workspace indexing finished.
    IndexReady { documents: usize, approx_tokens: usize },

    /// The displayed conversation should be cleared.
    Cleared,

    /// The active model changed.
    ModelChanged { model: String },

    /// A turn failed; shown once in the visible output.
    Error { message: String },
}

impl AgentEvent {
    /// Short name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::Message { .. } => "message",
            Self::Status { .. } => "status",
            Self::ConfirmationRequested { .. } => "confirmation_requested",
            Self::ToolResult { .. } => "tool_result",
            Self::IndexProgress { .. } => "index_progress",
            Self::IndexReady { .. } => "index_ready",
            Self::Cleared => "cleared",
            Self::ModelChanged { .. } => "model_changed",
            Self::Error { .. } => "error",
        }
    }
}

/// Something that displays agent output.
pub trait OutputSink: Send + Sync {
    fn send(&self, event: &AgentEvent);
}

/// Handle returned by [`SinkRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SinkId(u64);

/// Fan-out registry of output sinks.
#[derive(Default)]
pub struct SinkRegistry {
    next_id: AtomicU64,
    sinks: RwLock<BTreeMap<SinkId, Arc<dyn OutputSink>>>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, sink: Arc<dyn OutputSink>) -> SinkId {
        let id = SinkId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.write().insert(id, sink);
        id
    }

    /// Returns whether the sink was registered.
    pub fn unregister(&self, id: SinkId) -> bool {
        self.write().remove(&id).is_some()
    }

    /// Deliver an event to every registered sink, in registration order.
    pub fn broadcast(&self, event: &AgentEvent) {
        // Snapshot first so a sink may (un)register from inside `send`.
        let sinks: Vec<Arc<dyn OutputSink>> = self.read().values().cloned().collect();
        for sink in sinks {
            sink.send(event);
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<SinkId, Arc<dyn OutputSink>>> {
        self.sinks.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<SinkId, Arc<dyn OutputSink>>> {
        self.sinks.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A sink that forwards events into an unbounded channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<AgentEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<AgentEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink together with the receiving end.
    pub fn pair() -> (Arc<Self>, mpsc::UnboundedReceiver<AgentEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self::new(tx)), rx)
    }
}

impl OutputSink for ChannelSink {
    fn send(&self, event: &AgentEvent) {
        // A dropped receiver just means nobody is watching anymore.
        let _ = self.tx.send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolAction;

    #[test]
    fn broadcast_reaches_every_sink() {
        let registry = SinkRegistry::new();
        let (a, mut rx_a) = ChannelSink::pair();
        let (b, mut rx_b) = ChannelSink::pair();
        registry.register(a);
        registry.register(b);

        registry.broadcast(&AgentEvent::Status { message: "hi".into() });

        assert_eq!(rx_a.try_recv().unwrap().event_type(), "status");
        assert_eq!(rx_b.try_recv().unwrap().event_type(), "status");
    }

    #[test]
    fn unregistered_sink_stops_receiving() {
        let registry = SinkRegistry::new();
        let (a, mut rx_a) = ChannelSink::pair();
        let id = registry.register(a);
        assert_eq!(registry.len(), 1);

        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert!(registry.is_empty());

        registry.broadcast(&AgentEvent::Cleared);
        assert!(rx_a.try_recv().is_err());
    }

    #[test]
    fn dropped_receiver_doesnt_panic() {
        let registry = SinkRegistry::new();
        let (a, rx) = ChannelSink::pair();
        registry.register(a);
        drop(rx);
        registry.broadcast(&AgentEvent::Error { message: "nobody listening".into() });
    }

    #[test]
    fn event_serialization_chunk() {
        let event = AgentEvent::Chunk { content: "Hello".into() };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"chunk""#));
        assert!(json.contains(r#""content":"Hello""#));
    }

    #[test]
    fn confirmation_event_carries_wire_tool_call() {
        let event = AgentEvent::ConfirmationRequested {
            call: ToolCall::new("call_1", ToolAction::RunCommand { command: "ls".into() }),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "confirmation_requested");
        assert_eq!(json["call"]["tool"], "run_command");
        assert_eq!(json["call"]["params"]["command"], "ls");
    }
}
