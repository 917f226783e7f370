//! # ferrocode Core
//!
//! Domain types, traits, and error definitions for the ferrocode coding agent.
//! This crate has **no framework dependencies**. It defines the domain model
//! that the index, tool, provider and agent crates implement against.
//!
//! ## Layout
//!
//! - [`message`]: chat messages and sessions (append-only history)
//! - [`provider`]: the completion-service boundary (submit messages, receive a token stream)
//! - [`tool`]: typed tool calls parsed out of model output
//! - [`event`]: output sinks and the fan-out registry the orchestrator broadcasts through
//! - [`store`]: persistence boundaries for sessions and agent profiles

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{ProviderError, StorageError, ToolError};
pub use event::{AgentEvent, ChannelSink, OutputSink, SinkId, SinkRegistry};
pub use message::{ChatMessage, ChatSession, Role};
pub use provider::{ChunkStream, Provider, ProviderRequest, StreamChunk};
pub use store::{AgentProfile, ProfileStore, SessionStore};
pub use tool::{ToolAction, ToolCall, ToolKind, ToolOutcome};
