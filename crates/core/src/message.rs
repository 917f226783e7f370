//! Chat messages and sessions.
//!
//! A session is an ordered, append-only sequence of messages:
//! append order = display order = prompt order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title given to sessions that have not seen a user message yet.
pub const DEFAULT_TITLE: &str = "New Chat";

/// Number of characters of the first user message kept in a derived title.
const TITLE_CHARS: usize = 30;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The model, or a tool result surfaced on its behalf
    Assistant,
    /// System instructions
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// A single message in a conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// One continuous conversation, persisted independently of any view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,

    pub title: String,

    pub last_modified: DateTime<Utc>,

    /// Model the session was started with
    pub model: String,

    pub messages: Vec<ChatMessage>,

    /// Whether the title should still be derived from the first user message.
    #[serde(default)]
    pub auto_title: bool,
}

impl ChatSession {
    /// Create a session with an empty history and a fresh identifier.
    ///
    /// Without an explicit title the session is called "New Chat" until the
    /// first user message arrives.
    pub fn new(title: Option<String>, model: impl Into<String>) -> Self {
        let auto_title = title.is_none();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            last_modified: Utc::now(),
            model: model.into(),
            messages: Vec::new(),
            auto_title,
        }
    }

    /// Append a message and bump `last_modified`.
    pub fn append(&mut self, message: ChatMessage) {
        if self.auto_title && message.role == Role::User {
            self.title = derive_title(&message.content);
            self.auto_title = false;
        }
        self.last_modified = Utc::now();
        self.messages.push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages with the given role, in append order.
    pub fn messages_with_role(&self, role: Role) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(move |m| m.role == role)
    }
}

/// First 30 characters of the message, with an ellipsis when truncated.
pub fn derive_title(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(TITLE_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
