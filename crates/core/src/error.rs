//! Error types for the ferrocode domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type; callers wrap them in
//! their own enums (see `AgentError`).

use thiserror::Error;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures inside a tool. These never reach the orchestrator as errors:
/// the executor renders them into the tool's result text.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("No workspace open")]
    NoWorkspace,

    #[error("Path '{0}' escapes the workspace root")]
    OutsideWorkspace(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to write {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("Failed to encode store contents: {0}")]
    Encode(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        };
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn tool_error_messages_are_bare() {
        // Rendered after "Error executing <tool>: ", so no prefix of their own.
        assert_eq!(ToolError::NoWorkspace.to_string(), "No workspace open");
        let err = ToolError::OutsideWorkspace("../secret".into());
        assert!(err.to_string().contains("../secret"));
    }

    #[test]
    fn storage_error_names_the_missing_item() {
        let err = StorageError::NotFound("session 42".into());
        assert_eq!(err.to_string(), "Not found: session 42");
    }
}
