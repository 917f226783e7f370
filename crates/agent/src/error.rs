use ferrocode_core::error::{ProviderError, StorageError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("No API key configured. Run `ferrocode init` or set FERROCODE_API_KEY.")]
    MissingCredential,

    #[error("A response is already being generated")]
    TurnInProgress,

    #[error("Streaming failed: {0}")]
    Stream(ProviderError),

    #[error("Provider error: {0}")]
    Provider(ProviderError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
