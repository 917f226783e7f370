//! Completion service clients for ferrocode.
//!
//! Every client implements the `ferrocode_core::Provider` trait.
//! [`build_from_config`] picks one based on configuration.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use ferrocode_config::AppConfig;
use ferrocode_core::error::ProviderError;
use ferrocode_core::provider::Provider;
use std::sync::Arc;

/// Base URLs for the providers known by name.
pub fn default_base_url(provider_name: &str) -> Option<&'static str> {
    match provider_name {
        "groq" => Some(openai_compat::GROQ_BASE_URL),
        "openai" => Some(openai_compat::OPENAI_BASE_URL),
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "ollama" => Some("http://localhost:11434/v1"),
        _ => None,
    }
}

/// Build the configured provider.
///
/// An explicit `api_url` wins over the provider's well-known URL, so any
/// OpenAI-compatible endpoint can be used under any name. A missing key is
/// not an error here: the orchestrator refuses to send without one.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let base_url = match (&config.api_url, default_base_url(&config.provider)) {
        (Some(url), _) => url.clone(),
        (None, Some(url)) => url.to_string(),
        (None, None) => {
            return Err(ProviderError::NotConfigured(format!(
                "unknown provider '{}' and no api_url set",
                config.provider
            )));
        }
    };

    let api_key = config.api_key.clone().unwrap_or_default();
    tracing::debug!(provider = %config.provider, base_url = %base_url, "Building provider");
    Ok(Arc::new(OpenAiCompatProvider::new(&config.provider, base_url, api_key)))
}
