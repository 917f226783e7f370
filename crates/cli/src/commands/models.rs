//! `ferrocode models`: list models offered by the configured provider.

use ferrocode_config::AppConfig;
use ferrocode_core::provider::Provider;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let provider = ferrocode_providers::build_from_config(&config)?;

    let models = provider.list_models().await?;
    println!("🤖 Models from {}", config.provider);
    println!();
    if models.is_empty() {
        println!("  The provider did not list any models.");
    }
    for model in models {
        let marker = if model == config.model { "*" } else { " " };
        println!("  {marker} {model}");
    }

    Ok(())
}
