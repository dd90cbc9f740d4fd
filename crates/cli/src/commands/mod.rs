pub mod doctor;
pub mod onboard;
pub mod route;
pub mod split;
pub mod team;

use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use coupler_agent::{Coupler, CouplerOptions, ProviderModel};
use coupler_config::AppConfig;
use coupler_core::StructuredModel;
use tracing::{debug, info};

/// Load the config at `path`, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let path = path.map_or_else(AppConfig::config_path, Path::to_path_buf);
    debug!(path = %path.display(), "Loading config");
    let config =
        AppConfig::load_with_env(&path).map_err(|e| format!("Failed to load config: {e}"))?;
    debug!(team = config.team.len(), "Config loaded");
    Ok(config)
}

/// The request from `--message`, or everything on stdin.
pub fn read_request(message: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(message) = message {
        return Ok(message);
    }
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    Ok(input)
}

/// Build the pipeline from config, failing early with setup hints when no
/// API key is available.
pub fn build_coupler(
    config: &AppConfig,
    concurrency: Option<usize>,
) -> Result<Coupler, Box<dyn std::error::Error>> {
    if !config.has_api_key() && !is_local_provider(&config.default_provider) {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    COUPLER_API_KEY     (generic)");
        eprintln!("    OPENAI_API_KEY      (for OpenAI direct)");
        eprintln!("    OPENROUTER_API_KEY  (for OpenRouter)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_path().display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider =
        coupler_providers::build_primary(config).ok_or("No default provider configured")?;
    let model = Arc::new(ProviderModel::from_config(provider, config));
    info!(
        provider = model.name(),
        model = model.model(),
        timeout_secs = model.call_timeout().as_secs(),
        "Using provider"
    );

    let mut options = CouplerOptions::from_config(&config.coupler);
    if let Some(concurrency) = concurrency {
        options = options.with_max_concurrency(concurrency);
    }

    Ok(Coupler::with_options(model, config.team_roster()?, options))
}

fn is_local_provider(name: &str) -> bool {
    matches!(name, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}
