//! Provider router: selects the LLM provider based on config.
//!
//! Handles provider creation, caching, and assembling the fallback chain.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use coupler_core::provider::Provider;
use crate::fallback::FallbackProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Routes LLM requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// List all registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build providers from configuration.
pub fn build_from_config(config: &coupler_config::AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();

        let base_url = provider_config
            .api_url
            .clone()
            .unwrap_or_else(|| default_base_url(name));

        router.register(
            name.clone(),
            Arc::new(OpenAiCompatProvider::new(name, &base_url, &api_key)),
        );
    }

    // Ensure the default provider exists (even if not explicitly configured)
    if router.get(&config.default_provider).is_none() {
        let api_key = config.api_key.clone().unwrap_or_default();
        let base_url = default_base_url(&config.default_provider);
        router.register(
            config.default_provider.clone(),
            Arc::new(OpenAiCompatProvider::new(
                &config.default_provider,
                &base_url,
                &api_key,
            )),
        );
    }

    router
}

/// The provider the pipeline should call: the default provider alone, or
/// a fallback chain of the default followed by `fallback_providers`.
pub fn build_primary(config: &coupler_config::AppConfig) -> Option<Arc<dyn Provider>> {
    let router = build_from_config(config);
    let primary = router.default()?;

    if config.fallback_providers.is_empty() {
        return Some(primary);
    }

    let timeout_for = |name: &str| {
        config
            .providers
            .get(name)
            .and_then(|p| p.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or_else(|| config.coupler.request_timeout())
    };

    let mut chain =
        FallbackProvider::new("fallback").add(primary, timeout_for(&config.default_provider));
    for name in &config.fallback_providers {
        if name == &config.default_provider {
            continue;
        }
        let provider = router.get(name).unwrap_or_else(|| {
            let api_key = config.api_key.clone().unwrap_or_default();
            let adhoc: Arc<dyn Provider> =
                Arc::new(OpenAiCompatProvider::new(name, default_base_url(name), api_key));
            adhoc
        });
        let model = config.providers.get(name).and_then(|p| p.default_model.clone());
        chain = chain.add_with_model(provider, timeout_for(name), model);
    }

    Some(Arc::new(chain))
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "fireworks" => "https://api.fireworks.ai/inference/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
