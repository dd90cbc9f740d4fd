//! Configuration loading, validation, and management for Coupler.
//!
//! Loads configuration from `~/.coupler/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use coupler_core::error::CouplerError;
use coupler_core::team::TeamRoster;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.coupler/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Providers tried in order after the default one fails
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_providers: Vec<String>,

    /// Pipeline settings (timeouts, retries, fan-out)
    #[serde(default)]
    pub coupler: CouplerConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Team members requests are routed to, in prompt order
    #[serde(default)]
    pub team: Vec<TeamMemberConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    1024
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("fallback_providers", &self.fallback_providers)
            .field("coupler", &self.coupler)
            .field("providers", &self.providers)
            .field("team", &self.team)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Timeouts, retries and fan-out for the split-and-classify pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouplerConfig {
    /// Upper bound for a single model call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Attempts per model call, including the first (1 = no retry)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles on every further retry
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Cap for the retry delay
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Classifier calls in flight at once (1 = sequential)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// On fallback, report the default member's responsibility instead of
    /// the text the model returned
    #[serde(default)]
    pub echo_default_responsibility: bool,
}

fn default_request_timeout_secs() -> u64 {
    60
}
fn default_max_attempts() -> u32 {
    3
}
fn default_initial_backoff_ms() -> u64 {
    500
}
fn default_max_backoff_ms() -> u64 {
    8_000
}
fn default_max_concurrency() -> usize {
    1
}

impl Default for CouplerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            max_concurrency: default_max_concurrency(),
            echo_default_responsibility: false,
        }
    }
}

impl CouplerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    /// Per-provider timeout when used in the fallback chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// A `[[team]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMemberConfig {
    /// Unique identifier (e.g., "MARKETING")
    pub id: String,

    /// What the member is responsible for
    pub responsibility: String,

    /// Handles requests no other member matches
    #[serde(default)]
    pub default: bool,
}

impl TeamMemberConfig {
    pub fn new(id: &str, responsibility: &str, default: bool) -> Self {
        Self {
            id: id.into(),
            responsibility: responsibility.into(),
            default,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.coupler/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `COUPLER_API_KEY` (highest priority)
    /// - `OPENAI_API_KEY`
    /// - `OPENROUTER_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_path())
    }

    /// Load configuration from `path`, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("COUPLER_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("COUPLER_PROVIDER") {
            self.default_provider = provider;
        }

        if let Ok(model) = std::env::var("COUPLER_MODEL") {
            self.default_model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".coupler")
    }

    /// Get the default configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.coupler.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "coupler.request_timeout_secs must be > 0".into(),
            ));
        }

        if self.coupler.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "coupler.max_attempts must be >= 1".into(),
            ));
        }

        if self.coupler.max_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "coupler.max_concurrency must be >= 1".into(),
            ));
        }

        if self.coupler.initial_backoff_ms > self.coupler.max_backoff_ms {
            return Err(ConfigError::ValidationError(
                "coupler.initial_backoff_ms must not exceed coupler.max_backoff_ms".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Build the validated team roster from the `[[team]]` entries.
    pub fn team_roster(&self) -> Result<TeamRoster, CouplerError> {
        let mut builder = TeamRoster::builder();
        for member in &self.team {
            builder.register(&member.id, &member.responsibility, member.default)?;
        }
        Ok(builder.build())
    }

    /// A starter configuration with an example team.
    pub fn sample() -> Self {
        Self {
            team: vec![
                TeamMemberConfig::new(
                    "MARKETING",
                    "creates or provides marketing materials as requested",
                    false,
                ),
                TeamMemberConfig::new(
                    "SALES",
                    "handles all sales from new leads to closing deals",
                    false,
                ),
                TeamMemberConfig::new(
                    "FINANCE",
                    "manages all financial accounts and processes all incoming and outgoing money",
                    false,
                ),
                TeamMemberConfig::new("TEAM_MANAGER", "makes all management decisions", true),
            ],
            ..Self::default()
        }
    }

    /// Generate the starter config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::sample()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            fallback_providers: vec![],
            coupler: CouplerConfig::default(),
            providers: HashMap::new(),
            team: vec![],
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.default_model, "gpt-4o");
        assert_eq!(config.coupler.max_attempts, 3);
        assert_eq!(config.coupler.max_concurrency, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::sample();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.team, config.team);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_attempts_rejected() {
        let mut config = AppConfig::default();
        config.coupler.max_attempts = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn inverted_backoff_rejected() {
        let mut config = AppConfig::default();
        config.coupler.initial_backoff_ms = 10_000;
        config.coupler.max_backoff_ms = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        let config = result.unwrap();
        assert_eq!(config.default_provider, "openai");
        assert!(config.team.is_empty());
    }

    #[test]
    fn load_team_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_model = "gpt-4o-mini"

[coupler]
max_concurrency = 4

[[team]]
id = "MARKETING"
responsibility = "creates marketing materials"

[[team]]
id = "TEAM_MANAGER"
responsibility = "makes all management decisions"
default = true
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.default_model, "gpt-4o-mini");
        assert_eq!(config.coupler.max_concurrency, 4);
        assert_eq!(config.coupler.request_timeout_secs, 60);

        let roster = config.team_roster().unwrap();
        assert_eq!(roster.ids(), vec!["MARKETING", "TEAM_MANAGER"]);
        assert_eq!(roster.default_handler().unwrap().id, "TEAM_MANAGER");
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[[team]]\nid = 3\n").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn duplicate_team_ids_fail_roster() {
        let config = AppConfig {
            team: vec![
                TeamMemberConfig::new("SALES", "handles sales", false),
                TeamMemberConfig::new("SALES", "also handles sales", false),
            ],
            ..AppConfig::default()
        };
        assert!(matches!(
            config.team_roster(),
            Err(CouplerError::Validation(_))
        ));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-4o"));
        assert!(toml_str.contains("MARKETING"));
        assert!(toml_str.contains("TEAM_MANAGER"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn durations_from_config() {
        let config = CouplerConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.initial_backoff(), Duration::from_millis(500));
        assert_eq!(config.max_backoff(), Duration::from_millis(8_000));
    }
}
