//! `StructuredModel` backed by any chat-completion `Provider`.
//!
//! Each call is a system message (instructions) plus a user message (task),
//! constrained with a strict JSON-schema response format and bounded by a
//! per-call timeout.

use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use coupler_config::AppConfig;
use coupler_core::error::CouplerError;
use coupler_core::message::Message;
use coupler_core::provider::{Provider, ProviderRequest, ResponseFormat};
use coupler_core::structured::{OutputSchema, StructuredModel};
use tracing::{debug, trace};

/// Adapts a `Provider` to the structured-output boundary.
pub struct ProviderModel {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.2,
            max_tokens: None,
            timeout: Duration::from_secs(60),
        }
    }

    /// Model, temperature, token limit and timeout from configuration.
    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self::new(provider, &config.default_model)
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens)
            .with_timeout(config.coupler.request_timeout())
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Upper bound for one call; expiry surfaces as `ModelTimeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Deadline for one call: the configured timeout, widened to the
    /// provider's own budget when it has one (a fallback chain needs time
    /// to reach its later entries).
    pub fn call_timeout(&self) -> Duration {
        match self.provider.time_budget() {
            Some(budget) => budget.max(self.timeout),
            None => self.timeout,
        }
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Strip a Markdown code fence some models wrap JSON in.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse model content as a JSON object.
fn parse_json_object(schema: &str, content: &str) -> Result<serde_json::Value, CouplerError> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| CouplerError::schema_violation(schema, format!("response is not JSON: {e}")))?;
    if !value.is_object() {
        return Err(CouplerError::schema_violation(
            schema,
            "response is not a JSON object",
        ));
    }
    Ok(value)
}

#[async_trait]
impl StructuredModel for ProviderModel {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn complete(
        &self,
        instructions: &str,
        task: &str,
        schema: &OutputSchema,
    ) -> Result<serde_json::Value, CouplerError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![Message::system(instructions), Message::user(task)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: Some(ResponseFormat::JsonSchema {
                name: schema.name.clone(),
                schema: schema.schema.clone(),
                strict: true,
            }),
        };

        debug!(
            provider = self.provider.name(),
            model = %self.model,
            schema = %schema.name,
            "Requesting structured completion"
        );

        let deadline = self.call_timeout();
        let response = tokio::time::timeout(deadline, self.provider.complete(request))
            .await
            .map_err(|_| CouplerError::ModelTimeout {
                timeout_ms: millis(deadline),
            })??;

        trace!(content = %response.message.content, "Structured completion received");
        parse_json_object(&schema.name, &response.message.content)
    }
}
