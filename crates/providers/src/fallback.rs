//! Provider fallback: ordered chain with per-provider timeouts.
//!
//! A failed or slow backend hands the same structured request to the next
//! one. Each entry may name its own model, since a fallback backend rarely
//! serves the primary's model id. Request-shape errors (a 4xx other than
//! auth, not-found or rate-limit) end the chain: every OpenAI-compatible
//! backend would reject the same body and schema.

use async_trait::async_trait;
use coupler_core::error::ProviderError;
use coupler_core::provider::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Timeout for entries added without one.
pub const DEFAULT_ENTRY_TIMEOUT: Duration = Duration::from_secs(120);

/// Chains providers and moves on when one fails.
pub struct FallbackProvider {
    name: String,
    chain: Vec<ChainEntry>,
}

struct ChainEntry {
    provider: Arc<dyn Provider>,
    timeout: Duration,
    /// Replaces `ProviderRequest::model` for this entry.
    model: Option<String>,
}

/// What one entry's attempt means for the chain.
enum Step {
    Done(ProviderResponse),
    Stop(ProviderError),
    Next(ProviderError),
}

impl FallbackProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain: Vec::new(),
        }
    }

    /// Append a provider that keeps the request's model.
    pub fn add(self, provider: Arc<dyn Provider>, timeout: Duration) -> Self {
        self.add_with_model(provider, timeout, None)
    }

    /// Append a provider with [`DEFAULT_ENTRY_TIMEOUT`].
    pub fn add_default(self, provider: Arc<dyn Provider>) -> Self {
        self.add(provider, DEFAULT_ENTRY_TIMEOUT)
    }

    /// Append a provider that is asked for `model` instead of the request's.
    pub fn add_with_model(
        mut self,
        provider: Arc<dyn Provider>,
        timeout: Duration,
        model: Option<String>,
    ) -> Self {
        self.chain.push(ChainEntry {
            provider,
            timeout,
            model,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.chain.iter().map(|e| e.provider.name()).collect()
    }

    async fn attempt(&self, entry: &ChainEntry, mut request: ProviderRequest) -> Step {
        let provider = entry.provider.name();
        if let Some(model) = &entry.model {
            request.model = model.clone();
        }
        debug!(provider, model = %request.model, "Fallback: trying provider");

        match tokio::time::timeout(entry.timeout, entry.provider.complete(request)).await {
            Ok(Ok(response)) => Step::Done(response),
            Ok(Err(e)) if is_request_error(&e) => {
                warn!(provider, error = %e, "Fallback: request rejected, stopping chain");
                Step::Stop(e)
            }
            Ok(Err(e)) => {
                warn!(provider, error = %e, "Fallback: provider failed");
                Step::Next(e)
            }
            Err(_) => {
                warn!(
                    provider,
                    timeout_secs = entry.timeout.as_secs_f64(),
                    "Fallback: provider timed out"
                );
                Step::Next(ProviderError::Timeout(format!(
                    "provider '{provider}' gave no answer within {:?}",
                    entry.timeout
                )))
            }
        }
    }
}

/// A 4xx caused by the request body rather than by the backend.
fn is_request_error(error: &ProviderError) -> bool {
    match error {
        ProviderError::ApiError { status_code, .. } => {
            (400..500).contains(status_code) && !matches!(status_code, 401 | 403 | 404 | 429)
        }
        _ => false,
    }
}

#[async_trait]
impl Provider for FallbackProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let mut last_error = None;

        for entry in &self.chain {
            match self.attempt(entry, request.clone()).await {
                Step::Done(response) => return Ok(response),
                Step::Stop(e) => return Err(e),
                Step::Next(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ProviderError::NotConfigured(format!("fallback chain '{}' is empty", self.name))
        }))
    }

    /// Models of every reachable provider, without duplicates.
    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        let mut models: Vec<String> = Vec::new();
        for entry in &self.chain {
            for model in entry.provider.list_models().await.unwrap_or_default() {
                if !models.contains(&model) {
                    models.push(model);
                }
            }
        }
        Ok(models)
    }

    /// Healthy while at least one provider is.
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        for entry in &self.chain {
            if entry.provider.health_check().await.unwrap_or(false) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Enough time for every entry to use its full timeout.
    fn time_budget(&self) -> Option<Duration> {
        if self.chain.is_empty() {
            return None;
        }
        Some(
            self.chain
                .iter()
                .fold(Duration::ZERO, |total, e| total.saturating_add(e.timeout)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coupler_core::message::Message;
    use std::sync::Mutex;

    enum Behaviour {
        Answer,
        Fail(ProviderError),
        Hang,
    }

    /// Records the model of every request and behaves as scripted.
    struct StubProvider {
        name: &'static str,
        behaviour: Behaviour,
        models: Mutex<Vec<String>>,
    }

    impl StubProvider {
        fn new(name: &'static str, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                name,
                behaviour,
                models: Mutex::new(Vec::new()),
            })
        }

        fn answering(name: &'static str) -> Arc<Self> {
            Self::new(name, Behaviour::Answer)
        }

        fn failing(name: &'static str, error: ProviderError) -> Arc<Self> {
            Self::new(name, Behaviour::Fail(error))
        }

        fn calls(&self) -> usize {
            self.models.lock().unwrap().len()
        }

        fn models(&self) -> Vec<String> {
            self.models.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Provider for StubProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            self.models.lock().unwrap().push(request.model.clone());
            match &self.behaviour {
                Behaviour::Answer => Ok(ProviderResponse {
                    message: Message::assistant(r#"{"user_requests": []}"#),
                    usage: None,
                    model: request.model,
                    metadata: serde_json::Map::new(),
                }),
                Behaviour::Fail(e) => Err(e.clone()),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(ProviderError::Timeout("hung".into()))
                }
            }
        }

        async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
            match &self.behaviour {
                Behaviour::Fail(e) => Err(e.clone()),
                _ => Ok(vec!["gpt-4o".into(), format!("{}-model", self.name)]),
            }
        }

        async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
            Ok(matches!(self.behaviour, Behaviour::Answer))
        }
    }

    fn split_request() -> ProviderRequest {
        ProviderRequest {
            model: "gpt-4o".into(),
            messages: vec![
                Message::system("Split the request"),
                Message::user("Launch a campaign. Hire salespeople."),
            ],
            temperature: 0.2,
            max_tokens: None,
            response_format: Some(ResponseFormat::JsonObject),
        }
    }

    fn server_error() -> ProviderError {
        ProviderError::ApiError {
            status_code: 503,
            message: "Service Unavailable".into(),
        }
    }

    #[tokio::test]
    async fn primary_answer_ends_chain() {
        let primary = StubProvider::answering("primary");
        let backup = StubProvider::answering("backup");
        let chain = FallbackProvider::new("chain")
            .add_default(primary.clone())
            .add_default(backup.clone());

        assert!(chain.complete(split_request()).await.is_ok());
        assert_eq!(primary.calls(), 1);
        assert_eq!(backup.calls(), 0);
    }

    #[tokio::test]
    async fn provider_failures_move_on() {
        for error in [
            server_error(),
            ProviderError::RateLimited { retry_after_secs: 60 },
            ProviderError::Network("connection reset".into()),
        ] {
            let primary = StubProvider::failing("primary", error);
            let backup = StubProvider::answering("backup");
            let chain = FallbackProvider::new("chain")
                .add_default(primary.clone())
                .add_default(backup.clone());

            assert!(chain.complete(split_request()).await.is_ok());
            assert_eq!(backup.calls(), 1);
        }
    }

    #[tokio::test]
    async fn rejected_schema_stops_chain() {
        let primary = StubProvider::failing(
            "primary",
            ProviderError::ApiError {
                status_code: 400,
                message: "Invalid schema for response_format".into(),
            },
        );
        let backup = StubProvider::answering("backup");
        let chain = FallbackProvider::new("chain")
            .add_default(primary)
            .add_default(backup.clone());

        let err = chain.complete(split_request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status_code: 400, .. }));
        assert_eq!(backup.calls(), 0);
    }

    #[tokio::test]
    async fn last_error_surfaces_when_all_fail() {
        let chain = FallbackProvider::new("chain")
            .add_default(StubProvider::failing("primary", server_error()))
            .add_default(StubProvider::failing(
                "backup",
                ProviderError::AuthenticationFailed("bad key".into()),
            ));

        let err = chain.complete(split_request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_provider_is_skipped() {
        let backup = StubProvider::answering("backup");
        let chain = FallbackProvider::new("chain")
            .add(StubProvider::new("slow", Behaviour::Hang), Duration::from_secs(5))
            .add_default(backup.clone());

        assert!(chain.complete(split_request()).await.is_ok());
        assert_eq!(backup.calls(), 1);
    }

    #[tokio::test]
    async fn entry_model_overrides_request_model() {
        let primary = StubProvider::failing("openai", server_error());
        let backup = StubProvider::answering("openrouter");
        let chain = FallbackProvider::new("chain")
            .add_default(primary.clone())
            .add_with_model(
                backup.clone(),
                DEFAULT_ENTRY_TIMEOUT,
                Some("openai/gpt-4o-mini".into()),
            );

        let response = chain.complete(split_request()).await.unwrap();
        assert_eq!(primary.models(), vec!["gpt-4o"]);
        assert_eq!(backup.models(), vec!["openai/gpt-4o-mini"]);
        assert_eq!(response.model, "openai/gpt-4o-mini");
    }

    #[test]
    fn budget_covers_every_entry() {
        let chain = FallbackProvider::new("chain")
            .add(StubProvider::answering("a"), Duration::from_secs(2))
            .add(StubProvider::answering("b"), Duration::from_secs(3));
        assert_eq!(chain.time_budget(), Some(Duration::from_secs(5)));
        assert_eq!(FallbackProvider::new("empty").time_budget(), None);
    }

    #[tokio::test]
    async fn empty_chain_is_not_configured() {
        let err = FallbackProvider::new("empty")
            .complete(split_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn models_are_merged_and_health_needs_one_healthy() {
        let chain = FallbackProvider::new("chain")
            .add_default(StubProvider::failing("down", server_error()))
            .add_default(StubProvider::answering("a"))
            .add_default(StubProvider::answering("b"));

        assert_eq!(chain.len(), 3);
        assert_eq!(chain.provider_names(), vec!["down", "a", "b"]);
        assert_eq!(
            chain.list_models().await.unwrap(),
            vec!["gpt-4o", "a-model", "b-model"]
        );
        assert!(chain.health_check().await.unwrap());

        let unhealthy =
            FallbackProvider::new("chain").add_default(StubProvider::failing("down", server_error()));
        assert!(!unhealthy.health_check().await.unwrap());
    }
}
