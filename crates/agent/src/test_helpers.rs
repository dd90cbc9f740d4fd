//! Shared test helpers for pipeline tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use coupler_core::error::{CouplerError, ProviderError};
use coupler_core::message::Message;
use coupler_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use coupler_core::structured::{OutputSchema, StructuredModel, StructuredOutput};
use coupler_core::team::TeamRoster;

use crate::schema::{ClassificationResult, SplitResult};

/// A mock provider that returns a sequence of scripted results.
///
/// Each call to `complete` returns the next result in the queue and records
/// the request. Panics if more calls are made than results provided.
pub struct SequentialMockProvider {
    responses: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    delay: Duration,
    time_budget: Option<Duration>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            time_budget: None,
        }
    }

    /// Successful text responses, in order.
    pub fn from_texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(make_text_response(t))).collect())
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Report a time budget, as a fallback chain does.
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let next = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            let call = requests.len();
            let next = self.responses.lock().unwrap().pop_front();
            next.unwrap_or_else(|| panic!("SequentialMockProvider: no more responses (call #{call})"))
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        next
    }

    fn time_budget(&self) -> Option<Duration> {
        self.time_budget
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
        metadata: serde_json::Map::new(),
    }
}

/// One recorded call to a [`ScriptedModel`].
#[derive(Debug, Clone)]
pub struct ModelCall {
    pub schema: String,
    pub instructions: String,
    pub task: String,
}

type Scripted = (Duration, Result<serde_json::Value, CouplerError>);

/// A deterministic `StructuredModel`.
///
/// Split calls are answered from a queue; classification calls are answered
/// by the script registered for the request text the task ends with, so
/// concurrent classification is deterministic regardless of poll order.
#[derive(Default)]
pub struct ScriptedModel {
    splits: Mutex<VecDeque<Result<serde_json::Value, CouplerError>>>,
    classifications: Mutex<Vec<(String, VecDeque<Scripted>)>>,
    calls: Mutex<Vec<ModelCall>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn split(self, requests: &[&str]) -> Self {
        self.split_raw(Ok(split_of(requests)))
    }

    pub fn split_raw(self, response: Result<serde_json::Value, CouplerError>) -> Self {
        self.splits.lock().unwrap().push_back(response);
        self
    }

    pub fn classify(self, request: &str, id: &str, role: &str, confidence: f64) -> Self {
        self.classify_raw(request, Duration::ZERO, Ok(classification(id, role, request, confidence)))
    }

    pub fn classify_after(
        self,
        request: &str,
        delay: Duration,
        id: &str,
        confidence: f64,
    ) -> Self {
        self.classify_raw(request, delay, Ok(classification(id, "", request, confidence)))
    }

    pub fn classify_raw(
        self,
        request: &str,
        delay: Duration,
        response: Result<serde_json::Value, CouplerError>,
    ) -> Self {
        {
            let mut scripts = self.classifications.lock().unwrap();
            match scripts.iter_mut().find(|(key, _)| key == request) {
                Some((_, queue)) => queue.push_back((delay, response)),
                None => scripts.push((request.to_string(), VecDeque::from([(delay, response)]))),
            }
        }
        self
    }

    pub fn calls(&self) -> Vec<ModelCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, schema: &str) -> usize {
        self.calls().iter().filter(|c| c.schema == schema).count()
    }

    fn next_classification(&self, task: &str) -> Scripted {
        let mut scripts = self.classifications.lock().unwrap();
        let queue = scripts
            .iter_mut()
            .filter(|(key, _)| task.ends_with(key.as_str()))
            .max_by_key(|(key, _)| key.len())
            .map(|(_, queue)| queue)
            .unwrap_or_else(|| panic!("ScriptedModel: no classification scripted for task {task:?}"));
        queue
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedModel: classification script exhausted for {task:?}"))
    }
}

#[async_trait::async_trait]
impl StructuredModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        instructions: &str,
        task: &str,
        schema: &OutputSchema,
    ) -> Result<serde_json::Value, CouplerError> {
        self.calls.lock().unwrap().push(ModelCall {
            schema: schema.name.clone(),
            instructions: instructions.to_string(),
            task: task.to_string(),
        });

        let (delay, response) = if schema.name == SplitResult::NAME {
            let next = self.splits.lock().unwrap().pop_front();
            (
                Duration::ZERO,
                next.unwrap_or_else(|| panic!("ScriptedModel: split script exhausted")),
            )
        } else if schema.name == ClassificationResult::NAME {
            self.next_classification(task)
        } else {
            panic!("ScriptedModel: unexpected schema {}", schema.name)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        response
    }
}

/// A split response object.
pub fn split_of(requests: &[&str]) -> serde_json::Value {
    serde_json::json!({ "user_requests": requests })
}

/// A classification response object.
pub fn classification(id: &str, role: &str, request: &str, confidence: f64) -> serde_json::Value {
    serde_json::json!({
        "team_member_id": id,
        "role": role,
        "user_request": request,
        "confidence": confidence,
    })
}

/// MARKETING and SALES, no default.
pub fn sales_and_marketing() -> TeamRoster {
    let mut builder = TeamRoster::builder();
    builder
        .register("MARKETING", "creates marketing materials", false)
        .unwrap()
        .register("SALES", "handles sales", false)
        .unwrap();
    builder.build()
}

/// MARKETING, SALES and the default TEAM_MANAGER.
pub fn team_with_manager() -> TeamRoster {
    let mut builder = TeamRoster::builder();
    builder
        .register("MARKETING", "creates marketing materials", false)
        .unwrap()
        .register("SALES", "handles sales", false)
        .unwrap()
        .register("TEAM_MANAGER", "makes all management decisions", true)
        .unwrap();
    builder.build()
}
