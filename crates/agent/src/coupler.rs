//! Coupler: split a raw request, then route every piece.
//!
//! The coupler follows a decompose-then-delegate flow:
//! 1. Refuse to run without a roster (no model call is made)
//! 2. Split the raw request into atomic requests
//! 3. Classify each request, at most `max_concurrency` in flight
//! 4. Return assignments in split order

use std::sync::Arc;
use coupler_config::{AppConfig, CouplerConfig};
use coupler_core::assignment::Assignment;
use coupler_core::error::CouplerError;
use coupler_core::structured::StructuredModel;
use coupler_core::team::TeamRoster;
use futures::{StreamExt, TryStreamExt, stream};
use tracing::{info, warn};

use crate::classifier::{Classifier, FallbackPolicy};
use crate::retry::RetryPolicy;
use crate::splitter::RequestSplitter;

/// Pipeline tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct CouplerOptions {
    /// Classification calls allowed in flight at once; 1 is sequential.
    pub max_concurrency: usize,
    pub retry: RetryPolicy,
    pub fallback: FallbackPolicy,
}

impl Default for CouplerOptions {
    fn default() -> Self {
        Self::from_config(&CouplerConfig::default())
    }
}

impl CouplerOptions {
    pub fn from_config(config: &CouplerConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency.max(1),
            retry: RetryPolicy::from_config(config),
            fallback: if config.echo_default_responsibility {
                FallbackPolicy::EchoDefaultResponsibility
            } else {
                FallbackPolicy::KeepModelText
            },
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// One sub-request together with its own classification outcome.
#[derive(Debug)]
pub struct ClassifiedRequest {
    pub request: String,
    pub result: Result<Assignment, CouplerError>,
}

/// The routing pipeline.
pub struct Coupler {
    roster: Arc<TeamRoster>,
    splitter: RequestSplitter,
    classifier: Classifier,
    max_concurrency: usize,
}

impl Coupler {
    pub fn new(model: Arc<dyn StructuredModel>, roster: TeamRoster) -> Self {
        Self::with_options(model, roster, CouplerOptions::default())
    }

    pub fn with_options(
        model: Arc<dyn StructuredModel>,
        roster: TeamRoster,
        options: CouplerOptions,
    ) -> Self {
        let roster = Arc::new(roster);
        let splitter = RequestSplitter::new(model.clone()).with_retry(options.retry.clone());
        let classifier = Classifier::new(model, roster.clone())
            .with_retry(options.retry)
            .with_fallback(options.fallback);

        Self {
            roster,
            splitter,
            classifier,
            max_concurrency: options.max_concurrency.max(1),
        }
    }

    /// Roster and options from configuration.
    pub fn from_config(
        model: Arc<dyn StructuredModel>,
        config: &AppConfig,
    ) -> Result<Self, CouplerError> {
        let roster = config.team_roster()?;
        Ok(Self::with_options(
            model,
            roster,
            CouplerOptions::from_config(&config.coupler),
        ))
    }

    pub fn roster(&self) -> &TeamRoster {
        &self.roster
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Split only, without classifying.
    pub async fn split(&self, raw: &str) -> Result<Vec<String>, CouplerError> {
        self.splitter.split(raw).await
    }

    /// Route a raw request: one assignment per atomic request, in split order.
    ///
    /// The first failing classification fails the whole call.
    pub async fn process(&self, raw: &str) -> Result<Vec<Assignment>, CouplerError> {
        let requests = self.prepare(raw).await?;

        let assignments: Vec<Assignment> = stream::iter(requests.iter())
            .map(|request| self.classifier.classify(request))
            .buffered(self.max_concurrency)
            .try_collect()
            .await?;

        debug_assert_eq!(assignments.len(), requests.len());
        let fallbacks = assignments.iter().filter(|a| a.fallback_applied).count();
        info!(
            requests = assignments.len(),
            fallbacks, "Coupler: all requests routed"
        );
        Ok(assignments)
    }

    /// Like [`process`](Self::process), but a failed classification only
    /// affects its own entry.
    pub async fn process_isolated(
        &self,
        raw: &str,
    ) -> Result<Vec<ClassifiedRequest>, CouplerError> {
        let requests = self.prepare(raw).await?;

        let outcomes: Vec<ClassifiedRequest> = stream::iter(requests)
            .map(|request| async move {
                let result = self.classifier.classify(&request).await;
                ClassifiedRequest { request, result }
            })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        if failed > 0 {
            warn!(failed, total = outcomes.len(), "Coupler: some requests could not be routed");
        } else {
            info!(requests = outcomes.len(), "Coupler: all requests routed");
        }
        Ok(outcomes)
    }

    async fn prepare(&self, raw: &str) -> Result<Vec<String>, CouplerError> {
        if self.roster.is_empty() {
            return Err(CouplerError::EmptyRegistry);
        }
        if self.roster.default_handler().is_none() {
            warn!("Coupler: no default team member, unmatched requests stay UNKNOWN");
        }

        let requests = self.splitter.split(raw).await?;
        info!(
            requests = requests.len(),
            concurrency = self.max_concurrency,
            "Coupler: classifying requests"
        );
        Ok(requests)
    }
}
