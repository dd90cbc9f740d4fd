//! Request splitter: turns one raw request into atomic sub-requests.

use std::sync::Arc;
use coupler_core::error::CouplerError;
use coupler_core::structured::{StructuredModel, complete_as};
use tracing::{debug, info};

use crate::prompts::{SPLIT_INSTRUCTIONS, split_task};
use crate::retry::RetryPolicy;
use crate::schema::SplitResult;

/// Splits a composite request with one structured model call.
pub struct RequestSplitter {
    model: Arc<dyn StructuredModel>,
    retry: RetryPolicy,
}

impl RequestSplitter {
    pub fn new(model: Arc<dyn StructuredModel>) -> Self {
        Self {
            model,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Split `request` into an ordered, non-empty list of atomic requests.
    ///
    /// Entries are trimmed and blank entries dropped. A blank request or an
    /// empty model answer is `NoRequestsExtracted`.
    pub async fn split(&self, request: &str) -> Result<Vec<String>, CouplerError> {
        let request = request.trim();
        if request.is_empty() {
            return Err(CouplerError::NoRequestsExtracted);
        }

        let task = split_task(request);
        let result: SplitResult = self
            .retry
            .run("split", || {
                complete_as::<SplitResult>(self.model.as_ref(), SPLIT_INSTRUCTIONS, &task)
            })
            .await?;

        let raw_count = result.user_requests.len();
        let requests: Vec<String> = result
            .user_requests
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();

        if requests.len() != raw_count {
            debug!(
                dropped = raw_count - requests.len(),
                "Splitter: dropped blank requests"
            );
        }

        if requests.is_empty() {
            return Err(CouplerError::NoRequestsExtracted);
        }

        info!(model = self.model.name(), count = requests.len(), "Splitter: request split");
        Ok(requests)
    }
}
