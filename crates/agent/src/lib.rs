//! The routing pipeline: the heart of Coupler.
//!
//! A raw request flows through two model-backed stages:
//!
//! 1. **Split** the request into atomic sub-requests ([`RequestSplitter`])
//! 2. **Classify** each sub-request against the team roster ([`Classifier`])
//!
//! The [`Coupler`] drives both stages, applies the default-member fallback
//! and returns one [`Assignment`](coupler_core::Assignment) per sub-request,
//! in split order.

pub mod classifier;
pub mod coupler;
pub mod model;
pub mod prompts;
pub mod retry;
pub mod schema;
pub mod splitter;

pub use classifier::{Classifier, FallbackPolicy};
pub use coupler::{ClassifiedRequest, Coupler, CouplerOptions};
pub use model::ProviderModel;
pub use retry::RetryPolicy;
pub use schema::{ClassificationResult, SplitResult};
pub use splitter::RequestSplitter;

#[cfg(test)]
pub(crate) mod test_helpers;
