//! Error types for the Coupler domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Coupler operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Routing pipeline errors ---
    #[error("Coupler error: {0}")]
    Coupler(#[from] CouplerError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Whether a later attempt against the same provider may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Network(_) => true,
            // 200 with an unusable body: garbled JSON, no choices, a refusal
            Self::ApiError { status_code, .. } => *status_code == 200 || *status_code >= 500,
            Self::AuthenticationFailed(_) | Self::ModelNotFound(_) | Self::NotConfigured(_) => {
                false
            }
        }
    }
}

/// Failures of the split-and-classify pipeline.
///
/// `EmptyRegistry` and `Validation` are configuration problems (fix the
/// roster); everything else is a runtime/model problem (retry later).
#[derive(Debug, Clone, Error)]
pub enum CouplerError {
    #[error("No team members registered, cannot process any user requests")]
    EmptyRegistry,

    #[error("No user requests found")]
    NoRequestsExtracted,

    #[error("Model response does not match schema '{schema}': {reason}")]
    SchemaViolation { schema: String, reason: String },

    #[error("Model call failed: {0}")]
    ModelCallFailure(#[from] ProviderError),

    #[error("Model call timed out after {timeout_ms}ms")]
    ModelTimeout { timeout_ms: u64 },

    #[error("Invalid team member registration: {0}")]
    Validation(String),

    #[error("Model call failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<CouplerError>,
    },
}

impl CouplerError {
    pub fn schema_violation(schema: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            schema: schema.into(),
            reason: reason.into(),
        }
    }

    /// Configuration errors are fixed by changing the roster, not by retrying.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::EmptyRegistry | Self::Validation(_))
    }

    /// Whether the retry policy should try the model call again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::SchemaViolation { .. } | Self::ModelTimeout { .. } => true,
            Self::ModelCallFailure(e) => e.is_transient(),
            Self::EmptyRegistry
            | Self::NoRequestsExtracted
            | Self::Validation(_)
            | Self::RetriesExhausted { .. } => false,
        }
    }

    /// The underlying failure, looking through `RetriesExhausted`.
    pub fn root(&self) -> &CouplerError {
        match self {
            Self::RetriesExhausted { last, .. } => last.root(),
            other => other,
        }
    }
}
