//! Assignment: the routing decision for one atomic request.

use serde::{Deserialize, Serialize};
use crate::team::UNKNOWN_TEAM_MEMBER;

/// Which team member owns an atomic request, and how sure the model is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Resolved team member id, or `UNKNOWN`
    pub handler_id: String,

    /// Responsibility text as reported by the model
    pub responsibility_echo: String,

    /// The atomic request this decision is for
    pub source_request: String,

    /// Model-reported confidence in [0, 1]; advisory only
    pub confidence: f64,

    /// Set when `UNKNOWN` was replaced by the default member's id
    #[serde(default)]
    pub fallback_applied: bool,
}

impl Assignment {
    /// No team member (not even a default) took the request.
    pub fn is_unassigned(&self) -> bool {
        self.handler_id == UNKNOWN_TEAM_MEMBER
    }
}

impl std::fmt::Display for Assignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -- sent to -- {}({})",
            self.source_request, self.handler_id, self.confidence
        )
    }
}
