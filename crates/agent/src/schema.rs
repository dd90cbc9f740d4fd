//! Typed model outputs for the two pipeline stages.

use coupler_core::structured::StructuredOutput;
use serde::{Deserialize, Serialize};

/// Output of the splitting stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitResult {
    pub user_requests: Vec<String>,
}

impl StructuredOutput for SplitResult {
    const NAME: &'static str = "user_requests";

    fn json_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "user_requests": {
                    "type": "array",
                    "description": "Each individual user request, in the order it was made",
                    "items": { "type": "string" }
                }
            },
            "required": ["user_requests"],
            "additionalProperties": false
        })
    }
}

/// Output of the classification stage for one atomic request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Chosen team member id, or `UNKNOWN`
    pub team_member_id: String,

    /// Responsibility text of the chosen member
    pub role: String,

    /// The request as echoed back by the model
    #[serde(default)]
    pub user_request: Option<String>,

    /// Self-reported confidence in [0, 1]
    pub confidence: f64,
}

impl StructuredOutput for ClassificationResult {
    const NAME: &'static str = "team_member";

    fn json_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "team_member_id": {
                    "type": "string",
                    "description": "Unique identifier for the team member"
                },
                "role": {
                    "type": "string",
                    "description": "Description of what the team member is responsible for"
                },
                "user_request": {
                    "type": ["string", "null"],
                    "description": "The original user request"
                },
                "confidence": {
                    "type": "number",
                    "description": "Confidence score from 0 to 1 that the team member is correct"
                }
            },
            "required": ["team_member_id", "role", "user_request", "confidence"],
            "additionalProperties": false
        })
    }

    fn validate(&self) -> Result<(), String> {
        if self.team_member_id.trim().is_empty() {
            return Err("team_member_id is empty".into());
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "confidence {} is outside [0, 1]",
                self.confidence
            ));
        }
        Ok(())
    }
}
