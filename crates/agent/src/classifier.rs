//! Classifier: picks the team member for one atomic request.

use std::sync::Arc;
use coupler_core::assignment::Assignment;
use coupler_core::error::CouplerError;
use coupler_core::structured::{StructuredModel, StructuredOutput, complete_as};
use coupler_core::team::{TeamMember, TeamRoster, UNKNOWN_TEAM_MEMBER};
use tracing::{debug, info};

use crate::prompts::{classify_instructions, classify_task};
use crate::retry::RetryPolicy;
use crate::schema::ClassificationResult;

/// What the assignment reports as responsibility when the default member
/// takes over an `UNKNOWN` classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Only the id is replaced; role text and confidence stay as the model
    /// reported them.
    #[default]
    KeepModelText,
    /// The id and the responsibility text are both taken from the default member.
    EchoDefaultResponsibility,
}

/// Classifies atomic requests against a fixed roster.
pub struct Classifier {
    model: Arc<dyn StructuredModel>,
    roster: Arc<TeamRoster>,
    default: Option<TeamMember>,
    instructions: String,
    retry: RetryPolicy,
    fallback: FallbackPolicy,
}

impl Classifier {
    pub fn new(model: Arc<dyn StructuredModel>, roster: Arc<TeamRoster>) -> Self {
        let instructions = classify_instructions(&roster);
        let default = roster.default_handler().cloned();
        Self {
            model,
            roster,
            default,
            instructions,
            retry: RetryPolicy::default(),
            fallback: FallbackPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    /// The instructions sent with every classification call.
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Classify one atomic request and apply the default-member fallback.
    pub async fn classify(&self, request: &str) -> Result<Assignment, CouplerError> {
        let task = classify_task(request);
        let (handler_id, result) = self
            .retry
            .run("classify", || self.classify_once(&task))
            .await?;

        if let Some(echo) = result.user_request.as_deref() {
            if echo.trim() != request.trim() {
                debug!(request, echo, "Classifier: model echoed a different request");
            }
        }

        let mut assignment = Assignment {
            handler_id,
            responsibility_echo: result.role,
            source_request: request.to_string(),
            confidence: result.confidence,
            fallback_applied: false,
        };

        if assignment.handler_id == UNKNOWN_TEAM_MEMBER {
            if let Some(default) = &self.default {
                info!(
                    request,
                    default = %default.id,
                    "Classifier: no match, falling back to default team member"
                );
                assignment.handler_id = default.id.clone();
                assignment.fallback_applied = true;
                if self.fallback == FallbackPolicy::EchoDefaultResponsibility {
                    assignment.responsibility_echo = default.responsibility.clone();
                }
            }
        }

        debug!(
            request,
            handler = %assignment.handler_id,
            confidence = assignment.confidence,
            "Classifier: request classified"
        );
        Ok(assignment)
    }

    /// One model call, with the reported id resolved against the roster.
    async fn classify_once(
        &self,
        task: &str,
    ) -> Result<(String, ClassificationResult), CouplerError> {
        let result: ClassificationResult =
            complete_as(self.model.as_ref(), &self.instructions, task).await?;

        let handler_id = self
            .roster
            .resolve_id(&result.team_member_id)
            .ok_or_else(|| {
                CouplerError::schema_violation(
                    ClassificationResult::NAME,
                    format!(
                        "team_member_id '{}' is not a registered team member",
                        result.team_member_id
                    ),
                )
            })?
            .to_string();

        Ok((handler_id, result))
    }
}
