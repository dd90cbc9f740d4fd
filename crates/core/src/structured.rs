//! Structured-output boundary: the single seam between the pipeline and a
//! language model.
//!
//! A [`StructuredModel`] takes free-text instructions, a task string and a
//! declared [`OutputSchema`], and returns a raw JSON object. [`complete_as`]
//! turns that object into a typed [`StructuredOutput`], rejecting anything
//! that does not deserialize or fails the type's own validation.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use crate::error::CouplerError;

/// A named JSON schema sent alongside a model call.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

impl OutputSchema {
    pub fn new(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// A typed model response with a fixed schema.
pub trait StructuredOutput: DeserializeOwned + Send {
    /// Schema name, also used in `SchemaViolation` errors.
    const NAME: &'static str;

    /// JSON schema describing the expected object.
    fn json_schema() -> serde_json::Value;

    /// Semantic checks serde cannot express (ranges, non-empty fields).
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    fn output_schema() -> OutputSchema {
        OutputSchema::new(Self::NAME, Self::json_schema())
    }
}

/// The language-understanding service boundary.
///
/// Implementations: `ProviderModel` (any `Provider`) and scripted fakes in tests.
#[async_trait]
pub trait StructuredModel: Send + Sync {
    /// A human-readable name for logging.
    fn name(&self) -> &str;

    /// Run one call and return the parsed JSON object.
    async fn complete(
        &self,
        instructions: &str,
        task: &str,
        schema: &OutputSchema,
    ) -> Result<serde_json::Value, CouplerError>;
}

/// Call `model` and parse its answer as `T`.
pub async fn complete_as<T: StructuredOutput>(
    model: &dyn StructuredModel,
    instructions: &str,
    task: &str,
) -> Result<T, CouplerError> {
    let schema = T::output_schema();
    let value = model.complete(instructions, task, &schema).await?;
    parse_output(value)
}

/// Deserialize and validate a raw model object as `T`.
pub fn parse_output<T: StructuredOutput>(value: serde_json::Value) -> Result<T, CouplerError> {
    let output: T = serde_json::from_value(value)
        .map_err(|e| CouplerError::schema_violation(T::NAME, e.to_string()))?;
    output
        .validate()
        .map_err(|reason| CouplerError::schema_violation(T::NAME, reason))?;
    Ok(output)
}
