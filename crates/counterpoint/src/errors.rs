//! Error taxonomy for generation and evaluation units.
//!
//! Configuration and input errors (`experiment::ConfigError`) abort the run.
//! Everything here drops one unit of work and the loops carry on:
//!
//! | Error                                      | Log   | Effect                        |
//! |--------------------------------------------|-------|-------------------------------|
//! | `GenerationError::InvalidCondition`        | warn  | skip (item, model, condition) |
//! | `GenerationError::MissingTemplate`         | error | skip (item, model, condition) |
//! | `GenerationError::Provider`                | error | skip (item, model, condition) |
//! | `EvaluationError::MissingCriteria`         | warn  | skip (item, model) evaluation |
//! | `EvaluationError::EmptyCounterarguments`   | warn  | skip (item, model) evaluation |
//! | `EvaluationError::Analysis`                | error | skip (item, model) evaluation |
//!
//! Per-criterion provider failures are recorded on the criterion's result
//! and never become an `EvaluationError`.

use experiment::MissingCriteria;
use thiserror::Error;

use crate::providers::ProviderError;

/// Failure producing one counterargument.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Condition id is not in the condition table.
    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    /// The prompt store has no template for a stage of this condition.
    #[error("missing prompt template '{key}' for condition {condition}")]
    MissingTemplate { condition: String, key: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl GenerationError {
    /// Skips that deserve a warning rather than an error log.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::InvalidCondition(_))
    }
}

/// Failure evaluating one model's counterarguments for one item.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error(transparent)]
    MissingCriteria(#[from] MissingCriteria),

    #[error("no counterarguments to evaluate")]
    EmptyCounterarguments,

    /// The shared analysis call failed, so no criterion can be scored.
    #[error("analysis failed: {0}")]
    Analysis(#[source] ProviderError),
}

impl EvaluationError {
    /// Skips that deserve a warning rather than an error log.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::MissingCriteria(_) | Self::EmptyCounterarguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_condition_is_a_skip() {
        let err = GenerationError::InvalidCondition("x99".into());
        assert!(err.is_skip());
        assert_eq!(err.to_string(), "invalid condition: x99");
    }

    #[test]
    fn provider_error_is_transparent() {
        let err: GenerationError = ProviderError::Status {
            backend: "openai".into(),
            status: 503,
            body: "overloaded".into(),
        }
        .into();
        assert!(!err.is_skip());
        assert_eq!(err.to_string(), "[openai] API error (503): overloaded");
    }

    #[test]
    fn missing_template_is_logged_as_failure() {
        let err = GenerationError::MissingTemplate {
            condition: "x4".into(),
            key: "premise_generation_prompt".into(),
        };
        assert!(!err.is_skip());
    }

    #[test]
    fn missing_criteria_is_skip() {
        let err: EvaluationError = MissingCriteria(vec![4]).into();
        assert!(err.is_skip());
        assert!(EvaluationError::EmptyCounterarguments.is_skip());
        assert!(!EvaluationError::Analysis(ProviderError::EmptyPrompt {
            backend: "x".into()
        })
        .is_skip());
    }
}
