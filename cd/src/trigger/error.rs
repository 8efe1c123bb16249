//! Trigger engine error types

use thiserror::Error;

/// Errors that can occur while registering a trigger
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("invalid cron expression '{expression}': {source}")]
    InvalidExpression {
        expression: String,
        #[source]
        source: cron::error::Error,
    },

    #[error("trigger registration failed: {0}")]
    RegistrationFailed(String),
}

impl TriggerError {
    /// Check if this is a parse failure of the recurrence expression
    pub fn is_invalid_expression(&self) -> bool {
        matches!(self, TriggerError::InvalidExpression { .. })
    }
}
