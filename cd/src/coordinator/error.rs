//! Coordinator error taxonomy

use cronstore::{StoreError, TaskId};
use thiserror::Error;

use crate::trigger::TriggerError;

/// Errors surfaced by the scheduling coordinator
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Unrecoverable startup misconfiguration; fatal to construction
    #[error("cannot resolve timezone '{0}'")]
    Configuration(String),

    /// The bulk load behind start_all could not be performed
    #[error("task store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// Registration failure, including invalid recurrence expressions
    #[error(transparent)]
    Trigger(#[from] TriggerError),

    /// Referenced task does not exist
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// A store operation in the administrative API failed
    #[error("task store operation failed: {0}")]
    Store(#[source] StoreError),

    /// Registration failed and the compensating delete of the just-created
    /// record failed too; the store may now hold an orphaned task
    #[error("trigger registration for task {task_id} failed ({register}); compensating delete also failed ({compensation})")]
    Compensation {
        task_id: TaskId,
        register: TriggerError,
        #[source]
        compensation: StoreError,
    },
}

impl CoordinatorError {
    /// Map a store error from a single-task operation, preserving NotFound
    pub(crate) fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => CoordinatorError::NotFound(id),
            other => CoordinatorError::Store(other),
        }
    }

    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoordinatorError::NotFound(_))
    }
}
