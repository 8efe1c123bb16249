//! Task record type
//!
//! A Task is the durable description of one recurring unit of work. The
//! `program` field is opaque to this crate and to the coordinator; it is
//! interpreted by whatever execution layer consumes the firings.

use serde::{Deserialize, Serialize};

/// Unique task identifier, assigned by the store on creation
pub type TaskId = i64;

/// A durable recurring task record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier, immutable after creation
    pub id: TaskId,

    /// Human-readable label
    pub name: String,

    /// Opaque reference to the work to perform
    pub program: String,

    /// Six-field cron expression (seconds through day-of-week)
    pub cron: String,
}

/// Payload for creating a new task (no identifier yet)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub name: String,
    pub program: String,
    pub cron: String,
}

impl NewTask {
    /// Create a new task payload
    pub fn new(name: impl Into<String>, program: impl Into<String>, cron: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            cron: cron.into(),
        }
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.id, self.cron)
    }
}
