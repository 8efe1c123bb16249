//! cronstore - durable records for recurring tasks
//!
//! A small persistence layer for the cron daemon: each record couples a
//! human-readable name, an opaque program reference, and a six-field cron
//! expression. Records live in a single SQLite table and are consumed by the
//! scheduling coordinator through the narrow [`TaskStore`] trait.
//!
//! # Modules
//!
//! - [`task`] - the `Task` record and its insert payload
//! - [`store`] - the `TaskStore` trait and the SQLite implementation
//! - [`error`] - store error types

mod error;
mod store;
mod task;

pub use error::StoreError;
pub use store::{SqliteTaskStore, TaskStore};
pub use task::{NewTask, Task, TaskId};
