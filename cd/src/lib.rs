//! CronDaemon - durable recurring task scheduling
//!
//! CronDaemon keeps a set of recurring tasks - each a name, an opaque program
//! reference, and a six-field cron expression - and fires a callback at every
//! occurrence the expression matches, second-granular, in one fixed timezone.
//! Tasks are durable: they live in a SQLite store and the in-memory trigger
//! state is reconciled from that store at startup.
//!
//! # Core Concepts
//!
//! - **One mapping, one lock**: the coordinator owns the only link between
//!   persisted task records and live trigger handles, guarded by a single
//!   mutex held just long enough to touch the map
//! - **Store first**: administrative mutations hit the store before the
//!   engine, with a compensating delete when registration fails
//! - **Degraded is a state**: a task whose registration failed stays
//!   persisted and unscheduled until an operator removes or re-adds it
//!
//! # Modules
//!
//! - [`coordinator`] - the scheduling coordinator and its error taxonomy
//! - [`trigger`] - the cron trigger engine and its trait seam
//! - [`config`] - configuration types and loading
//! - [`seed`] - idempotent first-boot example tasks
//! - [`cli`] - command-line flags for the `cd` binary

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod seed;
pub mod trigger;

// Re-export commonly used types
pub use config::{Config, ScheduleConfig, StorageConfig};
pub use coordinator::{Coordinator, CoordinatorError, Executor, log_executor};
pub use trigger::{CronEngine, TriggerCallback, TriggerEngine, TriggerError, TriggerHandle};
