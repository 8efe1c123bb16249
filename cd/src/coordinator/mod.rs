//! Scheduling coordinator
//!
//! The coordinator keeps the single live mapping between durable task
//! records and registered trigger handles, and reconciles the two on
//! startup and on every administrative mutation:
//! - **StartAll:** load every persisted task, register its trigger, start
//!   the clock
//! - **AddTask:** persist, register, roll back the record if registration
//!   fails
//! - **RemoveTask:** cancel the trigger (when one exists), delete the record

mod core;
mod error;

pub use core::{Coordinator, Executor, log_executor};
pub use error::CoordinatorError;
