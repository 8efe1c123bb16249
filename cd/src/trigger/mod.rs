//! Trigger engine for recurring callbacks
//!
//! The engine owns a background clock per registered expression and invokes
//! callbacks at every matching instant, in one fixed timezone, with
//! second-level resolution. The coordinator consumes it through the
//! [`TriggerEngine`] trait:
//! - **Register:** expression + callback, returns a cancellable handle
//! - **Cancel:** no further fires; no-op-safe for unknown handles
//! - **Start:** the engine is dormant and fires nothing until started

mod engine;
mod error;
mod traits;

pub use engine::CronEngine;
pub use error::TriggerError;
pub use traits::{TriggerCallback, TriggerEngine, TriggerHandle};
