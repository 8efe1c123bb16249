//! Cron-backed trigger engine implementation
//!
//! One background clock task per registration: each loop computes the next
//! occurrence of its `cron::Schedule` in the engine's fixed timezone, sleeps
//! until then, and spawns the callback. Clocks only exist once the engine has
//! been started; registrations made before that sit dormant.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;
use cron::Schedule;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::error::TriggerError;
use super::traits::{TriggerCallback, TriggerEngine, TriggerHandle};

/// One registered recurrence
struct EngineEntry {
    schedule: Schedule,
    callback: TriggerCallback,
    /// Running clock task; None while the engine is dormant
    clock: Option<JoinHandle<()>>,
}

/// Registry protected by mutex
struct EngineInner {
    entries: HashMap<TriggerHandle, EngineEntry>,
    next_id: u64,
    started: bool,
}

/// Trigger engine driven by six-field cron expressions
pub struct CronEngine {
    timezone: Tz,
    inner: Mutex<EngineInner>,
}

impl CronEngine {
    /// Create a dormant engine fixed to the given timezone
    pub fn new(timezone: Tz) -> Self {
        debug!(%timezone, "CronEngine::new: called");
        Self {
            timezone,
            inner: Mutex::new(EngineInner {
                entries: HashMap::new(),
                next_id: 0,
                started: false,
            }),
        }
    }

    /// The timezone every expression is interpreted in
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    fn spawn_clock(&self, handle: TriggerHandle, entry: &mut EngineEntry) {
        let schedule = entry.schedule.clone();
        let callback = Arc::clone(&entry.callback);
        let timezone = self.timezone;
        entry.clock = Some(tokio::spawn(run_clock(handle, schedule, timezone, callback)));
    }
}

/// Clock loop for one registration.
///
/// `horizon` tracks the last occurrence handed to the callback, so a wakeup
/// that lands marginally before the target instant cannot fire it twice.
async fn run_clock(handle: TriggerHandle, schedule: Schedule, timezone: Tz, callback: TriggerCallback) {
    let mut horizon = Utc::now().with_timezone(&timezone);

    loop {
        let Some(fire_at) = schedule.after(&horizon).next() else {
            // Expression has no future occurrences (possible with fixed dates)
            debug!(%handle, "Schedule exhausted, clock stopping");
            return;
        };

        let now = Utc::now().with_timezone(&timezone);
        let wait = (fire_at.clone() - now).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        debug!(%handle, fire_at = %fire_at, "Trigger fired");
        let cb = Arc::clone(&callback);
        tokio::spawn(async move { cb() });

        horizon = fire_at;
    }
}

#[async_trait]
impl TriggerEngine for CronEngine {
    async fn register(&self, expression: &str, callback: TriggerCallback) -> Result<TriggerHandle, TriggerError> {
        let schedule = Schedule::from_str(expression).map_err(|source| TriggerError::InvalidExpression {
            expression: expression.to_string(),
            source,
        })?;

        let mut inner = self.inner.lock().await;
        let handle = TriggerHandle::new(inner.next_id);
        inner.next_id += 1;

        let mut entry = EngineEntry {
            schedule,
            callback,
            clock: None,
        };
        if inner.started {
            self.spawn_clock(handle, &mut entry);
        }
        inner.entries.insert(handle, entry);

        debug!(%handle, expression, started = inner.started, "Registered trigger");
        Ok(handle)
    }

    async fn cancel(&self, handle: TriggerHandle) {
        let mut inner = self.inner.lock().await;
        match inner.entries.remove(&handle) {
            Some(entry) => {
                if let Some(clock) = entry.clock {
                    clock.abort();
                }
                debug!(%handle, "Cancelled trigger");
            }
            // Unknown or already cancelled handles are tolerated
            None => debug!(%handle, "Cancel on unknown trigger handle, ignoring"),
        }
    }

    async fn start(&self) {
        let mut inner = self.inner.lock().await;
        if inner.started {
            debug!("CronEngine::start: already started, ignoring");
            return;
        }
        inner.started = true;

        let handles: Vec<TriggerHandle> = inner.entries.keys().copied().collect();
        for handle in handles {
            if let Some(entry) = inner.entries.get_mut(&handle)
                && entry.clock.is_none()
            {
                let schedule = entry.schedule.clone();
                let callback = Arc::clone(&entry.callback);
                entry.clock = Some(tokio::spawn(run_clock(handle, schedule, self.timezone, callback)));
            }
        }

        info!(triggers = inner.entries.len(), timezone = %self.timezone, "Trigger engine started");
    }
}
