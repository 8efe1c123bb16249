//! First-boot example tasks
//!
//! Administrative convenience, not core behavior: a few recognisable tasks
//! so a fresh database has something to schedule. Each insert is guarded by
//! a name lookup, which keeps re-runs idempotent.

use cronstore::{NewTask, StoreError, TaskStore};
use tracing::{info, warn};

/// Example tasks inserted when the store has no task of the same name
const EXAMPLE_TASKS: &[(&str, &str, &str)] = &[
    ("DailyBackup", "run database backup script", "0 0 0 * * *"),
    ("HourlyCheck", "check system status", "0 0 * * * *"),
    ("BiMinuteReport", "generate two-minute report", "0 */2 * * * *"),
];

/// Insert the example tasks that are not already present.
///
/// A failed insert is logged and skipped; only the guard lookup failing
/// aborts, since that suggests the store itself is unusable.
pub fn seed_example_tasks(store: &dyn TaskStore) -> Result<(), StoreError> {
    for (name, program, cron) in EXAMPLE_TASKS {
        if store.find_by_name(name)?.is_some() {
            continue;
        }
        match store.create(NewTask::new(*name, *program, *cron)) {
            Ok(task) => info!(id = task.id, name, "Seeded example task"),
            Err(err) => warn!(name, %err, "Failed to seed example task"),
        }
    }
    Ok(())
}
