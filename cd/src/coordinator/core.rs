//! Main Coordinator implementation

use std::collections::HashMap;
use std::sync::Arc;

use cronstore::{NewTask, Task, TaskId, TaskStore};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::ScheduleConfig;
use crate::trigger::{CronEngine, TriggerCallback, TriggerEngine, TriggerHandle};

use super::error::CoordinatorError;

/// Execution-layer contract: invoked once per firing with the task that
/// fired. May be called concurrently and repeatedly; must be cheap or
/// manage its own asynchrony.
pub type Executor = Arc<dyn Fn(&Task) + Send + Sync>;

/// Default executor: log the firing and do nothing else.
///
/// Real execution, retries, and result propagation live outside this crate.
pub fn log_executor() -> Executor {
    Arc::new(|task| {
        info!(id = task.id, name = %task.name, program = %task.program, "Executing task");
    })
}

/// The Coordinator reconciles durable task records with live triggers.
///
/// It is the only component permitted to call into the store and the engine
/// together, and owns the sole mapping from task id to trigger handle.
pub struct Coordinator {
    store: Arc<dyn TaskStore>,
    engine: Arc<dyn TriggerEngine>,
    executor: Executor,
    /// Task id -> live trigger handle. All access goes through this mutex,
    /// held only across the in-memory update - never across store or
    /// engine calls.
    triggers: Mutex<HashMap<TaskId, TriggerHandle>>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator").finish_non_exhaustive()
    }
}

impl Coordinator {
    /// Create a coordinator with a real cron engine built from config.
    ///
    /// Fails with [`CoordinatorError::Configuration`] when the configured
    /// timezone cannot be resolved; that is fatal to startup, not
    /// recoverable.
    pub fn new(store: Arc<dyn TaskStore>, schedule: &ScheduleConfig) -> Result<Self, CoordinatorError> {
        let timezone = schedule
            .timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| CoordinatorError::Configuration(schedule.timezone.clone()))?;

        debug!(%timezone, "Coordinator::new: resolved timezone");
        Ok(Self::with_engine(store, Arc::new(CronEngine::new(timezone)), log_executor()))
    }

    /// Create a coordinator over an explicit engine and executor
    pub fn with_engine(store: Arc<dyn TaskStore>, engine: Arc<dyn TriggerEngine>, executor: Executor) -> Self {
        Self {
            store,
            engine,
            executor,
            triggers: Mutex::new(HashMap::new()),
        }
    }

    /// Load every persisted task, register its trigger, and start the clock.
    ///
    /// A single task failing to register is logged and skipped - it stays
    /// persisted but unscheduled, a recognised steady state until an
    /// operator removes or re-adds it. Only a failed bulk load aborts.
    pub async fn start_all(&self) -> Result<(), CoordinatorError> {
        let tasks = self.store.list_all().map_err(CoordinatorError::StoreUnavailable)?;
        debug!(count = tasks.len(), "Coordinator::start_all: loaded tasks");

        for task in tasks {
            let already_live = {
                let triggers = self.triggers.lock().await;
                triggers.contains_key(&task.id)
            };
            if already_live {
                // Exactly one handle per task: a task added before this
                // load, or a repeated load, must not register twice
                debug!(id = task.id, "Trigger already live, skipping");
                continue;
            }

            let callback = self.trigger_callback(&task);
            match self.engine.register(&task.cron, callback).await {
                Ok(handle) => {
                    let mut triggers = self.triggers.lock().await;
                    triggers.insert(task.id, handle);
                    drop(triggers);
                    info!(id = task.id, name = %task.name, cron = %task.cron, "Task scheduled");
                }
                Err(err) => {
                    warn!(id = task.id, name = %task.name, %err, "Task left unscheduled");
                }
            }
        }

        self.engine.start().await;
        Ok(())
    }

    /// Persist a new task and register its trigger.
    ///
    /// When registration fails the just-created record is deleted again, so
    /// the store never keeps a task this coordinator knowingly cannot
    /// schedule. Returns the new task's identifier.
    pub async fn add_task(
        &self,
        name: impl Into<String>,
        program: impl Into<String>,
        cron: impl Into<String>,
    ) -> Result<TaskId, CoordinatorError> {
        let task = self
            .store
            .create(NewTask::new(name, program, cron))
            .map_err(CoordinatorError::from_store)?;

        let callback = self.trigger_callback(&task);
        match self.engine.register(&task.cron, callback).await {
            Ok(handle) => {
                let mut triggers = self.triggers.lock().await;
                triggers.insert(task.id, handle);
                drop(triggers);
                info!(id = task.id, name = %task.name, cron = %task.cron, "Task added");
                Ok(task.id)
            }
            Err(register) => {
                // Compensating delete: avoid an orphaned, un-triggered record
                if let Err(compensation) = self.store.delete_by_id(task.id) {
                    return Err(CoordinatorError::Compensation {
                        task_id: task.id,
                        register,
                        compensation,
                    });
                }
                debug!(id = task.id, "Rolled back task record after failed registration");
                Err(register.into())
            }
        }
    }

    /// Cancel a task's trigger and delete its record.
    ///
    /// A task without a mapping entry is tolerated - registration may have
    /// failed during [`start_all`](Self::start_all). When the store delete
    /// fails after the trigger was cancelled, the handle is not restored:
    /// the end state is "not scheduled, but still persisted" and the error
    /// is surfaced so the caller can retry the delete.
    pub async fn remove_task(&self, id: TaskId) -> Result<(), CoordinatorError> {
        let task = self.store.get_by_id(id).map_err(CoordinatorError::from_store)?;

        let handle = {
            let mut triggers = self.triggers.lock().await;
            triggers.remove(&id)
        };
        match handle {
            Some(handle) => self.engine.cancel(handle).await,
            None => debug!(id, "Coordinator::remove_task: no live trigger for task"),
        }

        self.store.delete_by_id(id).map_err(CoordinatorError::from_store)?;
        info!(id, name = %task.name, "Task removed");
        Ok(())
    }

    /// Number of tasks with a live trigger
    pub async fn scheduled_count(&self) -> usize {
        self.triggers.lock().await.len()
    }

    /// Check whether a task currently has a live trigger
    pub async fn is_scheduled(&self, id: TaskId) -> bool {
        self.triggers.lock().await.contains_key(&id)
    }

    /// Build the firing callback for one task.
    ///
    /// The task is captured by value so every callback refers to its own
    /// record, never to shared loop state.
    fn trigger_callback(&self, task: &Task) -> TriggerCallback {
        let task = task.clone();
        let executor = Arc::clone(&self.executor);
        Arc::new(move || executor(&task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cronstore::{SqliteTaskStore, StoreError};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex as StdMutex;

    use crate::trigger::TriggerError;

    /// Engine stub that accepts every registration and records live handles
    struct StubEngine {
        next_id: AtomicU64,
        active: StdMutex<HashSet<TriggerHandle>>,
    }

    impl StubEngine {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                next_id: AtomicU64::new(0),
                active: StdMutex::new(HashSet::new()),
            })
        }

        fn active_count(&self) -> usize {
            self.active.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TriggerEngine for StubEngine {
        async fn register(&self, _expression: &str, _callback: TriggerCallback) -> Result<TriggerHandle, TriggerError> {
            let handle = TriggerHandle::new(self.next_id.fetch_add(1, Ordering::SeqCst));
            self.active.lock().unwrap().insert(handle);
            Ok(handle)
        }

        async fn cancel(&self, handle: TriggerHandle) {
            self.active.lock().unwrap().remove(&handle);
        }

        async fn start(&self) {}
    }

    /// Engine stub that rejects every registration
    struct FailingEngine;

    #[async_trait]
    impl TriggerEngine for FailingEngine {
        async fn register(&self, _expression: &str, _callback: TriggerCallback) -> Result<TriggerHandle, TriggerError> {
            Err(TriggerError::RegistrationFailed("stub engine".to_string()))
        }

        async fn cancel(&self, _handle: TriggerHandle) {}

        async fn start(&self) {}
    }

    /// Store stub with injectable failures
    struct MemoryStore {
        tasks: StdMutex<HashMap<TaskId, Task>>,
        next_id: AtomicU64,
        fail_list: bool,
        fail_delete: bool,
    }

    impl MemoryStore {
        fn new() -> Self {
            Self {
                tasks: StdMutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                fail_list: false,
                fail_delete: false,
            }
        }
    }

    impl TaskStore for MemoryStore {
        fn create(&self, task: NewTask) -> Result<Task, StoreError> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) as TaskId;
            let task = Task {
                id,
                name: task.name,
                program: task.program,
                cron: task.cron,
            };
            self.tasks.lock().unwrap().insert(id, task.clone());
            Ok(task)
        }

        fn list_all(&self) -> Result<Vec<Task>, StoreError> {
            if self.fail_list {
                return Err(StoreError::Io(std::io::Error::other("injected failure")));
            }
            Ok(self.tasks.lock().unwrap().values().cloned().collect())
        }

        fn get_by_id(&self, id: TaskId) -> Result<Task, StoreError> {
            self.tasks.lock().unwrap().get(&id).cloned().ok_or(StoreError::NotFound(id))
        }

        fn delete_by_id(&self, id: TaskId) -> Result<(), StoreError> {
            if self.fail_delete {
                return Err(StoreError::Io(std::io::Error::other("injected failure")));
            }
            self.tasks.lock().unwrap().remove(&id).map(|_| ()).ok_or(StoreError::NotFound(id))
        }

        fn find_by_name(&self, name: &str) -> Result<Option<Task>, StoreError> {
            Ok(self.tasks.lock().unwrap().values().find(|t| t.name == name).cloned())
        }
    }

    fn sqlite_store() -> Arc<SqliteTaskStore> {
        Arc::new(SqliteTaskStore::open_in_memory().unwrap())
    }

    fn noop_executor() -> Executor {
        Arc::new(|_| {})
    }

    #[tokio::test]
    async fn test_start_all_maps_every_loadable_task() {
        let store = sqlite_store();
        store.create(NewTask::new("A", "p", "0 * * * * *")).unwrap();
        store.create(NewTask::new("B", "p", "*/5 * * * * *")).unwrap();
        // Registration for this one fails at the engine's parser
        store.create(NewTask::new("C", "p", "definitely not cron")).unwrap();

        let engine = Arc::new(CronEngine::new(chrono_tz::UTC));
        let coordinator = Coordinator::with_engine(store.clone(), engine, noop_executor());

        coordinator.start_all().await.unwrap();

        // Two scheduled, the failed one stays persisted but unscheduled
        assert_eq!(coordinator.scheduled_count().await, 2);
        assert_eq!(store.list_all().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_start_all_skips_tasks_with_live_triggers() {
        let store = sqlite_store();
        let engine = StubEngine::new();
        let coordinator = Coordinator::with_engine(store.clone(), engine.clone(), noop_executor());

        // Added before the bulk load; the load must not register it twice
        let id = coordinator.add_task("Early", "P", "0 * * * * *").await.unwrap();
        coordinator.start_all().await.unwrap();

        assert_eq!(coordinator.scheduled_count().await, 1);
        assert_eq!(engine.active_count(), 1);
        assert!(coordinator.is_scheduled(id).await);
    }

    #[tokio::test]
    async fn test_start_all_fails_when_load_fails() {
        let mut store = MemoryStore::new();
        store.fail_list = true;

        let coordinator = Coordinator::with_engine(Arc::new(store), StubEngine::new(), noop_executor());
        let err = coordinator.start_all().await.unwrap_err();
        assert!(matches!(err, CoordinatorError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_add_task_round_trip() {
        let store = sqlite_store();
        let engine = StubEngine::new();
        let coordinator = Coordinator::with_engine(store.clone(), engine.clone(), noop_executor());

        let id = coordinator.add_task("T", "P", "* * * * * *").await.unwrap();

        let listed = store.list_all().unwrap();
        assert!(listed.iter().any(|t| t.id == id && t.name == "T"));
        assert!(coordinator.is_scheduled(id).await);
        assert_eq!(engine.active_count(), 1);
    }

    #[tokio::test]
    async fn test_add_task_invalid_expression_rolls_back() {
        let store = sqlite_store();
        let engine = Arc::new(CronEngine::new(chrono_tz::UTC));
        let coordinator = Coordinator::with_engine(store.clone(), engine, noop_executor());

        let err = coordinator.add_task("T", "P", "bad expression").await.unwrap_err();
        assert!(matches!(err, CoordinatorError::Trigger(TriggerError::InvalidExpression { .. })));

        // Compensating delete left no trace
        assert!(store.list_all().unwrap().is_empty());
        assert_eq!(coordinator.scheduled_count().await, 0);
    }

    #[tokio::test]
    async fn test_add_task_engine_failure_rolls_back() {
        let store = sqlite_store();
        let coordinator = Coordinator::with_engine(store.clone(), Arc::new(FailingEngine), noop_executor());

        let err = coordinator.add_task("T", "P", "* * * * * *").await.unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::Trigger(TriggerError::RegistrationFailed(_))
        ));
        assert!(store.list_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_task_compensation_failure_is_surfaced() {
        let mut store = MemoryStore::new();
        store.fail_delete = true;
        let store = Arc::new(store);

        let coordinator = Coordinator::with_engine(store.clone(), Arc::new(FailingEngine), noop_executor());

        let err = coordinator.add_task("T", "P", "* * * * * *").await.unwrap_err();
        assert!(matches!(err, CoordinatorError::Compensation { .. }));
        // The orphaned record is still there, as the error warns
        assert_eq!(store.list_all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_task_tolerates_missing_handle() {
        let store = sqlite_store();
        let task = store.create(NewTask::new("T", "P", "* * * * * *")).unwrap();

        // Registration failed during load, so no mapping entry exists
        let coordinator = Coordinator::with_engine(store.clone(), Arc::new(FailingEngine), noop_executor());
        coordinator.start_all().await.unwrap();
        assert!(!coordinator.is_scheduled(task.id).await);

        coordinator.remove_task(task.id).await.unwrap();
        assert!(store.list_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_task_unknown_id() {
        let store = sqlite_store();
        store.create(NewTask::new("T", "P", "* * * * * *")).unwrap();

        let engine = StubEngine::new();
        let coordinator = Coordinator::with_engine(store.clone(), engine.clone(), noop_executor());
        coordinator.start_all().await.unwrap();

        let err = coordinator.remove_task(9999).await.unwrap_err();
        assert!(err.is_not_found());

        // Neither store nor mapping mutated
        assert_eq!(store.list_all().unwrap().len(), 1);
        assert_eq!(coordinator.scheduled_count().await, 1);
        assert_eq!(engine.active_count(), 1);
    }

    #[tokio::test]
    async fn test_remove_task_cancels_trigger() {
        let store = sqlite_store();
        let engine = StubEngine::new();
        let coordinator = Coordinator::with_engine(store.clone(), engine.clone(), noop_executor());

        let id = coordinator.add_task("T", "P", "* * * * * *").await.unwrap();
        assert_eq!(engine.active_count(), 1);

        coordinator.remove_task(id).await.unwrap();
        assert_eq!(engine.active_count(), 0);
        assert!(!coordinator.is_scheduled(id).await);
        assert!(store.list_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_add_then_remove() {
        let store = sqlite_store();
        let engine = StubEngine::new();
        let coordinator = Arc::new(Coordinator::with_engine(store.clone(), engine.clone(), noop_executor()));

        let adds: Vec<_> = (0..8)
            .map(|i| {
                let coordinator = Arc::clone(&coordinator);
                tokio::spawn(async move {
                    coordinator
                        .add_task(format!("task-{i}"), "P", "0 * * * * *")
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut ids = Vec::new();
        for add in adds {
            ids.push(add.await.unwrap());
        }
        assert_eq!(coordinator.scheduled_count().await, 8);
        assert_eq!(store.list_all().unwrap().len(), 8);

        let removes: Vec<_> = ids
            .into_iter()
            .map(|id| {
                let coordinator = Arc::clone(&coordinator);
                tokio::spawn(async move { coordinator.remove_task(id).await.unwrap() })
            })
            .collect();
        for remove in removes {
            remove.await.unwrap();
        }

        assert_eq!(coordinator.scheduled_count().await, 0);
        assert!(store.list_all().unwrap().is_empty());
        assert_eq!(engine.active_count(), 0);
    }

    #[tokio::test]
    async fn test_new_rejects_unknown_timezone() {
        let schedule = ScheduleConfig {
            timezone: "Middle/Nowhere".to_string(),
        };
        let err = Coordinator::new(sqlite_store(), &schedule).unwrap_err();
        assert!(matches!(err, CoordinatorError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_new_accepts_iana_timezone() {
        let schedule = ScheduleConfig {
            timezone: "Asia/Shanghai".to_string(),
        };
        assert!(Coordinator::new(sqlite_store(), &schedule).is_ok());
    }
}
