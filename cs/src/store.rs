//! Core TaskStore implementation
//!
//! The [`TaskStore`] trait is the narrow contract the coordinator consumes:
//! create, list, fetch-by-id, delete-by-id, plus a name lookup used by
//! first-boot seeding. [`SqliteTaskStore`] is the durable implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::task::{NewTask, Task, TaskId};

/// Narrow persistence contract for task records
pub trait TaskStore: Send + Sync {
    /// Persist a new task; the store assigns the identifier
    fn create(&self, task: NewTask) -> Result<Task, StoreError>;

    /// List every persisted task (order is store-defined)
    fn list_all(&self) -> Result<Vec<Task>, StoreError>;

    /// Fetch a task by identifier
    fn get_by_id(&self, id: TaskId) -> Result<Task, StoreError>;

    /// Delete a task by identifier
    fn delete_by_id(&self, id: TaskId) -> Result<(), StoreError>;

    /// Look up a task by name (used by idempotent seeding)
    fn find_by_name(&self, name: &str) -> Result<Option<Task>, StoreError>;
}

/// SQLite-backed task store
pub struct SqliteTaskStore {
    // rusqlite's Connection is Send but not Sync
    conn: Mutex<Connection>,
}

impl SqliteTaskStore {
    /// Open or create a store at the given path, running schema migration
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::migrate(&conn)?;
        info!(path = %path.display(), "Opened task store");
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory store (tests and throwaway runs)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::migrate(&conn)?;
        debug!("Opened in-memory task store");
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn migrate(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tasks (
                id      INTEGER PRIMARY KEY AUTOINCREMENT,
                name    TEXT NOT NULL,
                program TEXT NOT NULL,
                cron    TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A poisoned lock only means another thread panicked mid-query;
        // the connection itself is still usable.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TaskStore for SqliteTaskStore {
    fn create(&self, task: NewTask) -> Result<Task, StoreError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO tasks (name, program, cron) VALUES (?1, ?2, ?3)",
            params![task.name, task.program, task.cron],
        )?;
        let id = conn.last_insert_rowid();
        debug!(id, name = %task.name, "Created task record");
        Ok(Task {
            id,
            name: task.name,
            program: task.program,
            cron: task.cron,
        })
    }

    fn list_all(&self) -> Result<Vec<Task>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, name, program, cron FROM tasks")?;
        let rows = stmt.query_map([], |row| {
            Ok(Task {
                id: row.get(0)?,
                name: row.get(1)?,
                program: row.get(2)?,
                cron: row.get(3)?,
            })
        })?;
        let tasks = rows.collect::<Result<Vec<_>, _>>()?;
        debug!(count = tasks.len(), "Listed task records");
        Ok(tasks)
    }

    fn get_by_id(&self, id: TaskId) -> Result<Task, StoreError> {
        let conn = self.conn();
        let task = conn
            .query_row(
                "SELECT id, name, program, cron FROM tasks WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Task {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        program: row.get(2)?,
                        cron: row.get(3)?,
                    })
                },
            )
            .optional()?;
        task.ok_or(StoreError::NotFound(id))
    }

    fn delete_by_id(&self, id: TaskId) -> Result<(), StoreError> {
        let affected = self.conn().execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(StoreError::NotFound(id));
        }
        debug!(id, "Deleted task record");
        Ok(())
    }

    fn find_by_name(&self, name: &str) -> Result<Option<Task>, StoreError> {
        let conn = self.conn();
        let task = conn
            .query_row(
                "SELECT id, name, program, cron FROM tasks WHERE name = ?1 LIMIT 1",
                params![name],
                |row| {
                    Ok(Task {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        program: row.get(2)?,
                        cron: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(task)
    }
}
