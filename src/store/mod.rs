//! Durable state. Backed by a single SQLite connection
//! behind a blocking mutex; every public method hops onto a blocking-pool
//! thread via [`Store::run`] so callers never block the async runtime on
//! disk I/O under load.
//!
//! Schema setup follows the usual `init_schema` / `execute_batch` pattern
//! for a single bundled SQLite connection; the mutex-plus-spawn_blocking
//! wrapper is this crate's own addition to make that pattern async-safe.

mod actions;
mod admin;
mod agents;
mod context;
mod files;
mod messages;
mod schema;
mod sessions;
mod tasks;

pub use sessions::{GRACE_PERIOD_MINUTES, MAX_RECOVERY_ATTEMPTS};

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::errors::{CoreError, CoreResult};

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: &Path) -> CoreResult<Self> {
        let conn = Connection::open(path).map_err(CoreError::from)?;
        conn.execute_batch(schema::SCHEMA_SQL)
            .map_err(CoreError::from)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> CoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(CoreError::from)?;
        conn.execute_batch(schema::SCHEMA_SQL)
            .map_err(CoreError::from)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on a blocking-pool thread.
    pub(crate) async fn run<T, F>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&Connection) -> CoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| CoreError::Internal("store mutex poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| CoreError::Internal(format!("store task panicked: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_in_memory_applies_schema() {
        let store = Store::open_in_memory().unwrap();
        let count: i64 = store
            .run(|conn| {
                conn.query_row(
                    "SELECT count(*) FROM sqlite_master WHERE type = 'table'",
                    [],
                    |row| row.get(0),
                )
                .map_err(CoreError::from)
            })
            .await
            .unwrap();
        assert!(count >= 10);
    }
}
