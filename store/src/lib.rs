//! Small key-value persistence for PhotoSweep preferences.

use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Database Error: {0}")]
    DatabaseError(String),
    #[error("Task Error: {0}")]
    TaskError(String),
    #[error("Other Error: {0}")]
    Other(String),
}

/// Device key-value persistence as consumed by the preferences store.
/// Values are small strings; absent keys read back as `None`.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    fn set_item(&self, key: &str, value: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

fn apply_migrations(conn: &mut Connection) -> Result<(), StoreError> {
    let migrations = Migrations::new(vec![M::up(
        "CREATE TABLE IF NOT EXISTS kv_items (\
             key TEXT PRIMARY KEY,\
             value TEXT NOT NULL\
         );",
    )]);
    migrations
        .to_latest(conn)
        .map_err(|e| StoreError::DatabaseError(format!("Failed to apply migrations: {}", e)))?;
    Ok(())
}

impl SqliteStore {
    pub fn new(db_path: &Path) -> Result<Self, StoreError> {
        let mut conn = Connection::open(db_path)
            .map_err(|e| StoreError::DatabaseError(format!("Failed to open database: {}", e)))?;
        apply_migrations(&mut conn)?;
        Ok(SqliteStore { conn: Arc::new(Mutex::new(conn)) })
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Other("Poisoned lock".into()))
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT value FROM kv_items WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| StoreError::DatabaseError(format!("Failed to read {}: {}", key, e)))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO kv_items (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .map_err(|e| StoreError::DatabaseError(format!("Failed to write {}: {}", key, e)))?;
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let this = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || this.get(&key))
            .await
            .map_err(|e| StoreError::TaskError(e.to_string()))?
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let this = self.clone();
        let key = key.to_string();
        let value = value.to_string();
        tokio::task::spawn_blocking(move || this.set(&key, &value))
            .await
            .map_err(|e| StoreError::TaskError(e.to_string()))?
    }
}

/// Process-local store, used when no database is wanted and in tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items<I, K, V>(items: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = items.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        MemoryStore { items: Arc::new(Mutex::new(map)) }
    }

    pub fn snapshot(&self) -> HashMap<String, String> {
        self.items.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let items = self
            .items
            .lock()
            .map_err(|_| StoreError::Other("Poisoned lock".into()))?;
        Ok(items.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| StoreError::Other("Poisoned lock".into()))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
