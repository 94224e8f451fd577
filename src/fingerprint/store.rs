use crate::error::{AppError, AppResult};
use deadpool_sqlite::Pool;
use rusqlite::{params, OptionalExtension};
use std::collections::HashMap;
use std::sync::Mutex;

/// Persistent string key-value pairs owned by this process.
#[async_trait::async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> AppResult<()>;
}

/// Process-local store; nothing survives a restart.
#[derive(Default)]
pub struct MemoryKvStore {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let map = self
            .inner
            .lock()
            .map_err(|_| AppError::Internal("kv store lock poisoned".to_string()))?;
        Ok(map.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| AppError::Internal("kv store lock poisoned".to_string()))?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by the `local_state` table.
#[derive(Clone)]
pub struct SqliteKvStore {
    pool: Pool,
}

impl SqliteKvStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::Internal(format!("pool error: {e}")))?;
        let key = key.to_string();
        let value = conn
            .interact(move |conn| {
                conn.query_row(
                    "SELECT value FROM local_state WHERE key = ?1",
                    params![key],
                    |row| row.get::<_, String>(0),
                )
                .optional()
            })
            .await??;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::Internal(format!("pool error: {e}")))?;
        let key = key.to_string();
        let value = value.to_string();
        conn.interact(move |conn| {
            conn.execute(
                "INSERT INTO local_state (key, value, updated_at) VALUES (?1, ?2, unixepoch())
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value],
            )
        })
        .await??;
        Ok(())
    }
}
