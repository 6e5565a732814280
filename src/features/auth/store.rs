//! Persisted key-value store backing the session.

use sqlite::{Connection, ConnectionThreadSafe, State};
use std::path::Path;
use thiserror::Error;

/// Fixed key the auth snapshot lives under.
pub const STORAGE_KEY: &str = "auth-storage";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store_open_failed:{0}")]
    Open(sqlite::Error),
    #[error("store_query_failed:{0}")]
    Query(#[from] sqlite::Error),
    #[error("store_io_failed:{0}")]
    Io(#[from] std::io::Error),
}

pub trait SessionStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

pub struct SqliteStore {
    conn: ConnectionThreadSafe,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY NOT NULL, value TEXT NOT NULL)";

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open_thread_safe(path).map_err(StoreError::Open)?;
        conn.execute(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_thread_safe(":memory:").map_err(StoreError::Open)?;
        conn.execute(SCHEMA)?;
        Ok(Self { conn })
    }
}

impl SessionStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?")?;
        stmt.bind((1, key))?;
        match stmt.next()? {
            State::Row => Ok(Some(stmt.read::<String, usize>(0)?)),
            State::Done => Ok(None),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut stmt = self
            .conn
            .prepare("INSERT INTO kv (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value")?;
        stmt.bind((1, key))?;
        stmt.bind((2, value))?;
        while let State::Row = stmt.next()? {}
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let mut stmt = self.conn.prepare("DELETE FROM kv WHERE key = ?")?;
        stmt.bind((1, key))?;
        while let State::Row = stmt.next()? {}
        Ok(())
    }
}
