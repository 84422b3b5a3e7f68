//! SQLite implementation of the local key-value store.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::traits::KeyValueStore;
use crate::error::{Error, Result};

/// SQLite-based key-value storage.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open or create the store, at `path` if given, else at the default location.
  pub fn open(path: Option<&Path>) -> Result<Self> {
    let path = match path {
      Some(p) => p.to_path_buf(),
      None => Self::default_path()?,
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(&path).map_err(|e| {
      Error::Storage(format!(
        "Failed to open store database at {}: {}",
        path.display(),
        e
      ))
    })?;

    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;

    Ok(store)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("store.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self.lock()?;
    conn
      .execute_batch(STORE_SCHEMA)
      .map_err(|e| Error::Storage(format!("Failed to run store migrations: {}", e)))?;
    Ok(())
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))
  }
}

/// Application data directory, shared with the log files.
pub fn data_dir() -> Result<PathBuf> {
  let base = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| Error::Storage("Could not determine data directory".to_string()))?;
  Ok(base.join("cardkeep"))
}

const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

const UPSERT: &str = "INSERT OR REPLACE INTO kv_store (key, value, updated_at)
                      VALUES (?, ?, datetime('now'))";

impl KeyValueStore for SqliteStore {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self.lock()?;
    conn
      .query_row(
        "SELECT value FROM kv_store WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| Error::Storage(format!("Failed to read '{}': {}", key, e)))
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let conn = self.lock()?;
    conn
      .execute(UPSERT, params![key, value])
      .map_err(|e| Error::Storage(format!("Failed to write '{}': {}", key, e)))?;
    Ok(())
  }

  fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
    let mut conn = self.lock()?;
    let tx = conn
      .transaction()
      .map_err(|e| Error::Storage(format!("Failed to begin transaction: {}", e)))?;

    for (key, value) in entries {
      tx.execute(UPSERT, params![key, value])
        .map_err(|e| Error::Storage(format!("Failed to write '{}': {}", key, e)))?;
    }

    tx.commit()
      .map_err(|e| Error::Storage(format!("Failed to commit transaction: {}", e)))?;
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let conn = self.lock()?;
    conn
      .execute("DELETE FROM kv_store WHERE key = ?", params![key])
      .map_err(|e| Error::Storage(format!("Failed to delete '{}': {}", key, e)))?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_values_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("store.db");

    {
      let store = SqliteStore::open(Some(&path)).unwrap();
      store.set("collection", "[]").unwrap();
      store
        .set_many(&[("a", "1"), ("b", "2")])
        .unwrap();
    }

    let store = SqliteStore::open(Some(&path)).unwrap();
    assert_eq!(store.get("collection").unwrap().as_deref(), Some("[]"));
    assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
    assert_eq!(store.get("missing").unwrap(), None);
  }

  #[test]
  fn test_overwrite_and_remove() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(Some(&dir.path().join("store.db"))).unwrap();

    store.set("k", "old").unwrap();
    store.set("k", "new").unwrap();
    assert_eq!(store.get("k").unwrap().as_deref(), Some("new"));

    store.remove("k").unwrap();
    store.remove("k").unwrap();
    assert_eq!(store.get("k").unwrap(), None);
  }

  #[test]
  fn test_unusable_directory_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("taken");
    std::fs::write(&blocker, "not a directory").unwrap();

    let result = SqliteStore::open(Some(&blocker.join("store.db")));
    assert!(matches!(result, Err(Error::Io(_))));
  }
}
