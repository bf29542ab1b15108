//! Persisted named state: storage trait and SQLite implementation.
//!
//! Session state (activity log, current principal, theme) is persisted as
//! named serialized records with no versioning or migration logic — each
//! record is a JSON blob keyed by a fixed storage name.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Storage name for the activity log record.
pub const ACTIVITY_LOG_KEY: &str = "activity-log-storage";
/// Storage name for the current-principal record.
pub const AUTH_KEY: &str = "auth-storage";
/// Storage name for the theme record.
pub const THEME_KEY: &str = "theme-storage";

/// Backend for named persisted records.
pub trait StateStore: Send + Sync {
  /// Write the record stored under `name`, replacing any previous value.
  fn save(&self, name: &str, value: &serde_json::Value) -> Result<()>;

  /// Read the record stored under `name`, if any.
  fn load(&self, name: &str) -> Result<Option<serde_json::Value>>;
}

/// In-memory store. Used by tests and `--ephemeral` runs; nothing survives
/// the process.
#[derive(Default)]
pub struct MemoryStateStore {
  records: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryStateStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl StateStore for MemoryStateStore {
  fn save(&self, name: &str, value: &serde_json::Value) -> Result<()> {
    let mut records = self
      .records
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    records.insert(name.to_string(), value.clone());
    Ok(())
  }

  fn load(&self, name: &str) -> Result<Option<serde_json::Value>> {
    let records = self
      .records
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(records.get(name).cloned())
  }
}

/// SQLite-backed store at a fixed path under the platform data directory.
pub struct SqliteStateStore {
  conn: Mutex<Connection>,
}

const STATE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS named_state (
    name TEXT PRIMARY KEY,
    data BLOB NOT NULL,
    saved_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl SqliteStateStore {
  /// Open the store at the default location, creating it if needed.
  pub fn open() -> Result<Self> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open the store at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create state directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open state database at {}: {}", path.display(), e))?;
    conn
      .execute_batch(STATE_SCHEMA)
      .map_err(|e| eyre!("Failed to run state migrations: {}", e))?;

    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  /// Default database path: `<data dir>/udash/state.db`.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("udash").join("state.db"))
  }
}

impl StateStore for SqliteStateStore {
  fn save(&self, name: &str, value: &serde_json::Value) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let data = serde_json::to_vec(value).map_err(|e| eyre!("Failed to serialize state: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO named_state (name, data, saved_at)
         VALUES (?, ?, datetime('now'))",
        params![name, data],
      )
      .map_err(|e| eyre!("Failed to save state record {}: {}", name, e))?;

    Ok(())
  }

  fn load(&self, name: &str) -> Result<Option<serde_json::Value>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT data FROM named_state WHERE name = ?")
      .map_err(|e| eyre!("Failed to prepare state query: {}", e))?;

    let data: Option<Vec<u8>> = stmt.query_row(params![name], |row| row.get(0)).ok();

    match data {
      Some(bytes) => {
        let value = serde_json::from_slice(&bytes)
          .map_err(|e| eyre!("Failed to parse state record {}: {}", name, e))?;
        Ok(Some(value))
      }
      None => Ok(None),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_memory_store_roundtrip() {
    let store = MemoryStateStore::new();
    assert!(store.load("missing").unwrap().is_none());

    store.save("theme-storage", &json!({ "dark": true })).unwrap();
    let value = store.load("theme-storage").unwrap().unwrap();
    assert_eq!(value["dark"], json!(true));
  }

  #[test]
  fn test_memory_store_save_replaces() {
    let store = MemoryStateStore::new();
    store.save("k", &json!(1)).unwrap();
    store.save("k", &json!(2)).unwrap();
    assert_eq!(store.load("k").unwrap().unwrap(), json!(2));
  }

  #[test]
  fn test_sqlite_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.db");

    {
      let store = SqliteStateStore::open_at(&path).unwrap();
      store
        .save(ACTIVITY_LOG_KEY, &json!([{ "action": "CREATE" }]))
        .unwrap();
    }

    let store = SqliteStateStore::open_at(&path).unwrap();
    let value = store.load(ACTIVITY_LOG_KEY).unwrap().unwrap();
    assert_eq!(value[0]["action"], json!("CREATE"));
  }

  #[test]
  fn test_sqlite_store_missing_record() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStateStore::open_at(&dir.path().join("s.db")).unwrap();
    assert!(store.load("nope").unwrap().is_none());
  }
}
