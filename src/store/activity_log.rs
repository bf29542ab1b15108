//! Append-only, session-persisted ledger of mutation intents.
//!
//! An entry is recorded the moment a mutation is initiated and is never
//! retracted, even when the remote call later fails — the ledger records
//! intent, not confirmed effect. The only removal is an explicit clear-all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::store::persist::{StateStore, ACTIVITY_LOG_KEY};
use crate::users::types::{User, UserAction, UserFormData};

/// What a log entry refers to: the full record for deletes, the submitted
/// form for creates and updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogSubject {
  User(User),
  Form(UserFormData),
}

impl LogSubject {
  /// Display name of the affected user.
  pub fn name(&self) -> &str {
    match self {
      LogSubject::User(u) => &u.name,
      LogSubject::Form(f) => &f.name,
    }
  }
}

/// One recorded mutation intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
  pub id: String,
  pub action: UserAction,
  pub timestamp: DateTime<Utc>,
  pub subject: LogSubject,
  pub administrator: String,
}

struct LogInner {
  entries: Vec<ActivityLogEntry>,
  seq: u64,
}

/// The ledger. Entries are newest-first; growth is unbounded by design.
pub struct ActivityLogStore<S> {
  store: Arc<S>,
  administrator: String,
  inner: Mutex<LogInner>,
}

impl<S: StateStore> ActivityLogStore<S> {
  /// Create the ledger, loading any previously persisted entries.
  pub fn new(store: Arc<S>, administrator: String) -> Self {
    let entries = match store.load(ACTIVITY_LOG_KEY) {
      Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|e| {
        warn!("discarding unreadable activity log: {}", e);
        Vec::new()
      }),
      Ok(None) => Vec::new(),
      Err(e) => {
        warn!("failed to load activity log: {}", e);
        Vec::new()
      }
    };

    Self {
      store,
      administrator,
      inner: Mutex::new(LogInner { entries, seq: 0 }),
    }
  }

  /// The acting principal for this session. Fixed, not derived from any
  /// authentication.
  pub fn administrator(&self) -> &str {
    &self.administrator
  }

  /// Prepend a new entry. Always succeeds; a persistence failure is logged
  /// and the in-memory ledger keeps the entry.
  pub fn add(&self, action: UserAction, subject: LogSubject) -> ActivityLogEntry {
    let mut inner = match self.inner.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };

    let now = Utc::now();
    inner.seq += 1;
    let entry = ActivityLogEntry {
      // Time-based id, uniqued with a per-session sequence suffix.
      id: format!("{}-{}", now.timestamp_millis(), inner.seq),
      action,
      timestamp: now,
      subject,
      administrator: self.administrator.clone(),
    };

    inner.entries.insert(0, entry.clone());
    self.persist(&inner.entries);
    entry
  }

  /// Empty the ledger unconditionally.
  pub fn clear(&self) {
    let mut inner = match self.inner.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    inner.entries.clear();
    self.persist(&inner.entries);
  }

  /// Snapshot of the entries, newest first.
  pub fn entries(&self) -> Vec<ActivityLogEntry> {
    match self.inner.lock() {
      Ok(guard) => guard.entries.clone(),
      Err(poisoned) => poisoned.into_inner().entries.clone(),
    }
  }

  pub fn len(&self) -> usize {
    match self.inner.lock() {
      Ok(guard) => guard.entries.len(),
      Err(poisoned) => poisoned.into_inner().entries.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn persist(&self, entries: &[ActivityLogEntry]) {
    match serde_json::to_value(entries) {
      Ok(value) => {
        if let Err(e) = self.store.save(ACTIVITY_LOG_KEY, &value) {
          warn!("failed to persist activity log: {}", e);
        }
      }
      Err(e) => warn!("failed to serialize activity log: {}", e),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::persist::MemoryStateStore;

  fn form() -> UserFormData {
    UserFormData {
      name: "Ann Lee".to_string(),
      email: "ann@x.com".to_string(),
      phone: "+1 555-0100".to_string(),
      company: "Acme".to_string(),
    }
  }

  #[test]
  fn test_add_prepends_newest_first() {
    let log = ActivityLogStore::new(Arc::new(MemoryStateStore::new()), "Leanne".into());
    log.add(UserAction::Create, LogSubject::Form(form()));
    let mut second = form();
    second.name = "Bob Roe".to_string();
    log.add(UserAction::Update, LogSubject::Form(second));

    let entries = log.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].action, UserAction::Update);
    assert_eq!(entries[0].subject.name(), "Bob Roe");
    assert_eq!(entries[1].action, UserAction::Create);
  }

  #[test]
  fn test_entry_ids_are_unique() {
    let log = ActivityLogStore::new(Arc::new(MemoryStateStore::new()), "Leanne".into());
    for _ in 0..20 {
      log.add(UserAction::Create, LogSubject::Form(form()));
    }
    let entries = log.entries();
    let mut ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 20);
  }

  #[test]
  fn test_entries_carry_administrator() {
    let log = ActivityLogStore::new(Arc::new(MemoryStateStore::new()), "Leanne".into());
    let entry = log.add(UserAction::Delete, LogSubject::Form(form()));
    assert_eq!(entry.administrator, "Leanne");
  }

  #[test]
  fn test_clear_empties_ledger() {
    let log = ActivityLogStore::new(Arc::new(MemoryStateStore::new()), "Leanne".into());
    log.add(UserAction::Create, LogSubject::Form(form()));
    assert!(!log.is_empty());
    log.clear();
    assert!(log.is_empty());
  }

  #[test]
  fn test_entries_survive_reload() {
    let store = Arc::new(MemoryStateStore::new());
    {
      let log = ActivityLogStore::new(store.clone(), "Leanne".into());
      log.add(UserAction::Create, LogSubject::Form(form()));
    }
    let reloaded = ActivityLogStore::new(store, "Leanne".into());
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.entries()[0].subject.name(), "Ann Lee");
  }
}
