//! Session state: the current principal and the theme flag.
//!
//! Both are trivial persisted records loaded at startup and written on every
//! change, under the same storage names the product has always used.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::store::persist::{StateStore, AUTH_KEY, THEME_KEY};
use crate::users::types::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ThemeRecord {
  dark_mode: bool,
}

/// Per-session state. The current user is a display identity, not an
/// authenticated one.
pub struct SessionStore<S> {
  store: Arc<S>,
  current_user: Mutex<User>,
  dark_mode: Mutex<bool>,
}

impl<S: StateStore> SessionStore<S> {
  /// Load persisted session state, falling back to the given default
  /// principal and light mode.
  pub fn new(store: Arc<S>, default_user: User) -> Self {
    let current_user = match store.load(AUTH_KEY) {
      Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|e| {
        warn!("discarding unreadable session principal: {}", e);
        default_user.clone()
      }),
      Ok(None) => default_user.clone(),
      Err(e) => {
        warn!("failed to load session principal: {}", e);
        default_user.clone()
      }
    };

    let dark_mode = match store.load(THEME_KEY) {
      Ok(Some(value)) => serde_json::from_value::<ThemeRecord>(value)
        .map(|r| r.dark_mode)
        .unwrap_or(false),
      _ => false,
    };

    Self {
      store,
      current_user: Mutex::new(current_user),
      dark_mode: Mutex::new(dark_mode),
    }
  }

  pub fn current_user(&self) -> User {
    match self.current_user.lock() {
      Ok(guard) => guard.clone(),
      Err(poisoned) => poisoned.into_inner().clone(),
    }
  }

  pub fn set_current_user(&self, user: User) {
    {
      let mut guard = match self.current_user.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
      };
      *guard = user.clone();
    }
    match serde_json::to_value(&user) {
      Ok(value) => {
        if let Err(e) = self.store.save(AUTH_KEY, &value) {
          warn!("failed to persist session principal: {}", e);
        }
      }
      Err(e) => warn!("failed to serialize session principal: {}", e),
    }
  }

  pub fn dark_mode(&self) -> bool {
    match self.dark_mode.lock() {
      Ok(guard) => *guard,
      Err(poisoned) => *poisoned.into_inner(),
    }
  }

  /// Flip the theme and persist the new value.
  pub fn toggle_dark_mode(&self) -> bool {
    let dark = {
      let mut guard = match self.dark_mode.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
      };
      *guard = !*guard;
      *guard
    };
    let record = ThemeRecord { dark_mode: dark };
    match serde_json::to_value(record) {
      Ok(value) => {
        if let Err(e) = self.store.save(THEME_KEY, &value) {
          warn!("failed to persist theme: {}", e);
        }
      }
      Err(e) => warn!("failed to serialize theme: {}", e),
    }
    dark
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::persist::MemoryStateStore;
  use crate::users::repo::seed_users;

  #[test]
  fn test_defaults_when_nothing_persisted() {
    let session = SessionStore::new(Arc::new(MemoryStateStore::new()), seed_users()[0].clone());
    assert_eq!(session.current_user().name, "Leanne Graham");
    assert!(!session.dark_mode());
  }

  #[test]
  fn test_theme_toggle_persists_across_reload() {
    let store = Arc::new(MemoryStateStore::new());
    {
      let session = SessionStore::new(store.clone(), seed_users()[0].clone());
      assert!(session.toggle_dark_mode());
    }
    let reloaded = SessionStore::new(store, seed_users()[0].clone());
    assert!(reloaded.dark_mode());
  }

  #[test]
  fn test_current_user_persists_across_reload() {
    let store = Arc::new(MemoryStateStore::new());
    let users = seed_users();
    {
      let session = SessionStore::new(store.clone(), users[0].clone());
      session.set_current_user(users[4].clone());
    }
    let reloaded = SessionStore::new(store, users[0].clone());
    assert_eq!(reloaded.current_user().name, "Chelsey Dietrich");
  }
}
