//! Keyed cache of user result sets.
//!
//! Two entries overlap by construction: the current page slice and the full
//! list. Each holds its own independent copy of the records; nothing is
//! locked, and the last write to a key wins. Every write bumps the entry's
//! generation, so an in-flight fetch started before the write completes
//! against a stale token and is discarded instead of clobbering newer state.

use std::collections::HashMap;
use std::fmt;

use crate::users::types::User;

/// Identity of one cached result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
  /// One page of the paginated table (1-based).
  Page(u32),
  /// The unpaginated full list.
  AllUsers,
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      QueryKey::Page(n) => write!(f, "users:page:{}", n),
      QueryKey::AllUsers => write!(f, "users:all"),
    }
  }
}

/// One cached result set.
#[derive(Debug, Clone, Default)]
pub struct CacheEntry {
  pub users: Vec<User>,
  pub loading: bool,
  pub error: Option<String>,
  pub stale: bool,
  generation: u64,
}

/// Token identifying the cache state a fetch was started against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchToken {
  key: QueryKey,
  generation: u64,
}

/// The cache: query identity to entry.
#[derive(Debug, Default)]
pub struct QueryCache {
  entries: HashMap<QueryKey, CacheEntry>,
}

impl QueryCache {
  pub fn new() -> Self {
    Self::default()
  }

  /// Current entry for a key, if one exists.
  pub fn get(&self, key: &QueryKey) -> Option<&CacheEntry> {
    self.entries.get(key)
  }

  /// The cached records for a key, or an empty slice.
  pub fn users(&self, key: &QueryKey) -> &[User] {
    self.entries.get(key).map(|e| e.users.as_slice()).unwrap_or(&[])
  }

  /// Replace a key's records via a pure transform of the previous records.
  ///
  /// The producer receives the previous sequence and returns the new one;
  /// the old sequence is never edited in place. Bumps the generation.
  pub fn set<F>(&mut self, key: QueryKey, produce: F)
  where
    F: FnOnce(&[User]) -> Vec<User>,
  {
    let entry = self.entries.entry(key).or_default();
    entry.users = produce(&entry.users);
    entry.error = None;
    entry.stale = false;
    entry.generation += 1;
  }

  /// Copy of a key's records, for rollback snapshots.
  pub fn snapshot(&self, key: &QueryKey) -> Vec<User> {
    self.users(key).to_vec()
  }

  /// Restore a key's records from a snapshot. Bumps the generation so any
  /// fetch still in flight cannot resurrect the discarded state.
  pub fn restore(&mut self, key: QueryKey, users: Vec<User>) {
    let entry = self.entries.entry(key).or_default();
    entry.users = users;
    entry.generation += 1;
  }

  /// Mark a key stale so the next observer triggers a re-fetch.
  pub fn invalidate(&mut self, key: &QueryKey) {
    if let Some(entry) = self.entries.get_mut(key) {
      entry.stale = true;
    }
  }

  /// Mark every cached page except `current` stale. Mutations reconcile the
  /// live page and the full list; any other cached page is now out of date.
  pub fn invalidate_other_pages(&mut self, current: u32) {
    for (key, entry) in self.entries.iter_mut() {
      if matches!(key, QueryKey::Page(p) if *p != current) {
        entry.stale = true;
      }
    }
  }

  /// Whether a key has no usable data (missing, stale, or errored).
  pub fn needs_fetch(&self, key: &QueryKey) -> bool {
    match self.entries.get(key) {
      Some(entry) => !entry.loading && (entry.stale || entry.error.is_some()),
      None => true,
    }
  }

  /// Mark a key loading and return the token a later `complete_fetch` must
  /// present.
  pub fn begin_fetch(&mut self, key: QueryKey) -> FetchToken {
    let entry = self.entries.entry(key).or_default();
    entry.loading = true;
    FetchToken {
      key,
      generation: entry.generation,
    }
  }

  /// Finish a fetch. The result is applied only when the entry has not been
  /// written since the fetch began; a stale response is dropped. Returns
  /// whether the result was applied.
  pub fn complete_fetch(&mut self, token: FetchToken, result: Result<Vec<User>, String>) -> bool {
    let Some(entry) = self.entries.get_mut(&token.key) else {
      return false;
    };
    entry.loading = false;

    if entry.generation != token.generation {
      tracing::debug!(key = %token.key, "discarding stale fetch result");
      return false;
    }

    match result {
      Ok(users) => {
        entry.users = users;
        entry.error = None;
        entry.stale = false;
        entry.generation += 1;
      }
      Err(message) => {
        entry.error = Some(message);
      }
    }
    true
  }
}
