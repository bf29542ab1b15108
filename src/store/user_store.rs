//! Data-layer facade: fetching plus the optimistic mutation protocol.
//!
//! Every mutation follows the same three-step shape against both cached
//! views (the current page and the full list):
//!
//! 1. Snapshot both entries, apply the optimistic transform to both, append
//!    an activity-log entry, then issue the remote call. All of this happens
//!    before the first suspension point, so the optimistic state is visible
//!    before the repository is consulted.
//! 2. On success, reconcile both entries with the repository's canonical
//!    record.
//! 3. On failure, restore both entries from the snapshots. The log entry is
//!    not retracted.
//!
//! No retries anywhere; the caller surfaces the failure.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::store::activity_log::{ActivityLogStore, LogSubject};
use crate::store::cache::{CacheEntry, QueryCache, QueryKey};
use crate::store::persist::StateStore;
use crate::users::repo::{RepoError, UserRepository};
use crate::users::types::{User, UserAction, UserFormData};

/// The application's user data layer. Owned by the composition root and
/// shared by `Arc`; nothing here is a global.
pub struct UserStore<R, S> {
  repo: Arc<R>,
  cache: Mutex<QueryCache>,
  log: ActivityLogStore<S>,
  page_size: u32,
  provisional_seq: AtomicI64,
}

impl<R: UserRepository, S: StateStore> UserStore<R, S> {
  pub fn new(repo: Arc<R>, log: ActivityLogStore<S>, page_size: u32) -> Self {
    Self {
      repo,
      cache: Mutex::new(QueryCache::new()),
      log,
      page_size,
      provisional_seq: AtomicI64::new(0),
    }
  }

  pub fn page_size(&self) -> u32 {
    self.page_size
  }

  pub fn log(&self) -> &ActivityLogStore<S> {
    &self.log
  }

  /// Clone of the cache entry for a key, for rendering.
  pub fn entry(&self, key: &QueryKey) -> Option<CacheEntry> {
    self.cache().get(key).cloned()
  }

  /// Records currently cached for a page.
  pub fn page_users(&self, page: u32) -> Vec<User> {
    self.cache().snapshot(&QueryKey::Page(page))
  }

  /// Records currently cached for the full list.
  pub fn all_users(&self) -> Vec<User> {
    self.cache().snapshot(&QueryKey::AllUsers)
  }

  /// Mark a cached result set stale so it is re-fetched on next use.
  pub fn invalidate(&self, key: &QueryKey) {
    self.cache().invalidate(key);
  }

  /// Whether a key should be (re-)fetched before rendering from it.
  pub fn needs_fetch(&self, key: &QueryKey) -> bool {
    self.cache().needs_fetch(key)
  }

  /// Fetch one page of users. The repository only exposes a full list, so
  /// the slice is taken client-side.
  pub async fn load_page(&self, page: u32) -> Result<Vec<User>, RepoError> {
    let token = self.cache().begin_fetch(QueryKey::Page(page));
    let result = self.repo.list().await;

    match result {
      Ok(all) => {
        let slice = page_slice(&all, page, self.page_size);
        self
          .cache()
          .complete_fetch(token, Ok(slice.clone()));
        Ok(slice)
      }
      Err(e) => {
        self.cache().complete_fetch(token, Err(e.to_string()));
        Err(e)
      }
    }
  }

  /// Fetch the full list.
  pub async fn load_all(&self) -> Result<Vec<User>, RepoError> {
    let token = self.cache().begin_fetch(QueryKey::AllUsers);
    let result = self.repo.list().await;

    match result {
      Ok(all) => {
        self.cache().complete_fetch(token, Ok(all.clone()));
        Ok(all)
      }
      Err(e) => {
        self.cache().complete_fetch(token, Err(e.to_string()));
        Err(e)
      }
    }
  }

  /// Fetch one user by id. Detail lookups bypass the cached list views;
  /// not-found is a distinct, non-retried outcome.
  pub async fn get_user(&self, id: i64) -> Result<User, RepoError> {
    self.repo.get_by_id(id).await
  }

  /// Create a user optimistically.
  pub async fn create_user(&self, page: u32, form: UserFormData) -> Result<User, RepoError> {
    let page_key = QueryKey::Page(page);
    let provisional = form.expand(self.next_provisional_id());

    let (snap_page, snap_all) = {
      let mut cache = self.cache();
      let snaps = (cache.snapshot(&page_key), cache.snapshot(&QueryKey::AllUsers));
      for key in [page_key, QueryKey::AllUsers] {
        let provisional = provisional.clone();
        cache.set(key, move |old| prepend(provisional, old));
      }
      snaps
    };

    self.log.add(UserAction::Create, LogSubject::Form(form.clone()));
    debug!(provisional_id = provisional.id, "optimistic create applied");

    match self.repo.create(&form).await {
      Ok(created) => {
        let mut cache = self.cache();
        for key in [page_key, QueryKey::AllUsers] {
          let created = created.clone();
          let provisional_id = provisional.id;
          cache.set(key, move |old| {
            let survivors: Vec<User> = old
              .iter()
              .filter(|u| u.id != provisional_id && u.id != created.id)
              .cloned()
              .collect();
            prepend(created, &survivors)
          });
        }
        cache.invalidate_other_pages(page);
        debug!(id = created.id, "create reconciled");
        Ok(created)
      }
      Err(e) => {
        self.rollback(page_key, snap_page, snap_all);
        debug!(error = %e, "create rolled back");
        Err(e)
      }
    }
  }

  /// Update a user optimistically.
  pub async fn update_user(
    &self,
    page: u32,
    id: i64,
    form: UserFormData,
  ) -> Result<User, RepoError> {
    let page_key = QueryKey::Page(page);

    let (snap_page, snap_all) = {
      let mut cache = self.cache();
      let snaps = (cache.snapshot(&page_key), cache.snapshot(&QueryKey::AllUsers));
      for key in [page_key, QueryKey::AllUsers] {
        let form = form.clone();
        cache.set(key, move |old| {
          old
            .iter()
            .map(|u| if u.id == id { form.apply_to(u) } else { u.clone() })
            .collect()
        });
      }
      snaps
    };

    self.log.add(UserAction::Update, LogSubject::Form(form.clone()));
    debug!(id, "optimistic update applied");

    match self.repo.update(id, &form).await {
      Ok(updated) => {
        let mut cache = self.cache();
        for key in [page_key, QueryKey::AllUsers] {
          let updated = updated.clone();
          cache.set(key, move |old| {
            old
              .iter()
              .map(|u| if u.id == updated.id { updated.clone() } else { u.clone() })
              .collect()
          });
        }
        cache.invalidate_other_pages(page);
        Ok(updated)
      }
      Err(e) => {
        self.rollback(page_key, snap_page, snap_all);
        debug!(id, error = %e, "update rolled back");
        Err(e)
      }
    }
  }

  /// Delete a user optimistically.
  pub async fn delete_user(&self, page: u32, id: i64) -> Result<(), RepoError> {
    let page_key = QueryKey::Page(page);

    let (snap_page, snap_all) = {
      let mut cache = self.cache();
      let snaps = (cache.snapshot(&page_key), cache.snapshot(&QueryKey::AllUsers));
      for key in [page_key, QueryKey::AllUsers] {
        cache.set(key, move |old| {
          old.iter().filter(|u| u.id != id).cloned().collect()
        });
      }
      snaps
    };

    // The ledger wants the record as it existed before the delete.
    let deleted = snap_all
      .iter()
      .chain(snap_page.iter())
      .find(|u| u.id == id)
      .cloned();
    if let Some(user) = deleted {
      self.log.add(UserAction::Delete, LogSubject::User(user));
    }
    debug!(id, "optimistic delete applied");

    match self.repo.delete(id).await {
      // The records are already gone from both entries.
      Ok(()) => {
        self.cache().invalidate_other_pages(page);
        Ok(())
      }
      Err(e) => {
        self.rollback(page_key, snap_page, snap_all);
        debug!(id, error = %e, "delete rolled back");
        Err(e)
      }
    }
  }

  fn rollback(&self, page_key: QueryKey, snap_page: Vec<User>, snap_all: Vec<User>) {
    let mut cache = self.cache();
    cache.restore(page_key, snap_page);
    cache.restore(QueryKey::AllUsers, snap_all);
  }

  /// Reserved id namespace for optimistic records: negative, never assigned
  /// by any repository.
  fn next_provisional_id(&self) -> i64 {
    -(self.provisional_seq.fetch_add(1, Ordering::Relaxed) + 1)
  }

  fn cache(&self) -> MutexGuard<'_, QueryCache> {
    match self.cache.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    }
  }
}

fn prepend(user: User, rest: &[User]) -> Vec<User> {
  let mut next = Vec::with_capacity(rest.len() + 1);
  next.push(user);
  next.extend_from_slice(rest);
  next
}

fn page_slice(all: &[User], page: u32, page_size: u32) -> Vec<User> {
  let start = (page.saturating_sub(1) as usize) * page_size as usize;
  all.iter().skip(start).take(page_size as usize).cloned().collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::persist::MemoryStateStore;
  use crate::users::repo::{seed_users, SimulatedRepo};
  use async_trait::async_trait;
  use std::time::Duration;

  /// Repository whose mutations always fail.
  struct FailingRepo;

  #[async_trait]
  impl UserRepository for FailingRepo {
    async fn list(&self) -> Result<Vec<User>, RepoError> {
      Ok(seed_users())
    }

    async fn get_by_id(&self, id: i64) -> Result<User, RepoError> {
      Err(RepoError::NotFound(id))
    }

    async fn create(&self, _form: &UserFormData) -> Result<User, RepoError> {
      Err(RepoError::Unavailable("injected".into()))
    }

    async fn update(&self, _id: i64, _form: &UserFormData) -> Result<User, RepoError> {
      Err(RepoError::Unavailable("injected".into()))
    }

    async fn delete(&self, _id: i64) -> Result<(), RepoError> {
      Err(RepoError::Unavailable("injected".into()))
    }
  }

  fn form() -> UserFormData {
    UserFormData {
      name: "Ann Lee".to_string(),
      email: "ann@x.com".to_string(),
      phone: "+1 555-0100".to_string(),
      company: "Acme".to_string(),
    }
  }

  fn log() -> ActivityLogStore<MemoryStateStore> {
    ActivityLogStore::new(Arc::new(MemoryStateStore::new()), "Leanne".into())
  }

  async fn loaded_store<R: UserRepository>(repo: R) -> UserStore<R, MemoryStateStore> {
    let store = UserStore::new(Arc::new(repo), log(), 5);
    store.load_page(1).await.unwrap();
    store.load_all().await.unwrap();
    store
  }

  #[tokio::test]
  async fn test_load_page_slices_full_list() {
    let store = UserStore::new(Arc::new(SimulatedRepo::new(Duration::ZERO)), log(), 5);
    let page1 = store.load_page(1).await.unwrap();
    let page2 = store.load_page(2).await.unwrap();
    assert_eq!(page1.len(), 5);
    assert_eq!(page2.len(), 5);
    assert_eq!(page1[0].id, 1);
    assert_eq!(page2[0].id, 6);
    assert!(store.load_page(3).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_create_reconciles_both_views() {
    let store = loaded_store(SimulatedRepo::new(Duration::ZERO)).await;

    let created = store.create_user(1, form()).await.unwrap();
    assert_eq!(created.id, 11);
    assert_eq!(created.username, "annlee");

    for users in [store.page_users(1), store.all_users()] {
      // Canonical record at the head, no provisional left behind
      assert_eq!(users[0].id, 11);
      assert_eq!(users[0].username, "annlee");
      assert!(users.iter().all(|u| u.id > 0));
      assert_eq!(users.iter().filter(|u| u.id == 11).count(), 1);
    }
  }

  #[tokio::test]
  async fn test_create_optimistic_state_visible_before_resolution() {
    let store = Arc::new(loaded_store(SimulatedRepo::new(Duration::from_millis(80))).await);

    let task = {
      let store = store.clone();
      tokio::spawn(async move { store.create_user(1, form()).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Mid-flight: a provisional record heads both views, and the intent is
    // already in the ledger.
    for users in [store.page_users(1), store.all_users()] {
      assert!(users[0].is_provisional());
      assert_eq!(users[0].username, "annlee");
      assert_eq!(users[0].website, "");
    }
    assert_eq!(store.log().len(), 1);

    let created = task.await.unwrap().unwrap();
    assert!(created.id > 0);
    assert!(store.all_users().iter().all(|u| !u.is_provisional()));
  }

  #[tokio::test]
  async fn test_create_failure_rolls_back_exactly_and_keeps_log() {
    let store = loaded_store(FailingRepo).await;
    let before_page = store.page_users(1);
    let before_all = store.all_users();

    let err = store.create_user(1, form()).await.unwrap_err();
    assert_eq!(err, RepoError::Unavailable("injected".into()));

    assert_eq!(store.page_users(1), before_page);
    assert_eq!(store.all_users(), before_all);
    // The intent stays in the ledger even though the mutation failed.
    assert_eq!(store.log().len(), 1);
    assert_eq!(store.log().entries()[0].action, UserAction::Create);
  }

  #[tokio::test]
  async fn test_update_applies_same_change_to_both_views() {
    let store = loaded_store(SimulatedRepo::new(Duration::ZERO)).await;

    let updated = store.update_user(1, 1, form()).await.unwrap();
    assert_eq!(updated.id, 1);
    assert_eq!(updated.username, "bret");

    let from_page = store
      .page_users(1)
      .into_iter()
      .find(|u| u.id == 1)
      .unwrap();
    let from_all = store.all_users().into_iter().find(|u| u.id == 1).unwrap();
    assert_eq!(from_page, from_all);
    assert_eq!(from_page.name, "Ann Lee");
    assert_eq!(from_page.company.name, "Acme");
  }

  #[tokio::test]
  async fn test_update_failure_rolls_back_both_views() {
    let store = loaded_store(FailingRepo).await;
    let before_page = store.page_users(1);
    let before_all = store.all_users();

    store.update_user(1, 1, form()).await.unwrap_err();

    assert_eq!(store.page_users(1), before_page);
    assert_eq!(store.all_users(), before_all);
    assert_eq!(store.log().len(), 1);
  }

  #[tokio::test]
  async fn test_delete_removes_from_both_views_and_logs_full_record() {
    let store = loaded_store(SimulatedRepo::new(Duration::ZERO)).await;

    store.delete_user(2, 7).await.unwrap();

    assert!(store.all_users().iter().all(|u| u.id != 7));
    assert!(store.page_users(2).iter().all(|u| u.id != 7));

    let entries = store.log().entries();
    assert_eq!(entries[0].action, UserAction::Delete);
    match &entries[0].subject {
      LogSubject::User(u) => assert_eq!(u.id, 7),
      other => panic!("expected full record in ledger, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_delete_failure_restores_position_and_fields() {
    let store = loaded_store(FailingRepo).await;
    let before_page = store.page_users(2);
    let before_all = store.all_users();
    let position = before_all.iter().position(|u| u.id == 7).unwrap();

    store.delete_user(2, 7).await.unwrap_err();

    let after_all = store.all_users();
    assert_eq!(after_all, before_all);
    assert_eq!(after_all.iter().position(|u| u.id == 7).unwrap(), position);
    assert_eq!(store.page_users(2), before_page);

    // One DELETE entry for the attempt remains.
    let entries = store.log().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, UserAction::Delete);
  }

  #[tokio::test]
  async fn test_mutation_marks_other_cached_pages_stale() {
    let store = loaded_store(SimulatedRepo::new(Duration::ZERO)).await;
    store.load_page(2).await.unwrap();

    store.create_user(1, form()).await.unwrap();

    assert!(store.needs_fetch(&QueryKey::Page(2)));
    assert!(!store.needs_fetch(&QueryKey::Page(1)));
    assert!(!store.needs_fetch(&QueryKey::AllUsers));
  }

  #[tokio::test]
  async fn test_clear_logs_leaves_cache_untouched() {
    let store = loaded_store(SimulatedRepo::new(Duration::ZERO)).await;
    store.create_user(1, form()).await.unwrap();
    let all = store.all_users();

    store.log().clear();
    assert!(store.log().is_empty());
    assert_eq!(store.all_users(), all);
  }

  #[tokio::test]
  async fn test_provisional_ids_never_collide_with_repository_ids() {
    let store = loaded_store(FailingRepo).await;
    // Failed creates leave no provisional behind, but each attempt must draw
    // a distinct reserved id.
    let a = store.next_provisional_id();
    let b = store.next_provisional_id();
    assert!(a < 0 && b < 0);
    assert_ne!(a, b);
  }
}
