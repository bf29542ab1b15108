//! User repository: the remote-call boundary of the data layer.
//!
//! The only implementation shipped is [`SimulatedRepo`], which answers from
//! in-process state after an artificial delay. The data layer's optimistic
//! protocol is written against the trait, so it must hold for any
//! implementation, including one that fails intermittently.

use async_trait::async_trait;
use rand::Rng;
use std::sync::Mutex;
use std::time::Duration;

use super::types::{Address, Company, Geo, User, UserFormData};

/// Errors a repository operation can surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepoError {
  #[error("user {0} not found")]
  NotFound(i64),
  #[error("backend unavailable: {0}")]
  Unavailable(String),
}

/// Remote store for user records.
#[async_trait]
pub trait UserRepository: Send + Sync {
  /// Fetch every user record.
  async fn list(&self) -> Result<Vec<User>, RepoError>;

  /// Fetch a single user by id.
  async fn get_by_id(&self, id: i64) -> Result<User, RepoError>;

  /// Create a user from form input. The repository assigns the id.
  async fn create(&self, form: &UserFormData) -> Result<User, RepoError>;

  /// Update an existing user from form input.
  async fn update(&self, id: i64, form: &UserFormData) -> Result<User, RepoError>;

  /// Delete a user by id.
  async fn delete(&self, id: i64) -> Result<(), RepoError>;
}

/// In-process repository with artificial latency and seeded records.
pub struct SimulatedRepo {
  users: Mutex<Vec<User>>,
  latency: Duration,
}

impl SimulatedRepo {
  /// Create a repository seeded with the built-in records.
  pub fn new(latency: Duration) -> Self {
    Self {
      users: Mutex::new(seed_users()),
      latency,
    }
  }

  /// Simulate the round trip: the configured latency plus up to 20% jitter.
  async fn round_trip(&self) {
    if self.latency.is_zero() {
      return;
    }
    let jitter = rand::thread_rng().gen_range(0..=self.latency.as_millis() as u64 / 5);
    tokio::time::sleep(self.latency + Duration::from_millis(jitter)).await;
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<User>>, RepoError> {
    self
      .users
      .lock()
      .map_err(|e| RepoError::Unavailable(format!("store lock poisoned: {}", e)))
  }
}

#[async_trait]
impl UserRepository for SimulatedRepo {
  async fn list(&self) -> Result<Vec<User>, RepoError> {
    self.round_trip().await;
    Ok(self.lock()?.clone())
  }

  async fn get_by_id(&self, id: i64) -> Result<User, RepoError> {
    self.round_trip().await;
    self
      .lock()?
      .iter()
      .find(|u| u.id == id)
      .cloned()
      .ok_or(RepoError::NotFound(id))
  }

  async fn create(&self, form: &UserFormData) -> Result<User, RepoError> {
    self.round_trip().await;
    let mut users = self.lock()?;
    let next_id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
    let user = form.expand(next_id);
    users.insert(0, user.clone());
    Ok(user)
  }

  async fn update(&self, id: i64, form: &UserFormData) -> Result<User, RepoError> {
    self.round_trip().await;
    let mut users = self.lock()?;
    let existing = users
      .iter_mut()
      .find(|u| u.id == id)
      .ok_or(RepoError::NotFound(id))?;
    *existing = form.apply_to(existing);
    Ok(existing.clone())
  }

  async fn delete(&self, id: i64) -> Result<(), RepoError> {
    self.round_trip().await;
    let mut users = self.lock()?;
    let before = users.len();
    users.retain(|u| u.id != id);
    if users.len() == before {
      return Err(RepoError::NotFound(id));
    }
    Ok(())
  }
}

fn seed_user(
  id: i64,
  name: &str,
  username: &str,
  email: &str,
  city: &str,
  phone: &str,
  website: &str,
  company: &str,
  catch_phrase: &str,
) -> User {
  User {
    id,
    name: name.to_string(),
    username: username.to_string(),
    email: email.to_string(),
    address: Address {
      street: format!("{} Street", username),
      suite: format!("Suite {}", 100 + id),
      city: city.to_string(),
      zipcode: format!("{:05}-{:04}", 92990 + id, 3870 + id),
      geo: Geo {
        lat: format!("{:.4}", -37.3159 + id as f64),
        lng: format!("{:.4}", 81.1496 - id as f64),
      },
    },
    phone: phone.to_string(),
    website: website.to_string(),
    company: Company {
      name: company.to_string(),
      catch_phrase: catch_phrase.to_string(),
      bs: String::new(),
    },
  }
}

/// The records every fresh repository starts with.
pub fn seed_users() -> Vec<User> {
  vec![
    seed_user(
      1,
      "Leanne Graham",
      "bret",
      "sincere@april.biz",
      "Gwenborough",
      "1-770-736-8031",
      "hildegard.org",
      "Romaguera-Crona",
      "Multi-layered client-server neural-net",
    ),
    seed_user(
      2,
      "Ervin Howell",
      "antonette",
      "shanna@melissa.tv",
      "Wisokyburgh",
      "010-692-6593",
      "anastasia.net",
      "Deckow-Crist",
      "Proactive didactic contingency",
    ),
    seed_user(
      3,
      "Clementine Bauch",
      "samantha",
      "nathan@yesenia.net",
      "McKenziehaven",
      "1-463-123-4447",
      "ramiro.info",
      "Romaguera-Jacobson",
      "Face to face bifurcated interface",
    ),
    seed_user(
      4,
      "Patricia Lebsack",
      "karianne",
      "julianne@kory.org",
      "South Elvis",
      "493-170-9623",
      "kale.biz",
      "Robel-Corkery",
      "Multi-tiered zero tolerance productivity",
    ),
    seed_user(
      5,
      "Chelsey Dietrich",
      "kamren",
      "lucio@annie.ca",
      "Roscoeview",
      "(254)954-1289",
      "demarco.info",
      "Keebler LLC",
      "User-centric fault-tolerant solution",
    ),
    seed_user(
      6,
      "Dennis Schulist",
      "leopoldo",
      "karley@jasper.info",
      "South Christy",
      "1-477-935-8478",
      "ola.org",
      "Considine-Lockman",
      "Synchronised bottom-line interface",
    ),
    seed_user(
      7,
      "Kurtis Weissnat",
      "elwyn",
      "telly@rosamond.me",
      "Howemouth",
      "210-067-6132",
      "elvis.io",
      "Johns Group",
      "Configurable multimedia task-force",
    ),
    seed_user(
      8,
      "Nicholas Runolfsdottir",
      "maxime",
      "sherwood@rosamond.me",
      "Aliyaview",
      "586-493-6943",
      "jacynthe.com",
      "Abernathy Group",
      "Implemented secondary concept",
    ),
    seed_user(
      9,
      "Glenna Reichert",
      "delphine",
      "chaim@dayna.info",
      "Bartholomebury",
      "(775)976-6794",
      "conrad.com",
      "Yost and Sons",
      "Switchable contextually-based project",
    ),
    seed_user(
      10,
      "Clementina DuBuque",
      "moriah",
      "rey@dallas.biz",
      "Lebsackbury",
      "024-648-3804",
      "ambrose.net",
      "Hoeger LLC",
      "Centralized empowering task-force",
    ),
  ]
}

#[cfg(test)]
mod tests {
  use super::*;

  fn form(name: &str) -> UserFormData {
    UserFormData {
      name: name.to_string(),
      email: "new@example.com".to_string(),
      phone: "555-0100".to_string(),
      company: "Acme".to_string(),
    }
  }

  fn repo() -> SimulatedRepo {
    SimulatedRepo::new(Duration::ZERO)
  }

  #[tokio::test]
  async fn test_list_returns_seed() {
    let users = repo().list().await.unwrap();
    assert_eq!(users.len(), 10);
    assert_eq!(users[0].name, "Leanne Graham");
  }

  #[tokio::test]
  async fn test_create_assigns_fresh_positive_id() {
    let repo = repo();
    let created = repo.create(&form("Ann Lee")).await.unwrap();
    assert_eq!(created.id, 11);
    assert_eq!(created.username, "annlee");

    let again = repo.create(&form("Bob Roe")).await.unwrap();
    assert_eq!(again.id, 12);
  }

  #[tokio::test]
  async fn test_update_merges_and_preserves_username() {
    let repo = repo();
    let updated = repo.update(1, &form("Leanne G")).await.unwrap();
    assert_eq!(updated.id, 1);
    assert_eq!(updated.username, "bret");
    assert_eq!(updated.company.name, "Acme");
    // Untouched company detail survives
    assert_eq!(
      updated.company.catch_phrase,
      "Multi-layered client-server neural-net"
    );
  }

  #[tokio::test]
  async fn test_update_missing_user_is_not_found() {
    let err = repo().update(999, &form("Nobody")).await.unwrap_err();
    assert_eq!(err, RepoError::NotFound(999));
  }

  #[tokio::test]
  async fn test_delete_removes_record() {
    let repo = repo();
    repo.delete(3).await.unwrap();
    let err = repo.get_by_id(3).await.unwrap_err();
    assert_eq!(err, RepoError::NotFound(3));
    assert_eq!(repo.list().await.unwrap().len(), 9);
  }

  #[tokio::test]
  async fn test_get_by_id() {
    let user = repo().get_by_id(7).await.unwrap();
    assert_eq!(user.name, "Kurtis Weissnat");
  }
}
