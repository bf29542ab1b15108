//! Domain types for user records and mutation input.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Geographic coordinates, kept as strings like the backend serves them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geo {
  pub lat: String,
  pub lng: String,
}

/// Postal address of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
  pub street: String,
  pub suite: String,
  pub city: String,
  pub zipcode: String,
  pub geo: Geo,
}

/// Company a user belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
  pub name: String,
  #[serde(rename = "catchPhrase")]
  pub catch_phrase: String,
  pub bs: String,
}

/// A full user record.
///
/// `id` is assigned by the repository and immutable afterwards. Optimistic
/// provisional records use negative ids so they can never collide with a
/// repository-assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id: i64,
  pub name: String,
  pub username: String,
  pub email: String,
  pub address: Address,
  pub phone: String,
  pub website: String,
  pub company: Company,
}

impl User {
  /// Whether this record is an optimistic placeholder not yet confirmed
  /// by the repository.
  pub fn is_provisional(&self) -> bool {
    self.id < 0
  }

  /// Two-letter initials for avatar-style rendering.
  pub fn initials(&self) -> String {
    self
      .name
      .split_whitespace()
      .filter_map(|w| w.chars().next())
      .take(2)
      .collect::<String>()
      .to_uppercase()
  }
}

/// The kind of mutation a user record can undergo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserAction {
  Create,
  Update,
  Delete,
}

impl UserAction {
  pub fn label(&self) -> &'static str {
    match self {
      UserAction::Create => "CREATE",
      UserAction::Update => "UPDATE",
      UserAction::Delete => "DELETE",
    }
  }
}

/// Mutation input: the subset of fields the form collects.
///
/// Deliberately a distinct type from `User` — it only becomes a full record
/// through `expand` / `apply_to`, never through structural overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFormData {
  pub name: String,
  pub email: String,
  pub phone: String,
  pub company: String,
}

/// A single field validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
  pub field: &'static str,
  pub message: String,
}

lazy_static! {
  static ref EMAIL_RE: Regex = Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap();
  static ref PHONE_RE: Regex = Regex::new(r"^[+]?[\d\s\-()]+$").unwrap();
}

impl UserFormData {
  /// Validate the form fields. Malformed input never reaches the data layer.
  pub fn validate(&self) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    if self.name.trim().is_empty() {
      errors.push(FieldError {
        field: "name",
        message: "Name is required".into(),
      });
    } else if self.name.trim().len() < 2 {
      errors.push(FieldError {
        field: "name",
        message: "Name must be at least 2 characters".into(),
      });
    }

    if self.email.trim().is_empty() {
      errors.push(FieldError {
        field: "email",
        message: "Email is required".into(),
      });
    } else if !EMAIL_RE.is_match(self.email.trim()) {
      errors.push(FieldError {
        field: "email",
        message: "Invalid email address".into(),
      });
    }

    if self.phone.trim().is_empty() {
      errors.push(FieldError {
        field: "phone",
        message: "Phone number is required".into(),
      });
    } else if !PHONE_RE.is_match(self.phone.trim()) {
      errors.push(FieldError {
        field: "phone",
        message: "Invalid phone number".into(),
      });
    }

    if self.company.trim().is_empty() {
      errors.push(FieldError {
        field: "company",
        message: "Company name is required".into(),
      });
    } else if self.company.trim().len() < 2 {
      errors.push(FieldError {
        field: "company",
        message: "Company name must be at least 2 characters".into(),
      });
    }

    if errors.is_empty() {
      Ok(())
    } else {
      Err(errors)
    }
  }

  /// Expand form input into a full record under the given id.
  ///
  /// Username is derived here, exactly once; address and website start empty
  /// and the company object carries only the submitted name.
  pub fn expand(&self, id: i64) -> User {
    User {
      id,
      name: self.name.clone(),
      username: derive_username(&self.name),
      email: self.email.clone(),
      address: Address::default(),
      phone: self.phone.clone(),
      website: String::new(),
      company: Company {
        name: self.company.clone(),
        catch_phrase: String::new(),
        bs: String::new(),
      },
    }
  }

  /// Shallow-merge the submitted fields onto an existing record.
  ///
  /// Id, username, address, website and the non-name company fields are
  /// preserved; only `company.name` is replaced.
  pub fn apply_to(&self, user: &User) -> User {
    User {
      name: self.name.clone(),
      email: self.email.clone(),
      phone: self.phone.clone(),
      company: Company {
        name: self.company.clone(),
        ..user.company.clone()
      },
      ..user.clone()
    }
  }
}

/// Derive a username from a display name: lowercase, whitespace stripped.
pub fn derive_username(name: &str) -> String {
  name
    .to_lowercase()
    .chars()
    .filter(|c| !c.is_whitespace())
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn form() -> UserFormData {
    UserFormData {
      name: "Ann Lee".to_string(),
      email: "ann@x.com".to_string(),
      phone: "+1 555-0100".to_string(),
      company: "Acme".to_string(),
    }
  }

  #[test]
  fn test_derive_username_strips_whitespace() {
    assert_eq!(derive_username("Ann Lee"), "annlee");
    assert_eq!(derive_username("  Leanne   Graham "), "leannegraham");
  }

  #[test]
  fn test_expand_builds_provisional_shape() {
    let user = form().expand(-1);
    assert_eq!(user.id, -1);
    assert!(user.is_provisional());
    assert_eq!(user.username, "annlee");
    assert_eq!(user.address, Address::default());
    assert_eq!(user.website, "");
    assert_eq!(user.company.name, "Acme");
    assert_eq!(user.company.catch_phrase, "");
  }

  #[test]
  fn test_apply_to_preserves_identity_fields() {
    let original = UserFormData {
      name: "Old Name".to_string(),
      email: "old@x.com".to_string(),
      phone: "123".to_string(),
      company: "OldCo".to_string(),
    }
    .expand(7);
    let mut original = original;
    original.address.city = "Gwenborough".to_string();
    original.company.catch_phrase = "Multi-layered".to_string();

    let updated = form().apply_to(&original);
    assert_eq!(updated.id, 7);
    assert_eq!(updated.username, original.username);
    assert_eq!(updated.name, "Ann Lee");
    assert_eq!(updated.email, "ann@x.com");
    assert_eq!(updated.address.city, "Gwenborough");
    assert_eq!(updated.company.name, "Acme");
    assert_eq!(updated.company.catch_phrase, "Multi-layered");
  }

  #[test]
  fn test_validate_accepts_well_formed_input() {
    assert!(form().validate().is_ok());
  }

  #[test]
  fn test_validate_rejects_short_name() {
    let mut f = form();
    f.name = "A".to_string();
    let errors = f.validate().unwrap_err();
    assert!(errors.iter().any(|e| e.field == "name"));
  }

  #[test]
  fn test_validate_rejects_bad_email_and_phone() {
    let mut f = form();
    f.email = "not-an-email".to_string();
    f.phone = "call me".to_string();
    let errors = f.validate().unwrap_err();
    assert!(errors.iter().any(|e| e.field == "email"));
    assert!(errors.iter().any(|e| e.field == "phone"));
  }

  #[test]
  fn test_validate_requires_all_fields() {
    let f = UserFormData {
      name: String::new(),
      email: String::new(),
      phone: String::new(),
      company: String::new(),
    };
    let errors = f.validate().unwrap_err();
    assert_eq!(errors.len(), 4);
  }

  #[test]
  fn test_initials() {
    let user = form().expand(1);
    assert_eq!(user.initials(), "AL");
  }
}
