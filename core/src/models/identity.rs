// medcart/src/models/identity.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  Customer,
}

impl Role {
  pub fn parse(value: &str) -> Option<Role> {
    match value.trim().to_ascii_lowercase().as_str() {
      "admin" => Some(Role::Admin),
      "customer" => Some(Role::Customer),
      _ => None,
    }
  }
}

/// The authenticated caller, as established upstream. Trusted as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
  pub user_id: Uuid,
  pub role: Role,
}

impl Caller {
  pub fn customer(user_id: Uuid) -> Self {
    Self {
      user_id,
      role: Role::Customer,
    }
  }

  pub fn admin(user_id: Uuid) -> Self {
    Self {
      user_id,
      role: Role::Admin,
    }
  }

  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }
}
