// medcart/src/models/product.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog entry together with its stock ledger.
///
/// `stock` is the quantity not yet promised to any cart or live order. It is
/// only ever changed through `ProductStore::adjust_stock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
  pub id: Uuid,
  pub category_id: Option<Uuid>,
  pub name: String,
  pub description: Option<String>,
  pub price_cents: i64,
  pub stock: i32,
  pub image_url: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Admin input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
  pub category_id: Option<Uuid>,
  pub name: String,
  pub description: Option<String>,
  pub price_cents: i64,
  pub stock: i32,
  pub image_url: Option<String>,
}

impl NewProduct {
  /// Checks the fields a store would otherwise reject with a constraint error.
  pub fn validate(&self) -> Result<(), String> {
    if self.name.trim().len() < 2 {
      return Err("Product name must be at least 2 characters.".to_string());
    }
    if self.price_cents <= 0 {
      return Err("Product price must be positive.".to_string());
    }
    if self.stock < 0 {
      return Err("Product stock cannot be negative.".to_string());
    }
    Ok(())
  }
}
