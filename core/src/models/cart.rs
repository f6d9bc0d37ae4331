// medcart/src/models/cart.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's single in-progress cart. Created lazily on first use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
  pub id: Uuid,
  pub user_id: Uuid,
  pub items: Vec<CartItem>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// One reserved line. Its quantity has already been taken out of the
/// product's stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
  pub id: Uuid,
  pub cart_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCartItem {
  pub cart_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
}

/// Read model returned to the storefront: the cart priced at current
/// product prices.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
  pub cart_id: Uuid,
  pub user_id: Uuid,
  pub lines: Vec<CartLine>,
  pub total_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
  pub item: CartItem,
  pub product_name: String,
  pub unit_price_cents: i64,
  pub line_total_cents: i64,
}
