// medcart_server/src/db/rows.rs

//! Row shapes as Postgres returns them, and their conversion into the
//! domain models.

use chrono::{DateTime, Utc};
use medcart::{Cart, CartItem, Order, OrderItem, OrderStatus, Product, StoreError};
use sqlx::FromRow;
use uuid::Uuid;

pub(crate) const PRODUCT_COLUMNS: &str =
  "id, category_id, name, description, price_cents, stock, image_url, created_at, updated_at";
pub(crate) const CART_ITEM_COLUMNS: &str = "id, cart_id, product_id, quantity, added_at";
pub(crate) const ORDER_COLUMNS: &str =
  "id, user_id, status, total_price_cents, payment_method, bank_name, created_at, updated_at";
pub(crate) const ORDER_ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, price_cents";

#[derive(Debug, FromRow)]
pub(crate) struct ProductRow {
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

impl From<ProductRow> for Product {
  fn from(row: ProductRow) -> Self {
    Product {
      id: row.id,
      category_id: row.category_id,
      name: row.name,
      description: row.description,
      price_cents: row.price_cents,
      stock: row.stock,
      image_url: row.image_url,
      created_at: row.created_at,
      updated_at: row.updated_at,
    }
  }
}

#[derive(Debug, FromRow)]
pub(crate) struct CartRow {
  pub id: Uuid,
  pub user_id: Uuid,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl CartRow {
  pub fn into_cart(self, items: Vec<CartItem>) -> Cart {
    Cart {
      id: self.id,
      user_id: self.user_id,
      items,
      created_at: self.created_at,
      updated_at: self.updated_at,
    }
  }
}

#[derive(Debug, FromRow)]
pub(crate) struct CartItemRow {
  pub id: Uuid,
  pub cart_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub added_at: DateTime<Utc>,
}

impl From<CartItemRow> for CartItem {
  fn from(row: CartItemRow) -> Self {
    CartItem {
      id: row.id,
      cart_id: row.cart_id,
      product_id: row.product_id,
      quantity: row.quantity,
      added_at: row.added_at,
    }
  }
}

#[derive(Debug, FromRow)]
pub(crate) struct OrderRow {
  pub id: Uuid,
  pub user_id: Uuid,
  pub status: String,
  pub total_price_cents: i64,
  pub payment_method: String,
  pub bank_name: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl OrderRow {
  /// Fails only if the status column holds something the CHECK constraint
  /// should have refused.
  pub fn into_order(self, items: Vec<OrderItem>) -> Result<Order, StoreError> {
    let status: OrderStatus = self
      .status
      .parse()
      .map_err(|e| StoreError::Backend(anyhow::Error::new(e).context(format!("order {}", self.id))))?;
    Ok(Order {
      id: self.id,
      user_id: self.user_id,
      status,
      total_price_cents: self.total_price_cents,
      payment_method: self.payment_method,
      bank_name: self.bank_name,
      items,
      created_at: self.created_at,
      updated_at: self.updated_at,
    })
  }
}

#[derive(Debug, FromRow)]
pub(crate) struct OrderItemRow {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub price_cents: i64,
}

impl From<OrderItemRow> for OrderItem {
  fn from(row: OrderItemRow) -> Self {
    OrderItem {
      id: row.id,
      order_id: row.order_id,
      product_id: row.product_id,
      quantity: row.quantity,
      price_cents: row.price_cents,
    }
  }
}
