// medcart/src/store/mod.rs

//! Storage contracts the services depend on.
//!
//! Implementations must evaluate stock deltas inside the storage engine and
//! must run each multi-row operation (`remove_item_and_restock`,
//! `create_from_cart`, `cancel_and_restock`) as one atomic unit.

pub mod memory;

use crate::models::{Cart, CartItem, NewCartItem, NewOrder, NewProduct, Order, OrderItem, OrderStatus, Product};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("{entity} {id} not found")]
  NotFound { entity: &'static str, id: Uuid },

  /// The guarded delta would have driven stock below zero. Nothing changed.
  #[error("stock of product {product_id} cannot absorb delta {delta} (available {available})")]
  StockUnderflow {
    product_id: Uuid,
    available: i32,
    delta: i32,
  },

  /// The delta would push stock past what the stock column can hold. Nothing changed.
  #[error("stock of product {product_id} cannot absorb delta {delta} (current {current})")]
  StockOverflow {
    product_id: Uuid,
    current: i32,
    delta: i32,
  },

  /// A concurrent writer changed rows this unit depended on; the unit was rolled back.
  #[error("conflicting concurrent update: {0}")]
  Conflict(String),

  #[error("storage backend failure: {0}")]
  Backend(#[source] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ProductStore: Send + Sync {
  async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Product>>;

  /// Batch lookup. Unknown ids are simply absent from the result.
  async fn get_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>>;

  /// Applies `stock = stock + delta` atomically and returns the new stock.
  /// Fails with [`StoreError::StockUnderflow`] rather than going negative and
  /// with [`StoreError::StockOverflow`] rather than wrapping.
  async fn adjust_stock(&self, id: Uuid, delta: i32) -> StoreResult<i32>;

  async fn list(&self) -> StoreResult<Vec<Product>>;

  async fn create(&self, product: NewProduct) -> StoreResult<Product>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
  /// Returns the user's cart (without items), creating it if needed.
  async fn find_or_create(&self, user_id: Uuid) -> StoreResult<Cart>;

  async fn find_with_items(&self, user_id: Uuid) -> StoreResult<Option<Cart>>;

  async fn find_item(&self, item_id: Uuid) -> StoreResult<Option<CartItem>>;

  async fn create_item(&self, item: NewCartItem) -> StoreResult<CartItem>;

  /// Deletes the item from `cart_id` and gives its quantity back to the
  /// product, in one atomic unit. Returns the removed item.
  ///
  /// Whoever deletes the row owns the restock: when the item is already gone
  /// (or sits in another cart) this fails with [`StoreError::NotFound`] and
  /// stock is untouched.
  async fn remove_item_and_restock(&self, item_id: Uuid, cart_id: Uuid) -> StoreResult<CartItem>;

  /// Deletes every item of the cart and returns how many went. Stock is untouched.
  async fn clear_items(&self, cart_id: Uuid) -> StoreResult<u64>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  /// Writes the order, its items, and empties the cart in one atomic unit.
  ///
  /// `expected_items` are the cart item ids the order was priced from. If the
  /// cart no longer holds exactly those items the unit is rolled back with
  /// [`StoreError::Conflict`].
  async fn create_from_cart(&self, order: NewOrder, cart_id: Uuid, expected_items: &[Uuid]) -> StoreResult<Order>;

  async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Order>>;

  async fn find_items_by_order_id(&self, id: Uuid) -> StoreResult<Vec<OrderItem>>;

  /// Compare-and-set of the status column: only applies when the stored
  /// status still equals `from`, otherwise [`StoreError::Conflict`].
  async fn update_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> StoreResult<()>;

  /// Gives every item's quantity back to its product and marks the order
  /// cancelled, in one atomic unit.
  ///
  /// `from` is the status the caller observed; if the stored status differs
  /// the unit is rolled back with [`StoreError::Conflict`].
  async fn cancel_and_restock(&self, id: Uuid, from: OrderStatus, items: &[OrderItem]) -> StoreResult<()>;

  /// Newest first.
  async fn find_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>>;

  /// Newest first.
  async fn find_all(&self) -> StoreResult<Vec<Order>>;

  async fn count(&self) -> StoreResult<i64>;
}
