// medcart/src/store/memory.rs

//! A process-local store implementing every store contract behind one lock.
//!
//! Each trait method takes the lock exactly once, so every method is atomic
//! with respect to every other. Used by the tests, the benchmarks and the
//! server's HTTP tests.

use super::{CartStore, OrderStore, ProductStore, StoreError, StoreResult};
use crate::models::{Cart, CartItem, NewCartItem, NewOrder, NewProduct, Order, OrderItem, OrderStatus, Product};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Default)]
struct State {
  products: HashMap<Uuid, Product>,
  carts: HashMap<Uuid, Cart>,
  cart_items: Vec<CartItem>,
  orders: Vec<Order>,
}

impl State {
  fn product_mut(&mut self, id: Uuid) -> StoreResult<&mut Product> {
    self
      .products
      .get_mut(&id)
      .ok_or(StoreError::NotFound { entity: "product", id })
  }

  /// Validates every delta first so a failing one leaves all stock untouched.
  fn apply_stock_deltas(&mut self, deltas: &[(Uuid, i32)]) -> StoreResult<()> {
    let mut pending: HashMap<Uuid, i32> = HashMap::new();
    for &(product_id, delta) in deltas {
      let current = self
        .products
        .get(&product_id)
        .ok_or(StoreError::NotFound { entity: "product", id: product_id })?
        .stock;
      let summed = pending.entry(product_id).or_insert(0);
      *summed = summed.checked_add(delta).ok_or(StoreError::StockOverflow {
        product_id,
        current,
        delta,
      })?;
    }

    let mut next = Vec::with_capacity(pending.len());
    for (product_id, delta) in pending {
      let current = self.product_mut(product_id)?.stock;
      let stock = current.checked_add(delta).ok_or(StoreError::StockOverflow {
        product_id,
        current,
        delta,
      })?;
      if stock < 0 {
        return Err(StoreError::StockUnderflow {
          product_id,
          available: current,
          delta,
        });
      }
      next.push((product_id, stock));
    }

    let now = Utc::now();
    for (product_id, stock) in next {
      let product = self.product_mut(product_id)?;
      product.stock = stock;
      product.updated_at = now;
    }
    Ok(())
  }
}

#[derive(Default)]
pub struct InMemoryStore {
  state: Mutex<State>,
}

impl InMemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Inserts a product with a fresh id and returns it.
  pub fn seed_product(&self, name: &str, price_cents: i64, stock: i32) -> Product {
    let now = Utc::now();
    let product = Product {
      id: Uuid::new_v4(),
      category_id: None,
      name: name.to_string(),
      description: None,
      price_cents,
      stock,
      image_url: None,
      created_at: now,
      updated_at: now,
    };
    self.state.lock().products.insert(product.id, product.clone());
    product
  }

  /// Catalog maintenance outside the stock ledger (price edits). Never
  /// touches stock.
  pub fn set_price(&self, product_id: Uuid, price_cents: i64) -> StoreResult<()> {
    let mut state = self.state.lock();
    let product = state.product_mut(product_id)?;
    product.price_cents = price_cents;
    product.updated_at = Utc::now();
    Ok(())
  }

  pub fn stock_of(&self, product_id: Uuid) -> Option<i32> {
    self.state.lock().products.get(&product_id).map(|p| p.stock)
  }

  /// Sum of quantities held by live cart items for `product_id`.
  pub fn reserved_in_carts(&self, product_id: Uuid) -> i32 {
    self
      .state
      .lock()
      .cart_items
      .iter()
      .filter(|item| item.product_id == product_id)
      .map(|item| item.quantity)
      .sum()
  }

  pub fn order_rows(&self) -> usize {
    self.state.lock().orders.len()
  }
}

#[async_trait]
impl ProductStore for InMemoryStore {
  async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Product>> {
    Ok(self.state.lock().products.get(&id).cloned())
  }

  async fn get_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
    let state = self.state.lock();
    let wanted: HashSet<&Uuid> = ids.iter().collect();
    Ok(
      wanted
        .into_iter()
        .filter_map(|id| state.products.get(id).cloned())
        .collect(),
    )
  }

  async fn adjust_stock(&self, id: Uuid, delta: i32) -> StoreResult<i32> {
    let mut state = self.state.lock();
    state.apply_stock_deltas(&[(id, delta)])?;
    Ok(state.product_mut(id)?.stock)
  }

  async fn list(&self) -> StoreResult<Vec<Product>> {
    let mut products: Vec<Product> = self.state.lock().products.values().cloned().collect();
    products.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(products)
  }

  async fn create(&self, product: NewProduct) -> StoreResult<Product> {
    let now = Utc::now();
    let created = Product {
      id: Uuid::new_v4(),
      category_id: product.category_id,
      name: product.name,
      description: product.description,
      price_cents: product.price_cents,
      stock: product.stock,
      image_url: product.image_url,
      created_at: now,
      updated_at: now,
    };
    self.state.lock().products.insert(created.id, created.clone());
    Ok(created)
  }
}

#[async_trait]
impl CartStore for InMemoryStore {
  async fn find_or_create(&self, user_id: Uuid) -> StoreResult<Cart> {
    let mut state = self.state.lock();
    if let Some(cart) = state.carts.values().find(|c| c.user_id == user_id) {
      return Ok(cart.clone());
    }
    let now = Utc::now();
    let cart = Cart {
      id: Uuid::new_v4(),
      user_id,
      items: Vec::new(),
      created_at: now,
      updated_at: now,
    };
    state.carts.insert(cart.id, cart.clone());
    Ok(cart)
  }

  async fn find_with_items(&self, user_id: Uuid) -> StoreResult<Option<Cart>> {
    let state = self.state.lock();
    Ok(state.carts.values().find(|c| c.user_id == user_id).map(|cart| {
      let mut cart = cart.clone();
      cart.items = state
        .cart_items
        .iter()
        .filter(|item| item.cart_id == cart.id)
        .cloned()
        .collect();
      cart
    }))
  }

  async fn find_item(&self, item_id: Uuid) -> StoreResult<Option<CartItem>> {
    Ok(self.state.lock().cart_items.iter().find(|i| i.id == item_id).cloned())
  }

  async fn create_item(&self, item: NewCartItem) -> StoreResult<CartItem> {
    let mut state = self.state.lock();
    if !state.carts.contains_key(&item.cart_id) {
      return Err(StoreError::NotFound {
        entity: "cart",
        id: item.cart_id,
      });
    }
    let created = CartItem {
      id: Uuid::new_v4(),
      cart_id: item.cart_id,
      product_id: item.product_id,
      quantity: item.quantity,
      added_at: Utc::now(),
    };
    state.cart_items.push(created.clone());
    Ok(created)
  }

  async fn remove_item_and_restock(&self, item_id: Uuid, cart_id: Uuid) -> StoreResult<CartItem> {
    let mut state = self.state.lock();
    let position = state
      .cart_items
      .iter()
      .position(|i| i.id == item_id && i.cart_id == cart_id)
      .ok_or(StoreError::NotFound {
        entity: "cart item",
        id: item_id,
      })?;
    let (product_id, quantity) = {
      let item = &state.cart_items[position];
      (item.product_id, item.quantity)
    };
    state.apply_stock_deltas(&[(product_id, quantity)])?;
    Ok(state.cart_items.remove(position))
  }

  async fn clear_items(&self, cart_id: Uuid) -> StoreResult<u64> {
    let mut state = self.state.lock();
    let before = state.cart_items.len();
    state.cart_items.retain(|i| i.cart_id != cart_id);
    Ok((before - state.cart_items.len()) as u64)
  }
}

#[async_trait]
impl OrderStore for InMemoryStore {
  async fn create_from_cart(&self, order: NewOrder, cart_id: Uuid, expected_items: &[Uuid]) -> StoreResult<Order> {
    let mut state = self.state.lock();

    let held: HashSet<Uuid> = state
      .cart_items
      .iter()
      .filter(|i| i.cart_id == cart_id)
      .map(|i| i.id)
      .collect();
    let expected: HashSet<Uuid> = expected_items.iter().copied().collect();
    if held != expected {
      return Err(StoreError::Conflict(format!("cart {} changed during checkout", cart_id)));
    }

    let now = Utc::now();
    let order_id = Uuid::new_v4();
    let created = Order {
      id: order_id,
      user_id: order.user_id,
      status: order.status,
      total_price_cents: order.total_price_cents,
      payment_method: order.payment_method,
      bank_name: order.bank_name,
      items: order
        .items
        .into_iter()
        .map(|line| OrderItem {
          id: Uuid::new_v4(),
          order_id,
          product_id: line.product_id,
          quantity: line.quantity,
          price_cents: line.price_cents,
        })
        .collect(),
      created_at: now,
      updated_at: now,
    };

    state.cart_items.retain(|i| i.cart_id != cart_id);
    state.orders.push(created.clone());
    Ok(created)
  }

  async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Order>> {
    Ok(self.state.lock().orders.iter().find(|o| o.id == id).cloned())
  }

  async fn find_items_by_order_id(&self, id: Uuid) -> StoreResult<Vec<OrderItem>> {
    Ok(
      self
        .state
        .lock()
        .orders
        .iter()
        .find(|o| o.id == id)
        .map(|o| o.items.clone())
        .unwrap_or_default(),
    )
  }

  async fn update_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> StoreResult<()> {
    let mut state = self.state.lock();
    let order = state
      .orders
      .iter_mut()
      .find(|o| o.id == id)
      .ok_or(StoreError::NotFound { entity: "order", id })?;
    if order.status != from {
      return Err(StoreError::Conflict(format!(
        "order {} is '{}', expected '{}'",
        id, order.status, from
      )));
    }
    order.status = to;
    order.updated_at = Utc::now();
    Ok(())
  }

  async fn cancel_and_restock(&self, id: Uuid, from: OrderStatus, items: &[OrderItem]) -> StoreResult<()> {
    let mut state = self.state.lock();
    let current = state
      .orders
      .iter()
      .find(|o| o.id == id)
      .map(|o| o.status)
      .ok_or(StoreError::NotFound { entity: "order", id })?;
    if current != from {
      return Err(StoreError::Conflict(format!(
        "order {} moved from '{}' to '{}' before cancellation",
        id, from, current
      )));
    }

    let deltas: Vec<(Uuid, i32)> = items.iter().map(|i| (i.product_id, i.quantity)).collect();
    state.apply_stock_deltas(&deltas)?;

    if let Some(order) = state.orders.iter_mut().find(|o| o.id == id) {
      order.status = OrderStatus::Cancelled;
      order.updated_at = Utc::now();
    }
    Ok(())
  }

  async fn find_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
    Ok(
      self
        .state
        .lock()
        .orders
        .iter()
        .rev()
        .filter(|o| o.user_id == user_id)
        .cloned()
        .collect(),
    )
  }

  async fn find_all(&self) -> StoreResult<Vec<Order>> {
    Ok(self.state.lock().orders.iter().rev().cloned().collect())
  }

  async fn count(&self) -> StoreResult<i64> {
    Ok(self.state.lock().orders.len() as i64)
  }
}
