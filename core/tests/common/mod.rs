// tests/common/mod.rs
#![allow(dead_code)] // Not every test binary uses every helper.

use async_trait::async_trait;
use medcart::{
  Cart, CartItem, CartService, CartStore, InMemoryStore, NewCartItem, NewOrder, NewProduct, Order, OrderItem,
  OrderService, OrderStatus, OrderStore, PaymentSimulator, Product, ProductStore, StoreError, StoreResult,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Barrier, Notify};
use tracing::Level;
use uuid::Uuid;

// --- Helper for Tracing Setup ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Service wiring over a shared in-memory store ---
pub struct Shop {
  pub store: Arc<InMemoryStore>,
  pub carts: CartService,
  pub orders: OrderService,
}

impl Shop {
  /// Payment draw of `0.0` approves every method, `1.0` declines every
  /// method except cash on delivery.
  pub fn with_draw(draw: f64) -> Self {
    let store = Arc::new(InMemoryStore::new());
    let carts = CartService::new(store.clone(), store.clone());
    let orders = OrderService::new(store.clone(), store.clone(), store.clone(), PaymentSimulator::fixed(draw));
    Self { store, carts, orders }
  }

  pub fn approving() -> Self {
    Self::with_draw(0.0)
  }

  /// Approving shop whose services talk to `gate` instead of the store directly.
  pub fn gated(gate: Arc<GatedStore>) -> Self {
    let store = gate.inner.clone();
    let carts = CartService::new(gate.clone(), gate.clone());
    let orders = OrderService::new(gate.clone(), gate.clone(), gate, PaymentSimulator::fixed(0.0));
    Self { store, carts, orders }
  }

  pub fn stock(&self, product: &Product) -> i32 {
    self.store.stock_of(product.id).unwrap_or(i32::MIN)
  }
}

pub fn cod() -> medcart::PlaceOrderRequest {
  medcart::PlaceOrderRequest {
    payment_method: "cod".to_string(),
    bank_name: None,
  }
}

pub fn paying_with(method: &str) -> medcart::PlaceOrderRequest {
  medcart::PlaceOrderRequest {
    payment_method: method.to_string(),
    bank_name: Some("First Medical Bank".to_string()),
  }
}

// --- Stores with injectable failures, delegating to an InMemoryStore ---

/// Cart store whose `create_item` and `remove_item_and_restock` can be made to fail.
pub struct FlakyCartStore {
  pub inner: Arc<InMemoryStore>,
  pub fail_create_item: AtomicBool,
  pub fail_remove_item: AtomicBool,
}

impl FlakyCartStore {
  pub fn new(inner: Arc<InMemoryStore>) -> Self {
    Self {
      inner,
      fail_create_item: AtomicBool::new(false),
      fail_remove_item: AtomicBool::new(false),
    }
  }
}

fn injected(what: &str) -> StoreError {
  StoreError::Backend(anyhow::anyhow!("injected failure: {what}"))
}

#[async_trait]
impl CartStore for FlakyCartStore {
  async fn find_or_create(&self, user_id: Uuid) -> StoreResult<Cart> {
    self.inner.find_or_create(user_id).await
  }

  async fn find_with_items(&self, user_id: Uuid) -> StoreResult<Option<Cart>> {
    self.inner.find_with_items(user_id).await
  }

  async fn find_item(&self, item_id: Uuid) -> StoreResult<Option<CartItem>> {
    self.inner.find_item(item_id).await
  }

  async fn create_item(&self, item: NewCartItem) -> StoreResult<CartItem> {
    if self.fail_create_item.load(Ordering::SeqCst) {
      return Err(injected("create_item"));
    }
    self.inner.create_item(item).await
  }

  async fn remove_item_and_restock(&self, item_id: Uuid, cart_id: Uuid) -> StoreResult<CartItem> {
    if self.fail_remove_item.load(Ordering::SeqCst) {
      return Err(injected("remove_item_and_restock"));
    }
    self.inner.remove_item_and_restock(item_id, cart_id).await
  }

  async fn clear_items(&self, cart_id: Uuid) -> StoreResult<u64> {
    self.inner.clear_items(cart_id).await
  }
}

/// Product store that can refuse to give stock back (positive deltas).
pub struct FlakyProductStore {
  pub inner: Arc<InMemoryStore>,
  pub fail_restock: AtomicBool,
}

impl FlakyProductStore {
  pub fn new(inner: Arc<InMemoryStore>) -> Self {
    Self {
      inner,
      fail_restock: AtomicBool::new(false),
    }
  }
}

#[async_trait]
impl ProductStore for FlakyProductStore {
  async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Product>> {
    self.inner.get_by_id(id).await
  }

  async fn get_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
    self.inner.get_by_ids(ids).await
  }

  async fn adjust_stock(&self, id: Uuid, delta: i32) -> StoreResult<i32> {
    if delta > 0 && self.fail_restock.load(Ordering::SeqCst) {
      return Err(injected("adjust_stock"));
    }
    self.inner.adjust_stock(id, delta).await
  }

  async fn list(&self) -> StoreResult<Vec<Product>> {
    self.inner.list().await
  }

  async fn create(&self, product: NewProduct) -> StoreResult<Product> {
    self.inner.create(product).await
  }
}

// --- A store that holds chosen calls until concurrent callers line up ---

/// Delegates to an `InMemoryStore`. Gated calls wait on a barrier so every
/// racer has finished its reads before any of them writes.
pub struct GatedStore {
  pub inner: Arc<InMemoryStore>,
  removals: Option<Barrier>,
  cancels: Option<Barrier>,
  status_updates: Option<Barrier>,
  pause_checkout: AtomicBool,
  /// Signalled when a checkout reaches `create_from_cart`.
  pub checkout_parked: Notify,
  /// Lets a parked checkout continue.
  pub checkout_resume: Notify,
}

impl GatedStore {
  pub fn new(inner: Arc<InMemoryStore>) -> Self {
    Self {
      inner,
      removals: None,
      cancels: None,
      status_updates: None,
      pause_checkout: AtomicBool::new(false),
      checkout_parked: Notify::new(),
      checkout_resume: Notify::new(),
    }
  }

  pub fn gate_removals(mut self, racers: usize) -> Self {
    self.removals = Some(Barrier::new(racers));
    self
  }

  pub fn gate_cancels(mut self, racers: usize) -> Self {
    self.cancels = Some(Barrier::new(racers));
    self
  }

  pub fn gate_status_updates(mut self, racers: usize) -> Self {
    self.status_updates = Some(Barrier::new(racers));
    self
  }

  pub fn park_checkout(self) -> Self {
    self.pause_checkout.store(true, Ordering::SeqCst);
    self
  }
}

async fn pass(gate: &Option<Barrier>) {
  if let Some(barrier) = gate {
    barrier.wait().await;
  }
}

#[async_trait]
impl ProductStore for GatedStore {
  async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Product>> {
    self.inner.get_by_id(id).await
  }

  async fn get_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
    self.inner.get_by_ids(ids).await
  }

  async fn adjust_stock(&self, id: Uuid, delta: i32) -> StoreResult<i32> {
    self.inner.adjust_stock(id, delta).await
  }

  async fn list(&self) -> StoreResult<Vec<Product>> {
    self.inner.list().await
  }

  async fn create(&self, product: NewProduct) -> StoreResult<Product> {
    self.inner.create(product).await
  }
}

#[async_trait]
impl CartStore for GatedStore {
  async fn find_or_create(&self, user_id: Uuid) -> StoreResult<Cart> {
    self.inner.find_or_create(user_id).await
  }

  async fn find_with_items(&self, user_id: Uuid) -> StoreResult<Option<Cart>> {
    self.inner.find_with_items(user_id).await
  }

  async fn find_item(&self, item_id: Uuid) -> StoreResult<Option<CartItem>> {
    self.inner.find_item(item_id).await
  }

  async fn create_item(&self, item: NewCartItem) -> StoreResult<CartItem> {
    self.inner.create_item(item).await
  }

  async fn remove_item_and_restock(&self, item_id: Uuid, cart_id: Uuid) -> StoreResult<CartItem> {
    pass(&self.removals).await;
    self.inner.remove_item_and_restock(item_id, cart_id).await
  }

  async fn clear_items(&self, cart_id: Uuid) -> StoreResult<u64> {
    self.inner.clear_items(cart_id).await
  }
}

#[async_trait]
impl OrderStore for GatedStore {
  async fn create_from_cart(&self, order: NewOrder, cart_id: Uuid, expected_items: &[Uuid]) -> StoreResult<Order> {
    if self.pause_checkout.swap(false, Ordering::SeqCst) {
      self.checkout_parked.notify_one();
      self.checkout_resume.notified().await;
    }
    self.inner.create_from_cart(order, cart_id, expected_items).await
  }

  async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Order>> {
    self.inner.find_by_id(id).await
  }

  async fn find_items_by_order_id(&self, id: Uuid) -> StoreResult<Vec<OrderItem>> {
    self.inner.find_items_by_order_id(id).await
  }

  async fn update_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> StoreResult<()> {
    pass(&self.status_updates).await;
    self.inner.update_status(id, from, to).await
  }

  async fn cancel_and_restock(&self, id: Uuid, from: OrderStatus, items: &[OrderItem]) -> StoreResult<()> {
    pass(&self.cancels).await;
    self.inner.cancel_and_restock(id, from, items).await
  }

  async fn find_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
    self.inner.find_by_user(user_id).await
  }

  async fn find_all(&self) -> StoreResult<Vec<Order>> {
    self.inner.find_all().await
  }

  async fn count(&self) -> StoreResult<i64> {
    self.inner.count().await
  }
}
