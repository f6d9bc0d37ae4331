// medcart_server/src/state.rs
use medcart::{CartService, CartStore, OrderService, OrderStore, PaymentSimulator, ProductStore};
use std::sync::Arc;

/// Shared by every worker. Cloning only bumps reference counts.
#[derive(Clone)]
pub struct AppState {
  pub products: Arc<dyn ProductStore>,
  pub carts: Arc<CartService>,
  pub orders: Arc<OrderService>,
}

impl AppState {
  pub fn new(
    products: Arc<dyn ProductStore>,
    carts: Arc<dyn CartStore>,
    orders: Arc<dyn OrderStore>,
    payments: PaymentSimulator,
  ) -> Self {
    Self {
      carts: Arc::new(CartService::new(products.clone(), carts.clone())),
      orders: Arc::new(OrderService::new(orders, carts, products.clone(), payments)),
      products,
    }
  }
}
