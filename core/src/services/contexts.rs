// medcart/src/services/contexts.rs

//! State carried through the cart and checkout pipelines.

use crate::models::{Cart, CartItem, NewOrderItem, Order, OrderStatus, Product};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct AddToCartCtxData {
  pub user_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub product: Option<Product>,
  /// Stock left after this reservation, once `reserve_stock` ran.
  pub remaining_stock: Option<i32>,
  pub cart_item: Option<CartItem>,
}

impl AddToCartCtxData {
  pub fn new(user_id: Uuid, product_id: Uuid, quantity: i32) -> Self {
    Self {
      user_id,
      product_id,
      quantity,
      product: None,
      remaining_stock: None,
      cart_item: None,
    }
  }
}

#[derive(Debug, Clone)]
pub struct CheckoutCtxData {
  pub user_id: Uuid,
  pub payment_method: String,
  pub bank_name: Option<String>,
  pub cart: Option<Cart>,
  /// Batch-loaded products keyed by id.
  pub products: HashMap<Uuid, Product>,
  pub lines: Vec<NewOrderItem>,
  pub total_price_cents: i64,
  pub initial_status: Option<OrderStatus>,
  pub order: Option<Order>,
}

impl CheckoutCtxData {
  pub fn new(user_id: Uuid, payment_method: String, bank_name: Option<String>) -> Self {
    Self {
      user_id,
      payment_method,
      bank_name,
      cart: None,
      products: HashMap::new(),
      lines: Vec::new(),
      total_price_cents: 0,
      initial_status: None,
      order: None,
    }
  }
}
