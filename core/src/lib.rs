// medcart/src/lib.rs

//! Medcart: the commerce core of a medical-equipment shop.
//!
//! It covers:
//!  - Cart operations that reserve stock when items are added and release it
//!    when they are removed.
//!  - Checkout, run as a named-step pipeline: re-validate stock, snapshot
//!    prices, authorize a simulated payment and persist the order atomically.
//!  - The order status state machine, customer cancellation with restocking
//!    and admin status updates.
//!
//! Persistence is abstracted behind the [`ProductStore`], [`CartStore`] and
//! [`OrderStore`] traits. [`InMemoryStore`] implements all three.

pub mod error;
pub mod models;
pub mod payment;
pub mod pipeline;
pub mod services;
pub mod store;

pub use crate::error::{CommerceError, CommerceResult, PipelineError};
pub use crate::models::{
  Caller, Cart, CartItem, CartLine, CartView, NewCartItem, NewOrder, NewOrderItem, NewProduct, Order, OrderItem,
  OrderStatus, PlaceOrderRequest, Product, Role,
};
pub use crate::payment::{FixedDraw, PaymentDecline, PaymentDraw, PaymentMethod, PaymentSimulator, ThreadRngDraw};
pub use crate::pipeline::{ContextData, Handler, Pipeline, PipelineControl, PipelineResult, StepDef};
pub use crate::services::{CartService, OrderService};
pub use crate::store::memory::InMemoryStore;
pub use crate::store::{CartStore, OrderStore, ProductStore, StoreError, StoreResult};
