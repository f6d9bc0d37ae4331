// medcart/src/models/mod.rs

//! Domain entities shared by the services and the stores.

pub mod cart;
pub mod identity;
pub mod order;
pub mod product;

pub use cart::{Cart, CartItem, CartLine, CartView, NewCartItem};
pub use identity::{Caller, Role};
pub use order::{NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, PlaceOrderRequest, UnknownStatus};
pub use product::{NewProduct, Product};
