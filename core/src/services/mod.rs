// medcart/src/services/mod.rs

pub mod cart_service;
pub mod contexts;
pub mod order_service;

pub use cart_service::CartService;
pub use order_service::OrderService;
