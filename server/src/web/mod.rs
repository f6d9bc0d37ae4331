// medcart_server/src/web/mod.rs

pub mod extractors;
pub mod handlers;
pub mod routes;

#[cfg(test)]
mod tests;

pub use routes::configure_app_routes;
