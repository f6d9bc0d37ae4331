// medcart_server/src/web/routes.rs

use actix_web::web;

use crate::errors::AppError;
use crate::web::handlers::{admin_handlers, cart_handlers, order_handlers, product_handlers};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  // Malformed bodies get the same error envelope as everything else.
  cfg.app_data(
    web::JsonConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
  );
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/products")
          .route("", web::get().to(product_handlers::list_products_handler))
          .route("", web::post().to(product_handlers::create_product_handler))
          .route("/{product_id}", web::get().to(product_handlers::get_product_handler))
          .route("/{product_id}/stock", web::post().to(product_handlers::adjust_stock_handler)),
      )
      .service(
        web::scope("/cart")
          .route("", web::get().to(cart_handlers::get_cart_handler))
          .route("", web::post().to(cart_handlers::add_to_cart_handler))
          .route("/{cart_item_id}", web::delete().to(cart_handlers::remove_from_cart_handler)),
      )
      .service(
        web::scope("/orders")
          .route("", web::post().to(order_handlers::place_order_handler))
          .route("", web::get().to(order_handlers::list_user_orders_handler))
          .route("/{order_id}", web::get().to(order_handlers::get_order_handler))
          .route("/{order_id}/cancel", web::put().to(order_handlers::cancel_order_handler)),
      )
      .service(
        web::scope("/admin")
          .route("/orders", web::get().to(admin_handlers::list_all_orders_handler))
          .route("/orders/{order_id}/status", web::put().to(admin_handlers::update_order_status_handler))
          .route("/reports/orders", web::get().to(admin_handlers::order_report_handler))
          .route("/carts/{user_id}", web::delete().to(cart_handlers::clear_cart_handler)),
      ),
  );
}
