// medcart_server/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use medcart::{CommerceError, NewProduct};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AdminUser;

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let products = app_state.products.list().await?;
  info!(count = products.len(), "Products listed.");
  Ok(HttpResponse::Ok().json(json!({
      "message": "Products fetched successfully.",
      "products": products
  })))
}

#[instrument(name = "handler::get_product", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let product = app_state
    .products
    .get_by_id(product_id)
    .await?
    .ok_or(CommerceError::ProductNotFound { product_id })?;

  Ok(HttpResponse::Ok().json(json!({
      "message": "Product fetched successfully.",
      "product": product
  })))
}

#[instrument(name = "handler::create_product", skip(app_state, payload, admin), fields(admin_id = %admin.caller.user_id))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<NewProduct>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let new_product = payload.into_inner();
  if let Err(reason) = new_product.validate() {
    warn!(%reason, "Rejected product payload.");
    return Err(AppError::Validation(reason));
  }

  let product = app_state.products.create(new_product).await?;
  info!(product_id = %product.id, "Product created.");
  Ok(HttpResponse::Created().json(json!({
      "message": "Product created successfully.",
      "product": product
  })))
}

/// Largest restock or write-off accepted in one request.
pub const MAX_STOCK_ADJUSTMENT: i32 = 1_000_000;

#[derive(Deserialize, Debug)]
pub struct StockAdjustmentPayload {
  /// Positive to restock, negative to write off.
  pub delta: i32,
}

#[instrument(
    name = "handler::adjust_stock",
    skip(app_state, path, payload, admin),
    fields(admin_id = %admin.caller.user_id, product_id = %path.as_ref(), delta = payload.delta)
)]
pub async fn adjust_stock_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  payload: web::Json<StockAdjustmentPayload>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  if payload.delta == 0 {
    return Err(AppError::Validation("Stock delta must be non-zero.".to_string()));
  }
  if !(-MAX_STOCK_ADJUSTMENT..=MAX_STOCK_ADJUSTMENT).contains(&payload.delta) {
    warn!("Rejected oversized stock adjustment.");
    return Err(AppError::Validation(format!(
      "Stock delta must be between -{MAX_STOCK_ADJUSTMENT} and {MAX_STOCK_ADJUSTMENT}."
    )));
  }

  let stock = app_state.products.adjust_stock(product_id, payload.delta).await?;
  info!(stock, "Product stock adjusted.");
  Ok(HttpResponse::Ok().json(json!({
      "message": "Stock adjusted successfully.",
      "productId": product_id,
      "stock": stock
  })))
}
