// medcart_server/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::{AdminUser, AuthenticatedUser};

#[derive(Deserialize, Debug)]
pub struct AddToCartRequestPayload {
  pub product_id: Uuid,
  pub quantity: i32,
}

#[instrument(name = "handler::get_cart", skip(app_state, auth_user), fields(user_id = %auth_user.user_id()))]
pub async fn get_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let cart = app_state.carts.get_cart(auth_user.user_id()).await?;
  Ok(HttpResponse::Ok().json(json!({
      "message": "Cart fetched successfully.",
      "cart": cart
  })))
}

#[instrument(
    name = "handler::add_to_cart",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.user_id(), product_id = %req_payload.product_id, quantity = %req_payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<AddToCartRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let cart_item = app_state
    .carts
    .add_to_cart(auth_user.user_id(), req_payload.product_id, req_payload.quantity)
    .await?;

  info!(cart_item_id = %cart_item.id, "Add to cart successful.");
  Ok(HttpResponse::Created().json(json!({
      "message": "Item added to cart successfully.",
      "cartItem": cart_item
  })))
}

#[instrument(name = "handler::remove_from_cart", skip(app_state, path, auth_user), fields(user_id = %auth_user.user_id(), cart_item_id = %path.as_ref()))]
pub async fn remove_from_cart_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let cart_item_id = path.into_inner();
  app_state.carts.remove_from_cart(cart_item_id, auth_user.user_id()).await?;
  Ok(HttpResponse::Ok().json(json!({
      "message": "Item removed from cart.",
      "cartItemId": cart_item_id
  })))
}

/// Admin cleanup of a user's cart. Reservations are not returned to stock.
#[instrument(name = "handler::clear_cart", skip(app_state, path, admin), fields(admin_id = %admin.caller.user_id, user_id = %path.as_ref()))]
pub async fn clear_cart_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let removed = app_state.carts.clear_cart(path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({
      "message": "Cart cleared.",
      "removedItems": removed
  })))
}
