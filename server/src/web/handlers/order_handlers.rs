// medcart_server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use medcart::PlaceOrderRequest;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[instrument(
    name = "handler::place_order",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.user_id(), payment_method = %req_payload.payment_method)
)]
pub async fn place_order_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<PlaceOrderRequest>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .orders
    .place_order(auth_user.user_id(), req_payload.into_inner())
    .await?;

  info!(order_id = %order.id, status = %order.status, "Order placed.");
  Ok(HttpResponse::Created().json(json!({
      "message": "Order placed successfully.",
      "order": order
  })))
}

#[instrument(name = "handler::list_user_orders", skip(app_state, auth_user), fields(user_id = %auth_user.user_id()))]
pub async fn list_user_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.orders.list_user_orders(auth_user.user_id()).await?;
  Ok(HttpResponse::Ok().json(json!({
      "message": "Orders fetched successfully.",
      "orders": orders
  })))
}

#[instrument(name = "handler::get_order", skip(app_state, path, auth_user), fields(user_id = %auth_user.user_id(), order_id = %path.as_ref()))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = app_state.orders.get_order(path.into_inner(), &auth_user.caller).await?;
  Ok(HttpResponse::Ok().json(json!({
      "message": "Order fetched successfully.",
      "order": order
  })))
}

#[instrument(name = "handler::cancel_order", skip(app_state, path, auth_user), fields(user_id = %auth_user.user_id(), order_id = %path.as_ref()))]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  app_state.orders.cancel_order(order_id, auth_user.user_id()).await?;
  Ok(HttpResponse::Ok().json(json!({
      "message": "Order cancelled successfully.",
      "orderId": order_id
  })))
}
