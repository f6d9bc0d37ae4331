// medcart_server/src/web/handlers/admin_handlers.rs

use actix_web::{web, HttpResponse};
use medcart::{CommerceError, OrderStatus};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AdminUser;

#[derive(Deserialize, Debug)]
pub struct OrderStatusUpdatePayload {
  pub status: String,
}

#[instrument(name = "handler::list_all_orders", skip(app_state, admin), fields(admin_id = %admin.caller.user_id))]
pub async fn list_all_orders_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.orders.list_all_orders().await?;
  Ok(HttpResponse::Ok().json(json!({
      "message": "Orders fetched successfully.",
      "orders": orders
  })))
}

#[instrument(
    name = "handler::update_order_status",
    skip(app_state, path, payload, admin),
    fields(admin_id = %admin.caller.user_id, order_id = %path.as_ref(), status = %payload.status)
)]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  payload: web::Json<OrderStatusUpdatePayload>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let status: OrderStatus = payload.status.trim().parse().map_err(CommerceError::from)?;

  app_state.orders.update_order_status(order_id, status).await?;
  info!(%status, "Order status updated by admin.");
  Ok(HttpResponse::Ok().json(json!({
      "message": "Order status updated successfully.",
      "orderId": order_id,
      "status": status
  })))
}

#[instrument(name = "handler::order_report", skip(app_state, admin), fields(admin_id = %admin.caller.user_id))]
pub async fn order_report_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let total_orders = app_state.orders.order_count().await?;
  Ok(HttpResponse::Ok().json(json!({
      "message": "Order report generated.",
      "totalOrders": total_orders
  })))
}
