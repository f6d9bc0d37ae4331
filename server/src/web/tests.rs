// medcart_server/src/web/tests.rs

use actix_web::http::StatusCode;
use actix_web::{test, web as actix_data, App};
use medcart::{InMemoryStore, PaymentSimulator, Product};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::configure_app_routes;
use super::extractors::{USER_ID_HEADER, USER_ROLE_HEADER};
use crate::state::AppState;

fn state_with(store: &Arc<InMemoryStore>, draw: f64) -> AppState {
  AppState::new(store.clone(), store.clone(), store.clone(), PaymentSimulator::fixed(draw))
}

macro_rules! app {
  ($state:expr) => {
    test::init_service(
      App::new()
        .app_data(actix_data::Data::new($state))
        .configure(configure_app_routes),
    )
    .await
  };
}

fn seeded(stock: i32) -> (Arc<InMemoryStore>, Product) {
  let store = Arc::new(InMemoryStore::new());
  let product = store.seed_product("Pulse Oximeter", 2_999, stock);
  (store, product)
}

fn as_customer(req: test::TestRequest, user: Uuid) -> test::TestRequest {
  req.insert_header((USER_ID_HEADER, user.to_string()))
}

fn as_admin(req: test::TestRequest) -> test::TestRequest {
  req
    .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
    .insert_header((USER_ROLE_HEADER, "admin"))
}

#[actix_web::test]
async fn health_is_public() {
  let store = Arc::new(InMemoryStore::new());
  let app = app!(state_with(&store, 0.0));

  let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/health").to_request()).await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn cart_routes_require_identity() {
  let (store, product) = seeded(5);
  let app = app!(state_with(&store, 0.0));

  let req = test::TestRequest::post()
    .uri("/api/v1/cart")
    .set_json(json!({ "product_id": product.id, "quantity": 1 }))
    .to_request();
  let resp = test::call_service(&app, req).await;

  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "AuthenticationRequired");
  assert_eq!(store.stock_of(product.id), Some(5));
}

#[actix_web::test]
async fn add_then_checkout_over_http() {
  let (store, product) = seeded(10);
  let app = app!(state_with(&store, 0.0));
  let user = Uuid::new_v4();

  let req = as_customer(test::TestRequest::post().uri("/api/v1/cart"), user)
    .set_json(json!({ "product_id": product.id, "quantity": 2 }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  assert_eq!(store.stock_of(product.id), Some(8));

  let req = as_customer(test::TestRequest::get().uri("/api/v1/cart"), user).to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body["cart"]["total_cents"], 5_998);

  let req = as_customer(test::TestRequest::post().uri("/api/v1/orders"), user)
    .set_json(json!({ "payment_method": "cod" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["order"]["status"], "pending");
  assert_eq!(body["order"]["total_price_cents"], 5_998);
  assert_eq!(store.stock_of(product.id), Some(8));

  let req = as_customer(test::TestRequest::get().uri("/api/v1/orders"), user).to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body["orders"].as_array().map(Vec::len), Some(1));
}

#[actix_web::test]
async fn insufficient_stock_is_a_conflict() {
  let (store, product) = seeded(1);
  let app = app!(state_with(&store, 0.0));

  let req = as_customer(test::TestRequest::post().uri("/api/v1/cart"), Uuid::new_v4())
    .set_json(json!({ "product_id": product.id, "quantity": 3 }))
    .to_request();
  let resp = test::call_service(&app, req).await;

  assert_eq!(resp.status(), StatusCode::CONFLICT);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "InsufficientStock");
}

#[actix_web::test]
async fn malformed_body_is_a_validation_error() {
  let (store, _product) = seeded(1);
  let app = app!(state_with(&store, 0.0));

  let req = as_customer(test::TestRequest::post().uri("/api/v1/cart"), Uuid::new_v4())
    .set_json(json!({ "product_id": "not-a-uuid", "quantity": 1 }))
    .to_request();
  let resp = test::call_service(&app, req).await;

  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "ValidationError");
}

#[actix_web::test]
async fn declined_payment_is_payment_required() {
  let (store, product) = seeded(3);
  let app = app!(state_with(&store, 0.99));
  let user = Uuid::new_v4();

  let req = as_customer(test::TestRequest::post().uri("/api/v1/cart"), user)
    .set_json(json!({ "product_id": product.id, "quantity": 1 }))
    .to_request();
  assert!(test::call_service(&app, req).await.status().is_success());

  let req = as_customer(test::TestRequest::post().uri("/api/v1/orders"), user)
    .set_json(json!({ "payment_method": "debit", "bank_name": "Northside Credit Union" }))
    .to_request();
  let resp = test::call_service(&app, req).await;

  assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
  assert_eq!(store.order_rows(), 0);
}

#[actix_web::test]
async fn admin_routes_reject_customers() {
  let (store, _product) = seeded(3);
  let app = app!(state_with(&store, 0.0));

  let req = as_customer(test::TestRequest::get().uri("/api/v1/admin/orders"), Uuid::new_v4()).to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let req = as_admin(test::TestRequest::get().uri("/api/v1/admin/reports/orders")).to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body["totalOrders"], 0);
}

#[actix_web::test]
async fn order_lifecycle_over_http() {
  let (store, product) = seeded(5);
  let app = app!(state_with(&store, 0.0));
  let user = Uuid::new_v4();

  let req = as_customer(test::TestRequest::post().uri("/api/v1/cart"), user)
    .set_json(json!({ "product_id": product.id, "quantity": 2 }))
    .to_request();
  assert!(test::call_service(&app, req).await.status().is_success());
  let req = as_customer(test::TestRequest::post().uri("/api/v1/orders"), user)
    .set_json(json!({ "payment_method": "cod" }))
    .to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  let order_id = body["order"]["id"].as_str().map(str::to_string).unwrap();

  // pending -> shipped skips payment.
  let req = as_admin(test::TestRequest::put().uri(&format!("/api/v1/admin/orders/{order_id}/status")))
    .set_json(json!({ "status": "shipped" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "InvalidTransition");

  let req = as_admin(test::TestRequest::put().uri(&format!("/api/v1/admin/orders/{order_id}/status")))
    .set_json(json!({ "status": "refunded" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  // Another customer can neither read nor cancel it.
  let stranger = Uuid::new_v4();
  let req = as_customer(test::TestRequest::get().uri(&format!("/api/v1/orders/{order_id}")), stranger).to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
  let req =
    as_customer(test::TestRequest::put().uri(&format!("/api/v1/orders/{order_id}/cancel")), stranger).to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

  let req = as_customer(test::TestRequest::put().uri(&format!("/api/v1/orders/{order_id}/cancel")), user).to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
  assert_eq!(store.stock_of(product.id), Some(5));

  let req = as_customer(test::TestRequest::put().uri(&format!("/api/v1/orders/{order_id}/cancel")), user).to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "InvalidState");
}

#[actix_web::test]
async fn admin_catalog_management() {
  let store = Arc::new(InMemoryStore::new());
  let app = app!(state_with(&store, 0.0));

  let req = as_admin(test::TestRequest::post().uri("/api/v1/products"))
    .set_json(json!({
      "category_id": null,
      "name": "Hospital Bed",
      "description": "Electric three-function bed.",
      "price_cents": 150_000,
      "stock": 2,
      "image_url": null
    }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let body: Value = test::read_body_json(resp).await;
  let product_id = body["product"]["id"].as_str().map(str::to_string).unwrap();

  let req = as_admin(test::TestRequest::post().uri(&format!("/api/v1/products/{product_id}/stock")))
    .set_json(json!({ "delta": 3 }))
    .to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body["stock"], 5);

  let req = as_admin(test::TestRequest::post().uri(&format!("/api/v1/products/{product_id}/stock")))
    .set_json(json!({ "delta": -9 }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

  let req = as_admin(test::TestRequest::post().uri("/api/v1/products"))
    .set_json(json!({ "name": "X", "price_cents": 0, "stock": 1 }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

  let req = test::TestRequest::get().uri(&format!("/api/v1/products/{}", Uuid::new_v4())).to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn stock_adjustments_that_cannot_fit_are_rejected() {
  let store = Arc::new(InMemoryStore::new());
  let gauze = store.seed_product("Gauze Roll", 150, 10);
  let stockpile = store.seed_product("Cotton Swabs", 10, i32::MAX - 10);
  let app = app!(state_with(&store, 0.0));

  let req = as_admin(test::TestRequest::post().uri(&format!("/api/v1/products/{}/stock", gauze.id)))
    .set_json(json!({ "delta": i32::MAX }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "ValidationError");
  assert_eq!(store.stock_of(gauze.id), Some(10));

  // Within the per-request bound, but past what the stock column holds.
  let req = as_admin(test::TestRequest::post().uri(&format!("/api/v1/products/{}/stock", stockpile.id)))
    .set_json(json!({ "delta": 100 }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "ValidationError");
  assert_eq!(store.stock_of(stockpile.id), Some(i32::MAX - 10));
}
