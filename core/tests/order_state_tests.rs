// tests/order_state_tests.rs
mod common;
use common::*;
use medcart::{Caller, CommerceError, InMemoryStore, Order, OrderStatus, Product};
use std::sync::Arc;
use uuid::Uuid;

async fn place_one(shop: &Shop, user: Uuid, product: &Product, quantity: i32, method: &str) -> Order {
  shop.carts.add_to_cart(user, product.id, quantity).await.unwrap();
  shop.orders.place_order(user, paying_with(method)).await.unwrap()
}

#[test]
fn transition_table_is_exact() {
  use OrderStatus::*;
  let allowed = [
    (Pending, Paid),
    (Pending, Cancelled),
    (Paid, Shipped),
    (Paid, Cancelled),
  ];
  for from in OrderStatus::ALL {
    for to in OrderStatus::ALL {
      assert_eq!(
        from.can_transition_to(to),
        allowed.contains(&(from, to)),
        "{from} -> {to}"
      );
    }
  }
  assert!(Shipped.is_terminal());
  assert!(Cancelled.is_terminal());
  assert!(!Paid.is_terminal());
  assert!(!Pending.is_terminal());
}

#[test]
fn status_parses_only_known_lowercase_names() {
  assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
  assert!("Shipped".parse::<OrderStatus>().is_err());
  assert!("refunded".parse::<OrderStatus>().is_err());
}

#[tokio::test]
async fn cancelling_a_paid_order_restores_stock_once() {
  setup_tracing();
  let shop = Shop::approving();
  let defib = shop.store.seed_product("AED Defibrillator", 129_900, 5);
  let user = Uuid::new_v4();
  let order = place_one(&shop, user, &defib, 2, "debit").await;
  assert_eq!(order.status, OrderStatus::Paid);
  assert_eq!(shop.stock(&defib), 3);

  shop.orders.cancel_order(order.id, user).await.unwrap();
  assert_eq!(shop.stock(&defib), 5);
  let reloaded = shop.orders.get_order(order.id, &Caller::customer(user)).await.unwrap();
  assert_eq!(reloaded.status, OrderStatus::Cancelled);

  let err = shop.orders.cancel_order(order.id, user).await.unwrap_err();
  assert!(matches!(err, CommerceError::InvalidState { status: OrderStatus::Cancelled, .. }));
  assert_eq!(shop.stock(&defib), 5);
}

#[tokio::test]
async fn cancelling_a_pending_order_restores_every_line() {
  setup_tracing();
  let shop = Shop::approving();
  let splint = shop.store.seed_product("Finger Splint", 450, 10);
  let tape = shop.store.seed_product("Medical Tape", 300, 10);
  let user = Uuid::new_v4();
  shop.carts.add_to_cart(user, splint.id, 2).await.unwrap();
  shop.carts.add_to_cart(user, tape.id, 3).await.unwrap();
  let order = shop.orders.place_order(user, cod()).await.unwrap();

  shop.orders.cancel_order(order.id, user).await.unwrap();

  assert_eq!(shop.stock(&splint), 10);
  assert_eq!(shop.stock(&tape), 10);
}

#[tokio::test]
async fn shipped_orders_cannot_be_cancelled() {
  setup_tracing();
  let shop = Shop::approving();
  let lamp = shop.store.seed_product("Examination Lamp", 21_000, 4);
  let user = Uuid::new_v4();
  let order = place_one(&shop, user, &lamp, 1, "cc").await;
  shop.orders.update_order_status(order.id, OrderStatus::Shipped).await.unwrap();

  let err = shop.orders.cancel_order(order.id, user).await.unwrap_err();

  assert!(matches!(err, CommerceError::InvalidState { status: OrderStatus::Shipped, .. }));
  assert_eq!(err.kind(), "InvalidState");
  assert_eq!(shop.stock(&lamp), 3);
}

#[tokio::test]
async fn cancelling_someone_elses_order_is_unauthorized() {
  setup_tracing();
  let shop = Shop::approving();
  let otoscope = shop.store.seed_product("Otoscope", 7_700, 3);
  let owner = Uuid::new_v4();
  let order = place_one(&shop, owner, &otoscope, 1, "cod").await;

  let err = shop.orders.cancel_order(order.id, Uuid::new_v4()).await.unwrap_err();
  assert_eq!(err.kind(), "Unauthorized");
  assert_eq!(shop.stock(&otoscope), 2);

  let missing = Uuid::new_v4();
  let err = shop.orders.cancel_order(missing, owner).await.unwrap_err();
  assert!(matches!(err, CommerceError::OrderNotFound { order_id } if order_id == missing));
}

#[tokio::test]
async fn admin_updates_follow_the_transition_table() {
  setup_tracing();
  let shop = Shop::approving();
  let gown = shop.store.seed_product("Isolation Gown (10)", 2_200, 10);
  let user = Uuid::new_v4();
  let order = place_one(&shop, user, &gown, 1, "cod").await;
  assert_eq!(order.status, OrderStatus::Pending);

  let err = shop.orders.update_order_status(order.id, OrderStatus::Shipped).await.unwrap_err();
  match err {
    CommerceError::InvalidTransition { from, to, .. } => {
      assert_eq!(from, OrderStatus::Pending);
      assert_eq!(to, OrderStatus::Shipped);
    }
    other => panic!("expected InvalidTransition, got {other:?}"),
  }

  let err = shop.orders.update_order_status(order.id, OrderStatus::Pending).await.unwrap_err();
  assert_eq!(err.kind(), "InvalidTransition");

  for next in [OrderStatus::Paid, OrderStatus::Shipped] {
    shop.orders.update_order_status(order.id, next).await.unwrap();
  }
  let reloaded = shop.orders.get_order(order.id, &Caller::customer(user)).await.unwrap();
  assert_eq!(reloaded.status, OrderStatus::Shipped);
  for next in OrderStatus::ALL {
    let err = shop.orders.update_order_status(order.id, next).await.unwrap_err();
    assert_eq!(err.kind(), "InvalidTransition");
  }

  let missing = Uuid::new_v4();
  let err = shop.orders.update_order_status(missing, OrderStatus::Paid).await.unwrap_err();
  assert!(matches!(err, CommerceError::OrderNotFound { .. }));
}

#[tokio::test]
async fn admin_cancellation_leaves_stock_alone() {
  setup_tracing();
  let shop = Shop::approving();
  let brace = shop.store.seed_product("Knee Brace", 3_900, 6);
  let user = Uuid::new_v4();
  let order = place_one(&shop, user, &brace, 2, "cod").await;

  shop.orders.update_order_status(order.id, OrderStatus::Cancelled).await.unwrap();

  assert_eq!(shop.stock(&brace), 4);
  let err = shop.orders.cancel_order(order.id, user).await.unwrap_err();
  assert_eq!(err.kind(), "InvalidState");
}

#[tokio::test]
async fn only_owner_or_admin_can_read_an_order() {
  setup_tracing();
  let shop = Shop::approving();
  let mask = shop.store.seed_product("N95 Respirator (20)", 3_400, 10);
  let owner = Uuid::new_v4();
  let order = place_one(&shop, owner, &mask, 1, "cod").await;

  assert_eq!(
    shop.orders.get_order(order.id, &Caller::customer(owner)).await.unwrap().id,
    order.id
  );
  assert_eq!(
    shop.orders.get_order(order.id, &Caller::admin(Uuid::new_v4())).await.unwrap().id,
    order.id
  );
  let err = shop
    .orders
    .get_order(order.id, &Caller::customer(Uuid::new_v4()))
    .await
    .unwrap_err();
  assert!(matches!(err, CommerceError::Unauthorized { resource: "order", .. }));
}

#[tokio::test]
async fn racing_cancellations_restore_stock_once() {
  setup_tracing();
  let gate = Arc::new(GatedStore::new(Arc::new(InMemoryStore::new())).gate_cancels(2));
  let shop = Shop::gated(gate);
  let concentrator = shop.store.seed_product("Oxygen Concentrator", 79_900, 5);
  let user = Uuid::new_v4();
  let order = place_one(&shop, user, &concentrator, 2, "cc").await;
  assert_eq!(order.status, OrderStatus::Paid);
  assert_eq!(shop.stock(&concentrator), 3);

  let (first, second) = tokio::join!(
    shop.orders.cancel_order(order.id, user),
    shop.orders.cancel_order(order.id, user),
  );

  let outcomes = [first, second];
  assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
  assert!(outcomes.iter().any(|outcome| matches!(
    outcome,
    Err(CommerceError::InvalidState {
      status: OrderStatus::Cancelled,
      ..
    })
  )));
  assert_eq!(shop.stock(&concentrator), 5);
}

#[tokio::test]
async fn losing_status_update_is_judged_from_the_winning_status() {
  setup_tracing();
  let gate = Arc::new(GatedStore::new(Arc::new(InMemoryStore::new())).gate_status_updates(2));
  let shop = Shop::gated(gate);
  let lamp = shop.store.seed_product("Examination Lamp", 18_000, 4);
  let user = Uuid::new_v4();
  let order = place_one(&shop, user, &lamp, 1, "paypal").await;
  assert_eq!(order.status, OrderStatus::Paid);

  // Both are legal from `paid`; only one can be applied.
  let (shipped, cancelled) = tokio::join!(
    shop.orders.update_order_status(order.id, OrderStatus::Shipped),
    shop.orders.update_order_status(order.id, OrderStatus::Cancelled),
  );

  let current = shop.orders.get_order(order.id, &Caller::customer(user)).await.unwrap().status;
  let (winner, loser, lost_to) = match (shipped, cancelled) {
    (Ok(()), Err(err)) => (OrderStatus::Shipped, err, OrderStatus::Cancelled),
    (Err(err), Ok(())) => (OrderStatus::Cancelled, err, OrderStatus::Shipped),
    other => panic!("exactly one update must win, got {other:?}"),
  };
  assert_eq!(current, winner);
  match loser {
    CommerceError::InvalidTransition { from, to, .. } => {
      assert_eq!(from, winner);
      assert_eq!(to, lost_to);
    }
    other => panic!("expected InvalidTransition, got {other:?}"),
  }
  // Administrative updates never touch stock.
  assert_eq!(shop.stock(&lamp), 3);
}
