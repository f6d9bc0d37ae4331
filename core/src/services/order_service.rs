// medcart/src/services/order_service.rs

//! Checkout, order lookups and the order state machine.

use crate::error::{CommerceError, CommerceResult, PipelineError};
use crate::models::{Caller, NewOrder, NewOrderItem, Order, OrderStatus, PlaceOrderRequest};
use crate::payment::PaymentSimulator;
use crate::pipeline::{ContextData, Pipeline, PipelineControl, PipelineResult};
use crate::services::contexts::CheckoutCtxData;
use crate::store::{CartStore, OrderStore, ProductStore, StoreError};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const CHECKOUT_STEPS: &[(&str, bool)] = &[
  ("load_cart", false),
  ("fetch_products", false),
  ("validate_stock", false),
  ("snapshot_prices", false),
  ("authorize_payment", false),
  ("persist_order", false),
];

pub struct OrderService {
  orders: Arc<dyn OrderStore>,
  checkout: Pipeline<CheckoutCtxData, CommerceError>,
}

impl OrderService {
  pub fn new(
    orders: Arc<dyn OrderStore>,
    carts: Arc<dyn CartStore>,
    products: Arc<dyn ProductStore>,
    payments: PaymentSimulator,
  ) -> Self {
    let checkout = build_checkout_pipeline(&orders, &carts, &products, payments);
    Self { orders, checkout }
  }

  /// Turns the user's cart into an order.
  ///
  /// Nothing is written unless every line validates and payment succeeds.
  /// Stock is not decremented here: the cart already holds the reservation.
  #[instrument(name = "order_service::place_order", skip(self, request), fields(payment_method = %request.payment_method), err(Display))]
  pub async fn place_order(&self, user_id: Uuid, request: PlaceOrderRequest) -> CommerceResult<Order> {
    let ctx = ContextData::new(CheckoutCtxData::new(user_id, request.payment_method, request.bank_name));
    let halted = || CommerceError::from(PipelineError::Halted { pipeline: "checkout" });

    if self.checkout.run(ctx.clone()).await? == PipelineResult::Stopped {
      return Err(halted());
    }
    let order = ctx.read().order.clone();
    let order = order.ok_or_else(halted)?;

    info!(order_id = %order.id, status = %order.status, total_price_cents = order.total_price_cents, "Order placed.");
    Ok(order)
  }

  /// Owner or admin only.
  #[instrument(name = "order_service::get_order", skip(self, caller), fields(user_id = %caller.user_id), err(Display))]
  pub async fn get_order(&self, order_id: Uuid, caller: &Caller) -> CommerceResult<Order> {
    let order = self.load(order_id).await?;
    if order.user_id != caller.user_id && !caller.is_admin() {
      return Err(CommerceError::Unauthorized {
        resource: "order",
        resource_id: order_id,
        user_id: caller.user_id,
      });
    }
    Ok(order)
  }

  #[instrument(name = "order_service::list_user_orders", skip(self), err(Display))]
  pub async fn list_user_orders(&self, user_id: Uuid) -> CommerceResult<Vec<Order>> {
    self
      .orders
      .find_by_user(user_id)
      .await
      .map_err(CommerceError::persistence("list user orders"))
  }

  #[instrument(name = "order_service::list_all_orders", skip(self), err(Display))]
  pub async fn list_all_orders(&self) -> CommerceResult<Vec<Order>> {
    self
      .orders
      .find_all()
      .await
      .map_err(CommerceError::persistence("list orders"))
  }

  /// Total number of orders ever placed, for reporting.
  pub async fn order_count(&self) -> CommerceResult<i64> {
    self.orders.count().await.map_err(CommerceError::persistence("count orders"))
  }

  /// Administrative status change. Persists only the status; cancelling
  /// through this path does not restore stock.
  #[instrument(name = "order_service::update_order_status", skip(self), err(Display))]
  pub async fn update_order_status(&self, order_id: Uuid, new_status: OrderStatus) -> CommerceResult<()> {
    let order = self.load(order_id).await?;
    if !order.status.can_transition_to(new_status) {
      warn!(from = %order.status, to = %new_status, "Rejected order status transition.");
      return Err(CommerceError::InvalidTransition {
        order_id,
        from: order.status,
        to: new_status,
      });
    }

    match self.orders.update_status(order_id, order.status, new_status).await {
      Ok(()) => {
        info!(from = %order.status, to = %new_status, "Order status updated.");
        Ok(())
      }
      Err(StoreError::Conflict(reason)) => {
        // Someone moved the order first; judge the request against where it is now.
        warn!(%reason, "Order status changed concurrently.");
        let current = self.load(order_id).await?;
        Err(CommerceError::InvalidTransition {
          order_id,
          from: current.status,
          to: new_status,
        })
      }
      Err(source) => Err(CommerceError::Persistence {
        operation: "update order status",
        source,
      }),
    }
  }

  /// Customer cancellation: gives every item's quantity back to stock and
  /// marks the order cancelled, atomically.
  #[instrument(name = "order_service::cancel_order", skip(self), err(Display))]
  pub async fn cancel_order(&self, order_id: Uuid, user_id: Uuid) -> CommerceResult<()> {
    let order = self.load(order_id).await?;
    if order.user_id != user_id {
      return Err(CommerceError::Unauthorized {
        resource: "order",
        resource_id: order_id,
        user_id,
      });
    }
    if order.status.is_terminal() {
      return Err(CommerceError::InvalidState {
        order_id,
        status: order.status,
      });
    }

    let items = self
      .orders
      .find_items_by_order_id(order_id)
      .await
      .map_err(CommerceError::persistence("load order items"))?;

    match self.orders.cancel_and_restock(order_id, order.status, &items).await {
      Ok(()) => {
        info!(restored_lines = items.len(), "Order cancelled, stock restored.");
        Ok(())
      }
      Err(StoreError::Conflict(reason)) => {
        warn!(%reason, "Order changed before cancellation committed.");
        let current = self.load(order_id).await?;
        Err(CommerceError::InvalidState {
          order_id,
          status: current.status,
        })
      }
      Err(source) => Err(CommerceError::Persistence {
        operation: "cancel order",
        source,
      }),
    }
  }

  async fn load(&self, order_id: Uuid) -> CommerceResult<Order> {
    self
      .orders
      .find_by_id(order_id)
      .await
      .map_err(CommerceError::persistence("load order"))?
      .ok_or(CommerceError::OrderNotFound { order_id })
  }
}

fn build_checkout_pipeline(
  orders: &Arc<dyn OrderStore>,
  carts: &Arc<dyn CartStore>,
  products: &Arc<dyn ProductStore>,
  payments: PaymentSimulator,
) -> Pipeline<CheckoutCtxData, CommerceError> {
  let mut p = Pipeline::<CheckoutCtxData, CommerceError>::new(CHECKOUT_STEPS);
  let halted = || CommerceError::from(PipelineError::Halted { pipeline: "checkout" });

  let cart_store = Arc::clone(carts);
  p.on_root("load_cart", move |ctx: ContextData<CheckoutCtxData>| {
    let carts = Arc::clone(&cart_store);
    async move {
      let user_id = ctx.read().user_id;
      let cart = carts
        .find_with_items(user_id)
        .await
        .map_err(CommerceError::persistence("load cart"))?
        .filter(|cart| !cart.items.is_empty())
        .ok_or(CommerceError::EmptyCart { user_id })?;

      info!(cart_id = %cart.id, lines = cart.items.len(), "Cart loaded for checkout.");
      ctx.write().cart = Some(cart);
      Ok::<_, CommerceError>(PipelineControl::Continue)
    }
  });

  let product_store = Arc::clone(products);
  p.on_root("fetch_products", move |ctx: ContextData<CheckoutCtxData>| {
    let products = Arc::clone(&product_store);
    async move {
      let product_ids: Vec<Uuid> = {
        let guard = ctx.read();
        let cart = guard.cart.as_ref().ok_or_else(halted)?;
        let distinct: HashSet<Uuid> = cart.items.iter().map(|item| item.product_id).collect();
        distinct.into_iter().collect()
      };

      // One batch query for the whole cart.
      let fetched = products
        .get_by_ids(&product_ids)
        .await
        .map_err(CommerceError::persistence("load cart products"))?;
      ctx.write().products = fetched.into_iter().map(|product| (product.id, product)).collect();
      Ok::<_, CommerceError>(PipelineControl::Continue)
    }
  });

  p.on_root("validate_stock", move |ctx: ContextData<CheckoutCtxData>| {
    let outcome = (|| -> CommerceResult<PipelineControl> {
      let guard = ctx.read();
      let cart = guard.cart.as_ref().ok_or_else(halted)?;
      for item in &cart.items {
        let product = guard.products.get(&item.product_id).ok_or(CommerceError::ProductNotFound {
          product_id: item.product_id,
        })?;
        if product.stock < item.quantity {
          warn!(product_id = %product.id, available = product.stock, requested = item.quantity, "Checkout stock re-validation failed.");
          return Err(CommerceError::InsufficientStock {
            product_id: product.id,
            product_name: product.name.clone(),
            available: product.stock,
            requested: item.quantity,
          });
        }
      }
      Ok(PipelineControl::Continue)
    })();
    std::future::ready(outcome)
  });

  p.on_root("snapshot_prices", move |ctx: ContextData<CheckoutCtxData>| {
    let outcome = (|| -> CommerceResult<PipelineControl> {
      let mut guard = ctx.write();
      let cart = guard.cart.as_ref().ok_or_else(halted)?;
      let mut lines = Vec::with_capacity(cart.items.len());
      for item in &cart.items {
        let product = guard.products.get(&item.product_id).ok_or(CommerceError::ProductNotFound {
          product_id: item.product_id,
        })?;
        lines.push(NewOrderItem {
          product_id: item.product_id,
          quantity: item.quantity,
          price_cents: product.price_cents,
        });
      }
      guard.total_price_cents = lines
        .iter()
        .map(|line| line.price_cents * i64::from(line.quantity))
        .sum();
      guard.lines = lines;
      Ok(PipelineControl::Continue)
    })();
    std::future::ready(outcome)
  });

  p.on_root("authorize_payment", move |ctx: ContextData<CheckoutCtxData>| {
    let outcome = {
      let mut guard = ctx.write();
      match payments.simulate(&guard.payment_method) {
        Ok(status) => {
          guard.initial_status = Some(status);
          Ok(PipelineControl::Continue)
        }
        Err(decline) => Err(CommerceError::PaymentFailed {
          method: decline.method,
          reason: decline.reason,
        }),
      }
    };
    std::future::ready(outcome)
  });

  let order_store = Arc::clone(orders);
  p.on_root("persist_order", move |ctx: ContextData<CheckoutCtxData>| {
    let orders = Arc::clone(&order_store);
    async move {
      let (new_order, cart_id, priced_items) = {
        let guard = ctx.read();
        let cart = guard.cart.as_ref().ok_or_else(halted)?;
        let status = guard.initial_status.ok_or_else(halted)?;
        let new_order = NewOrder {
          user_id: guard.user_id,
          status,
          total_price_cents: guard.total_price_cents,
          payment_method: guard.payment_method.clone(),
          bank_name: guard.bank_name.clone(),
          items: guard.lines.clone(),
        };
        let priced_items: Vec<Uuid> = cart.items.iter().map(|item| item.id).collect();
        (new_order, cart.id, priced_items)
      };

      let order = orders
        .create_from_cart(new_order, cart_id, &priced_items)
        .await
        .map_err(CommerceError::persistence("persist order"))?;
      ctx.write().order = Some(order);
      Ok::<_, CommerceError>(PipelineControl::Continue)
    }
  });

  p
}
