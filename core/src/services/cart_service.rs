// medcart/src/services/cart_service.rs

//! Cart operations and the stock reservations they carry.
//!
//! Stock is taken out of a product when an item enters a cart and put back
//! when the item leaves it. Checkout consumes the reservation without
//! touching stock again.

use crate::error::{CommerceError, CommerceResult, PipelineError};
use crate::models::{CartItem, CartLine, CartView, NewCartItem};
use crate::pipeline::{ContextData, Pipeline, PipelineControl, PipelineResult};
use crate::services::contexts::AddToCartCtxData;
use crate::store::{CartStore, ProductStore, StoreError, StoreResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

const ADD_TO_CART_STEPS: &[(&str, bool)] = &[
  ("validate_quantity", false),
  ("fetch_product", false),
  ("check_stock", false),
  ("reserve_stock", false),
  ("attach_to_cart", false),
];

pub struct CartService {
  products: Arc<dyn ProductStore>,
  carts: Arc<dyn CartStore>,
  add_pipeline: Pipeline<AddToCartCtxData, CommerceError>,
}

impl CartService {
  pub fn new(products: Arc<dyn ProductStore>, carts: Arc<dyn CartStore>) -> Self {
    let add_pipeline = build_add_to_cart_pipeline(&products, &carts);
    Self {
      products,
      carts,
      add_pipeline,
    }
  }

  /// Reserves `quantity` units of a product and records them in the user's cart.
  #[instrument(name = "cart_service::add_to_cart", skip(self), err(Display))]
  pub async fn add_to_cart(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> CommerceResult<CartItem> {
    let ctx = ContextData::new(AddToCartCtxData::new(user_id, product_id, quantity));
    let halted = || CommerceError::from(PipelineError::Halted { pipeline: "add_to_cart" });

    if self.add_pipeline.run(ctx.clone()).await? == PipelineResult::Stopped {
      return Err(halted());
    }
    let (cart_item, remaining_stock) = {
      let guard = ctx.read();
      (guard.cart_item.clone(), guard.remaining_stock)
    };
    let cart_item = cart_item.ok_or_else(halted)?;

    info!(cart_item_id = %cart_item.id, remaining_stock, "Item added to cart.");
    Ok(cart_item)
  }

  /// Removes one of the caller's cart items and gives its quantity back to stock.
  #[instrument(name = "cart_service::remove_from_cart", skip(self), err(Display))]
  pub async fn remove_from_cart(&self, cart_item_id: Uuid, user_id: Uuid) -> CommerceResult<()> {
    let item = self
      .carts
      .find_item(cart_item_id)
      .await
      .map_err(CommerceError::persistence("look up cart item"))?
      .ok_or(CommerceError::CartItemNotFound { cart_item_id })?;

    let owner_cart = self
      .carts
      .find_with_items(user_id)
      .await
      .map_err(CommerceError::persistence("look up cart"))?
      .filter(|cart| cart.id == item.cart_id);
    let Some(cart) = owner_cart else {
      warn!(cart_item_id = %item.id, "Cart item belongs to another user's cart.");
      return Err(CommerceError::Unauthorized {
        resource: "cart item",
        resource_id: cart_item_id,
        user_id,
      });
    };

    // A concurrent removal or checkout may have taken the row since the lookup.
    let removed = match self.carts.remove_item_and_restock(item.id, cart.id).await {
      Ok(removed) => removed,
      Err(StoreError::NotFound { entity: "cart item", .. }) => {
        return Err(CommerceError::CartItemNotFound { cart_item_id });
      }
      Err(source) => {
        return Err(CommerceError::Persistence {
          operation: "remove cart item",
          source,
        })
      }
    };

    info!(product_id = %removed.product_id, quantity = removed.quantity, "Cart item removed, stock restored.");
    Ok(())
  }

  /// Empties the user's cart WITHOUT restoring stock.
  ///
  /// Only correct after the reservation has been consumed, or when the caller
  /// restores stock itself.
  #[instrument(name = "cart_service::clear_cart", skip(self), err(Display))]
  pub async fn clear_cart(&self, user_id: Uuid) -> CommerceResult<u64> {
    let cart = self
      .carts
      .find_with_items(user_id)
      .await
      .map_err(CommerceError::persistence("look up cart"))?
      .ok_or(CommerceError::CartNotFound { user_id })?;

    let removed = self
      .carts
      .clear_items(cart.id)
      .await
      .map_err(CommerceError::persistence("clear cart"))?;
    info!(cart_id = %cart.id, removed, "Cart cleared.");
    Ok(removed)
  }

  /// The user's cart priced at current catalog prices. Creates the cart on
  /// first use.
  #[instrument(name = "cart_service::get_cart", skip(self), err(Display))]
  pub async fn get_cart(&self, user_id: Uuid) -> CommerceResult<CartView> {
    let cart = match self
      .carts
      .find_with_items(user_id)
      .await
      .map_err(CommerceError::persistence("look up cart"))?
    {
      Some(cart) => cart,
      None => self
        .carts
        .find_or_create(user_id)
        .await
        .map_err(CommerceError::persistence("create cart"))?,
    };

    let product_ids: Vec<Uuid> = cart.items.iter().map(|item| item.product_id).collect();
    let products: HashMap<Uuid, _> = self
      .products
      .get_by_ids(&product_ids)
      .await
      .map_err(CommerceError::persistence("load cart products"))?
      .into_iter()
      .map(|product| (product.id, product))
      .collect();

    let mut lines = Vec::with_capacity(cart.items.len());
    for item in cart.items {
      let product = products
        .get(&item.product_id)
        .ok_or(CommerceError::ProductNotFound {
          product_id: item.product_id,
        })?;
      lines.push(CartLine {
        product_name: product.name.clone(),
        unit_price_cents: product.price_cents,
        line_total_cents: product.price_cents * i64::from(item.quantity),
        item,
      });
    }
    let total_cents = lines.iter().map(|line| line.line_total_cents).sum();

    Ok(CartView {
      cart_id: cart.id,
      user_id,
      lines,
      total_cents,
    })
  }
}

fn build_add_to_cart_pipeline(
  products: &Arc<dyn ProductStore>,
  carts: &Arc<dyn CartStore>,
) -> Pipeline<AddToCartCtxData, CommerceError> {
  let mut p = Pipeline::<AddToCartCtxData, CommerceError>::new(ADD_TO_CART_STEPS);

  p.on_root("validate_quantity", |ctx: ContextData<AddToCartCtxData>| {
    let quantity = ctx.read().quantity;
    std::future::ready(if quantity > 0 {
      Ok(PipelineControl::Continue)
    } else {
      warn!(quantity, "Rejected non-positive cart quantity.");
      Err(CommerceError::InvalidQuantity { quantity })
    })
  });

  let product_store = Arc::clone(products);
  p.on_root("fetch_product", move |ctx: ContextData<AddToCartCtxData>| {
    let products = Arc::clone(&product_store);
    async move {
      let product_id = ctx.read().product_id;
      let product = products
        .get_by_id(product_id)
        .await
        .map_err(CommerceError::persistence("load product"))?
        .ok_or(CommerceError::ProductNotFound { product_id })?;
      ctx.write().product = Some(product);
      Ok::<_, CommerceError>(PipelineControl::Continue)
    }
  });

  p.on_root("check_stock", |ctx: ContextData<AddToCartCtxData>| {
    let outcome = {
      let guard = ctx.read();
      match &guard.product {
        None => Err(CommerceError::from(PipelineError::Halted { pipeline: "add_to_cart" })),
        Some(product) if product.stock < guard.quantity => {
          warn!(product_id = %product.id, available = product.stock, requested = guard.quantity, "Insufficient stock.");
          Err(CommerceError::InsufficientStock {
            product_id: product.id,
            product_name: product.name.clone(),
            available: product.stock,
            requested: guard.quantity,
          })
        }
        Some(_) => Ok(PipelineControl::Continue),
      }
    };
    std::future::ready(outcome)
  });

  let product_store = Arc::clone(products);
  p.on_root("reserve_stock", move |ctx: ContextData<AddToCartCtxData>| {
    let products = Arc::clone(&product_store);
    async move {
      let (product_id, quantity, product_name) = {
        let guard = ctx.read();
        let name = guard.product.as_ref().map(|p| p.name.clone()).unwrap_or_default();
        (guard.product_id, guard.quantity, name)
      };

      match products.adjust_stock(product_id, -quantity).await {
        Ok(remaining) => {
          ctx.write().remaining_stock = Some(remaining);
          debug!(%product_id, quantity, remaining, "Stock reserved.");
          Ok(PipelineControl::Continue)
        }
        // Lost a race with another reservation between check and decrement.
        Err(StoreError::StockUnderflow { available, .. }) => Err(CommerceError::InsufficientStock {
          product_id,
          product_name,
          available,
          requested: quantity,
        }),
        Err(StoreError::NotFound { .. }) => Err(CommerceError::ProductNotFound { product_id }),
        Err(source) => Err(CommerceError::Persistence {
          operation: "reserve stock",
          source,
        }),
      }
    }
  });

  let product_store = Arc::clone(products);
  let cart_store = Arc::clone(carts);
  p.on_root("attach_to_cart", move |ctx: ContextData<AddToCartCtxData>| {
    let products = Arc::clone(&product_store);
    let carts = Arc::clone(&cart_store);
    async move {
      let (user_id, product_id, quantity) = {
        let guard = ctx.read();
        (guard.user_id, guard.product_id, guard.quantity)
      };

      match attach_item(carts.as_ref(), user_id, product_id, quantity).await {
        Ok(item) => {
          ctx.write().cart_item = Some(item);
          Ok(PipelineControl::Continue)
        }
        Err(cause) => {
          warn!(error = %cause, %product_id, quantity, "Cart write failed after reserving stock; releasing reservation.");
          Err(release_reservation(products.as_ref(), product_id, quantity, cause).await)
        }
      }
    }
  });

  p
}

async fn attach_item(carts: &dyn CartStore, user_id: Uuid, product_id: Uuid, quantity: i32) -> StoreResult<CartItem> {
  let cart = carts.find_or_create(user_id).await?;
  carts
    .create_item(NewCartItem {
      cart_id: cart.id,
      product_id,
      quantity,
    })
    .await
}

/// Compensates a reservation whose cart write failed. Returns the error the
/// caller should see.
async fn release_reservation(
  products: &dyn ProductStore,
  product_id: Uuid,
  quantity: i32,
  cause: StoreError,
) -> CommerceError {
  match products.adjust_stock(product_id, quantity).await {
    Ok(_) => CommerceError::Persistence {
      operation: "add item to cart",
      source: cause,
    },
    Err(source) => {
      error!(error = %source, %product_id, quantity, "Failed to release stock reservation.");
      CommerceError::CompensationFailed {
        product_id,
        delta: quantity,
        source,
      }
    }
  }
}
