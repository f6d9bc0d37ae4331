// medcart_server/src/db/pg_store.rs

//! Postgres implementation of the medcart store contracts.
//!
//! Stock changes are single guarded `UPDATE`s so concurrent reservations are
//! serialized by the row lock. Multi-row units run in one transaction; an
//! early return drops the transaction, which rolls it back.

use super::rows::{
  CartItemRow, CartRow, OrderItemRow, OrderRow, ProductRow, CART_ITEM_COLUMNS, ORDER_COLUMNS, ORDER_ITEM_COLUMNS,
  PRODUCT_COLUMNS,
};
use async_trait::async_trait;
use medcart::{
  Cart, CartItem, CartStore, NewCartItem, NewOrder, NewProduct, Order, OrderItem, OrderStatus, OrderStore, Product,
  ProductStore, StoreError, StoreResult,
};
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};
use uuid::Uuid;

fn backend(err: sqlx::Error) -> StoreError {
  StoreError::Backend(err.into())
}

/// `numeric_value_out_of_range`: `stock + delta` left the INTEGER range.
fn is_out_of_range(err: &sqlx::Error) -> bool {
  err
    .as_database_error()
    .and_then(|db| db.code())
    .is_some_and(|code| code == "22003")
}

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  async fn begin(&self) -> StoreResult<Transaction<'static, Postgres>> {
    self.pool.begin().await.map_err(backend)
  }

  async fn order_exists(&self, id: Uuid) -> StoreResult<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM orders WHERE id = $1)")
      .bind(id)
      .fetch_one(&self.pool)
      .await
      .map_err(backend)
  }

  /// Loads the items of every order in `rows` with one query and assembles
  /// the orders, keeping the row order.
  async fn with_items(&self, rows: Vec<OrderRow>) -> StoreResult<Vec<Order>> {
    let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let item_rows: Vec<OrderItemRow> = sqlx::query_as(&format!(
      "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1)"
    ))
    .bind(&ids)
    .fetch_all(&self.pool)
    .await
    .map_err(backend)?;

    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for row in item_rows {
      by_order.entry(row.order_id).or_default().push(row.into());
    }
    rows
      .into_iter()
      .map(|row| {
        let items = by_order.remove(&row.id).unwrap_or_default();
        row.into_order(items)
      })
      .collect()
  }
}

#[async_trait]
impl ProductStore for PgStore {
  async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Product>> {
    let row: Option<ProductRow> = sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
      .bind(id)
      .fetch_optional(&self.pool)
      .await
      .map_err(backend)?;
    Ok(row.map(Product::from))
  }

  async fn get_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
    let rows: Vec<ProductRow> = sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"))
      .bind(ids)
      .fetch_all(&self.pool)
      .await
      .map_err(backend)?;
    Ok(rows.into_iter().map(Product::from).collect())
  }

  #[instrument(name = "pg_store::adjust_stock", skip(self), err(Display))]
  async fn adjust_stock(&self, id: Uuid, delta: i32) -> StoreResult<i32> {
    let updated: Result<Option<i32>, sqlx::Error> = sqlx::query_scalar(
      "UPDATE products SET stock = stock + $1, updated_at = now() \
       WHERE id = $2 AND stock + $1 >= 0 RETURNING stock",
    )
    .bind(delta)
    .bind(id)
    .fetch_optional(&self.pool)
    .await;

    let overflowed = match updated {
      Ok(Some(stock)) => return Ok(stock),
      Ok(None) => false,
      Err(err) if is_out_of_range(&err) => true,
      Err(err) => return Err(backend(err)),
    };

    // Nothing changed: the product is gone or the guard refused.
    let current: Option<i32> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
      .bind(id)
      .fetch_optional(&self.pool)
      .await
      .map_err(backend)?;
    match current {
      Some(current) if overflowed => Err(StoreError::StockOverflow {
        product_id: id,
        current,
        delta,
      }),
      Some(available) => Err(StoreError::StockUnderflow {
        product_id: id,
        available,
        delta,
      }),
      None => Err(StoreError::NotFound { entity: "product", id }),
    }
  }

  async fn list(&self) -> StoreResult<Vec<Product>> {
    let rows: Vec<ProductRow> = sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name ASC"))
      .fetch_all(&self.pool)
      .await
      .map_err(backend)?;
    Ok(rows.into_iter().map(Product::from).collect())
  }

  async fn create(&self, product: NewProduct) -> StoreResult<Product> {
    let row: ProductRow = sqlx::query_as(&format!(
      "INSERT INTO products (id, category_id, name, description, price_cents, stock, image_url) \
       VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(product.category_id)
    .bind(product.name)
    .bind(product.description)
    .bind(product.price_cents)
    .bind(product.stock)
    .bind(product.image_url)
    .fetch_one(&self.pool)
    .await
    .map_err(backend)?;
    Ok(row.into())
  }
}

#[async_trait]
impl CartStore for PgStore {
  async fn find_or_create(&self, user_id: Uuid) -> StoreResult<Cart> {
    sqlx::query("INSERT INTO carts (id, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING")
      .bind(Uuid::new_v4())
      .bind(user_id)
      .execute(&self.pool)
      .await
      .map_err(backend)?;

    let row: CartRow = sqlx::query_as("SELECT id, user_id, created_at, updated_at FROM carts WHERE user_id = $1")
      .bind(user_id)
      .fetch_one(&self.pool)
      .await
      .map_err(backend)?;
    Ok(row.into_cart(Vec::new()))
  }

  async fn find_with_items(&self, user_id: Uuid) -> StoreResult<Option<Cart>> {
    let row: Option<CartRow> = sqlx::query_as("SELECT id, user_id, created_at, updated_at FROM carts WHERE user_id = $1")
      .bind(user_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(backend)?;
    let Some(row) = row else {
      return Ok(None);
    };

    let items: Vec<CartItemRow> = sqlx::query_as(&format!(
      "SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE cart_id = $1 ORDER BY added_at ASC"
    ))
    .bind(row.id)
    .fetch_all(&self.pool)
    .await
    .map_err(backend)?;
    Ok(Some(row.into_cart(items.into_iter().map(CartItem::from).collect())))
  }

  async fn find_item(&self, item_id: Uuid) -> StoreResult<Option<CartItem>> {
    let row: Option<CartItemRow> = sqlx::query_as(&format!("SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE id = $1"))
      .bind(item_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(backend)?;
    Ok(row.map(CartItem::from))
  }

  async fn create_item(&self, item: NewCartItem) -> StoreResult<CartItem> {
    let row: CartItemRow = sqlx::query_as(&format!(
      "INSERT INTO cart_items (id, cart_id, product_id, quantity) VALUES ($1, $2, $3, $4) RETURNING {CART_ITEM_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(item.cart_id)
    .bind(item.product_id)
    .bind(item.quantity)
    .fetch_one(&self.pool)
    .await
    .map_err(backend)?;
    Ok(row.into())
  }

  #[instrument(name = "pg_store::remove_item_and_restock", skip(self), err(Display))]
  async fn remove_item_and_restock(&self, item_id: Uuid, cart_id: Uuid) -> StoreResult<CartItem> {
    let mut tx = self.begin().await?;

    // The DELETE decides which of two racing removals owns the restock.
    let removed: Option<CartItemRow> = sqlx::query_as(&format!(
      "DELETE FROM cart_items WHERE id = $1 AND cart_id = $2 RETURNING {CART_ITEM_COLUMNS}"
    ))
    .bind(item_id)
    .bind(cart_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(backend)?;
    let Some(removed) = removed else {
      return Err(StoreError::NotFound {
        entity: "cart item",
        id: item_id,
      });
    };

    let restored: Option<i32> = sqlx::query_scalar(
      "UPDATE products SET stock = stock + $1, updated_at = now() WHERE id = $2 RETURNING stock",
    )
    .bind(removed.quantity)
    .bind(removed.product_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(backend)?;
    if restored.is_none() {
      return Err(StoreError::NotFound {
        entity: "product",
        id: removed.product_id,
      });
    }

    tx.commit().await.map_err(backend)?;
    debug!(%item_id, product_id = %removed.product_id, quantity = removed.quantity, "Cart item removed and restocked.");
    Ok(removed.into())
  }

  async fn clear_items(&self, cart_id: Uuid) -> StoreResult<u64> {
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
      .bind(cart_id)
      .execute(&self.pool)
      .await
      .map_err(backend)?;
    Ok(result.rows_affected())
  }
}

#[async_trait]
impl OrderStore for PgStore {
  #[instrument(name = "pg_store::create_from_cart", skip(self, order, expected_items), fields(lines = order.items.len()), err(Display))]
  async fn create_from_cart(&self, order: NewOrder, cart_id: Uuid, expected_items: &[Uuid]) -> StoreResult<Order> {
    let mut tx = self.begin().await?;

    // Lock the cart's items so a concurrent add or remove waits for us.
    let held: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM cart_items WHERE cart_id = $1 FOR UPDATE")
      .bind(cart_id)
      .fetch_all(&mut *tx)
      .await
      .map_err(backend)?;
    let held: HashSet<Uuid> = held.into_iter().collect();
    let expected: HashSet<Uuid> = expected_items.iter().copied().collect();
    if held != expected {
      return Err(StoreError::Conflict(format!("cart {} changed during checkout", cart_id)));
    }

    let order_row: OrderRow = sqlx::query_as(&format!(
      "INSERT INTO orders (id, user_id, status, total_price_cents, payment_method, bank_name) \
       VALUES ($1, $2, $3, $4, $5, $6) RETURNING {ORDER_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(order.user_id)
    .bind(order.status.as_str())
    .bind(order.total_price_cents)
    .bind(&order.payment_method)
    .bind(&order.bank_name)
    .fetch_one(&mut *tx)
    .await
    .map_err(backend)?;

    let mut items = Vec::with_capacity(order.items.len());
    for line in &order.items {
      let row: OrderItemRow = sqlx::query_as(&format!(
        "INSERT INTO order_items (id, order_id, product_id, quantity, price_cents) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {ORDER_ITEM_COLUMNS}"
      ))
      .bind(Uuid::new_v4())
      .bind(order_row.id)
      .bind(line.product_id)
      .bind(line.quantity)
      .bind(line.price_cents)
      .fetch_one(&mut *tx)
      .await
      .map_err(backend)?;
      items.push(OrderItem::from(row));
    }

    let cleared = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
      .bind(cart_id)
      .execute(&mut *tx)
      .await
      .map_err(backend)?;

    tx.commit().await.map_err(backend)?;
    debug!(order_id = %order_row.id, cleared = cleared.rows_affected(), "Order committed.");
    order_row.into_order(items)
  }

  async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
      .bind(id)
      .fetch_optional(&self.pool)
      .await
      .map_err(backend)?;
    match row {
      Some(row) => Ok(self.with_items(vec![row]).await?.pop()),
      None => Ok(None),
    }
  }

  async fn find_items_by_order_id(&self, id: Uuid) -> StoreResult<Vec<OrderItem>> {
    let rows: Vec<OrderItemRow> =
      sqlx::query_as(&format!("SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = $1"))
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
    Ok(rows.into_iter().map(OrderItem::from).collect())
  }

  async fn update_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> StoreResult<()> {
    let result = sqlx::query("UPDATE orders SET status = $1, updated_at = now() WHERE id = $2 AND status = $3")
      .bind(to.as_str())
      .bind(id)
      .bind(from.as_str())
      .execute(&self.pool)
      .await
      .map_err(backend)?;
    if result.rows_affected() == 1 {
      return Ok(());
    }
    if self.order_exists(id).await? {
      Err(StoreError::Conflict(format!("order {} is no longer '{}'", id, from)))
    } else {
      Err(StoreError::NotFound { entity: "order", id })
    }
  }

  #[instrument(name = "pg_store::cancel_and_restock", skip(self, items), fields(lines = items.len()), err(Display))]
  async fn cancel_and_restock(&self, id: Uuid, from: OrderStatus, items: &[OrderItem]) -> StoreResult<()> {
    let mut tx = self.begin().await?;

    // Flip the status first: the row lock it takes serializes competing cancels.
    let flipped = sqlx::query("UPDATE orders SET status = $1, updated_at = now() WHERE id = $2 AND status = $3")
      .bind(OrderStatus::Cancelled.as_str())
      .bind(id)
      .bind(from.as_str())
      .execute(&mut *tx)
      .await
      .map_err(backend)?;
    if flipped.rows_affected() == 0 {
      drop(tx);
      return if self.order_exists(id).await? {
        Err(StoreError::Conflict(format!("order {} is no longer '{}'", id, from)))
      } else {
        Err(StoreError::NotFound { entity: "order", id })
      };
    }

    for item in items {
      let restored = sqlx::query("UPDATE products SET stock = stock + $1, updated_at = now() WHERE id = $2")
        .bind(item.quantity)
        .bind(item.product_id)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;
      if restored.rows_affected() == 0 {
        return Err(StoreError::NotFound {
          entity: "product",
          id: item.product_id,
        });
      }
    }

    tx.commit().await.map_err(backend)
  }

  async fn find_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
    let rows: Vec<OrderRow> = sqlx::query_as(&format!(
      "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(&self.pool)
    .await
    .map_err(backend)?;
    self.with_items(rows).await
  }

  async fn find_all(&self) -> StoreResult<Vec<Order>> {
    let rows: Vec<OrderRow> = sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"))
      .fetch_all(&self.pool)
      .await
      .map_err(backend)?;
    self.with_items(rows).await
  }

  async fn count(&self) -> StoreResult<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM orders")
      .fetch_one(&self.pool)
      .await
      .map_err(backend)
  }
}
