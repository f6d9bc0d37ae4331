// medcart/src/error.rs

use crate::models::{OrderStatus, UnknownStatus};
use crate::store::StoreError;
use thiserror::Error;
use uuid::Uuid;

/// Misconfiguration of a [`Pipeline`](crate::pipeline::Pipeline).
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  /// A run ended with `PipelineResult::Stopped`, or completed without
  /// producing the value its caller reads back.
  #[error("Pipeline '{pipeline}' halted before producing a result")]
  Halted { pipeline: &'static str },
}

/// Every failure the cart and order workflows can report to their caller.
///
/// Business-rule variants are raised before any mutation of the current
/// operation. Use [`CommerceError::kind`] for a stable machine-readable name.
#[derive(Debug, Error)]
pub enum CommerceError {
  #[error("product {product_id} not found")]
  ProductNotFound { product_id: Uuid },

  #[error("no cart exists for user {user_id}")]
  CartNotFound { user_id: Uuid },

  #[error("cart item {cart_item_id} not found")]
  CartItemNotFound { cart_item_id: Uuid },

  #[error("order {order_id} not found")]
  OrderNotFound { order_id: Uuid },

  #[error("insufficient stock for product '{product_name}' ({product_id}): available {available}, requested {requested}")]
  InsufficientStock {
    product_id: Uuid,
    product_name: String,
    available: i32,
    requested: i32,
  },

  #[error("cart of user {user_id} is empty")]
  EmptyCart { user_id: Uuid },

  #[error("quantity must be positive, got {quantity}")]
  InvalidQuantity { quantity: i32 },

  #[error("user {user_id} is not allowed to access {resource} {resource_id}")]
  Unauthorized {
    resource: &'static str,
    resource_id: Uuid,
    user_id: Uuid,
  },

  #[error("order {order_id} cannot move from '{from}' to '{to}'")]
  InvalidTransition {
    order_id: Uuid,
    from: OrderStatus,
    to: OrderStatus,
  },

  #[error("order {order_id} cannot be cancelled in status '{status}'")]
  InvalidState { order_id: Uuid, status: OrderStatus },

  #[error("'{value}' is not an order status")]
  InvalidStatus { value: String },

  #[error("payment failed ({method}): {reason}")]
  PaymentFailed { method: String, reason: String },

  #[error("storage failure while trying to {operation}: {source}")]
  Persistence {
    operation: &'static str,
    #[source]
    source: StoreError,
  },

  /// A compensating stock adjustment failed after a partial cart write.
  /// The stock of `product_id` is off by `delta` until corrected.
  #[error("compensating stock adjustment of {delta} for product {product_id} failed: {source}")]
  CompensationFailed {
    product_id: Uuid,
    delta: i32,
    #[source]
    source: StoreError,
  },

  #[error("workflow misconfigured: {0}")]
  Workflow(#[from] PipelineError),
}

impl CommerceError {
  /// Stable, machine-readable error kind.
  pub fn kind(&self) -> &'static str {
    match self {
      CommerceError::ProductNotFound { .. } => "ProductNotFound",
      CommerceError::CartNotFound { .. } => "CartNotFound",
      CommerceError::CartItemNotFound { .. } => "CartItemNotFound",
      CommerceError::OrderNotFound { .. } => "OrderNotFound",
      CommerceError::InsufficientStock { .. } => "InsufficientStock",
      CommerceError::EmptyCart { .. } => "EmptyCart",
      CommerceError::InvalidQuantity { .. } => "InvalidQuantity",
      CommerceError::Unauthorized { .. } => "Unauthorized",
      CommerceError::InvalidTransition { .. } => "InvalidTransition",
      CommerceError::InvalidState { .. } => "InvalidState",
      CommerceError::InvalidStatus { .. } => "InvalidStatus",
      CommerceError::PaymentFailed { .. } => "PaymentFailed",
      CommerceError::Persistence { .. } | CommerceError::CompensationFailed { .. } => "PersistenceError",
      CommerceError::Workflow(_) => "WorkflowError",
    }
  }

  pub(crate) fn persistence(operation: &'static str) -> impl FnOnce(StoreError) -> CommerceError {
    move |source| CommerceError::Persistence { operation, source }
  }
}

impl From<UnknownStatus> for CommerceError {
  fn from(err: UnknownStatus) -> Self {
    CommerceError::InvalidStatus { value: err.0 }
  }
}

pub type CommerceResult<T, E = CommerceError> = std::result::Result<T, E>;
