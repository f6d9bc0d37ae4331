// medcart_server/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use medcart::{CommerceError, StoreError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error(transparent)]
  Commerce(#[from] CommerceError),

  /// Direct catalog store calls (product create, restock).
  #[error(transparent)]
  Store(#[from] StoreError),

  #[error("Validation Error: {0}")]
  Validation(String),

  /// No usable caller identity on the request.
  #[error("Authentication Required: {0}")]
  Auth(String),

  /// Identified caller without the role the route needs.
  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Migration Error: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),
}

impl AppError {
  /// Machine-readable error kind placed in every error body.
  pub fn kind(&self) -> &'static str {
    match self {
      AppError::Commerce(e) => e.kind(),
      AppError::Store(StoreError::NotFound { .. }) => "NotFound",
      AppError::Store(StoreError::StockUnderflow { .. }) => "InsufficientStock",
      AppError::Store(StoreError::Conflict(_)) => "Conflict",
      AppError::Store(StoreError::StockOverflow { .. }) => "ValidationError",
      AppError::Store(StoreError::Backend(_)) | AppError::Sqlx(_) | AppError::Migration(_) => "PersistenceError",
      AppError::Validation(_) => "ValidationError",
      AppError::Auth(_) => "AuthenticationRequired",
      AppError::Forbidden(_) => "Unauthorized",
      AppError::Config(_) => "ConfigError",
    }
  }
}

fn commerce_status(err: &CommerceError) -> StatusCode {
  match err {
    CommerceError::ProductNotFound { .. }
    | CommerceError::CartNotFound { .. }
    | CommerceError::CartItemNotFound { .. }
    | CommerceError::OrderNotFound { .. } => StatusCode::NOT_FOUND,
    CommerceError::Unauthorized { .. } => StatusCode::FORBIDDEN,
    CommerceError::InsufficientStock { .. }
    | CommerceError::EmptyCart { .. }
    | CommerceError::InvalidTransition { .. }
    | CommerceError::InvalidState { .. } => StatusCode::CONFLICT,
    CommerceError::PaymentFailed { .. } => StatusCode::PAYMENT_REQUIRED,
    CommerceError::InvalidQuantity { .. } | CommerceError::InvalidStatus { .. } => StatusCode::BAD_REQUEST,
    CommerceError::Persistence { .. } | CommerceError::CompensationFailed { .. } | CommerceError::Workflow(_) => {
      StatusCode::INTERNAL_SERVER_ERROR
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Commerce(e) => commerce_status(e),
      AppError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
      AppError::Store(StoreError::StockUnderflow { .. }) | AppError::Store(StoreError::Conflict(_)) => {
        StatusCode::CONFLICT
      }
      AppError::Validation(_) | AppError::Store(StoreError::StockOverflow { .. }) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::Store(StoreError::Backend(_)) | AppError::Config(_) | AppError::Sqlx(_) | AppError::Migration(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, kind = self.kind(), "Responding with error");
    } else {
      tracing::warn!(application_error = %self, kind = self.kind(), status = status.as_u16(), "Responding with error");
    }
    HttpResponse::build(status).json(json!({
      "error": self.kind(),
      "message": self.to_string(),
    }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
