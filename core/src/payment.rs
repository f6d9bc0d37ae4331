// medcart/src/payment.rs

//! Simulated payment gateway.
//!
//! Each supported method succeeds with a fixed probability. The random draw
//! is taken from a [`PaymentDraw`] so tests can force either outcome.

use crate::models::OrderStatus;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
  /// Cash on delivery.
  Cod,
  Paypal,
  Debit,
  /// Credit card.
  Cc,
}

impl PaymentMethod {
  pub fn as_str(self) -> &'static str {
    match self {
      PaymentMethod::Cod => "cod",
      PaymentMethod::Paypal => "paypal",
      PaymentMethod::Debit => "debit",
      PaymentMethod::Cc => "cc",
    }
  }

  /// Probability that a single attempt succeeds.
  pub fn success_probability(self) -> f64 {
    match self {
      PaymentMethod::Cod => 1.0,
      PaymentMethod::Paypal => 0.95,
      PaymentMethod::Debit => 0.90,
      PaymentMethod::Cc => 0.92,
    }
  }

  /// Order status assigned when the attempt succeeds.
  pub fn status_on_success(self) -> OrderStatus {
    match self {
      PaymentMethod::Cod => OrderStatus::Pending,
      _ => OrderStatus::Paid,
    }
  }

  pub fn decline_reason(self) -> &'static str {
    match self {
      PaymentMethod::Cod => "cash on delivery cannot be declined",
      PaymentMethod::Paypal => "insufficient funds",
      PaymentMethod::Debit => "card declined",
      PaymentMethod::Cc => "credit limit exceeded",
    }
  }
}

impl fmt::Display for PaymentMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PaymentMethod {
  type Err = PaymentDecline;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "cod" => Ok(PaymentMethod::Cod),
      "paypal" => Ok(PaymentMethod::Paypal),
      "debit" => Ok(PaymentMethod::Debit),
      "cc" => Ok(PaymentMethod::Cc),
      other => Err(PaymentDecline {
        method: other.to_string(),
        reason: "unsupported payment method".to_string(),
      }),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("payment failed ({method}): {reason}")]
pub struct PaymentDecline {
  pub method: String,
  pub reason: String,
}

/// Source of the uniform draw in `[0, 1)` that decides an attempt.
pub trait PaymentDraw: Send + Sync {
  fn draw(&self) -> f64;
}

/// Production draw backed by the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngDraw;

impl PaymentDraw for ThreadRngDraw {
  fn draw(&self) -> f64 {
    rand::thread_rng().gen::<f64>()
  }
}

/// Always returns the same value. `FixedDraw(0.0)` approves every supported
/// method; `FixedDraw(0.99)` declines every method except cash on delivery.
#[derive(Debug, Clone, Copy)]
pub struct FixedDraw(pub f64);

impl PaymentDraw for FixedDraw {
  fn draw(&self) -> f64 {
    self.0
  }
}

#[derive(Clone)]
pub struct PaymentSimulator {
  draw: Arc<dyn PaymentDraw>,
}

impl Default for PaymentSimulator {
  fn default() -> Self {
    Self::new(Arc::new(ThreadRngDraw))
  }
}

impl PaymentSimulator {
  pub fn new(draw: Arc<dyn PaymentDraw>) -> Self {
    Self { draw }
  }

  pub fn fixed(value: f64) -> Self {
    Self::new(Arc::new(FixedDraw(value)))
  }

  /// Attempts a payment and returns the order's initial status.
  pub fn simulate(&self, method: &str) -> Result<OrderStatus, PaymentDecline> {
    let method: PaymentMethod = method.parse().map_err(|decline: PaymentDecline| {
      warn!(method = %decline.method, "Rejected unsupported payment method.");
      decline
    })?;

    let draw = self.draw.draw();
    if draw < method.success_probability() {
      info!(%method, draw, "Simulated payment approved.");
      Ok(method.status_on_success())
    } else {
      warn!(%method, draw, reason = method.decline_reason(), "Simulated payment declined.");
      Err(PaymentDecline {
        method: method.as_str().to_string(),
        reason: method.decline_reason().to_string(),
      })
    }
  }
}
