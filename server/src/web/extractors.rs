// medcart_server/src/web/extractors.rs

//! Caller identity as forwarded by the upstream auth gateway.
//!
//! `X-User-ID` carries the user's uuid. `X-User-Role` is `admin` or
//! `customer` and defaults to `customer` when absent.

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use medcart::{Caller, Role};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
  pub caller: Caller,
}

impl AuthenticatedUser {
  pub fn user_id(&self) -> Uuid {
    self.caller.user_id
  }
}

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
  req.headers().get(name).and_then(|value| value.to_str().ok())
}

fn caller_from(req: &HttpRequest) -> Result<Caller, AppError> {
  let user_id = header(req, USER_ID_HEADER)
    .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
    .ok_or_else(|| {
      warn!("Missing or invalid {} header.", USER_ID_HEADER);
      AppError::Auth(format!("A valid {} header is required.", USER_ID_HEADER))
    })?;

  let role = match header(req, USER_ROLE_HEADER) {
    None => Role::Customer,
    Some(raw) => Role::parse(raw).ok_or_else(|| {
      warn!(role = raw, "Unrecognised {} header.", USER_ROLE_HEADER);
      AppError::Auth(format!("Unrecognised role '{}'.", raw))
    })?,
  };
  Ok(Caller { user_id, role })
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(caller_from(req).map(|caller| AuthenticatedUser { caller }))
  }
}

/// An authenticated caller holding the admin role.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser {
  pub caller: Caller,
}

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(caller_from(req).and_then(|caller| {
      if caller.is_admin() {
        Ok(AdminUser { caller })
      } else {
        warn!(user_id = %caller.user_id, path = req.path(), "Non-admin caller on an admin route.");
        Err(AppError::Forbidden("This operation requires the admin role.".to_string()))
      }
    }))
  }
}
