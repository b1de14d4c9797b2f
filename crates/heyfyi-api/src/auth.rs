//! Session extractors.
//!
//! A session token is read from `Authorization: Bearer <token>` or, failing
//! that, from the [`SESSION_COOKIE`] cookie.

use axum::{
  extract::FromRequestParts,
  http::{
    HeaderMap,
    header::{AUTHORIZATION, COOKIE},
    request::Parts,
  },
};
use chrono::{DateTime, Utc};
use heyfyi_core::{
  Error as CoreError, account::Account, notify::Mailer, store::AccountStore as _,
};

use crate::{AppState, Store, error::ApiError};

pub const SESSION_COOKIE: &str = "heyfyi_session";

fn session_token(headers: &HeaderMap) -> Option<&str> {
  let bearer = headers
    .get(AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim);
  if bearer.is_some() {
    return bearer;
  }

  headers
    .get_all(COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find_map(|(name, value)| (name == SESSION_COOKIE).then_some(value))
}

async fn resolve<S: Store, M>(
  parts: &Parts,
  state: &AppState<S, M>,
) -> Result<Option<Account>, ApiError> {
  let Some(token) = session_token(&parts.headers) else {
    return Ok(None);
  };
  state
    .store
    .load_account_by_session(token)
    .await
    .map_err(|e| ApiError::Core(CoreError::storage(e)))
}

/// `Set-Cookie` value opening a session that lasts until `expires`.
pub fn session_cookie(token: &str, expires: Option<DateTime<Utc>>) -> String {
  let mut cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
  if let Some(expires) = expires {
    let max_age = (expires - Utc::now()).num_seconds().max(0);
    cookie.push_str(&format!("; Max-Age={max_age}"));
  }
  cookie
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_session_cookie() -> String {
  format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// The logged-in account. Rejects with 401 when there is no live session.
pub struct CurrentAccount(pub Account);

impl<S, M> FromRequestParts<AppState<S, M>> for CurrentAccount
where
  S: Store,
  M: Mailer + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, M>,
  ) -> Result<Self, Self::Rejection> {
    resolve(parts, state)
      .await?
      .map(CurrentAccount)
      .ok_or(ApiError::Unauthorized)
  }
}

/// The logged-in account, if any. A missing or expired session is not an
/// error.
pub struct MaybeAccount(pub Option<Account>);

impl<S, M> FromRequestParts<AppState<S, M>> for MaybeAccount
where
  S: Store,
  M: Mailer + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, M>,
  ) -> Result<Self, Self::Rejection> {
    resolve(parts, state).await.map(MaybeAccount)
  }
}
