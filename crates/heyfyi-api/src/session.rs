//! Handlers for `/session`: logging in and out.

use axum::{
  Json,
  extract::State,
  http::{StatusCode, header::SET_COOKIE},
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use heyfyi_core::{account::attempt_login, notify::Mailer};
use serde::{Deserialize, Serialize};

use crate::{
  AppState, Store,
  accounts::AccountView,
  auth::{CurrentAccount, clear_session_cookie, session_cookie},
  error::ApiError,
};

#[derive(Debug, Deserialize)]
pub struct LogInBody {
  pub email:       String,
  pub password:    String,
  #[serde(default)]
  pub remember_me: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
  pub token:   String,
  pub expires: Option<DateTime<Utc>>,
  pub account: AccountView,
}

/// `POST /session`: returns the new token and also sets it as a cookie.
pub async fn log_in<S: Store, M: Mailer>(
  State(state): State<AppState<S, M>>,
  Json(body): Json<LogInBody>,
) -> Result<impl IntoResponse, ApiError> {
  let account =
    attempt_login(&*state.store, &body.email, &body.password, body.remember_me).await?;

  let token = account.session_token.clone().unwrap_or_default();
  let cookie = session_cookie(&token, account.session_expires);
  let view = SessionView {
    token,
    expires: account.session_expires,
    account: AccountView::from(&account),
  };
  Ok(([(SET_COOKIE, cookie)], Json(view)))
}

/// `DELETE /session`
pub async fn log_out<S: Store, M: Mailer>(
  State(state): State<AppState<S, M>>,
  CurrentAccount(mut account): CurrentAccount,
) -> Result<impl IntoResponse, ApiError> {
  account.expire_session(&*state.store).await?;
  tracing::info!(account_id = account.id, "session closed");
  Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, clear_session_cookie())]))
}
