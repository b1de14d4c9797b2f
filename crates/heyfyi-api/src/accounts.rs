//! Handlers for account lifecycle endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/accounts` | Body: [`SignUpBody`]; returns 201 + [`AccountView`] |
//! | `GET`  | `/accounts/me` | Requires a session |
//! | `GET`  | `/verify/{account_id}/{code}` | Link from the verification email |
//! | `POST` | `/reset` | Body: `{"email":"..."}`; always 202 |
//! | `POST` | `/reset/{account_id}/{code}` | Body: [`NewPasswordBody`] |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use heyfyi_core::{
  Error as CoreError,
  account::{Account, AccountId, check_and_create_account, request_password_reset},
  notify::Mailer,
  store::AccountStore as _,
};
use serde::{Deserialize, Serialize};

use crate::{AppState, Store, auth::CurrentAccount, error::ApiError};

/// The public face of an [`Account`]: no hashes, codes or tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountView {
  pub id:        AccountId,
  pub email:     String,
  pub nickname:  String,
  pub vote_bank: u32,
  pub admin:     bool,
  pub verified:  bool,
}

impl From<&Account> for AccountView {
  fn from(a: &Account) -> Self {
    Self {
      id:        a.id,
      email:     a.email.clone(),
      nickname:  a.nickname.clone(),
      vote_bank: a.vote_bank,
      admin:     a.admin,
      verified:  a.is_verified(),
    }
  }
}

const PASSWORDS_DIFFER: &str = "Your passwords don't match!";

async fn load_account<S: Store>(store: &S, id: AccountId) -> Result<Account, ApiError> {
  store
    .load_account_by_id(id)
    .await
    .map_err(CoreError::storage)?
    .ok_or(ApiError::Core(CoreError::AccountNotFound))
}

// ─── Sign up ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SignUpBody {
  pub email:            String,
  pub nickname:         String,
  pub password:         String,
  pub confirm_password: String,
  #[serde(default)]
  pub accept_terms:     bool,
}

/// `POST /accounts`
pub async fn sign_up<S: Store, M: Mailer>(
  State(state): State<AppState<S, M>>,
  Json(body): Json<SignUpBody>,
) -> Result<impl IntoResponse, ApiError> {
  if body.password != body.confirm_password {
    return Err(ApiError::BadRequest(PASSWORDS_DIFFER.into()));
  }
  if !body.accept_terms {
    return Err(ApiError::BadRequest(
      "You must accept the terms and conditions!".into(),
    ));
  }

  let account = check_and_create_account(
    &*state.store,
    &*state.notifier,
    &body.email,
    &body.password,
    &body.nickname,
  )
  .await?;
  Ok((StatusCode::CREATED, Json(AccountView::from(&account))))
}

/// `GET /accounts/me`
pub async fn me(CurrentAccount(account): CurrentAccount) -> Json<AccountView> {
  Json(AccountView::from(&account))
}

// ─── Verification ─────────────────────────────────────────────────────────────

/// `GET /verify/{account_id}/{code}`
pub async fn verify<S: Store, M: Mailer>(
  State(state): State<AppState<S, M>>,
  Path((account_id, code)): Path<(AccountId, String)>,
) -> Result<Json<AccountView>, ApiError> {
  let mut account = load_account(&*state.store, account_id).await?;
  account.apply_verification_code(&*state.store, &code).await?;
  tracing::info!(account_id, "account verified");
  Ok(Json(AccountView::from(&account)))
}

// ─── Password reset ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ResetRequestBody {
  pub email: String,
}

/// `POST /reset`
///
/// Answers 202 whether or not the email is registered.
pub async fn request_reset<S: Store, M: Mailer>(
  State(state): State<AppState<S, M>>,
  Json(body): Json<ResetRequestBody>,
) -> Result<StatusCode, ApiError> {
  match request_password_reset(&*state.store, &*state.notifier, &body.email).await {
    Ok(()) | Err(CoreError::AccountNotFound) => Ok(StatusCode::ACCEPTED),
    Err(e) => Err(e.into()),
  }
}

#[derive(Debug, Deserialize)]
pub struct NewPasswordBody {
  pub password:         String,
  pub confirm_password: String,
}

/// `POST /reset/{account_id}/{code}`
pub async fn apply_reset<S: Store, M: Mailer>(
  State(state): State<AppState<S, M>>,
  Path((account_id, code)): Path<(AccountId, String)>,
  Json(body): Json<NewPasswordBody>,
) -> Result<StatusCode, ApiError> {
  if body.password != body.confirm_password {
    return Err(ApiError::BadRequest(PASSWORDS_DIFFER.into()));
  }

  let mut account = load_account(&*state.store, account_id).await?;
  account
    .apply_password_reset_code(&*state.store, &code, &body.password)
    .await?;
  tracing::info!(account_id, "password reset");
  Ok(StatusCode::NO_CONTENT)
}
