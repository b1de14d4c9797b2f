//! Accounts and their credential/session lifecycle.
//!
//! An account moves from unverified (a verification code is pending) to
//! active, and then back and forth between logged in and logged out. A
//! pending password reset is tracked independently of login state.

use chrono::{DateTime, Duration, Months, Utc};

use crate::{
  Error, Result,
  credential::{
    generate_opaque_code, hash_password, is_password_acceptable,
    verify_password,
  },
  notify::{Mailer, Notifier},
  store::AccountStore,
};

/// Storage-assigned numeric account id.
pub type AccountId = i64;

/// Maximum nickname length, in characters.
pub const MAX_NICKNAME_LEN: usize = 15;

/// Votes every new account starts with.
pub const INITIAL_VOTE_BANK: u32 = 10;

/// Votes an admin created by [`create_admin_account`] starts with.
pub const ADMIN_VOTE_BANK: u32 = 100;

/// How long a session lasts when the user did not ask to be remembered.
pub const SHORT_SESSION_SECS: i64 = 3600;

/// How long a session lasts when the user asked to be remembered.
pub const REMEMBERED_SESSION: Months = Months::new(1);

#[derive(Debug, Clone, Default)]
pub struct Account {
  pub id:                AccountId,
  pub email:             String,
  pub nickname:          String,
  /// Argon2 PHC string; the plaintext is never stored.
  pub password_hash:     String,
  /// While set, the account cannot log in.
  pub verification_code: Option<String>,
  /// While set, a password reset is pending.
  pub reset_code:        Option<String>,
  pub session_token:     Option<String>,
  /// `None` with a token present means the session never expires.
  pub session_expires:   Option<DateTime<Utc>>,
  pub vote_bank:         u32,
  pub admin:             bool,
  pub created_at:        Option<DateTime<Utc>>,
  pub updated_at:        Option<DateTime<Utc>>,
  pub deleted_at:        Option<DateTime<Utc>>,
  /// Optimistic-concurrency version, managed by the store.
  pub version:           i64,
}

impl Account {
  /// An unsaved account with the initial vote bank.
  pub fn new(email: impl Into<String>, nickname: impl Into<String>) -> Self {
    Self {
      email: email.into(),
      nickname: nickname.into(),
      vote_bank: INITIAL_VOTE_BANK,
      ..Self::default()
    }
  }

  pub fn is_verified(&self) -> bool { self.verification_code.is_none() }

  pub fn awaiting_password_reset(&self) -> bool { self.reset_code.is_some() }

  /// A session is live while `token` matches the stored one and the expiry,
  /// if any, is still in the future.
  pub fn has_live_session(&self, token: &str, now: DateTime<Utc>) -> bool {
    match &self.session_token {
      Some(current) if current == token => {
        self.session_expires.is_none_or(|expires| expires > now)
      }
      _ => false,
    }
  }

  /// Replace the password with a fresh hash of `plaintext`.
  pub fn set_password(&mut self, plaintext: &str) -> Result<()> {
    self.password_hash = hash_password(plaintext)?;
    Ok(())
  }

  /// Non-empty email and nickname. Whitespace counts as content.
  fn validate_fields(&self) -> Result<()> {
    if self.email.is_empty() || self.nickname.is_empty() {
      return Err(Error::MissingRequiredFields);
    }
    Ok(())
  }

  /// Give an existing account admin rights.
  pub async fn promote_to_admin<S: AccountStore>(&mut self, store: &S) -> Result<()> {
    self.admin = true;
    if let Err(e) = store.save_account(self).await {
      self.admin = false;
      return Err(Error::storage(e));
    }
    tracing::info!(account_id = self.id, "account promoted to admin");
    Ok(())
  }

  /// Clear the pending verification code if `code` matches it exactly.
  pub async fn apply_verification_code<S: AccountStore>(
    &mut self,
    store: &S,
    code: &str,
  ) -> Result<()> {
    match self.verification_code.as_deref() {
      None => return Err(Error::NoVerificationNeeded),
      Some(pending) if pending != code => {
        return Err(Error::VerificationCodeMismatch);
      }
      Some(_) => {}
    }

    self.verification_code = None;
    store.save_account(self).await.map_err(Error::storage)
  }

  /// Complete a pending password reset.
  pub async fn apply_password_reset_code<S: AccountStore>(
    &mut self,
    store: &S,
    code: &str,
    new_password: &str,
  ) -> Result<()> {
    match self.reset_code.as_deref() {
      None => return Err(Error::NoResetPending),
      Some(pending) if pending != code => {
        return Err(Error::VerificationCodeMismatch);
      }
      Some(_) => {}
    }

    if !is_password_acceptable(new_password) {
      return Err(Error::PasswordNotAcceptable);
    }

    self.set_password(new_password)?;
    self.reset_code = None;
    store.save_account(self).await.map_err(Error::storage)
  }

  /// Log out: drop the session token and expire it immediately.
  pub async fn expire_session<S: AccountStore>(&mut self, store: &S) -> Result<()> {
    self.session_token = None;
    self.session_expires = Some(Utc::now());
    store.save_account(self).await.map_err(Error::storage)
  }
}

// ─── Login ───────────────────────────────────────────────────────────────────

/// Check credentials and open a new session.
///
/// An unknown email and a wrong password both yield
/// [`Error::InvalidCredentials`]. A correct password on an unverified
/// account yields [`Error::NotYetVerified`] without opening a session.
pub async fn attempt_login<S: AccountStore>(
  store: &S,
  email: &str,
  password: &str,
  remember_me: bool,
) -> Result<Account> {
  let mut account = match store.load_account_by_email(email).await {
    Ok(Some(account)) => account,
    Ok(None) => return Err(Error::InvalidCredentials),
    Err(e) => {
      tracing::warn!(error = %e, "account lookup failed during login");
      return Err(Error::InvalidCredentials);
    }
  };

  if !verify_password(&account.password_hash, password) {
    return Err(Error::InvalidCredentials);
  }

  if !account.is_verified() {
    return Err(Error::NotYetVerified);
  }

  let now = Utc::now();
  let expires = if remember_me {
    now.checked_add_months(REMEMBERED_SESSION).unwrap_or(now + Duration::days(31))
  } else {
    now + Duration::seconds(SHORT_SESSION_SECS)
  };

  account.session_token = Some(generate_opaque_code()?);
  account.session_expires = Some(expires);
  store.save_account(&mut account).await.map_err(Error::storage)?;

  tracing::info!(account_id = account.id, remember_me, "session opened");
  Ok(account)
}

// ─── Registration ────────────────────────────────────────────────────────────

/// Whether an account with `email` exists. Only a definite "not found" counts
/// as available; any other lookup failure is returned.
pub async fn is_email_in_use<S: AccountStore>(store: &S, email: &str) -> Result<bool> {
  store
    .load_account_by_email(email)
    .await
    .map(|found| found.is_some())
    .map_err(Error::storage)
}

/// Validate a registration candidate.
///
/// Checks run in a fixed order and the first failure wins: password
/// strength, email availability, nickname length, then required fields.
pub async fn can_account_be_made<S: AccountStore>(
  store: &S,
  candidate: &Account,
  plaintext_password: &str,
) -> Result<()> {
  if !is_password_acceptable(plaintext_password) {
    return Err(Error::PasswordNotAcceptable);
  }

  if is_email_in_use(store, &candidate.email).await? {
    return Err(Error::EmailAlreadyInUse);
  }

  if candidate.nickname.chars().count() > MAX_NICKNAME_LEN {
    return Err(Error::NicknameTooLong);
  }

  candidate.validate_fields()
}

/// Register a new, unverified account and email it a verification link.
///
/// A failure to send the email is logged and does not undo the registration.
pub async fn check_and_create_account<S, M>(
  store: &S,
  notifier: &Notifier<M>,
  email: &str,
  password: &str,
  nickname: &str,
) -> Result<Account>
where
  S: AccountStore,
  M: Mailer,
{
  let mut account = Account::new(email, nickname);
  can_account_be_made(store, &account, password).await?;

  account.set_password(password)?;
  account.verification_code = Some(generate_opaque_code()?);

  store.create_account(&mut account).await.map_err(Error::storage)?;
  tracing::info!(account_id = account.id, "account created");

  if let Err(e) = notifier.send_verification(&account).await {
    tracing::warn!(
      account_id = account.id,
      error = %e,
      "failed to send verification email"
    );
  }

  Ok(account)
}

// ─── Password reset ──────────────────────────────────────────────────────────

/// Issue a fresh reset code for the account registered under `email` and
/// email it a reset link. Any previously issued code stops working.
pub async fn request_password_reset<S, M>(
  store: &S,
  notifier: &Notifier<M>,
  email: &str,
) -> Result<()>
where
  S: AccountStore,
  M: Mailer,
{
  let mut account = store
    .load_account_by_email(email)
    .await
    .map_err(Error::storage)?
    .ok_or(Error::AccountNotFound)?;

  account.reset_code = Some(generate_opaque_code()?);
  store.save_account(&mut account).await.map_err(Error::storage)?;

  if let Err(e) = notifier.send_password_reset(&account).await {
    tracing::warn!(
      account_id = account.id,
      error = %e,
      "failed to send password reset email"
    );
  }

  Ok(())
}

// ─── Administration ──────────────────────────────────────────────────────────

/// Create an already-verified admin account with [`ADMIN_VOTE_BANK`] votes.
///
/// Runs the registration checks of [`can_account_be_made`] but sends no
/// email. A fresh deployment needs one of these before any fact can leave
/// moderation.
pub async fn create_admin_account<S: AccountStore>(
  store: &S,
  email: &str,
  nickname: &str,
  password: &str,
) -> Result<Account> {
  let mut account = Account::new(email, nickname);
  can_account_be_made(store, &account, password).await?;

  account.set_password(password)?;
  account.admin = true;
  account.vote_bank = ADMIN_VOTE_BANK;

  store.create_account(&mut account).await.map_err(Error::storage)?;
  tracing::info!(account_id = account.id, "admin account created");
  Ok(account)
}
