//! Error types for `heyfyi-core`.

use thiserror::Error;

use crate::{fact::FactId, store::StaleWrite};

/// Every failure a domain operation can report.
///
/// The display strings are user-facing; the HTTP layer shows them as-is for
/// validation failures.
#[derive(Debug, Error)]
pub enum Error {
  // ── Accounts ─────────────────────────────────────────────────────────
  /// Deliberately covers both "no such email" and "wrong password".
  #[error("Invalid email or password.")]
  InvalidCredentials,

  #[error("Account not yet verified.")]
  NotYetVerified,

  #[error(
    "Password must be at least 8 characters long and contain at least 3 \
     types of characters from uppercase, lowercase, symbols, digits, and \
     punctuation."
  )]
  PasswordNotAcceptable,

  #[error("This email address is already in use!")]
  EmailAlreadyInUse,

  #[error("Your nickname cannot be longer than 15 characters!")]
  NicknameTooLong,

  #[error("Account doesn't need verifying!")]
  NoVerificationNeeded,

  #[error("Bad verification code!")]
  VerificationCodeMismatch,

  #[error("Password reset not requested!")]
  NoResetPending,

  #[error("account not found")]
  AccountNotFound,

  // ── Votes ────────────────────────────────────────────────────────────
  #[error("No votes left in bank!")]
  NoVotesLeft,

  // ── Facts ────────────────────────────────────────────────────────────
  #[error("All fields are compulsory.")]
  MissingRequiredFields,

  #[error("You need at least 2 references!")]
  NotEnoughReferences,

  #[error("No account ID was specified!")]
  NoAccountSpecified,

  #[error("fact not found: {0}")]
  FactNotFound(FactId),

  // ── Infrastructure ───────────────────────────────────────────────────
  #[error("randomness unavailable: {0}")]
  RandomnessUnavailable(#[from] rand_core::Error),

  #[error("password hashing failed: {0}")]
  PasswordHash(String),

  #[error("conflicting update: {0}")]
  Conflict(StaleWrite),

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error.
  ///
  /// If the error (or anything in its source chain) is a [`StaleWrite`], the
  /// result is [`Error::Conflict`] so callers can tell a lost optimistic
  /// write apart from a broken backend.
  pub fn storage<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    let mut cause: Option<&(dyn std::error::Error + 'static)> = Some(&err);
    while let Some(c) = cause {
      if let Some(stale) = c.downcast_ref::<StaleWrite>() {
        return Self::Conflict(*stale);
      }
      cause = c.source();
    }
    Self::Storage(Box::new(err))
  }

  /// True for the input-validation kinds that a caller can fix by changing
  /// their request.
  pub fn is_validation(&self) -> bool {
    matches!(
      self,
      Self::PasswordNotAcceptable
        | Self::EmailAlreadyInUse
        | Self::NicknameTooLong
        | Self::NoVerificationNeeded
        | Self::VerificationCodeMismatch
        | Self::NoResetPending
        | Self::NoVotesLeft
        | Self::MissingRequiredFields
        | Self::NotEnoughReferences
        | Self::NoAccountSpecified
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
