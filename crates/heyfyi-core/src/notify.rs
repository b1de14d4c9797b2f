//! Outbound notifications.
//!
//! Delivery is delegated to a [`Mailer`]; this module only knows what the
//! verification and password-reset emails say and where their links point.

use std::future::Future;

use crate::account::Account;

/// Something that can deliver a plain-text email.
pub trait Mailer: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn send_email<'a>(
    &'a self,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// Composes account emails and hands them to a [`Mailer`].
pub struct Notifier<M> {
  mailer:   M,
  base_url: String,
}

impl<M: Mailer> Notifier<M> {
  /// `base_url` is the public site root links are built from, e.g.
  /// `https://hey.fyi`.
  pub fn new(mailer: M, base_url: impl Into<String>) -> Self {
    let base_url = base_url.into().trim_end_matches('/').to_owned();
    Self { mailer, base_url }
  }

  pub fn mailer(&self) -> &M { &self.mailer }

  pub fn verification_link(&self, account: &Account) -> Option<String> {
    let code = account.verification_code.as_deref()?;
    Some(format!("{}/verify/{}/{code}", self.base_url, account.id))
  }

  pub fn reset_link(&self, account: &Account) -> Option<String> {
    let code = account.reset_code.as_deref()?;
    Some(format!("{}/reset/{}/{code}", self.base_url, account.id))
  }

  /// Email the account its verification link. Does nothing for an account
  /// that is already verified.
  pub async fn send_verification(&self, account: &Account) -> Result<(), M::Error> {
    let Some(link) = self.verification_link(account) else {
      return Ok(());
    };
    let body = format!(
      "Hello!\r\n\r\nTo validate your hey.fyi account, you need to follow \
       this link:\r\n{link}\r\n\r\nI hope you enjoy using the \
       service!\r\n\r\nRegards,\r\nhey.fyi"
    );
    self
      .mailer
      .send_email(&account.email, "Verification code", &body)
      .await
  }

  /// Email the account its password-reset link. Does nothing when no reset
  /// is pending.
  pub async fn send_password_reset(&self, account: &Account) -> Result<(), M::Error> {
    let Some(link) = self.reset_link(account) else {
      return Ok(());
    };
    let body = format!(
      "Hello!\r\n\r\nSomeone requested a password reset to your hey.fyi \
       account.\r\nIf you didn't request this, simply ignore this \
       email.\r\n\r\nOtherwise, follow this link:\r\n{link}\r\n\r\nRegards,\
       \r\nhey.fyi"
    );
    self
      .mailer
      .send_email(&account.email, "Password Reset Request", &body)
      .await
  }
}
