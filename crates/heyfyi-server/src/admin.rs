//! Bootstrapping an admin on a fresh deployment.
//!
//! New facts wait for an admin to clear them, so the first admin has to come
//! from outside the HTTP API.

use anyhow::Context as _;
use heyfyi_core::{
  account::{Account, create_admin_account},
  store::AccountStore,
};

/// What [`ensure_admin`] did.
#[derive(Debug)]
pub enum AdminBootstrap {
  Created(Account),
  Promoted(Account),
  AlreadyAdmin(Account),
}

impl AdminBootstrap {
  pub fn account(&self) -> &Account {
    match self {
      Self::Created(a) | Self::Promoted(a) | Self::AlreadyAdmin(a) => a,
    }
  }
}

/// Make sure the account registered under `email` is an admin.
///
/// An existing account is promoted in place. Otherwise a verified admin is
/// created, and only then is `password` called for the new password.
pub async fn ensure_admin<S, F>(
  store: &S,
  email: &str,
  nickname: &str,
  password: F,
) -> anyhow::Result<AdminBootstrap>
where
  S: AccountStore,
  F: FnOnce() -> anyhow::Result<String>,
{
  let existing = store
    .load_account_by_email(email)
    .await
    .with_context(|| format!("failed to look up {email}"))?;

  match existing {
    Some(account) if account.admin => Ok(AdminBootstrap::AlreadyAdmin(account)),
    Some(mut account) => {
      account.promote_to_admin(store).await?;
      Ok(AdminBootstrap::Promoted(account))
    }
    None => {
      let password = password()?;
      let account = create_admin_account(store, email, nickname, &password).await?;
      Ok(AdminBootstrap::Created(account))
    }
  }
}
