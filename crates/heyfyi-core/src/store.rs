//! Storage traits and supporting query types.
//!
//! The traits are implemented by storage backends (e.g.
//! `heyfyi-store-sqlite`). Domain functions depend only on these
//! abstractions, never on a concrete persistence technology.

use std::future::Future;

use crate::{
  account::{Account, AccountId},
  fact::{Fact, FactId, Vote},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Which facts [`FactStore::list_facts`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
  /// Every fact, including those awaiting moderation.
  All,
  /// Moderated facts, plus the viewer's own pending ones when a viewer is
  /// known.
  Public { viewer: Option<AccountId> },
}

impl ListScope {
  /// Admins see everything; everyone else gets the public scope.
  pub fn for_viewer(viewer: Option<&Account>) -> Self {
    match viewer {
      Some(account) if account.admin => Self::All,
      Some(account) => Self::Public { viewer: Some(account.id) },
      None => Self::Public { viewer: None },
    }
  }

  /// Whether `fact` belongs in this scope.
  pub fn includes(&self, fact: &Fact) -> bool {
    match self {
      Self::All => true,
      Self::Public { viewer } => {
        !fact.awaiting_moderation || *viewer == Some(fact.account_id)
      }
    }
  }
}

// ─── Optimistic concurrency ──────────────────────────────────────────────────

/// Identifies the record a [`StaleWrite`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
  Account(AccountId),
  Vote { account_id: AccountId, fact_id: FactId },
}

impl std::fmt::Display for Entity {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Account(id) => write!(f, "account {id}"),
      Self::Vote { account_id, fact_id } => {
        write!(f, "vote of account {account_id} on fact {fact_id}")
      }
    }
  }
}

/// A conditional save found a newer version than the one it read.
///
/// Backends return this (usually wrapped in their own error type) when a
/// `save_*` call loses a race; [`crate::Error::storage`] turns it into
/// [`crate::Error::Conflict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{entity} was modified concurrently (expected version {expected_version})")]
pub struct StaleWrite {
  pub entity:           Entity,
  pub expected_version: i64,
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// The error type shared by every storage trait a backend implements.
pub trait Backend: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;
}

/// Persistence for [`Account`]s.
///
/// All lookups skip soft-deleted accounts and return `Ok(None)` when nothing
/// matches, so "not found" is never confused with a failing backend.
pub trait AccountStore: Backend {
  fn load_account_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  fn load_account_by_id(
    &self,
    id: AccountId,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  /// Load the account whose session token is `token`, but only while that
  /// session is live (see [`Account::has_live_session`]). An expired session
  /// yields `Ok(None)`.
  fn load_account_by_session<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  /// Persist a new account. The store assigns `id`, `version` and
  /// `created_at`.
  fn create_account<'a>(
    &'a self,
    account: &'a mut Account,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Write back every mutable field of `account`.
  ///
  /// The write succeeds only if the stored version still equals
  /// `account.version`; on success the version is bumped in place. A lost
  /// race is reported as a [`StaleWrite`].
  fn save_account<'a>(
    &'a self,
    account: &'a mut Account,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// Persistence for [`Fact`]s, their references and their votes.
pub trait FactStore: Backend {
  /// List facts in `scope`, newest first, with references and votes
  /// populated.
  fn list_facts(
    &self,
    scope: ListScope,
  ) -> impl Future<Output = Result<Vec<Fact>, Self::Error>> + Send + '_;

  /// Load one fact with references and votes populated.
  fn load_fact(
    &self,
    id: FactId,
  ) -> impl Future<Output = Result<Option<Fact>, Self::Error>> + Send + '_;

  /// Persist a new fact and its references. The store assigns `id` and
  /// `created_at` (and the ids of the references).
  fn create_fact<'a>(
    &'a self,
    fact: &'a mut Fact,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Soft-delete a fact.
  fn delete_fact(
    &self,
    id: FactId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Fetch the vote `account_id` holds on `fact_id`, creating a zero-score
  /// record first if none exists.
  fn get_or_create_vote(
    &self,
    account_id: AccountId,
    fact_id: FactId,
  ) -> impl Future<Output = Result<Vote, Self::Error>> + Send + '_;

  /// Conditionally write back a vote's score, bumping its version. A lost race
  /// is reported as a [`StaleWrite`].
  fn save_vote<'a>(
    &'a self,
    vote: &'a mut Vote,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn set_moderation(
    &self,
    id: FactId,
    awaiting_moderation: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// The single bulk operation behind periodic vote replenishment.
pub trait VoteGrant: Backend {
  /// Add one vote to the bank of every live account. Returns the number of
  /// accounts touched.
  fn grant_vote_to_all_accounts(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
