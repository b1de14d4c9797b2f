//! JSON REST API for hey.fyi.
//!
//! Exposes an axum [`Router`] backed by any store implementing
//! [`AccountStore`] and [`FactStore`], and any [`Mailer`]. TLS and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let state = heyfyi_api::AppState::new(store, notifier);
//! axum::serve(listener, heyfyi_api::api_router(state)).await?;
//! ```

pub mod accounts;
pub mod auth;
pub mod error;
pub mod facts;
pub mod session;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use heyfyi_core::{
  notify::{Mailer, Notifier},
  store::{AccountStore, FactStore},
};

pub use error::ApiError;

/// Everything a handler needs from its store.
pub trait Store: AccountStore + FactStore + 'static {}

impl<T> Store for T where T: AccountStore + FactStore + 'static {}

/// Shared handler state.
pub struct AppState<S, M> {
  pub store:    Arc<S>,
  pub notifier: Arc<Notifier<M>>,
}

impl<S, M> AppState<S, M> {
  pub fn new(store: Arc<S>, notifier: Notifier<M>) -> Self {
    Self { store, notifier: Arc::new(notifier) }
  }
}

impl<S, M> Clone for AppState<S, M> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      notifier: Arc::clone(&self.notifier),
    }
  }
}

/// Build the full API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, M>(state: AppState<S, M>) -> Router<()>
where
  S: Store,
  M: Mailer + 'static,
{
  Router::new()
    // Accounts
    .route("/accounts", post(accounts::sign_up::<S, M>))
    .route("/accounts/me", get(accounts::me))
    .route("/verify/{account_id}/{code}", get(accounts::verify::<S, M>))
    .route("/reset", post(accounts::request_reset::<S, M>))
    .route("/reset/{account_id}/{code}", post(accounts::apply_reset::<S, M>))
    // Sessions
    .route(
      "/session",
      post(session::log_in::<S, M>).delete(session::log_out::<S, M>),
    )
    // Facts
    .route("/facts", get(facts::list::<S, M>).post(facts::create::<S, M>))
    .route(
      "/facts/{id}",
      get(facts::get_one::<S, M>).delete(facts::delete_one::<S, M>),
    )
    .route("/facts/{id}/vote", post(facts::vote::<S, M>))
    .route("/facts/{id}/moderate", post(facts::moderate::<S, M>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
