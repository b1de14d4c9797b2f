//! Handlers for `/facts` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/facts` | Newest first; pending facts only for their creator and admins |
//! | `POST`   | `/facts` | Body: [`NewFact`]; returns 201 + [`FactView`] |
//! | `GET`    | `/facts/{id}` | 404 for pending facts the viewer may not see |
//! | `DELETE` | `/facts/{id}` | Creator or admin |
//! | `POST`   | `/facts/{id}/vote` | Body: `{"up":true}` |
//! | `POST`   | `/facts/{id}/moderate` | Admin only; body: `{"awaiting_moderation":false}` |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use heyfyi_core::{
  Error as CoreError,
  account::{Account, AccountId},
  fact::{
    self, Fact, FactId, NewFact, Reference, VoteOutcome, VoteScore, cast_vote,
    create_fact, moderate_fact,
  },
  notify::Mailer,
  store::{FactStore as _, ListScope},
};
use serde::{Deserialize, Serialize};

use crate::{
  AppState, Store,
  auth::{CurrentAccount, MaybeAccount},
  error::ApiError,
};

/// A fact as one viewer sees it: individual votes are folded into a score.
#[derive(Debug, Serialize, Deserialize)]
pub struct FactView {
  pub id:                  FactId,
  pub account_id:          AccountId,
  pub statement:           String,
  pub explain:             String,
  pub explain_further:     String,
  pub awaiting_moderation: bool,
  pub references:          Vec<Reference>,
  pub score:               VoteScore,
  pub created_at:          Option<DateTime<Utc>>,
}

impl FactView {
  fn new(fact: Fact, viewer: Option<&Account>) -> Self {
    let score = fact.score(viewer.map_or(0, |a| a.id));
    Self {
      id: fact.id,
      account_id: fact.account_id,
      statement: fact.statement,
      explain: fact.explain,
      explain_further: fact.explain_further,
      awaiting_moderation: fact.awaiting_moderation,
      references: fact.references,
      score,
      created_at: fact.created_at,
    }
  }
}

/// Load a fact, treating one the viewer may not see as missing.
async fn visible_fact<S: Store>(
  store: &S,
  id: FactId,
  viewer: Option<&Account>,
) -> Result<Fact, ApiError> {
  store
    .load_fact(id)
    .await
    .map_err(CoreError::storage)?
    .filter(|f| f.is_visible_to(viewer))
    .ok_or(ApiError::Core(CoreError::FactNotFound(id)))
}

// ─── Read ─────────────────────────────────────────────────────────────────────

/// `GET /facts`
pub async fn list<S: Store, M: Mailer>(
  State(state): State<AppState<S, M>>,
  MaybeAccount(viewer): MaybeAccount,
) -> Result<Json<Vec<FactView>>, ApiError> {
  let facts = state
    .store
    .list_facts(ListScope::for_viewer(viewer.as_ref()))
    .await
    .map_err(CoreError::storage)?;
  Ok(Json(
    facts
      .into_iter()
      .map(|f| FactView::new(f, viewer.as_ref()))
      .collect(),
  ))
}

/// `GET /facts/{id}`
pub async fn get_one<S: Store, M: Mailer>(
  State(state): State<AppState<S, M>>,
  MaybeAccount(viewer): MaybeAccount,
  Path(id): Path<FactId>,
) -> Result<Json<FactView>, ApiError> {
  let fact = visible_fact(&*state.store, id, viewer.as_ref()).await?;
  Ok(Json(FactView::new(fact, viewer.as_ref())))
}

// ─── Write ────────────────────────────────────────────────────────────────────

/// `POST /facts`: the creator is always the logged-in account.
pub async fn create<S: Store, M: Mailer>(
  State(state): State<AppState<S, M>>,
  CurrentAccount(account): CurrentAccount,
  Json(mut input): Json<NewFact>,
) -> Result<impl IntoResponse, ApiError> {
  input.account_id = account.id;
  let fact = create_fact(&*state.store, input).await?;
  Ok((StatusCode::CREATED, Json(FactView::new(fact, Some(&account)))))
}

/// `DELETE /facts/{id}`
pub async fn delete_one<S: Store, M: Mailer>(
  State(state): State<AppState<S, M>>,
  CurrentAccount(account): CurrentAccount,
  Path(id): Path<FactId>,
) -> Result<StatusCode, ApiError> {
  let fact = visible_fact(&*state.store, id, Some(&account)).await?;
  if !fact.can_be_deleted_by(&account) {
    return Err(CoreError::FactNotFound(id).into());
  }
  fact::delete_fact(&*state.store, &fact).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct VoteBody {
  pub up: bool,
}

/// `POST /facts/{id}/vote`
pub async fn vote<S: Store, M: Mailer>(
  State(state): State<AppState<S, M>>,
  CurrentAccount(mut account): CurrentAccount,
  Path(id): Path<FactId>,
  Json(body): Json<VoteBody>,
) -> Result<Json<VoteOutcome>, ApiError> {
  let fact = visible_fact(&*state.store, id, Some(&account)).await?;
  let outcome = cast_vote(&*state.store, &mut account, &fact, body.up).await?;
  Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct ModerateBody {
  pub awaiting_moderation: bool,
}

/// `POST /facts/{id}/moderate`
pub async fn moderate<S: Store, M: Mailer>(
  State(state): State<AppState<S, M>>,
  CurrentAccount(account): CurrentAccount,
  Path(id): Path<FactId>,
  Json(body): Json<ModerateBody>,
) -> Result<Json<FactView>, ApiError> {
  if !account.admin {
    return Err(ApiError::Forbidden);
  }
  let mut fact = visible_fact(&*state.store, id, Some(&account)).await?;
  moderate_fact(&*state.store, &mut fact, body.awaiting_moderation).await?;
  Ok(Json(FactView::new(fact, Some(&account))))
}
