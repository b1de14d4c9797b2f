//! Facts: user-submitted claims backed by references and scored by votes.
//!
//! Every new fact starts out awaiting moderation. Until an admin clears it,
//! only its creator and admins may see it; to everyone else it does not
//! exist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  account::{Account, AccountId},
  store::{AccountStore, FactStore},
  vote_bank::BankMovement,
};

/// Storage-assigned numeric fact id.
pub type FactId = i64;

/// A fact needs at least this many references.
pub const MIN_REFERENCES: usize = 2;

/// URL prefixes accepted as-is; anything else gets [`DEFAULT_SCHEME`].
const KNOWN_SCHEMES: [&str; 3] = ["http://", "https://", "ftp://"];

const DEFAULT_SCHEME: &str = "http://";

// ─── Types ───────────────────────────────────────────────────────────────────

/// A source supporting a fact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
  #[serde(default)]
  pub id:        i64,
  pub url:       String,
  pub title:     String,
  pub publisher: String,
}

/// One account's vote on one fact. At most one exists per (fact, account).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
  pub id:         i64,
  pub fact_id:    FactId,
  pub account_id: AccountId,
  /// Net score; each vote action moves it by one.
  pub score:      i64,
  /// Optimistic-concurrency version, managed by the store.
  #[serde(skip)]
  pub version:    i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
  pub id:                  FactId,
  /// The creator.
  pub account_id:          AccountId,
  pub statement:           String,
  pub explain:             String,
  pub explain_further:     String,
  pub awaiting_moderation: bool,
  pub references:          Vec<Reference>,
  pub votes:               Vec<Vote>,
  pub created_at:          Option<DateTime<Utc>>,
  pub deleted_at:          Option<DateTime<Utc>>,
}

/// Aggregated votes on a fact, as seen by one viewer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteScore {
  pub ups:          i64,
  pub downs:        i64,
  /// The viewer's own net vote; `0` when they have not voted.
  pub account_vote: i64,
}

impl Fact {
  /// Sum positive scores into `ups` and the magnitude of the rest into
  /// `downs`, and pick out the viewer's own vote.
  pub fn score(&self, viewer: AccountId) -> VoteScore {
    self.votes.iter().fold(VoteScore::default(), |mut acc, vote| {
      if vote.account_id == viewer {
        acc.account_vote = vote.score;
      }
      if vote.score > 0 {
        acc.ups += vote.score;
      } else {
        acc.downs -= vote.score;
      }
      acc
    })
  }

  /// Moderation gate: a pending fact is visible only to its creator and to
  /// admins.
  pub fn is_visible_to(&self, viewer: Option<&Account>) -> bool {
    if !self.awaiting_moderation {
      return true;
    }
    viewer.is_some_and(|account| account.admin || account.id == self.account_id)
  }

  pub fn can_be_deleted_by(&self, account: &Account) -> bool {
    account.admin || account.id == self.account_id
  }
}

// ─── Creation ────────────────────────────────────────────────────────────────

/// Input to [`create_fact`]. Reference ids are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewFact {
  #[serde(default)]
  pub account_id:      AccountId,
  pub statement:       String,
  pub explain:         String,
  pub explain_further: String,
  pub references:      Vec<Reference>,
}

impl NewFact {
  /// Check required fields and references, in that order.
  pub fn validate(&self) -> Result<()> {
    if self.statement.is_empty()
      || self.explain.is_empty()
      || self.explain_further.is_empty()
    {
      return Err(Error::MissingRequiredFields);
    }

    if self.references.len() < MIN_REFERENCES {
      return Err(Error::NotEnoughReferences);
    }

    if self
      .references
      .iter()
      .any(|r| r.url.is_empty() || r.title.is_empty() || r.publisher.is_empty())
    {
      return Err(Error::MissingRequiredFields);
    }

    if self.account_id == 0 {
      return Err(Error::NoAccountSpecified);
    }

    Ok(())
  }
}

/// Prefix `http://` unless the URL already starts with a known scheme.
pub fn normalize_url(url: &str) -> String {
  if KNOWN_SCHEMES.iter().any(|scheme| url.starts_with(scheme)) {
    url.to_owned()
  } else {
    format!("{DEFAULT_SCHEME}{url}")
  }
}

/// Validate and persist a new fact. The fact always starts out awaiting
/// moderation.
pub async fn create_fact<S: FactStore>(store: &S, input: NewFact) -> Result<Fact> {
  input.validate()?;

  let references = input
    .references
    .into_iter()
    .map(|r| Reference { id: 0, url: normalize_url(&r.url), ..r })
    .collect();

  let mut fact = Fact {
    id: 0,
    account_id: input.account_id,
    statement: input.statement,
    explain: input.explain,
    explain_further: input.explain_further,
    awaiting_moderation: true,
    references,
    votes: Vec::new(),
    created_at: None,
    deleted_at: None,
  };

  store.create_fact(&mut fact).await.map_err(Error::storage)?;
  tracing::info!(fact_id = fact.id, account_id = fact.account_id, "fact submitted");
  Ok(fact)
}

// ─── Votes ───────────────────────────────────────────────────────────────────

/// Move `account_id`'s vote on `fact_id` one step up or down.
///
/// This does not touch the vote bank; callers run
/// [`Account::update_vote_bank`] first.
pub async fn vote_for_fact<S: FactStore>(
  store: &S,
  account_id: AccountId,
  fact_id: FactId,
  up: bool,
) -> Result<Vote> {
  let mut vote = store
    .get_or_create_vote(account_id, fact_id)
    .await
    .map_err(Error::storage)?;

  vote.score += if up { 1 } else { -1 };
  store.save_vote(&mut vote).await.map_err(Error::storage)?;
  Ok(vote)
}

/// Result of [`cast_vote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteOutcome {
  pub fact_id:   FactId,
  pub score:     VoteScore,
  pub vote_bank: u32,
}

/// The whole vote action: settle the bank against the account's prior vote,
/// move the vote, then report the fact's fresh score.
///
/// If the vote cannot be recorded, the bank movement is reversed in storage
/// before the error is returned.
pub async fn cast_vote<S>(
  store: &S,
  account: &mut Account,
  fact: &Fact,
  up: bool,
) -> Result<VoteOutcome>
where
  S: AccountStore + FactStore,
{
  let prior = fact.score(account.id).account_vote;
  account.update_vote_bank(store, up, prior).await?;

  if let Err(e) = vote_for_fact(store, account.id, fact.id, up).await {
    let movement = BankMovement::for_action(up, prior);
    if let Err(undo) = account.undo_bank_movement(store, movement).await {
      tracing::error!(
        account_id = account.id,
        fact_id = fact.id,
        error = %undo,
        "failed to reverse vote bank after a failed vote"
      );
    }
    return Err(e);
  }

  let refreshed = store
    .load_fact(fact.id)
    .await
    .map_err(Error::storage)?
    .ok_or(Error::FactNotFound(fact.id))?;

  Ok(VoteOutcome {
    fact_id:   fact.id,
    score:     refreshed.score(account.id),
    vote_bank: account.vote_bank,
  })
}

// ─── Moderation & deletion ───────────────────────────────────────────────────

/// Set or clear the awaiting-moderation flag. Callers restrict this to admins.
pub async fn moderate_fact<S: FactStore>(
  store: &S,
  fact: &mut Fact,
  awaiting_moderation: bool,
) -> Result<()> {
  store
    .set_moderation(fact.id, awaiting_moderation)
    .await
    .map_err(Error::storage)?;
  fact.awaiting_moderation = awaiting_moderation;
  tracing::info!(fact_id = fact.id, awaiting_moderation, "fact moderated");
  Ok(())
}

/// Soft-delete a fact. Callers check [`Fact::can_be_deleted_by`].
pub async fn delete_fact<S: FactStore>(store: &S, fact: &Fact) -> Result<()> {
  store.delete_fact(fact.id).await.map_err(Error::storage)?;
  tracing::info!(fact_id = fact.id, "fact deleted");
  Ok(())
}
