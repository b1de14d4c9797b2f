//! In-memory test doubles for the storage and mailer traits.

use std::{
  collections::BTreeMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
  },
};

use chrono::Utc;

use crate::{
  account::{Account, AccountId, INITIAL_VOTE_BANK},
  credential::hash_password,
  fact::{Fact, FactId, Vote},
  notify::{Mailer, Notifier},
  store::{
    AccountStore, Backend, Entity, FactStore, ListScope, StaleWrite, VoteGrant,
  },
};

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
  #[error("simulated backend failure")]
  Unavailable,
  #[error("stale write: {0}")]
  Stale(#[from] StaleWrite),
  #[error("no such record")]
  Missing,
}

#[derive(Default)]
struct Inner {
  accounts: BTreeMap<AccountId, Account>,
  facts:    BTreeMap<FactId, Fact>,
  votes:    Vec<Vote>,
  next_id:  i64,
}

impl Inner {
  fn next_id(&mut self) -> i64 {
    self.next_id += 1;
    self.next_id
  }

  fn with_votes(&self, fact: &Fact) -> Fact {
    let mut fact = fact.clone();
    fact.votes = self
      .votes
      .iter()
      .filter(|v| v.fact_id == fact.id)
      .cloned()
      .collect();
    fact
  }
}

/// A single-process store with optimistic versioning and failure injection.
#[derive(Default)]
pub struct MemoryStore {
  inner:              Mutex<Inner>,
  fail_email_lookups: AtomicBool,
  fail_vote_saves:    AtomicBool,
}

impl MemoryStore {
  pub fn with_account(account: Account) -> Self {
    let store = Self::default();
    {
      let mut inner = store.inner.lock().unwrap();
      let id = account.id;
      inner.next_id = inner.next_id.max(id);
      inner.accounts.insert(id, account);
    }
    store
  }

  /// Make every load-by-email fail with something other than "not found".
  pub fn fail_email_lookups(&self) {
    self.fail_email_lookups.store(true, Ordering::SeqCst);
  }

  /// Make every vote save fail.
  pub fn fail_vote_saves(&self) { self.fail_vote_saves.store(true, Ordering::SeqCst); }

  pub fn account(&self, id: AccountId) -> Option<Account> {
    self.inner.lock().unwrap().accounts.get(&id).cloned()
  }

  pub fn fact(&self, id: FactId) -> Option<Fact> {
    let inner = self.inner.lock().unwrap();
    inner
      .facts
      .get(&id)
      .filter(|f| f.deleted_at.is_none())
      .map(|f| inner.with_votes(f))
  }

  pub fn facts(&self) -> Vec<Fact> {
    self.inner.lock().unwrap().facts.values().cloned().collect()
  }

  pub fn votes(&self) -> Vec<Vote> { self.inner.lock().unwrap().votes.clone() }
}

/// An already-verified admin account with id 1 and ten votes.
pub fn verified_account(email: &str, password: &str) -> Account {
  Account {
    id: 1,
    email: email.into(),
    nickname: "Test account".into(),
    password_hash: hash_password(password).unwrap(),
    admin: true,
    vote_bank: INITIAL_VOTE_BANK,
    ..Account::default()
  }
}

impl Backend for MemoryStore {
  type Error = MemoryError;
}

impl AccountStore for MemoryStore {
  async fn load_account_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> Result<Option<Account>, MemoryError> {
    if self.fail_email_lookups.load(Ordering::SeqCst) {
      return Err(MemoryError::Unavailable);
    }
    let inner = self.inner.lock().unwrap();
    Ok(inner.accounts.values().find(|a| a.email == email).cloned())
  }

  async fn load_account_by_id(&self, id: AccountId) -> Result<Option<Account>, MemoryError> {
    Ok(self.account(id))
  }

  async fn load_account_by_session<'a>(
    &'a self,
    token: &'a str,
  ) -> Result<Option<Account>, MemoryError> {
    let now = Utc::now();
    let inner = self.inner.lock().unwrap();
    Ok(
      inner
        .accounts
        .values()
        .find(|a| a.has_live_session(token, now))
        .cloned(),
    )
  }

  async fn create_account<'a>(&'a self, account: &'a mut Account) -> Result<(), MemoryError> {
    let mut inner = self.inner.lock().unwrap();
    account.id = inner.next_id();
    account.version = 1;
    account.created_at = Some(Utc::now());
    inner.accounts.insert(account.id, account.clone());
    Ok(())
  }

  async fn save_account<'a>(&'a self, account: &'a mut Account) -> Result<(), MemoryError> {
    let mut inner = self.inner.lock().unwrap();
    let stored = inner.accounts.get_mut(&account.id).ok_or(MemoryError::Missing)?;
    if stored.version != account.version {
      return Err(
        StaleWrite {
          entity:           Entity::Account(account.id),
          expected_version: account.version,
        }
        .into(),
      );
    }
    account.version += 1;
    *stored = account.clone();
    Ok(())
  }
}

impl FactStore for MemoryStore {
  async fn list_facts(&self, scope: ListScope) -> Result<Vec<Fact>, MemoryError> {
    let inner = self.inner.lock().unwrap();
    Ok(
      inner
        .facts
        .values()
        .rev()
        .filter(|f| f.deleted_at.is_none() && scope.includes(f))
        .map(|f| inner.with_votes(f))
        .collect(),
    )
  }

  async fn load_fact(&self, id: FactId) -> Result<Option<Fact>, MemoryError> {
    Ok(self.fact(id))
  }

  async fn create_fact<'a>(&'a self, fact: &'a mut Fact) -> Result<(), MemoryError> {
    let mut inner = self.inner.lock().unwrap();
    fact.id = inner.next_id();
    fact.created_at = Some(Utc::now());
    for reference in &mut fact.references {
      reference.id = inner.next_id();
    }
    inner.facts.insert(fact.id, fact.clone());
    Ok(())
  }

  async fn delete_fact(&self, id: FactId) -> Result<(), MemoryError> {
    let mut inner = self.inner.lock().unwrap();
    let fact = inner.facts.get_mut(&id).ok_or(MemoryError::Missing)?;
    fact.deleted_at = Some(Utc::now());
    Ok(())
  }

  async fn get_or_create_vote(
    &self,
    account_id: AccountId,
    fact_id: FactId,
  ) -> Result<Vote, MemoryError> {
    let mut inner = self.inner.lock().unwrap();
    if let Some(vote) = inner
      .votes
      .iter()
      .find(|v| v.account_id == account_id && v.fact_id == fact_id)
    {
      return Ok(vote.clone());
    }
    let vote = Vote { id: inner.next_id(), fact_id, account_id, score: 0, version: 1 };
    inner.votes.push(vote.clone());
    Ok(vote)
  }

  async fn save_vote<'a>(&'a self, vote: &'a mut Vote) -> Result<(), MemoryError> {
    if self.fail_vote_saves.load(Ordering::SeqCst) {
      return Err(MemoryError::Unavailable);
    }
    let mut inner = self.inner.lock().unwrap();
    let stored = inner
      .votes
      .iter_mut()
      .find(|v| v.id == vote.id)
      .ok_or(MemoryError::Missing)?;
    if stored.version != vote.version {
      return Err(
        StaleWrite {
          entity:           Entity::Vote {
            account_id: vote.account_id,
            fact_id:    vote.fact_id,
          },
          expected_version: vote.version,
        }
        .into(),
      );
    }
    vote.version += 1;
    *stored = vote.clone();
    Ok(())
  }

  async fn set_moderation(&self, id: FactId, awaiting_moderation: bool) -> Result<(), MemoryError> {
    let mut inner = self.inner.lock().unwrap();
    let fact = inner.facts.get_mut(&id).ok_or(MemoryError::Missing)?;
    fact.awaiting_moderation = awaiting_moderation;
    Ok(())
  }
}

impl VoteGrant for MemoryStore {
  async fn grant_vote_to_all_accounts(&self) -> Result<u64, MemoryError> {
    let mut inner = self.inner.lock().unwrap();
    let mut touched = 0;
    for account in inner.accounts.values_mut().filter(|a| a.deleted_at.is_none()) {
      account.vote_bank += 1;
      account.version += 1;
      touched += 1;
    }
    Ok(touched)
  }
}

// ─── Mailer ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SentEmail {
  pub to:      String,
  pub subject: String,
  pub body:    String,
}

#[derive(Debug, thiserror::Error)]
#[error("simulated mail failure")]
pub struct MailFailure;

/// Records every email instead of sending it; optionally fails every send.
#[derive(Clone, Default)]
pub struct RecordingMailer {
  sent: Arc<Mutex<Vec<SentEmail>>>,
  fail: bool,
}

impl RecordingMailer {
  pub fn failing() -> Self { Self { fail: true, ..Self::default() } }

  pub fn sent(&self) -> Vec<SentEmail> { self.sent.lock().unwrap().clone() }
}

impl Mailer for RecordingMailer {
  type Error = MailFailure;

  async fn send_email<'a>(
    &'a self,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
  ) -> Result<(), MailFailure> {
    if self.fail {
      return Err(MailFailure);
    }
    self.sent.lock().unwrap().push(SentEmail {
      to:      to.into(),
      subject: subject.into(),
      body:    body.into(),
    });
    Ok(())
  }
}

pub fn notifier(mailer: RecordingMailer) -> Notifier<RecordingMailer> {
  Notifier::new(mailer, "http://hey.test")
}
