//! [`SqliteStore`]: the SQLite implementation of the hey.fyi storage traits.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use heyfyi_core::{
  account::{Account, AccountId},
  fact::{Fact, FactId, Vote},
  store::{
    AccountStore, Backend, Entity, FactStore, ListScope, StaleWrite, VoteGrant,
  },
};

use crate::{
  Error, Result,
  encode::{
    ACCOUNT_COLUMNS, FACT_COLUMNS, RawAccount, RawFact, VOTE_COLUMNS, encode_dt,
    vote_from_row,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A hey.fyi store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Fetch at most one live account matching `filter`, whose single
  /// parameter is `arg`.
  async fn load_account_where(
    &self,
    filter: &'static str,
    arg: rusqlite::types::Value,
  ) -> Result<Option<Account>> {
    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {ACCOUNT_COLUMNS} FROM accounts
           WHERE {filter} = ?1 AND deleted_at IS NULL"
        );
        Ok(
          conn
            .query_row(&sql, [arg], RawAccount::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }
}

impl Backend for SqliteStore {
  type Error = Error;
}

// ─── Accounts ────────────────────────────────────────────────────────────────

impl AccountStore for SqliteStore {
  async fn load_account_by_email<'a>(&'a self, email: &'a str) -> Result<Option<Account>> {
    self
      .load_account_where("email", email.to_owned().into())
      .await
  }

  async fn load_account_by_id(&self, id: AccountId) -> Result<Option<Account>> {
    self.load_account_where("id", id.into()).await
  }

  async fn load_account_by_session<'a>(
    &'a self,
    token: &'a str,
  ) -> Result<Option<Account>> {
    let account = self
      .load_account_where("session_token", token.to_owned().into())
      .await?;
    let now = Utc::now();
    Ok(account.filter(|a| a.has_live_session(token, now)))
  }

  async fn create_account<'a>(&'a self, account: &'a mut Account) -> Result<()> {
    let created_at = Utc::now();
    let created_str = encode_dt(created_at);
    let row = account.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO accounts (
             email, nickname, password_hash, verification_code, reset_code,
             session_token, session_expires, vote_bank, admin, created_at,
             version
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1)",
          rusqlite::params![
            row.email,
            row.nickname,
            row.password_hash,
            row.verification_code,
            row.reset_code,
            row.session_token,
            row.session_expires.map(encode_dt),
            row.vote_bank,
            row.admin,
            created_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    account.id = id;
    account.version = 1;
    account.created_at = Some(created_at);
    Ok(())
  }

  async fn save_account<'a>(&'a self, account: &'a mut Account) -> Result<()> {
    let updated_at = Utc::now();
    let updated_str = encode_dt(updated_at);
    let row = account.clone();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE accounts SET
             email = ?1, nickname = ?2, password_hash = ?3,
             verification_code = ?4, reset_code = ?5, session_token = ?6,
             session_expires = ?7, vote_bank = ?8, admin = ?9,
             updated_at = ?10, version = version + 1
           WHERE id = ?11 AND version = ?12 AND deleted_at IS NULL",
          rusqlite::params![
            row.email,
            row.nickname,
            row.password_hash,
            row.verification_code,
            row.reset_code,
            row.session_token,
            row.session_expires.map(encode_dt),
            row.vote_bank,
            row.admin,
            updated_str,
            row.id,
            row.version,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(
        StaleWrite {
          entity:           Entity::Account(account.id),
          expected_version: account.version,
        }
        .into(),
      );
    }

    account.version += 1;
    account.updated_at = Some(updated_at);
    Ok(())
  }
}

// ─── Facts & votes ───────────────────────────────────────────────────────────

impl FactStore for SqliteStore {
  async fn list_facts(&self, scope: ListScope) -> Result<Vec<Fact>> {
    let (everything, viewer) = match scope {
      ListScope::All => (true, None),
      ListScope::Public { viewer } => (false, viewer),
    };

    let raws: Vec<RawFact> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {FACT_COLUMNS} FROM facts
           WHERE deleted_at IS NULL
             AND (?1 OR awaiting_moderation = 0 OR account_id = ?2)
           ORDER BY id DESC"
        ))?;
        let mut raws = stmt
          .query_map(rusqlite::params![everything, viewer], RawFact::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        for raw in &mut raws {
          raw.load_children(conn)?;
        }
        Ok(raws)
      })
      .await?;

    raws.into_iter().map(RawFact::into_fact).collect()
  }

  async fn load_fact(&self, id: FactId) -> Result<Option<Fact>> {
    let raw: Option<RawFact> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &format!(
              "SELECT {FACT_COLUMNS} FROM facts
               WHERE id = ?1 AND deleted_at IS NULL"
            ),
            [id],
            RawFact::from_row,
          )
          .optional()?;
        let Some(mut raw) = raw else { return Ok(None) };
        raw.load_children(conn)?;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawFact::into_fact).transpose()
  }

  async fn create_fact<'a>(&'a self, fact: &'a mut Fact) -> Result<()> {
    let created_at = Utc::now();
    let created_str = encode_dt(created_at);
    let row = fact.clone();

    let (fact_id, reference_ids) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO facts (
             account_id, statement, explain, explain_further,
             awaiting_moderation, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            row.account_id,
            row.statement,
            row.explain,
            row.explain_further,
            row.awaiting_moderation,
            created_str,
          ],
        )?;
        let fact_id = tx.last_insert_rowid();

        let mut reference_ids = Vec::with_capacity(row.references.len());
        for reference in &row.references {
          tx.execute(
            "INSERT INTO fact_references (fact_id, url, title, publisher)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
              fact_id,
              reference.url,
              reference.title,
              reference.publisher,
            ],
          )?;
          reference_ids.push(tx.last_insert_rowid());
        }

        tx.commit()?;
        Ok((fact_id, reference_ids))
      })
      .await?;

    fact.id = fact_id;
    fact.created_at = Some(created_at);
    for (reference, id) in fact.references.iter_mut().zip(reference_ids) {
      reference.id = id;
    }
    Ok(())
  }

  async fn delete_fact(&self, id: FactId) -> Result<()> {
    let deleted_str = encode_dt(Utc::now());
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE facts SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
          rusqlite::params![deleted_str, id],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::FactNotFound(id));
    }
    Ok(())
  }

  async fn get_or_create_vote(&self, account_id: AccountId, fact_id: FactId) -> Result<Vote> {
    let vote = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO votes (fact_id, account_id, score, version)
           VALUES (?1, ?2, 0, 1)",
          rusqlite::params![fact_id, account_id],
        )?;
        Ok(conn.query_row(
          &format!(
            "SELECT {VOTE_COLUMNS} FROM votes WHERE fact_id = ?1 AND account_id = ?2"
          ),
          rusqlite::params![fact_id, account_id],
          vote_from_row,
        )?)
      })
      .await?;
    Ok(vote)
  }

  async fn save_vote<'a>(&'a self, vote: &'a mut Vote) -> Result<()> {
    let (id, score, version) = (vote.id, vote.score, vote.version);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE votes SET score = ?1, version = version + 1
           WHERE id = ?2 AND version = ?3",
          rusqlite::params![score, id, version],
        )?)
      })
      .await?;

    if changed == 0 {
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
    Ok(())
  }

  async fn set_moderation(&self, id: FactId, awaiting_moderation: bool) -> Result<()> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE facts SET awaiting_moderation = ?1
           WHERE id = ?2 AND deleted_at IS NULL",
          rusqlite::params![awaiting_moderation, id],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::FactNotFound(id));
    }
    Ok(())
  }
}

// ─── Replenishment ───────────────────────────────────────────────────────────

impl VoteGrant for SqliteStore {
  async fn grant_vote_to_all_accounts(&self) -> Result<u64> {
    let changed = self
      .conn
      .call(|conn| {
        Ok(conn.execute(
          "UPDATE accounts SET vote_bank = vote_bank + 1, version = version + 1
           WHERE deleted_at IS NULL",
          [],
        )?)
      })
      .await?;

    tracing::debug!(accounts = changed, "granted one vote to every account");
    Ok(changed as u64)
  }
}
