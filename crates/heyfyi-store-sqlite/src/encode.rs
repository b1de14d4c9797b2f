//! Conversions between domain types and the plain values stored in SQLite
//! columns.
//!
//! Timestamps are stored as RFC 3339 strings. Rows are first read into `Raw*`
//! structs inside the database thread and decoded afterwards, so parse
//! failures surface as this crate's [`Error`] rather than as SQLite errors.

use chrono::{DateTime, Utc};
use heyfyi_core::{
  account::Account,
  fact::{Fact, Reference, Vote},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Accounts ────────────────────────────────────────────────────────────────

/// Column list matching the field order of [`RawAccount::from_row`].
pub const ACCOUNT_COLUMNS: &str = "id, email, nickname, password_hash, \
  verification_code, reset_code, session_token, session_expires, vote_bank, \
  admin, created_at, updated_at, deleted_at, version";

/// An `accounts` row with its timestamps still encoded.
pub struct RawAccount {
  pub id:                i64,
  pub email:             String,
  pub nickname:          String,
  pub password_hash:     String,
  pub verification_code: Option<String>,
  pub reset_code:        Option<String>,
  pub session_token:     Option<String>,
  pub session_expires:   Option<String>,
  pub vote_bank:         u32,
  pub admin:             bool,
  pub created_at:        String,
  pub updated_at:        Option<String>,
  pub deleted_at:        Option<String>,
  pub version:           i64,
}

impl RawAccount {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                row.get(0)?,
      email:             row.get(1)?,
      nickname:          row.get(2)?,
      password_hash:     row.get(3)?,
      verification_code: row.get(4)?,
      reset_code:        row.get(5)?,
      session_token:     row.get(6)?,
      session_expires:   row.get(7)?,
      vote_bank:         row.get(8)?,
      admin:             row.get(9)?,
      created_at:        row.get(10)?,
      updated_at:        row.get(11)?,
      deleted_at:        row.get(12)?,
      version:           row.get(13)?,
    })
  }

  pub fn into_account(self) -> Result<Account> {
    Ok(Account {
      id:                self.id,
      email:             self.email,
      nickname:          self.nickname,
      password_hash:     self.password_hash,
      verification_code: self.verification_code,
      reset_code:        self.reset_code,
      session_token:     self.session_token,
      session_expires:   decode_opt_dt(self.session_expires)?,
      vote_bank:         self.vote_bank,
      admin:             self.admin,
      created_at:        Some(decode_dt(&self.created_at)?),
      updated_at:        decode_opt_dt(self.updated_at)?,
      deleted_at:        decode_opt_dt(self.deleted_at)?,
      version:           self.version,
    })
  }
}

// ─── Facts ───────────────────────────────────────────────────────────────────

pub const FACT_COLUMNS: &str = "id, account_id, statement, explain, \
  explain_further, awaiting_moderation, created_at, deleted_at";

/// A `facts` row plus its child rows, with timestamps still encoded.
pub struct RawFact {
  pub id:                  i64,
  pub account_id:          i64,
  pub statement:           String,
  pub explain:             String,
  pub explain_further:     String,
  pub awaiting_moderation: bool,
  pub created_at:          String,
  pub deleted_at:          Option<String>,
  pub references:          Vec<Reference>,
  pub votes:               Vec<Vote>,
}

impl RawFact {
  /// Read the `facts` columns; children are filled in by
  /// [`RawFact::load_children`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                  row.get(0)?,
      account_id:          row.get(1)?,
      statement:           row.get(2)?,
      explain:             row.get(3)?,
      explain_further:     row.get(4)?,
      awaiting_moderation: row.get(5)?,
      created_at:          row.get(6)?,
      deleted_at:          row.get(7)?,
      references:          Vec::new(),
      votes:               Vec::new(),
    })
  }

  pub fn load_children(&mut self, conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(
      "SELECT id, url, title, publisher FROM fact_references
       WHERE fact_id = ?1 ORDER BY id",
    )?;
    self.references = stmt
      .query_map([self.id], |row| {
        Ok(Reference {
          id:        row.get(0)?,
          url:       row.get(1)?,
          title:     row.get(2)?,
          publisher: row.get(3)?,
        })
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare_cached(&format!(
      "SELECT {VOTE_COLUMNS} FROM votes WHERE fact_id = ?1 ORDER BY id"
    ))?;
    self.votes = stmt
      .query_map([self.id], vote_from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(())
  }

  pub fn into_fact(self) -> Result<Fact> {
    Ok(Fact {
      id:                  self.id,
      account_id:          self.account_id,
      statement:           self.statement,
      explain:             self.explain,
      explain_further:     self.explain_further,
      awaiting_moderation: self.awaiting_moderation,
      references:          self.references,
      votes:               self.votes,
      created_at:          Some(decode_dt(&self.created_at)?),
      deleted_at:          decode_opt_dt(self.deleted_at)?,
    })
  }
}

// ─── Votes ───────────────────────────────────────────────────────────────────

pub const VOTE_COLUMNS: &str = "id, fact_id, account_id, score, version";

pub fn vote_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Vote> {
  Ok(Vote {
    id:         row.get(0)?,
    fact_id:    row.get(1)?,
    account_id: row.get(2)?,
    score:      row.get(3)?,
    version:    row.get(4)?,
  })
}
