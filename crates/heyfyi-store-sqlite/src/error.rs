//! Error type for `heyfyi-store-sqlite`.

use heyfyi_core::{fact::FactId, store::StaleWrite};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A conditional update matched no row at the version that was read.
  #[error("stale write: {0}")]
  Stale(#[from] StaleWrite),

  #[error("fact not found: {0}")]
  FactNotFound(FactId),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
