//! SQL schema for the hey.fyi SQLite store.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS accounts (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    email             TEXT    NOT NULL,
    nickname          TEXT    NOT NULL,
    password_hash     TEXT    NOT NULL,
    verification_code TEXT,               -- NULL once verified
    reset_code        TEXT,               -- NULL unless a reset is pending
    session_token     TEXT,
    session_expires   TEXT,               -- RFC 3339 UTC
    vote_bank         INTEGER NOT NULL DEFAULT 10,
    admin             INTEGER NOT NULL DEFAULT 0,
    created_at        TEXT    NOT NULL,
    updated_at        TEXT,
    deleted_at        TEXT,
    version           INTEGER NOT NULL DEFAULT 1
);

-- Only live accounts compete for an email address.
CREATE UNIQUE INDEX IF NOT EXISTS accounts_email_live_idx
    ON accounts(email) WHERE deleted_at IS NULL;
CREATE INDEX IF NOT EXISTS accounts_session_idx ON accounts(session_token);

CREATE TABLE IF NOT EXISTS facts (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id          INTEGER NOT NULL REFERENCES accounts(id),
    statement           TEXT    NOT NULL,
    explain             TEXT    NOT NULL,
    explain_further     TEXT    NOT NULL,
    awaiting_moderation INTEGER NOT NULL DEFAULT 1,
    created_at          TEXT    NOT NULL,
    deleted_at          TEXT
);

CREATE TABLE IF NOT EXISTS fact_references (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    fact_id   INTEGER NOT NULL REFERENCES facts(id),
    url       TEXT    NOT NULL,
    title     TEXT    NOT NULL,
    publisher TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS votes (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    fact_id    INTEGER NOT NULL REFERENCES facts(id),
    account_id INTEGER NOT NULL REFERENCES accounts(id),
    score      INTEGER NOT NULL DEFAULT 0,
    version    INTEGER NOT NULL DEFAULT 1,
    UNIQUE (fact_id, account_id)
);

CREATE INDEX IF NOT EXISTS references_fact_idx ON fact_references(fact_id);
CREATE INDEX IF NOT EXISTS votes_fact_idx      ON votes(fact_id);

PRAGMA user_version = 1;
";
