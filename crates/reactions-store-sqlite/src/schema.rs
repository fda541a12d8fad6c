//! SQL schema for the reaction SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per item that has at least one vote.
-- Counters always equal the per-reaction row counts in `votes`.
CREATE TABLE IF NOT EXISTS items (
    item_id       INTEGER PRIMARY KEY CHECK (item_id > 0),
    like_count    INTEGER NOT NULL DEFAULT 0 CHECK (like_count >= 0),
    dislike_count INTEGER NOT NULL DEFAULT 0 CHECK (dislike_count >= 0)
);

-- The vote ledger. Rows are never updated; the primary key is the
-- one-vote-per-(voter, item) guarantee.
CREATE TABLE IF NOT EXISTS votes (
    voter_id  TEXT    NOT NULL,
    item_id   INTEGER NOT NULL REFERENCES items(item_id) ON DELETE CASCADE,
    reaction  TEXT    NOT NULL CHECK (reaction IN ('like', 'dislike')),
    voted_at  TEXT    NOT NULL,   -- ISO 8601 UTC; server-assigned
    PRIMARY KEY (voter_id, item_id)
);

CREATE INDEX IF NOT EXISTS votes_item_idx ON votes(item_id);

PRAGMA user_version = 1;
";
