//! [`SqliteStore`] — the SQLite implementation of [`VoteStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use reactions_core::{
  StoreError,
  reaction::{ItemId, ItemTally, ReactionKind, Tally, VoterId},
  store::{EraseFilter, VoteStore},
};

use crate::{
  Result,
  encode::{RawTally, counter_column, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A vote store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. Every
/// operation is one closure on the connection thread, and writes run inside a
/// single transaction, so a dropped request future can never leave a vote
/// without its counter increment.
///
/// That single connection thread also serialises all votes, including votes
/// on unrelated items. Per-item independence is only provided by
/// [`MemoryStore`](reactions_core::memory::MemoryStore).
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

  /// Open an in-memory store — useful for testing.
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

  async fn has_voted_inner(&self, voter_id: &VoterId, item_id: ItemId) -> Result<bool> {
    let voter_str = voter_id.as_str().to_owned();
    let item_int = item_id.as_i64();

    let found = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM votes WHERE voter_id = ?1 AND item_id = ?2",
              rusqlite::params![voter_str, item_int],
              |_| Ok(()),
            )
            .optional()?
            .is_some(),
        )
      })
      .await?;
    Ok(found)
  }

  /// Returns `None` when the pair already had a vote.
  async fn record_vote_inner(
    &self,
    voter_id: &VoterId,
    item_id:  ItemId,
    reaction: ReactionKind,
  ) -> Result<Option<Tally>> {
    let voter_str    = voter_id.as_str().to_owned();
    let item_int     = item_id.as_i64();
    let reaction_str = reaction.as_str();
    let at_str       = encode_dt(Utc::now());
    let bump_sql     = format!(
      "UPDATE items SET {col} = {col} + 1 WHERE item_id = ?1",
      col = counter_column(reaction)
    );

    let raw: Option<RawTally> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        tx.execute(
          "INSERT INTO items (item_id) VALUES (?1) ON CONFLICT (item_id) DO NOTHING",
          rusqlite::params![item_int],
        )?;

        let inserted = tx.execute(
          "INSERT INTO votes (voter_id, item_id, reaction, voted_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (voter_id, item_id) DO NOTHING",
          rusqlite::params![voter_str, item_int, reaction_str, at_str],
        )?;

        if inserted == 0 {
          // Dropping `tx` rolls back the speculative items row as well.
          return Ok(None);
        }

        tx.execute(&bump_sql, rusqlite::params![item_int])?;
        let raw = tx.query_row(
          "SELECT item_id, like_count, dislike_count FROM items WHERE item_id = ?1",
          rusqlite::params![item_int],
          RawTally::from_row,
        )?;

        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawTally::into_tally).transpose()
  }

  async fn get_counts_inner(&self, item_id: ItemId) -> Result<Tally> {
    let item_int = item_id.as_i64();

    let raw: Option<RawTally> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT item_id, like_count, dislike_count FROM items WHERE item_id = ?1",
              rusqlite::params![item_int],
              RawTally::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    Ok(raw.map(RawTally::into_tally).transpose()?.unwrap_or_default())
  }

  async fn bulk_erase_inner(&self, filter: EraseFilter) -> Result<usize> {
    // Each id list is bound as a single JSON array parameter, so the number of
    // SQL variables stays fixed however many ids are selected.
    let mut conds: Vec<String> = vec![];
    let mut values: Vec<String> = vec![];

    if let Some(items) = &filter.item_ids {
      let ids: Vec<i64> = items.iter().map(|id| id.as_i64()).collect();
      values.push(serde_json::to_string(&ids)?);
      conds.push(in_json_array("item_id", values.len()));
    }
    if let Some(voters) = &filter.voter_ids {
      let ids: Vec<&str> = voters.iter().map(VoterId::as_str).collect();
      values.push(serde_json::to_string(&ids)?);
      conds.push(in_json_array("voter_id", values.len()));
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };

    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let removed = tx.execute(
          &format!("DELETE FROM votes {where_clause}"),
          rusqlite::params_from_iter(values.iter()),
        )?;

        tx.execute_batch(
          "UPDATE items SET
             like_count    = (SELECT COUNT(*) FROM votes v
                              WHERE v.item_id = items.item_id AND v.reaction = 'like'),
             dislike_count = (SELECT COUNT(*) FROM votes v
                              WHERE v.item_id = items.item_id AND v.reaction = 'dislike');
           DELETE FROM items WHERE like_count = 0 AND dislike_count = 0;",
        )?;

        tx.commit()?;
        Ok(removed)
      })
      .await?;

    Ok(removed)
  }

  async fn list_tallies_inner(&self, limit: usize) -> Result<Vec<ItemTally>> {
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawTally> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT item_id, like_count, dislike_count
           FROM items
           ORDER BY like_count + dislike_count DESC, item_id ASC
           LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit_val], RawTally::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTally::into_item_tally).collect()
  }
}

/// `column IN (...)` over the JSON array bound at placeholder `?n`.
/// An empty array matches nothing.
fn in_json_array(column: &str, n: usize) -> String {
  format!("{column} IN (SELECT value FROM json_each(?{n}))")
}

// ─── VoteStore impl ──────────────────────────────────────────────────────────

impl VoteStore for SqliteStore {
  async fn has_voted(&self, voter_id: &VoterId, item_id: ItemId) -> Result<bool, StoreError> {
    Ok(self.has_voted_inner(voter_id, item_id).await?)
  }

  async fn record_vote(
    &self,
    voter_id: &VoterId,
    item_id:  ItemId,
    reaction: ReactionKind,
  ) -> Result<Tally, StoreError> {
    self
      .record_vote_inner(voter_id, item_id, reaction)
      .await?
      .ok_or(StoreError::AlreadyVoted)
  }

  async fn get_counts(&self, item_id: ItemId) -> Result<Tally, StoreError> {
    Ok(self.get_counts_inner(item_id).await?)
  }

  async fn bulk_erase(&self, filter: EraseFilter) -> Result<usize, StoreError> {
    let removed = self.bulk_erase_inner(filter).await?;
    tracing::debug!(removed, "sqlite ledger rows erased");
    Ok(removed)
  }

  async fn list_tallies(&self, limit: usize) -> Result<Vec<ItemTally>, StoreError> {
    Ok(self.list_tallies_inner(limit).await?)
  }
}
