//! [`ReactionService`] — business rules on top of a [`VoteStore`].
//!
//! This is the only entry point that mutates reaction state. It validates raw
//! input, enforces the [`Mode`] passed in for the call, and turns a duplicate
//! vote into a typed [`VoteResult`] instead of an error. Nothing is retried.

use serde::Serialize;
use tracing::{debug, error, info};

use crate::{
  error::{ReactionError, StoreError},
  reaction::{ItemId, ItemTally, Mode, ReactionKind, Tally, VoterId},
  store::{EraseFilter, VoteStore},
};

/// Outcome of [`ReactionService::cast_vote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteResult {
  /// The vote was recorded; carries the post-increment tally.
  Voted(Tally),
  /// The voter had already reacted; carries the current, unchanged tally.
  AlreadyVoted(Tally),
}

impl VoteResult {
  pub fn tally(&self) -> Tally {
    match self {
      Self::Voted(t) | Self::AlreadyVoted(t) => *t,
    }
  }
}

/// What a page needs to render the reaction bar for one voter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoterStatus {
  #[serde(flatten)]
  pub tally: Tally,
  pub mode:  Mode,
  pub voted: bool,
}

/// Upper bound on [`ReactionService::dashboard`] rows.
pub const MAX_DASHBOARD_ROWS: usize = 200;

pub struct ReactionService<S> {
  store: S,
}

impl<S: VoteStore> ReactionService<S> {
  pub fn new(store: S) -> Self { Self { store } }

  pub fn store(&self) -> &S { &self.store }

  /// Record one reaction from `voter_id` on `item_id`.
  pub async fn cast_vote(
    &self,
    voter_id: &VoterId,
    item_id:  i64,
    reaction: &str,
    mode:     Mode,
  ) -> Result<VoteResult, ReactionError> {
    let item_id = ItemId::try_from(item_id)?;
    let reaction: ReactionKind = reaction.parse()?;

    if !mode.accepts(reaction) {
      debug!(%voter_id, %item_id, %reaction, %mode, "reaction refused by mode");
      return Err(ReactionError::ModeDisabled);
    }

    match self.store.record_vote(voter_id, item_id, reaction).await {
      Ok(tally) => {
        info!(%voter_id, %item_id, %reaction, likes = tally.likes, dislikes = tally.dislikes, "vote recorded");
        Ok(VoteResult::Voted(tally))
      }
      Err(StoreError::AlreadyVoted) => {
        debug!(%voter_id, %item_id, "duplicate vote");
        let tally = self.store.get_counts(item_id).await.map_err(storage_failure)?;
        Ok(VoteResult::AlreadyVoted(tally))
      }
      Err(e) => Err(storage_failure(e)),
    }
  }

  pub async fn get_tally(&self, item_id: i64) -> Result<Tally, ReactionError> {
    let item_id = ItemId::try_from(item_id)?;
    self.store.get_counts(item_id).await.map_err(storage_failure)
  }

  /// Tally plus whether `voter_id` (if known) already reacted.
  pub async fn voter_status(
    &self,
    voter_id: Option<&VoterId>,
    item_id:  i64,
    mode:     Mode,
  ) -> Result<VoterStatus, ReactionError> {
    let item_id = ItemId::try_from(item_id)?;
    let tally = self.store.get_counts(item_id).await.map_err(storage_failure)?;
    let voted = match voter_id {
      Some(v) => self.store.has_voted(v, item_id).await.map_err(storage_failure)?,
      None => false,
    };
    Ok(VoterStatus { tally, mode, voted })
  }

  /// Top items by reaction count, capped at [`MAX_DASHBOARD_ROWS`].
  pub async fn dashboard(&self, limit: usize) -> Result<Vec<ItemTally>, ReactionError> {
    self
      .store
      .list_tallies(limit.min(MAX_DASHBOARD_ROWS))
      .await
      .map_err(storage_failure)
  }

  pub async fn erase(&self, filter: EraseFilter) -> Result<usize, ReactionError> {
    let removed = self.store.bulk_erase(filter.clone()).await.map_err(storage_failure)?;
    info!(
      removed,
      items = ?filter.item_ids,
      voters = filter.voter_ids.as_ref().map(Vec::len),
      "reaction data erased"
    );
    Ok(removed)
  }
}

fn storage_failure(e: StoreError) -> ReactionError {
  error!(error = %e, "vote store failure");
  match e {
    StoreError::Unavailable(source) => ReactionError::StorageUnavailable(source),
    other @ StoreError::AlreadyVoted => ReactionError::StorageUnavailable(Box::new(other)),
  }
}
