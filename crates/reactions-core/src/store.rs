//! The `VoteStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends ([`MemoryStore`] here,
//! `reactions-store-sqlite` for durable storage). [`ReactionService`] is the
//! only caller that mutates through it.
//!
//! [`MemoryStore`]: crate::memory::MemoryStore
//! [`ReactionService`]: crate::service::ReactionService

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
  error::StoreError,
  reaction::{ItemId, ItemTally, ReactionKind, Tally, VoterId},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Selection for [`VoteStore::bulk_erase`].
///
/// With both filters unset every counter and ledger entry is wiped. With both
/// set only records matching both are removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EraseFilter {
  pub item_ids:  Option<Vec<ItemId>>,
  pub voter_ids: Option<Vec<VoterId>>,
}

impl EraseFilter {
  pub fn everything() -> Self { Self::default() }

  pub fn items(ids: impl IntoIterator<Item = ItemId>) -> Self {
    Self { item_ids: Some(ids.into_iter().collect()), voter_ids: None }
  }

  pub fn voters(ids: impl IntoIterator<Item = VoterId>) -> Self {
    Self { item_ids: None, voter_ids: Some(ids.into_iter().collect()) }
  }

  pub fn matches(&self, voter_id: &VoterId, item_id: ItemId) -> bool {
    let item_ok = self.item_ids.as_ref().is_none_or(|ids| ids.contains(&item_id));
    let voter_ok = self.voter_ids.as_ref().is_none_or(|ids| ids.contains(voter_id));
    item_ok && voter_ok
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the counters + vote ledger.
///
/// [`record_vote`](Self::record_vote) is the single atomic check-and-increment;
/// an implementation must never let the ledger and the counters diverge, even
/// if the returned future is dropped half way.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait VoteStore: Send + Sync {
  /// Whether a vote exists for the pair.
  fn has_voted<'a>(
    &'a self,
    voter_id: &'a VoterId,
    item_id: ItemId,
  ) -> impl Future<Output = Result<bool, StoreError>> + Send + 'a;

  /// Atomically insert the vote and bump the matching counter, returning the
  /// post-increment tally. Fails with [`StoreError::AlreadyVoted`] if the pair
  /// already had a vote at the time of the check.
  fn record_vote<'a>(
    &'a self,
    voter_id: &'a VoterId,
    item_id: ItemId,
    reaction: ReactionKind,
  ) -> impl Future<Output = Result<Tally, StoreError>> + Send + 'a;

  /// Current counts; `(0, 0)` for items nobody voted on.
  fn get_counts(
    &self,
    item_id: ItemId,
  ) -> impl Future<Output = Result<Tally, StoreError>> + Send + '_;

  /// Administrative wipe. Returns the number of ledger entries removed.
  ///
  /// Counters of every touched item are recomputed from the surviving ledger;
  /// items left without votes disappear.
  fn bulk_erase(
    &self,
    filter: EraseFilter,
  ) -> impl Future<Output = Result<usize, StoreError>> + Send + '_;

  /// Items ordered by total reactions (descending), then by id.
  fn list_tallies(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<ItemTally>, StoreError>> + Send + '_;
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(n: u64) -> ItemId { ItemId::try_from(n).unwrap() }
  fn voter(s: &str) -> VoterId { VoterId::new(s).unwrap() }

  #[test]
  fn empty_filter_matches_everything() {
    let f = EraseFilter::everything();
    assert!(f.matches(&voter("a"), item(1)));
    assert!(f.matches(&voter("b"), item(99)));
  }

  #[test]
  fn combined_filter_is_an_intersection() {
    let f = EraseFilter {
      item_ids:  Some(vec![item(1)]),
      voter_ids: Some(vec![voter("a")]),
    };
    assert!(f.matches(&voter("a"), item(1)));
    assert!(!f.matches(&voter("a"), item(2)));
    assert!(!f.matches(&voter("b"), item(1)));
  }
}
