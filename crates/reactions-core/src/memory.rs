//! [`MemoryStore`] — a process-local [`VoteStore`].
//!
//! Each item owns a cell (`Arc<Mutex<ItemEntry>>`) holding both its tally and
//! its slice of the ledger. The map shard is only held long enough to fetch or
//! create a cell; the check-and-increment runs under the cell's own mutex, so
//! votes on different items never wait on each other.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, MutexGuard},
};

use chrono::Utc;
use dashmap::DashMap;

use crate::{
  error::StoreError,
  reaction::{ItemId, ItemTally, ReactionKind, Tally, VoteRecord, VoterId},
  store::{EraseFilter, VoteStore},
};

#[derive(Debug, thiserror::Error)]
#[error("item cell lock poisoned")]
struct Poisoned;

#[derive(Debug, Default)]
struct ItemEntry {
  tally:   Tally,
  ledger:  HashMap<VoterId, VoteRecord>,
  /// Set once an erase has emptied the cell; writers must fetch a fresh one.
  retired: bool,
}

impl ItemEntry {
  fn recount(&mut self) {
    let mut tally = Tally::default();
    for record in self.ledger.values() {
      tally.bump(record.reaction);
    }
    self.tally = tally;
  }
}

type Cell = Arc<Mutex<ItemEntry>>;

/// An in-memory vote store. Cloning is cheap and clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
  items: Arc<DashMap<ItemId, Cell>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn cell(&self, item_id: ItemId) -> Cell {
    Arc::clone(self.items.entry(item_id).or_default().value())
  }

  fn existing(&self, item_id: ItemId) -> Option<Cell> {
    self.items.get(&item_id).map(|c| Arc::clone(c.value()))
  }

  fn retire(&self, item_id: ItemId, cell: &Cell) {
    self.items.remove_if(&item_id, |_, current| Arc::ptr_eq(current, cell));
  }

  /// Snapshot of every cell; the map is not held while the cells are locked.
  fn cells(&self) -> Vec<(ItemId, Cell)> {
    self
      .items
      .iter()
      .map(|e| (*e.key(), Arc::clone(e.value())))
      .collect()
  }

  #[cfg(test)]
  pub(crate) fn hold_item(&self, item_id: ItemId) -> Cell { self.cell(item_id) }
}

fn lock(cell: &Cell) -> Result<MutexGuard<'_, ItemEntry>, StoreError> {
  cell.lock().map_err(|_| StoreError::unavailable(Poisoned))
}

impl VoteStore for MemoryStore {
  async fn has_voted(&self, voter_id: &VoterId, item_id: ItemId) -> Result<bool, StoreError> {
    match self.existing(item_id) {
      Some(cell) => {
        let voted = lock(&cell)?.ledger.contains_key(voter_id);
        Ok(voted)
      }
      None => Ok(false),
    }
  }

  async fn record_vote(
    &self,
    voter_id: &VoterId,
    item_id:  ItemId,
    reaction: ReactionKind,
  ) -> Result<Tally, StoreError> {
    loop {
      let cell = self.cell(item_id);
      let mut entry = lock(&cell)?;

      if entry.retired {
        drop(entry);
        self.retire(item_id, &cell);
        continue;
      }

      if entry.ledger.contains_key(voter_id) {
        return Err(StoreError::AlreadyVoted);
      }

      entry.ledger.insert(voter_id.clone(), VoteRecord {
        voter_id: voter_id.clone(),
        item_id,
        reaction,
        voted_at: Utc::now(),
      });
      entry.tally.bump(reaction);
      return Ok(entry.tally);
    }
  }

  async fn get_counts(&self, item_id: ItemId) -> Result<Tally, StoreError> {
    match self.existing(item_id) {
      Some(cell) => {
        let tally = lock(&cell)?.tally;
        Ok(tally)
      }
      None => Ok(Tally::default()),
    }
  }

  async fn bulk_erase(&self, filter: EraseFilter) -> Result<usize, StoreError> {
    let targets = match &filter.item_ids {
      Some(ids) => ids
        .iter()
        .filter_map(|id| self.existing(*id).map(|c| (*id, c)))
        .collect(),
      None => self.cells(),
    };

    let mut removed = 0;
    for (item_id, cell) in targets {
      let emptied = {
        let mut entry = lock(&cell)?;
        let before = entry.ledger.len();
        entry.ledger.retain(|voter_id, _| !filter.matches(voter_id, item_id));
        removed += before - entry.ledger.len();
        entry.recount();
        entry.retired = entry.ledger.is_empty();
        entry.retired
      };
      if emptied {
        self.retire(item_id, &cell);
      }
    }

    Ok(removed)
  }

  async fn list_tallies(&self, limit: usize) -> Result<Vec<ItemTally>, StoreError> {
    let mut tallies = Vec::new();
    for (item_id, cell) in self.cells() {
      let entry = lock(&cell)?;
      if !entry.retired {
        tallies.push(ItemTally { item_id, tally: entry.tally });
      }
    }
    tallies.sort_by(|a, b| {
      b.tally
        .total()
        .cmp(&a.tally.total())
        .then(a.item_id.cmp(&b.item_id))
    });
    tallies.truncate(limit);
    Ok(tallies)
  }
}
