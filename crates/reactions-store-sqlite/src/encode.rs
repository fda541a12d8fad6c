//! Conversions between domain values and SQLite column values.

use chrono::{DateTime, SecondsFormat, Utc};
use reactions_core::reaction::{ItemId, ItemTally, ReactionKind, Tally};

use crate::{Error, Result};

pub(crate) fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn counter_column(kind: ReactionKind) -> &'static str {
  match kind {
    ReactionKind::Like => "like_count",
    ReactionKind::Dislike => "dislike_count",
  }
}

/// `(item_id, like_count, dislike_count)` as read from the `items` table.
pub(crate) struct RawTally {
  pub item_id:  i64,
  pub likes:    i64,
  pub dislikes: i64,
}

impl RawTally {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      item_id:  row.get(0)?,
      likes:    row.get(1)?,
      dislikes: row.get(2)?,
    })
  }

  pub fn into_tally(self) -> Result<Tally> {
    let count = |value: i64| {
      u64::try_from(value).map_err(|_| Error::CorruptCounter { item_id: self.item_id, value })
    };
    Ok(Tally::new(count(self.likes)?, count(self.dislikes)?))
  }

  pub fn into_item_tally(self) -> Result<ItemTally> {
    let item_id = ItemId::try_from(self.item_id)?;
    Ok(ItemTally { item_id, tally: self.into_tally()? })
  }
}
