//! Reaction primitives: items, voters, reaction kinds, modes and tallies.
//!
//! Every identifier is validated at construction, so a value of these types
//! that reaches a [`VoteStore`](crate::store::VoteStore) is always well formed.

use std::{fmt, num::NonZeroU64, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

// ─── Item ────────────────────────────────────────────────────────────────────

/// Identifier of the content item being reacted to. Always in `1..=i64::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u64")]
pub struct ItemId(NonZeroU64);

impl ItemId {
  pub fn get(self) -> u64 { self.0.get() }

  /// Lossless: construction rejects anything above `i64::MAX`.
  pub fn as_i64(self) -> i64 { self.0.get() as i64 }
}

impl TryFrom<i64> for ItemId {
  type Error = Error;

  fn try_from(raw: i64) -> Result<Self, Self::Error> {
    u64::try_from(raw)
      .ok()
      .and_then(NonZeroU64::new)
      .map(Self)
      .ok_or(Error::InvalidItemId(raw.to_string()))
  }
}

impl TryFrom<u64> for ItemId {
  type Error = Error;

  fn try_from(raw: u64) -> Result<Self, Self::Error> {
    i64::try_from(raw)
      .map_err(|_| Error::InvalidItemId(raw.to_string()))
      .and_then(Self::try_from)
  }
}

impl From<ItemId> for u64 {
  fn from(id: ItemId) -> Self { id.get() }
}

impl FromStr for ItemId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let raw: i64 = s
      .trim()
      .parse()
      .map_err(|_| Error::InvalidItemId(s.to_owned()))?;
    Self::try_from(raw)
  }
}

impl fmt::Display for ItemId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Voter ───────────────────────────────────────────────────────────────────

/// Longest voter identifier accepted.
pub const MAX_VOTER_ID_LEN: usize = 128;

/// Opaque, caller-supplied identity of whoever casts a vote.
///
/// How the identifier is derived (session cookie, account id, ...) is the
/// caller's business. It must be 1..=128 visible ASCII characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VoterId(String);

impl VoterId {
  pub fn new(raw: impl Into<String>) -> Result<Self, Error> {
    let raw = raw.into();
    let valid = !raw.is_empty()
      && raw.len() <= MAX_VOTER_ID_LEN
      && raw.bytes().all(|b| b.is_ascii_graphic());
    if valid {
      Ok(Self(raw))
    } else {
      Err(Error::InvalidVoterId)
    }
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for VoterId {
  type Error = Error;

  fn try_from(raw: String) -> Result<Self, Self::Error> { Self::new(raw) }
}

impl From<VoterId> for String {
  fn from(id: VoterId) -> Self { id.0 }
}

impl fmt::Display for VoterId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── Reaction kind ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
  Like,
  Dislike,
}

impl ReactionKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Like => "like",
      Self::Dislike => "dislike",
    }
  }
}

impl FromStr for ReactionKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "like" => Ok(Self::Like),
      "dislike" => Ok(Self::Dislike),
      other => Err(Error::UnknownReaction(other.to_owned())),
    }
  }
}

impl fmt::Display for ReactionKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

// ─── Mode ────────────────────────────────────────────────────────────────────

/// Which reaction kinds are currently accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
  LikeOnly,
  #[default]
  LikeDislike,
}

impl Mode {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::LikeOnly => "like_only",
      Self::LikeDislike => "like_dislike",
    }
  }

  pub fn accepts(self, kind: ReactionKind) -> bool {
    !matches!((self, kind), (Self::LikeOnly, ReactionKind::Dislike))
  }
}

impl FromStr for Mode {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "like_only" => Ok(Self::LikeOnly),
      "like_dislike" => Ok(Self::LikeDislike),
      other => Err(Error::UnknownMode(other.to_owned())),
    }
  }
}

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

// ─── Tallies and records ─────────────────────────────────────────────────────

/// Current counts for one item. Unknown items tally to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tally {
  pub likes:    u64,
  pub dislikes: u64,
}

impl Tally {
  pub fn new(likes: u64, dislikes: u64) -> Self { Self { likes, dislikes } }

  pub fn total(&self) -> u64 { self.likes + self.dislikes }

  pub(crate) fn bump(&mut self, kind: ReactionKind) {
    match kind {
      ReactionKind::Like => self.likes += 1,
      ReactionKind::Dislike => self.dislikes += 1,
    }
  }
}

/// A tally paired with its item, as listed on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTally {
  pub item_id:  ItemId,
  #[serde(flatten)]
  pub tally:    Tally,
}

/// One entry of the vote ledger. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
  pub voter_id: VoterId,
  pub item_id:  ItemId,
  pub reaction: ReactionKind,
  pub voted_at: DateTime<Utc>,
}
