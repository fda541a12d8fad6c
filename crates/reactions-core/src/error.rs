//! Error types for `reactions-core`.

use thiserror::Error;

/// Validation failures when building domain values from raw input.
#[derive(Debug, Error)]
pub enum Error {
  #[error("item_id must be a positive integer, got {0:?}")]
  InvalidItemId(String),

  #[error("voter id must be 1-128 visible ASCII characters")]
  InvalidVoterId,

  #[error("reaction must be \"like\" or \"dislike\", got {0:?}")]
  UnknownReaction(String),

  #[error("mode must be \"like_only\" or \"like_dislike\", got {0:?}")]
  UnknownMode(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The only two ways a [`VoteStore`](crate::store::VoteStore) operation can
/// fail.
#[derive(Debug, Error)]
pub enum StoreError {
  /// A vote for this (voter, item) pair already existed at the atomic check.
  #[error("voter already reacted to this item")]
  AlreadyVoted,

  #[error("storage unavailable: {0}")]
  Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
  pub fn unavailable(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Unavailable(Box::new(e))
  }
}

/// Failures surfaced by [`ReactionService`](crate::service::ReactionService).
///
/// A duplicate vote is not an error; it is reported through
/// [`VoteResult::AlreadyVoted`](crate::service::VoteResult::AlreadyVoted).
#[derive(Debug, Error)]
pub enum ReactionError {
  #[error("invalid request: {0}")]
  InvalidRequest(String),

  #[error("no voter identity")]
  Unauthenticated,

  #[error("dislike is disabled")]
  ModeDisabled,

  #[error("storage unavailable: {0}")]
  StorageUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<Error> for ReactionError {
  fn from(e: Error) -> Self {
    match e {
      Error::InvalidVoterId => Self::Unauthenticated,
      other => Self::InvalidRequest(other.to_string()),
    }
  }
}
