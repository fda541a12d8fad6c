//! Error type for `reactions-store-sqlite`.

use reactions_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] reactions_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json encoding error: {0}")]
  Json(#[from] serde_json::Error),

  /// A counter column held a negative value.
  #[error("corrupt counter for item {item_id}: {value}")]
  CorruptCounter { item_id: i64, value: i64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for StoreError {
  fn from(e: Error) -> Self { StoreError::unavailable(e) }
}
