//! Runtime reaction settings.
//!
//! The mode is read fresh for every request and may be changed between
//! requests by an administrator; [`ModeCell`] is the shared handle for that.

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

use crate::reaction::Mode;

/// A cheaply clonable, lock-free handle on the current [`Mode`].
#[derive(Debug, Clone)]
pub struct ModeCell {
  like_only: Arc<AtomicBool>,
}

impl ModeCell {
  pub fn new(mode: Mode) -> Self {
    Self { like_only: Arc::new(AtomicBool::new(mode == Mode::LikeOnly)) }
  }

  pub fn get(&self) -> Mode {
    if self.like_only.load(Ordering::Acquire) {
      Mode::LikeOnly
    } else {
      Mode::LikeDislike
    }
  }

  /// Replace the mode, returning the previous one.
  pub fn set(&self, mode: Mode) -> Mode {
    let was_like_only = self.like_only.swap(mode == Mode::LikeOnly, Ordering::AcqRel);
    if was_like_only { Mode::LikeOnly } else { Mode::LikeDislike }
  }
}

impl Default for ModeCell {
  fn default() -> Self { Self::new(Mode::default()) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clones_observe_updates() {
    let cell = ModeCell::default();
    let reader = cell.clone();
    assert_eq!(reader.get(), Mode::LikeDislike);

    assert_eq!(cell.set(Mode::LikeOnly), Mode::LikeDislike);
    assert_eq!(reader.get(), Mode::LikeOnly);
  }
}
