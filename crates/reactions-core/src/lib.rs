//! Core types, the vote store abstraction and the reaction service.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! SQLite backend and the HTTP layer both depend on it.

pub mod error;
pub mod memory;
pub mod reaction;
pub mod service;
pub mod settings;
pub mod store;

pub use error::{Error, ReactionError, Result, StoreError};
