//! Voter identity resolution.
//!
//! The service never derives identities itself: an upstream session or
//! account layer puts a stable opaque id into a request header, or the page
//! keeps one in a cookie. This module only reads it back.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, HeaderName, header, request::Parts},
};
use reactions_core::{reaction::VoterId, store::VoteStore};

use crate::{AppState, error::ApiError};

pub const DEFAULT_VOTER_HEADER: &str = "x-voter-id";
pub const DEFAULT_VOTER_COOKIE: &str = "spr_voter";

/// Where voter identities are looked up.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
  pub header: HeaderName,
  pub cookie: String,
}

impl Default for IdentityConfig {
  fn default() -> Self {
    Self {
      header: HeaderName::from_static(DEFAULT_VOTER_HEADER),
      cookie: DEFAULT_VOTER_COOKIE.to_owned(),
    }
  }
}

/// Resolve the voter from the identity header, falling back to the cookie.
///
/// A header that is present but malformed is not rescued by the cookie.
pub fn resolve_voter(headers: &HeaderMap, config: &IdentityConfig) -> Option<VoterId> {
  if let Some(value) = headers.get(&config.header) {
    return value.to_str().ok().and_then(|s| VoterId::new(s.trim()).ok());
  }

  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(name, _)| *name == config.cookie)
    .and_then(|(_, value)| VoterId::new(value.trim_matches('"')).ok())
}

/// Extracts the voter or rejects with 401.
pub struct Voter(pub VoterId);

/// Extracts the voter if one can be resolved. Never rejects.
pub struct MaybeVoter(pub Option<VoterId>);

impl<S> FromRequestParts<AppState<S>> for Voter
where
  S: VoteStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    resolve_voter(&parts.headers, &state.identity)
      .map(Voter)
      .ok_or(ApiError::Unauthenticated)
  }
}

impl<S> FromRequestParts<AppState<S>> for MaybeVoter
where
  S: VoteStore + 'static,
{
  type Rejection = std::convert::Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    Ok(MaybeVoter(resolve_voter(&parts.headers, &state.identity)))
  }
}
