//! HTTP Basic-auth extractor guarding the admin routes.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use reactions_core::store::VoteStore;

use crate::{AppState, error::ApiError};

/// Administrator credentials accepted by this server instance.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Zero-size marker: present in the handler means the caller is an admin.
pub struct Admin;

/// `(username, password)` from an `Authorization: Basic` header, if well formed.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
  let encoded = headers
    .get(axum::http::header::AUTHORIZATION)?
    .to_str()
    .ok()?
    .strip_prefix("Basic ")?;
  let decoded = String::from_utf8(B64.decode(encoded).ok()?).ok()?;
  let (username, password) = decoded.split_once(':')?;
  Some((username.to_owned(), password.to_owned()))
}

/// Gate for the `/admin` routes: the caller must present the configured
/// administrator's Basic credentials. Voting routes never go through here.
///
/// Every failure, including an unparsable stored hash, is reported as
/// [`ApiError::Unauthorized`].
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<(), ApiError> {
  let (username, password) = basic_credentials(headers).ok_or(ApiError::Unauthorized)?;
  if username != config.username {
    return Err(ApiError::Unauthorized);
  }

  let hash = PasswordHash::new(&config.password_hash).map_err(|e| {
    tracing::warn!(error = %e, "admin_password_hash is not a valid PHC string");
    ApiError::Unauthorized
  })?;
  Argon2::default()
    .verify_password(password.as_bytes(), &hash)
    .map_err(|_| ApiError::Unauthorized)
}

impl<S> FromRequestParts<AppState<S>> for Admin
where
  S: VoteStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let config = state.admin.as_deref().ok_or(ApiError::Unauthorized)?;
    verify_auth(&parts.headers, config)?;
    Ok(Admin)
  }
}
