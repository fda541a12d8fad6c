//! JSON HTTP API for the reaction service.
//!
//! Exposes an axum [`Router`] backed by any [`VoteStore`]. Voter identity is
//! resolved upstream and handed in via a header or cookie; TLS and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let state = AppState::new(store, ModeCell::new(Mode::LikeDislike));
//! axum::serve(listener, reactions_api::router(state)).await?;
//! ```

pub mod admin;
pub mod auth;
pub mod error;
pub mod react;
pub mod voter;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use reactions_core::{service::ReactionService, settings::ModeCell, store::VoteStore};
use tower_http::trace::TraceLayer;

pub use auth::AuthConfig;
pub use error::ApiError;
pub use voter::IdentityConfig;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub service:  Arc<ReactionService<S>>,
  /// Read on every request; admins may flip it at runtime.
  pub mode:     ModeCell,
  pub identity: Arc<IdentityConfig>,
  /// `None` disables the `/admin` routes entirely.
  pub admin:    Option<Arc<AuthConfig>>,
}

impl<S: VoteStore> AppState<S> {
  pub fn new(store: S, mode: ModeCell) -> Self {
    Self {
      service:  Arc::new(ReactionService::new(store)),
      mode,
      identity: Arc::new(IdentityConfig::default()),
      admin:    None,
    }
  }

  pub fn with_identity(mut self, identity: IdentityConfig) -> Self {
    self.identity = Arc::new(identity);
    self
  }

  pub fn with_admin(mut self, admin: AuthConfig) -> Self {
    self.admin = Some(Arc::new(admin));
    self
  }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      service:  Arc::clone(&self.service),
      mode:     self.mode.clone(),
      identity: Arc::clone(&self.identity),
      admin:    self.admin.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: VoteStore + 'static,
{
  let mut app = Router::new()
    .route("/react", post(react::cast::<S>))
    .route("/tally", get(react::tally::<S>))
    .route("/status", get(react::status::<S>));

  if state.admin.is_some() {
    app = app
      .route(
        "/admin/settings",
        get(admin::get_settings::<S>).put(admin::put_settings::<S>),
      )
      .route("/admin/dashboard", get(admin::dashboard::<S>))
      .route("/admin/erase", post(admin::erase::<S>));
  }

  app.layer(TraceLayer::new_for_http()).with_state(state)
}

#[cfg(test)]
mod tests;
