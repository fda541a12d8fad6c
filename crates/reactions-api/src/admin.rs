//! Handlers for `/admin` endpoints. All require the [`Admin`] extractor.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/admin/settings`  | Current reaction mode |
//! | `PUT`  | `/admin/settings`  | Body: `{"mode":"like_only"}` |
//! | `GET`  | `/admin/dashboard` | Optional `?limit=` (default 20, max 200) |
//! | `POST` | `/admin/erase`     | Body: [`EraseBody`]; returns `{"removed":n}` |

use axum::{
  Json,
  extract::{Query, State, rejection::{JsonRejection, QueryRejection}},
};
use reactions_core::{
  reaction::{ItemId, ItemTally, Mode, VoterId},
  store::{EraseFilter, VoteStore},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{AppState, auth::Admin, error::ApiError};

pub const DEFAULT_DASHBOARD_ROWS: usize = 20;

// ─── Settings ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsBody {
  pub mode: String,
}

/// `GET /admin/settings`
pub async fn get_settings<S>(
  State(state): State<AppState<S>>,
  _: Admin,
) -> Json<SettingsBody>
where
  S: VoteStore + 'static,
{
  Json(SettingsBody { mode: state.mode.get().to_string() })
}

/// `PUT /admin/settings` — body: `{"mode":"like_only"|"like_dislike"}`
pub async fn put_settings<S>(
  State(state): State<AppState<S>>,
  _: Admin,
  body: Result<Json<SettingsBody>, JsonRejection>,
) -> Result<Json<SettingsBody>, ApiError>
where
  S: VoteStore + 'static,
{
  let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let mode: Mode = body
    .mode
    .parse()
    .map_err(|e: reactions_core::Error| ApiError::BadRequest(e.to_string()))?;

  let previous = state.mode.set(mode);
  tracing::info!(%previous, %mode, "reaction mode changed");
  Ok(Json(SettingsBody { mode: mode.to_string() }))
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DashboardParams {
  pub limit: Option<usize>,
}

/// `GET /admin/dashboard[?limit=<n>]`
pub async fn dashboard<S>(
  State(state): State<AppState<S>>,
  _: Admin,
  params: Result<Query<DashboardParams>, QueryRejection>,
) -> Result<Json<Vec<ItemTally>>, ApiError>
where
  S: VoteStore + 'static,
{
  let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let limit = params.limit.unwrap_or(DEFAULT_DASHBOARD_ROWS);
  Ok(Json(state.service.dashboard(limit).await?))
}

// ─── Erase ───────────────────────────────────────────────────────────────────

/// Body of `POST /admin/erase`. Wiping everything needs `"all": true`.
#[derive(Debug, Default, Deserialize)]
pub struct EraseBody {
  pub item_ids:  Option<Vec<i64>>,
  pub voter_ids: Option<Vec<String>>,
  #[serde(default)]
  pub all:       bool,
}

impl EraseBody {
  pub fn into_filter(self) -> Result<EraseFilter, ApiError> {
    if self.item_ids.is_none() && self.voter_ids.is_none() && !self.all {
      return Err(ApiError::BadRequest(
        "give item_ids, voter_ids, or \"all\": true".into(),
      ));
    }

    let item_ids = self
      .item_ids
      .map(|ids| ids.into_iter().map(ItemId::try_from).collect::<Result<Vec<_>, _>>())
      .transpose()
      .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let voter_ids = self
      .voter_ids
      .map(|ids| ids.into_iter().map(VoterId::new).collect::<Result<Vec<_>, _>>())
      .transpose()
      .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(EraseFilter { item_ids, voter_ids })
  }
}

/// `POST /admin/erase`
pub async fn erase<S>(
  State(state): State<AppState<S>>,
  _: Admin,
  body: Result<Json<EraseBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError>
where
  S: VoteStore + 'static,
{
  let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let removed = state.service.erase(body.into_filter()?).await?;
  Ok(Json(json!({ "removed": removed })))
}
