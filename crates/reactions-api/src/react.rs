//! Handlers for the public voting endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/react` | Body: `{"item_id":42,"reaction":"like"}`; voter identity required |
//! | `GET`  | `/tally` | `?item_id=<id>` |
//! | `GET`  | `/status` | `?item_id=<id>`; tally, mode and whether the caller voted |

use axum::{
  Json,
  extract::{Query, State, rejection::{JsonRejection, QueryRejection}},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use reactions_core::{
  reaction::Tally,
  service::{VoteResult, VoterStatus},
  store::VoteStore,
};
use serde::{Deserialize, Serialize};

use crate::{
  AppState,
  error::ApiError,
  voter::{MaybeVoter, Voter},
};

pub const MSG_THANKS: &str = "Thanks for your feedback!";
pub const MSG_ALREADY: &str = "You already voted on this item.";

// ─── Request bodies ──────────────────────────────────────────────────────────

/// Item ids arrive as JSON numbers, but numeric strings are tolerated.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawItemId {
  Int(i64),
  Text(String),
}

impl RawItemId {
  fn to_i64(&self) -> Result<i64, ApiError> {
    match self {
      Self::Int(n) => Ok(*n),
      Self::Text(s) => s
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest("item_id must be a positive integer".into())),
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ReactBody {
  pub item_id:  Option<RawItemId>,
  pub reaction: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ItemParams {
  pub item_id: Option<String>,
}

impl ItemParams {
  fn item_id(&self) -> Result<i64, ApiError> {
    let raw = self
      .item_id
      .as_deref()
      .ok_or_else(|| ApiError::BadRequest("item_id is required".into()))?;
    RawItemId::Text(raw.to_owned()).to_i64()
  }
}

// ─── Response bodies ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct VotedBody {
  pub likes:    u64,
  pub dislikes: u64,
  pub message:  &'static str,
}

#[derive(Debug, Serialize)]
pub struct AlreadyVotedBody {
  pub message:  &'static str,
  pub already:  bool,
  pub likes:    u64,
  pub dislikes: u64,
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// `POST /react`
pub async fn cast<S>(
  State(state): State<AppState<S>>,
  Voter(voter_id): Voter,
  body: Result<Json<ReactBody>, JsonRejection>,
) -> Result<Response, ApiError>
where
  S: VoteStore + 'static,
{
  let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

  let item_id = body
    .item_id
    .as_ref()
    .ok_or_else(|| ApiError::BadRequest("item_id is required".into()))?
    .to_i64()?;
  let reaction = body
    .reaction
    .ok_or_else(|| ApiError::BadRequest("reaction is required".into()))?;

  let mode = state.mode.get();
  let result = state
    .service
    .cast_vote(&voter_id, item_id, &reaction, mode)
    .await?;

  let response = match result {
    VoteResult::Voted(Tally { likes, dislikes }) => (
      StatusCode::OK,
      Json(VotedBody { likes, dislikes, message: MSG_THANKS }),
    )
      .into_response(),
    VoteResult::AlreadyVoted(Tally { likes, dislikes }) => (
      StatusCode::CONFLICT,
      Json(AlreadyVotedBody { message: MSG_ALREADY, already: true, likes, dislikes }),
    )
      .into_response(),
  };
  Ok(response)
}

/// `GET /tally?item_id=<id>`
pub async fn tally<S>(
  State(state): State<AppState<S>>,
  params: Result<Query<ItemParams>, QueryRejection>,
) -> Result<Json<Tally>, ApiError>
where
  S: VoteStore + 'static,
{
  let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let tally = state.service.get_tally(params.item_id()?).await?;
  Ok(Json(tally))
}

/// `GET /status?item_id=<id>`
pub async fn status<S>(
  State(state): State<AppState<S>>,
  MaybeVoter(voter_id): MaybeVoter,
  params: Result<Query<ItemParams>, QueryRejection>,
) -> Result<Json<VoterStatus>, ApiError>
where
  S: VoteStore + 'static,
{
  let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let status = state
    .service
    .voter_status(voter_id.as_ref(), params.item_id()?, state.mode.get())
    .await?;
  Ok(Json(status))
}
