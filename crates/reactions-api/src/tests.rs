//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::{
  Arc,
  atomic::{AtomicUsize, Ordering},
};

use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use rand_core::OsRng;
use reactions_core::{
  StoreError,
  memory::MemoryStore,
  reaction::{ItemId, ItemTally, Mode, ReactionKind, Tally, VoterId},
  settings::ModeCell,
  store::{EraseFilter, VoteStore},
};
use reactions_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt as _};

use crate::{AppState, AuthConfig, error::MSG_STORAGE, react::{MSG_ALREADY, MSG_THANKS}, router};

fn admin_config(password: &str) -> AuthConfig {
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .unwrap()
    .to_string();
  AuthConfig { username: "admin".to_string(), password_hash: hash }
}

fn make_state(mode: Mode) -> AppState<MemoryStore> {
  AppState::new(MemoryStore::new(), ModeCell::new(mode)).with_admin(admin_config("secret"))
}

fn admin_auth() -> String {
  format!("Basic {}", B64.encode("admin:secret"))
}

async fn send<S: VoteStore + 'static>(
  state:   AppState<S>,
  method:  &str,
  uri:     &str,
  headers: Vec<(&str, &str)>,
  body:    &str,
) -> Response {
  let mut builder = Request::builder().method(method).uri(uri);
  for (k, v) in headers {
    builder = builder.header(k, v);
  }
  let req = builder.body(Body::from(body.to_string())).unwrap();
  router(state).oneshot(req).await.unwrap()
}

async fn react<S: VoteStore + 'static>(
  state: AppState<S>,
  voter: &str,
  body:  Value,
) -> Response {
  send(
    state,
    "POST",
    "/react",
    vec![("x-voter-id", voter), ("content-type", "application/json")],
    &body.to_string(),
  )
  .await
}

async fn json_body(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

// ── POST /react ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_vote_then_duplicate_then_other_voter() {
  let state = make_state(Mode::LikeDislike);

  let resp = react(state.clone(), "7", json!({ "item_id": 42, "reaction": "like" })).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(
    json_body(resp).await,
    json!({ "likes": 1, "dislikes": 0, "message": MSG_THANKS })
  );

  let resp = react(state.clone(), "7", json!({ "item_id": 42, "reaction": "like" })).await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);
  let body = json_body(resp).await;
  assert_eq!(body["already"], true);
  assert_eq!(body["message"], MSG_ALREADY);
  assert_eq!(body["likes"], 1);
  assert_eq!(body["dislikes"], 0);

  let resp = react(state, "8", json!({ "item_id": 42, "reaction": "dislike" })).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!((body["likes"].as_u64(), body["dislikes"].as_u64()), (Some(1), Some(1)));
}

#[tokio::test]
async fn dislike_in_like_only_mode_is_forbidden() {
  let state = make_state(Mode::LikeOnly);

  let resp = react(state.clone(), "1", json!({ "item_id": 5, "reaction": "dislike" })).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  assert_eq!(json_body(resp).await["message"], "Dislike is disabled.");

  let resp = send(state, "GET", "/tally?item_id=5", vec![], "").await;
  assert_eq!(json_body(resp).await, json!({ "likes": 0, "dislikes": 0 }));
}

#[tokio::test]
async fn malformed_votes_are_bad_requests() {
  let state = make_state(Mode::LikeDislike);
  let cases = [
    json!({ "item_id": -3, "reaction": "like" }),
    json!({ "item_id": 0, "reaction": "like" }),
    json!({ "item_id": 1.5, "reaction": "like" }),
    json!({ "item_id": "abc", "reaction": "like" }),
    json!({ "reaction": "like" }),
    json!({ "item_id": 3 }),
    json!({ "item_id": 3, "reaction": "love" }),
    json!({ "item_id": 3, "reaction": 1 }),
  ];
  for body in cases {
    let resp = react(state.clone(), "9", body.clone()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {body}");
    assert!(json_body(resp).await["message"].is_string());
  }

  let resp = send(
    state.clone(),
    "POST",
    "/react",
    vec![("x-voter-id", "9"), ("content-type", "application/json")],
    "{not json",
  )
  .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  // Nothing was recorded along the way.
  assert!(state.service.dashboard(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn numeric_string_item_id_is_accepted() {
  let state = make_state(Mode::LikeDislike);
  let resp = react(state, "9", json!({ "item_id": "12", "reaction": "like" })).await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn vote_without_identity_is_unauthenticated() {
  let state = make_state(Mode::LikeDislike);
  let resp = send(
    state.clone(),
    "POST",
    "/react",
    vec![("content-type", "application/json")],
    r#"{"item_id":1,"reaction":"like"}"#,
  )
  .await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert!(json_body(resp).await["message"].is_string());
}

#[tokio::test]
async fn cookie_identity_is_accepted() {
  let state = make_state(Mode::LikeDislike);
  let resp = send(
    state,
    "POST",
    "/react",
    vec![("content-type", "application/json"), ("cookie", "spr_voter=guest-1")],
    r#"{"item_id":1,"reaction":"like"}"#,
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_requests_count_once() {
  let state = make_state(Mode::LikeDislike);
  let handles: Vec<_> = (0..16)
    .map(|_| {
      let state = state.clone();
      tokio::spawn(async move {
        react(state, "racer", json!({ "item_id": 77, "reaction": "like" })).await.status()
      })
    })
    .collect();

  let mut statuses = Vec::new();
  for h in handles {
    statuses.push(h.await.unwrap());
  }
  assert_eq!(statuses.iter().filter(|s| **s == StatusCode::OK).count(), 1);
  assert_eq!(statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count(), 15);
  assert_eq!(state.service.get_tally(77).await.unwrap(), Tally::new(1, 0));
}

#[tokio::test]
async fn sqlite_backend_serves_the_same_contract() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let state = AppState::new(store, ModeCell::new(Mode::LikeDislike));

  let resp = react(state.clone(), "7", json!({ "item_id": 42, "reaction": "like" })).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let resp = react(state.clone(), "7", json!({ "item_id": 42, "reaction": "dislike" })).await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);

  let resp = send(state, "GET", "/tally?item_id=42", vec![], "").await;
  assert_eq!(json_body(resp).await, json!({ "likes": 1, "dislikes": 0 }));
}

// ── Storage failure ──────────────────────────────────────────────────────────

struct DownStore;

#[derive(Debug, thiserror::Error)]
#[error("database is locked: /var/lib/reactions.db")]
struct Down;

impl VoteStore for DownStore {
  async fn has_voted(&self, _: &VoterId, _: ItemId) -> Result<bool, StoreError> { Err(StoreError::unavailable(Down)) }
  async fn record_vote(&self, _: &VoterId, _: ItemId, _: ReactionKind) -> Result<Tally, StoreError> { Err(StoreError::unavailable(Down)) }
  async fn get_counts(&self, _: ItemId) -> Result<Tally, StoreError> { Err(StoreError::unavailable(Down)) }
  async fn bulk_erase(&self, _: EraseFilter) -> Result<usize, StoreError> { Err(StoreError::unavailable(Down)) }
  async fn list_tallies(&self, _: usize) -> Result<Vec<ItemTally>, StoreError> { Err(StoreError::unavailable(Down)) }
}

#[tokio::test]
async fn storage_failure_is_a_generic_500() {
  let state = AppState::new(DownStore, ModeCell::default());

  let resp = react(state.clone(), "1", json!({ "item_id": 1, "reaction": "like" })).await;
  assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
  let body = json_body(resp).await;
  assert_eq!(body, json!({ "message": MSG_STORAGE }));

  let resp = send(state, "GET", "/tally?item_id=1", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

/// Counts ERROR events emitted from this workspace's crates.
struct ErrorCounter(Arc<AtomicUsize>);

impl<T: tracing::Subscriber> Layer<T> for ErrorCounter {
  fn on_event(&self, event: &tracing::Event<'_>, _: Context<'_, T>) {
    let meta = event.metadata();
    if *meta.level() == tracing::Level::ERROR && meta.target().starts_with("reactions") {
      self.0.fetch_add(1, Ordering::SeqCst);
    }
  }
}

#[tokio::test]
async fn storage_failure_is_logged_once() {
  let errors = Arc::new(AtomicUsize::new(0));
  let subscriber = tracing_subscriber::registry().with(ErrorCounter(Arc::clone(&errors)));
  let _guard = tracing::subscriber::set_default(subscriber);

  let state = AppState::new(DownStore, ModeCell::default());
  let resp = react(state, "1", json!({ "item_id": 1, "reaction": "like" })).await;
  assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(errors.load(Ordering::SeqCst), 1);
}

// ── GET /tally, GET /status ─────────────────────────────────────────────────

#[tokio::test]
async fn tally_rejects_bad_ids() {
  let state = make_state(Mode::LikeDislike);
  for uri in ["/tally", "/tally?item_id=", "/tally?item_id=x", "/tally?item_id=-1"] {
    let resp = send(state.clone(), "GET", uri, vec![], "").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "uri: {uri}");
  }
}

#[tokio::test]
async fn status_reports_mode_and_prior_vote() {
  let state = make_state(Mode::LikeOnly);
  react(state.clone(), "7", json!({ "item_id": 3, "reaction": "like" })).await;

  let resp = send(state.clone(), "GET", "/status?item_id=3", vec![("x-voter-id", "7")], "").await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(
    json_body(resp).await,
    json!({ "likes": 1, "dislikes": 0, "mode": "like_only", "voted": true })
  );

  let resp = send(state, "GET", "/status?item_id=3", vec![], "").await;
  assert_eq!(json_body(resp).await["voted"], false);
}

// ── Admin ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_routes_require_credentials() {
  let state = make_state(Mode::LikeDislike);
  let resp = send(state.clone(), "GET", "/admin/settings", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));

  let wrong = format!("Basic {}", B64.encode("admin:nope"));
  let resp = send(state, "GET", "/admin/dashboard", vec![("authorization", &wrong)], "").await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_absent_without_admin_config() {
  let state = AppState::new(MemoryStore::new(), ModeCell::default());
  let resp = send(state, "GET", "/admin/settings", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mode_change_applies_to_the_next_request() {
  let state = make_state(Mode::LikeDislike);
  let auth = admin_auth();

  let resp = send(
    state.clone(),
    "PUT",
    "/admin/settings",
    vec![("authorization", &auth), ("content-type", "application/json")],
    r#"{"mode":"like_only"}"#,
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await, json!({ "mode": "like_only" }));

  let resp = react(state.clone(), "1", json!({ "item_id": 1, "reaction": "dislike" })).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp = send(state, "GET", "/admin/settings", vec![("authorization", &auth)], "").await;
  assert_eq!(json_body(resp).await["mode"], "like_only");
}

#[tokio::test]
async fn unknown_mode_is_rejected() {
  let state = make_state(Mode::LikeDislike);
  let auth = admin_auth();
  let resp = send(
    state.clone(),
    "PUT",
    "/admin/settings",
    vec![("authorization", &auth), ("content-type", "application/json")],
    r#"{"mode":"dislike_only"}"#,
  )
  .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(state.mode.get(), Mode::LikeDislike);
}

#[tokio::test]
async fn dashboard_lists_top_items() {
  let state = make_state(Mode::LikeDislike);
  react(state.clone(), "a", json!({ "item_id": 1, "reaction": "like" })).await;
  react(state.clone(), "a", json!({ "item_id": 2, "reaction": "like" })).await;
  react(state.clone(), "b", json!({ "item_id": 2, "reaction": "dislike" })).await;

  let auth = admin_auth();
  let resp = send(state, "GET", "/admin/dashboard?limit=5", vec![("authorization", &auth)], "").await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(
    json_body(resp).await,
    json!([
      { "item_id": 2, "likes": 1, "dislikes": 1 },
      { "item_id": 1, "likes": 1, "dislikes": 0 },
    ])
  );
}

#[tokio::test]
async fn erase_needs_a_selection_and_removes_votes() {
  let state = make_state(Mode::LikeDislike);
  react(state.clone(), "a", json!({ "item_id": 1, "reaction": "like" })).await;
  react(state.clone(), "b", json!({ "item_id": 1, "reaction": "like" })).await;
  let auth = admin_auth();
  let headers = || vec![("authorization", auth.as_str()), ("content-type", "application/json")];

  let resp = send(state.clone(), "POST", "/admin/erase", headers(), "{}").await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let resp = send(state.clone(), "POST", "/admin/erase", headers(), r#"{"voter_ids":["a"]}"#).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await, json!({ "removed": 1 }));
  assert_eq!(state.service.get_tally(1).await.unwrap(), Tally::new(1, 0));

  // The erased voter can react again.
  let resp = react(state.clone(), "a", json!({ "item_id": 1, "reaction": "like" })).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let resp = send(state.clone(), "POST", "/admin/erase", headers(), r#"{"all":true}"#).await;
  assert_eq!(json_body(resp).await, json!({ "removed": 2 }));
  assert_eq!(state.service.get_tally(1).await.unwrap(), Tally::default());
}
