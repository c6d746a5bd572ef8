//! Axum router and all HTTP handlers for kicker-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Match routes go straight to the [`MatchController`];
//! player, history and statistics routes need the database pool.
//!
//! [`MatchController`]: kicker_match::MatchController

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{delete, get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use kicker_match::{MatchError, MatchStatus, PlayerId, SensorEvent, SensorKind};
use sqlx::PgPool;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::{
    api_types::{
        AddPlayerRequest, DeletePlayerResponse, HealthResponse, ScoreResponse, SensorPushRequest,
        StartMatchRequest, StatisticsResponse,
    },
    error::ApiError,
    state::{uptime_secs, AppState, BusMsg},
};

const RECENT_GAMES: i64 = 5;
const TOP_PLAYERS: i64 = 5;

type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/stream", get(stream))
        .route("/v1/match", get(match_snapshot))
        .route("/v1/match/start", post(match_start))
        .route("/v1/match/stop", post(match_stop))
        .route("/v1/match/score", get(match_score))
        .route("/v1/sensor", post(sensor_push))
        .route("/v1/players", get(players_list).post(players_add))
        .route("/v1/players/:id", delete(players_delete))
        .route("/v1/games/recent", get(games_recent))
        .route("/v1/statistics", get(statistics))
        .with_state(state)
}

fn require_db(st: &AppState) -> ApiResult<&PgPool> {
    st.db.as_ref().ok_or(ApiError::DbUnavailable)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let match_status = st.controller.status().await;
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
            uptime_secs: uptime_secs(),
            match_status: match_status.as_str().to_string(),
            db_configured: st.db.is_some(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Match lifecycle
// ---------------------------------------------------------------------------

/// StartMatch. With a database, every listed player must exist.
pub(crate) async fn match_start(
    State(st): State<Arc<AppState>>,
    Json(req): Json<StartMatchRequest>,
) -> ApiResult<Response> {
    if let Some(pool) = st.db.as_ref() {
        for id in req.home_players.iter().chain(&req.away_players) {
            if kicker_db::fetch_player(pool, *id).await?.is_none() {
                return Err(MatchError::InvalidRequest(format!("unknown player {id}")).into());
            }
        }
    }

    let snap = st
        .controller
        .start_match(req.home_players, req.away_players)
        .await?;
    let _ = st.bus.send(BusMsg::log(
        "INFO",
        format!("match {} opened; awaiting kickoff", snap.match_id),
    ));
    Ok((StatusCode::OK, Json(snap)).into_response())
}

pub(crate) async fn match_stop(State(st): State<Arc<AppState>>) -> ApiResult<Response> {
    let fin = st.controller.stop_match().await?;
    let _ = st.bus.send(BusMsg::log(
        "INFO",
        format!(
            "match {} ended {}:{}",
            fin.match_id, fin.home_score, fin.away_score
        ),
    ));
    Ok((StatusCode::OK, Json(fin)).into_response())
}

/// QueryScore: reconcile once, then answer. `stale` flags a sensor outage.
pub(crate) async fn match_score(State(st): State<Arc<AppState>>) -> ApiResult<Response> {
    let report = st.controller.query_score().await?;
    Ok((
        StatusCode::OK,
        Json(ScoreResponse {
            snapshot: report.snapshot,
            stale: report.stale,
        }),
    )
        .into_response())
}

/// Current state without touching the sensor log.
pub(crate) async fn match_snapshot(State(st): State<Arc<AppState>>) -> ApiResult<Response> {
    let snap = st.controller.snapshot().await?;
    Ok((StatusCode::OK, Json(snap)).into_response())
}

// ---------------------------------------------------------------------------
// POST /v1/sensor
// ---------------------------------------------------------------------------

/// Live sensor push.
///
/// With a database the event is appended to the sensor log and the
/// controller then catches up with the log, so goals already logged but not
/// yet polled are counted too. Without one the event is applied in memory.
/// Timestamps ahead of the controller clock are refused.
pub(crate) async fn sensor_push(
    State(st): State<Arc<AppState>>,
    Json(req): Json<SensorPushRequest>,
) -> ApiResult<Response> {
    let kind = SensorKind::parse(&req.kind)
        .ok_or_else(|| MatchError::InvalidRequest(format!("unknown sensor kind {:?}", req.kind)))?;

    let Some(pool) = st.db.as_ref() else {
        let ts = req.timestamp.unwrap_or_else(|| st.controller.now());
        let snapshot = st
            .controller
            .ingest_live(SensorEvent::new(0, kind, ts))
            .await?;
        return Ok((
            StatusCode::OK,
            Json(ScoreResponse {
                snapshot,
                stale: false,
            }),
        )
            .into_response());
    };

    if st.controller.status().await == MatchStatus::Idle {
        return Err(MatchError::NoActiveMatch.into());
    }
    if let Some(ts) = req.timestamp {
        st.controller.check_push_time(ts)?;
    }
    kicker_db::insert_sensor_event(pool, kind, req.timestamp).await?;

    let report = st.controller.catch_up().await?;
    Ok((
        StatusCode::OK,
        Json(ScoreResponse {
            snapshot: report.snapshot,
            stale: report.stale,
        }),
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

pub(crate) async fn players_list(State(st): State<Arc<AppState>>) -> ApiResult<Response> {
    let pool = require_db(&st)?;
    let players = kicker_db::list_players(pool).await?;
    Ok((StatusCode::OK, Json(players)).into_response())
}

pub(crate) async fn players_add(
    State(st): State<Arc<AppState>>,
    Json(req): Json<AddPlayerRequest>,
) -> ApiResult<Response> {
    let pool = require_db(&st)?;
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("player name must not be blank".into()));
    }
    let player = kicker_db::add_player(pool, &req.name).await?;
    info!(player_id = %player.player_id, name = %player.name, "player added");
    Ok((StatusCode::CREATED, Json(player)).into_response())
}

/// Delete a player. If the open match includes them it is ended first, with
/// its current score.
pub(crate) async fn players_delete(
    State(st): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    let pool = require_db(&st)?;
    let player_id = PlayerId(id);
    if kicker_db::fetch_player(pool, player_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("player {player_id}")));
    }

    let in_open_match = match st.controller.snapshot().await {
        Ok(snap) => snap
            .home_players
            .iter()
            .chain(&snap.away_players)
            .any(|p| *p == player_id),
        Err(_) => false,
    };
    let ended_match = if in_open_match {
        warn!(%player_id, "deleting a player in the open match; ending it first");
        Some(st.controller.stop_match().await?)
    } else {
        None
    };

    if !kicker_db::delete_player(pool, player_id).await? {
        return Err(ApiError::NotFound(format!("player {player_id}")));
    }
    info!(%player_id, "player deleted");
    Ok((
        StatusCode::OK,
        Json(DeletePlayerResponse {
            deleted: player_id,
            ended_match,
        }),
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// History and statistics
// ---------------------------------------------------------------------------

pub(crate) async fn games_recent(State(st): State<Arc<AppState>>) -> ApiResult<Response> {
    let pool = require_db(&st)?;
    let games = kicker_db::recent_matches(pool, RECENT_GAMES).await?;
    Ok((StatusCode::OK, Json(games)).into_response())
}

pub(crate) async fn statistics(State(st): State<Arc<AppState>>) -> ApiResult<Response> {
    let pool = require_db(&st)?;
    let totals = kicker_db::match_statistics(pool).await?;
    let top_players = kicker_db::top_players(pool, TOP_PLAYERS).await?;
    Ok((StatusCode::OK, Json(StatisticsResponse { totals, top_players })).into_response())
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(m.event_name()).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
