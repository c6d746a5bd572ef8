//! Request and response types for all kicker-daemon HTTP endpoints.
//!
//! No business logic lives here.

use kicker_db::{MatchStatistics, PlayerGames};
use kicker_match::{MatchSnapshot, PlayerId, Timestamp};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    /// "idle" | "awaiting_kickoff" | "live"
    pub match_status: String,
    pub db_configured: bool,
}

// ---------------------------------------------------------------------------
// /v1/match/*
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartMatchRequest {
    pub home_players: Vec<PlayerId>,
    pub away_players: Vec<PlayerId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResponse {
    #[serde(flatten)]
    pub snapshot: MatchSnapshot,
    /// True when the sensor log could not be read for this answer.
    pub stale: bool,
}

// ---------------------------------------------------------------------------
// /v1/sensor
// ---------------------------------------------------------------------------

/// Live sensor push. `kind` is `kickoff` | `goal_home` | `goal_away`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorPushRequest {
    pub kind: String,
    /// Defaults to now. Refused when ahead of the daemon clock.
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// /v1/players
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPlayerRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletePlayerResponse {
    pub deleted: PlayerId,
    /// Final snapshot of the match that had to be ended first, if any.
    pub ended_match: Option<MatchSnapshot>,
}

// ---------------------------------------------------------------------------
// /v1/statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatisticsResponse {
    #[serde(flatten)]
    pub totals: MatchStatistics,
    pub top_players: Vec<PlayerGames>,
}
