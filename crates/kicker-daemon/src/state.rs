//! Shared runtime state for kicker-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The match itself lives
//! in [`MatchController`]; this module only wires it to the SSE bus and owns
//! the background tasks (heartbeat, periodic reconcile).

use std::sync::Arc;
use std::time::Duration;

use kicker_match::{MatchController, MatchEvent, Notifier, ReconcileOutcome, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// BusMsg: SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat {
        ts_millis: i64,
    },
    GameStarted {
        start_time: Timestamp,
    },
    ScoreUpdate {
        home_score: u32,
        away_score: u32,
        needs_kickoff: bool,
    },
    LogLine {
        level: String,
        msg: String,
    },
}

impl BusMsg {
    /// SSE `event:` name.
    pub fn event_name(&self) -> &'static str {
        match self {
            BusMsg::Heartbeat { .. } => "heartbeat",
            BusMsg::GameStarted { .. } => "game_started",
            BusMsg::ScoreUpdate { .. } => "score_update",
            BusMsg::LogLine { .. } => "log",
        }
    }

    pub fn log(level: &str, msg: impl Into<String>) -> Self {
        BusMsg::LogLine {
            level: level.to_string(),
            msg: msg.into(),
        }
    }
}

impl From<&MatchEvent> for BusMsg {
    fn from(ev: &MatchEvent) -> Self {
        match ev {
            MatchEvent::MatchStarted { start_time } => BusMsg::GameStarted {
                start_time: *start_time,
            },
            MatchEvent::ScoreUpdated {
                home_score,
                away_score,
                needs_kickoff,
            } => BusMsg::ScoreUpdate {
                home_score: *home_score,
                away_score: *away_score,
                needs_kickoff: *needs_kickoff,
            },
        }
    }
}

pub fn bus_channel(capacity: usize) -> broadcast::Sender<BusMsg> {
    let (bus, _rx) = broadcast::channel::<BusMsg>(capacity);
    bus
}

/// Forwards controller notifications onto the SSE bus.
///
/// Sending with no subscribers is not an error; the event is simply dropped.
#[derive(Clone)]
pub struct BusNotifier {
    bus: broadcast::Sender<BusMsg>,
}

impl BusNotifier {
    pub fn new(bus: broadcast::Sender<BusMsg>) -> Self {
        Self { bus }
    }
}

impl Notifier for BusNotifier {
    fn broadcast(&self, event: &MatchEvent) {
        let _ = self.bus.send(BusMsg::from(event));
    }
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    /// Sole owner of the match state.
    pub controller: Arc<MatchController>,
    /// Player/history/statistics routes need this; `None` makes them 503.
    pub db: Option<PgPool>,
}

impl AppState {
    pub fn new(
        controller: Arc<MatchController>,
        bus: broadcast::Sender<BusMsg>,
        db: Option<PgPool>,
    ) -> Self {
        Self {
            bus,
            build: BuildInfo {
                service: "kicker-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            controller,
            db,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    })
}

/// Spawn a background task that runs one reconciliation pass per `interval`.
///
/// Kickoffs and goals therefore reach SSE subscribers even when no client
/// polls the score. Passes go through the same controller lock as every
/// other mutation. A sensor-log outage is reported once on the bus as a
/// `WARN` log line, and its recovery once as `INFO`.
pub fn spawn_reconcile_tick(state: Arc<AppState>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut degraded = false;
        loop {
            ticker.tick().await;
            match state.controller.reconcile().await {
                ReconcileOutcome::SourceUnavailable => {
                    if !degraded {
                        degraded = true;
                        let _ = state.bus.send(BusMsg::log(
                            "WARN",
                            "sensor log unavailable; score may be stale",
                        ));
                    }
                }
                outcome => {
                    if degraded {
                        degraded = false;
                        info!("sensor log reachable again");
                        let _ = state
                            .bus
                            .send(BusMsg::log("INFO", "sensor log reachable again"));
                    }
                    if let ReconcileOutcome::Applied { emitted } = &outcome {
                        if !emitted.is_empty() {
                            debug!(count = emitted.len(), "reconcile tick applied events");
                        }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn match_events_keep_their_wire_names() {
        let t = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let started = BusMsg::from(&MatchEvent::MatchStarted { start_time: t });
        assert_eq!(started.event_name(), "game_started");
        let json = serde_json::to_value(&started).unwrap();
        assert_eq!(json["type"], "game_started");

        let score = BusMsg::from(&MatchEvent::ScoreUpdated {
            home_score: 2,
            away_score: 1,
            needs_kickoff: true,
        });
        assert_eq!(score.event_name(), "score_update");
        let json = serde_json::to_value(&score).unwrap();
        assert_eq!(json["type"], "score_update");
        assert_eq!(json["home_score"], 2);
        assert_eq!(json["needs_kickoff"], true);

        assert_eq!(BusMsg::log("INFO", "x").event_name(), "log");
    }

    #[test]
    fn notifier_without_subscribers_does_not_fail() {
        let bus = bus_channel(4);
        let notifier = BusNotifier::new(bus.clone());
        notifier.broadcast(&MatchEvent::MatchStarted {
            start_time: Utc::now(),
        });

        let mut rx = bus.subscribe();
        notifier.broadcast(&MatchEvent::ScoreUpdated {
            home_score: 1,
            away_score: 0,
            needs_kickoff: true,
        });
        assert!(matches!(rx.try_recv(), Ok(BusMsg::ScoreUpdate { .. })));
    }
}
