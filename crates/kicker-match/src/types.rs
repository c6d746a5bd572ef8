use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// All sensor and match times are UTC.
pub type Timestamp = DateTime<Utc>;

/// Player identifier as assigned by the roster store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub i64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// External identifier of a persisted match record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub i64);

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Sensor events
// ---------------------------------------------------------------------------

/// Classified sensor signal. Debouncing happens upstream of this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Kickoff,
    GoalHome,
    GoalAway,
}

impl SensorKind {
    pub const GOALS: [SensorKind; 2] = [SensorKind::GoalHome, SensorKind::GoalAway];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Kickoff => "kickoff",
            SensorKind::GoalHome => "goal_home",
            SensorKind::GoalAway => "goal_away",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kickoff" => Some(SensorKind::Kickoff),
            "goal_home" => Some(SensorKind::GoalHome),
            "goal_away" => Some(SensorKind::GoalAway),
            _ => None,
        }
    }

    /// Which side scored, for goal kinds.
    pub fn goal_side(&self) -> Option<Side> {
        match self {
            SensorKind::Kickoff => None,
            SensorKind::GoalHome => Some(Side::Home),
            SensorKind::GoalAway => Some(Side::Away),
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Home,
    Away,
}

/// One row of the append-only sensor log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorEvent {
    /// Assigned by the source, increasing in insertion order.
    pub id: i64,
    pub kind: SensorKind,
    pub timestamp: Timestamp,
}

impl SensorEvent {
    pub fn new(id: i64, kind: SensorKind, timestamp: Timestamp) -> Self {
        Self {
            id,
            kind,
            timestamp,
        }
    }
}

// ---------------------------------------------------------------------------
// Match status / snapshot
// ---------------------------------------------------------------------------

/// Externally visible match status.
///
/// `Ended` only appears in the final snapshot returned when a match is
/// stopped; the controller itself resets straight to `Idle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Idle,
    AwaitingKickoff,
    Live,
    Ended,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Idle => "idle",
            MatchStatus::AwaitingKickoff => "awaiting_kickoff",
            MatchStatus::Live => "live",
            MatchStatus::Ended => "ended",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of an open (or just ended) match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub match_id: MatchId,
    pub status: MatchStatus,
    /// Time of the most recently reconciled kickoff.
    pub start_time: Option<Timestamp>,
    pub home_score: u32,
    pub away_score: u32,
    pub home_players: Vec<PlayerId>,
    pub away_players: Vec<PlayerId>,
    pub needs_kickoff: bool,
    pub last_checkpoint: Timestamp,
}

impl MatchSnapshot {
    pub fn score(&self) -> (u32, u32) {
        (self.home_score, self.away_score)
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Messages the engine fans out to connected viewers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchEvent {
    MatchStarted {
        start_time: Timestamp,
    },
    ScoreUpdated {
        home_score: u32,
        away_score: u32,
        needs_kickoff: bool,
    },
}

impl MatchEvent {
    /// Wire event name used by viewers.
    pub fn name(&self) -> &'static str {
        match self {
            MatchEvent::MatchStarted { .. } => "game_started",
            MatchEvent::ScoreUpdated { .. } => "score_update",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_kind_parse_accepts_wire_names() {
        for kind in [SensorKind::Kickoff, SensorKind::GoalHome, SensorKind::GoalAway] {
            assert_eq!(SensorKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(SensorKind::parse(" GOAL_AWAY "), Some(SensorKind::GoalAway));
        assert_eq!(SensorKind::parse("penalty"), None);
    }

    #[test]
    fn match_event_serializes_with_type_tag() {
        let ev = MatchEvent::ScoreUpdated {
            home_score: 2,
            away_score: 1,
            needs_kickoff: true,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "score_updated");
        assert_eq!(json["home_score"], 2);
        assert_eq!(json["needs_kickoff"], true);
        assert_eq!(ev.name(), "score_update");
    }
}
