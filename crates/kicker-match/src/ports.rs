//! Boundaries between the engine and the outside world.
//!
//! This module defines **only** the port traits and the plain data they
//! carry. Concrete adapters live elsewhere (`kicker-db` for Postgres, the
//! daemon's broadcast bus, `kicker-testkit` for in-memory fakes).

use anyhow::Result;
use async_trait::async_trait;

use crate::{MatchEvent, MatchId, PlayerId, SensorEvent, SensorKind, Timestamp};

// ---------------------------------------------------------------------------
// Event source
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventOrder {
    NewestFirst,
    OldestFirst,
}

/// Filter for [`EventSource::query_events_after`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventQuery {
    /// Exclusive lower bound on the event timestamp.
    pub after: Timestamp,
    pub kinds: Vec<SensorKind>,
    pub order: EventOrder,
    pub limit: Option<u32>,
}

impl EventQuery {
    /// Most recent kickoff strictly after `after`.
    pub fn latest_kickoff(after: Timestamp) -> Self {
        Self {
            after,
            kinds: vec![SensorKind::Kickoff],
            order: EventOrder::NewestFirst,
            limit: Some(1),
        }
    }

    /// Every goal strictly after `after`, oldest first.
    pub fn goals(after: Timestamp) -> Self {
        Self {
            after,
            kinds: SensorKind::GOALS.to_vec(),
            order: EventOrder::OldestFirst,
            limit: None,
        }
    }

    /// Whether `event` passes the kind and time filter (ordering and limit
    /// are the source's job).
    pub fn matches(&self, event: &SensorEvent) -> bool {
        event.timestamp > self.after && self.kinds.contains(&event.kind)
    }
}

/// Read-only view of the append-only sensor log.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn query_events_after(&self, query: &EventQuery) -> Result<Vec<SensorEvent>>;
}

// ---------------------------------------------------------------------------
// Match record store
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewMatchRecord {
    pub opened_at: Timestamp,
    pub home_players: Vec<PlayerId>,
    pub away_players: Vec<PlayerId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalScore {
    pub home_score: u32,
    pub away_score: u32,
    pub ended_at: Timestamp,
}

/// Write side of match persistence.
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn create_match_record(&self, record: &NewMatchRecord) -> Result<MatchId>;

    async fn finalize_match_record(&self, match_id: MatchId, fin: &FinalScore) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Notification fan-out
// ---------------------------------------------------------------------------

/// Fire-and-forget broadcast to viewers. Implementations must not block.
pub trait Notifier: Send + Sync {
    fn broadcast(&self, event: &MatchEvent);
}
