use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use kicker_match::{EventOrder, EventQuery, EventSource, SensorEvent, SensorKind, Timestamp};

/// Append-only sensor log held in memory.
///
/// Can be switched "unavailable" to simulate an outage, and can delay every
/// query so concurrent reconciliation passes overlap.
#[derive(Default)]
pub struct MemorySensorLog {
    events: Mutex<Vec<SensorEvent>>,
    unavailable: AtomicBool,
    queries: AtomicUsize,
    query_delay: Option<Duration>,
}

impl MemorySensorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = Some(delay);
        self
    }

    /// Append an event; ids are assigned in insertion order from 1.
    pub fn push(&self, kind: SensorKind, timestamp: Timestamp) -> SensorEvent {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        let ev = SensorEvent::new(events.len() as i64 + 1, kind, timestamp);
        events.push(ev.clone());
        ev
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of queries served or refused so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSource for MemorySensorLog {
    async fn query_events_after(&self, query: &EventQuery) -> Result<Vec<SensorEvent>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.query_delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            bail!("sensor log unreachable (simulated)");
        }

        let mut hits: Vec<SensorEvent> = {
            let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
            events.iter().filter(|e| query.matches(e)).cloned().collect()
        };
        hits.sort_by_key(|e| (e.timestamp, e.id));
        if query.order == EventOrder::NewestFirst {
            hits.reverse();
        }
        if let Some(limit) = query.limit {
            hits.truncate(limit as usize);
        }
        Ok(hits)
    }
}
