//! In-memory stand-ins for every port of `kicker-match`.
//!
//! Deterministic, no DB, no network. Scenario tests under `tests/` and the
//! daemon's route tests build a [`Harness`] instead of a Postgres pool.

mod notifier;
mod sensor_log;
mod store;

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use kicker_match::{Clock, MatchController, PlayerId, Timestamp};

pub use notifier::RecordingNotifier;
pub use sensor_log::MemorySensorLog;
pub use store::{MemoryMatchStore, StoredMatch};

/// Fixed reference instant all scenario timestamps are offsets from.
pub fn base_time() -> Timestamp {
    Utc.with_ymd_and_hms(2025, 6, 1, 18, 0, 0)
        .single()
        .unwrap_or_default()
}

/// `base_time() + secs`.
pub fn at(secs: i64) -> Timestamp {
    base_time() + Duration::seconds(secs)
}

/// A clock frozen at `ts`.
pub fn fixed_clock(ts: Timestamp) -> Clock {
    Arc::new(move || ts)
}

pub fn players(ids: &[i64]) -> Vec<PlayerId> {
    ids.iter().copied().map(PlayerId).collect()
}

/// Controller wired to in-memory fakes, clock frozen at `base_time()`.
pub struct Harness {
    pub log: Arc<MemorySensorLog>,
    pub store: Arc<MemoryMatchStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub controller: Arc<MatchController>,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with_log(MemorySensorLog::new())
    }

    pub fn with_log(log: MemorySensorLog) -> Self {
        let log = Arc::new(log);
        let store = Arc::new(MemoryMatchStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let controller = Arc::new(
            MatchController::new(log.clone(), store.clone(), notifier.clone())
                .with_clock(fixed_clock(base_time())),
        );
        Self {
            log,
            store,
            notifier,
            controller,
        }
    }
}
