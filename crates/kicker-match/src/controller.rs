//! Single owner of the match state.
//!
//! Every mutation of [`MatchState`] happens under one `tokio::sync::Mutex`:
//!
//! - Lifecycle operations (start/stop) hold the lock across their store write,
//!   so the in-memory transition happens only after the record is persisted
//!   and no reconciliation can interleave.
//! - A reconciliation pass plans its query under the lock, releases it for the
//!   sensor-log read, then re-locks and applies the batch only if the
//!   [`ReconcileCursor`] is unchanged. The applied-or-not decision is atomic
//!   with the checkpoint advance.
//! - A live push that was appended to the sensor log is followed by
//!   [`MatchController::catch_up`], the same query and apply path as polling,
//!   run under the lock. Without a log, [`MatchController::ingest_live`]
//!   applies the single event through the same transition functions.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    EventSource, FinalScore, MatchError, MatchEvent, MatchSnapshot, MatchState, MatchStatus,
    MatchStore, NewMatchRecord, Notifier, OpenMatch, PlayerId, SensorEvent, Timestamp,
};

/// Clock skew tolerated on pushed sensor timestamps.
pub const MAX_PUSH_SKEW_SECS: i64 = 5;

/// Wall-clock source, injectable for tests.
pub type Clock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(chrono::Utc::now)
}

/// Result of one reconciliation pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No match open; nothing to do.
    Idle,
    /// The batch was applied. `emitted` may be empty when nothing was new.
    Applied { emitted: Vec<MatchEvent> },
    /// State moved while the sensor log was being read; batch dropped.
    Superseded,
    /// Sensor log unreachable; state untouched.
    SourceUnavailable,
}

impl ReconcileOutcome {
    pub fn is_stale(&self) -> bool {
        matches!(self, ReconcileOutcome::SourceUnavailable)
    }
}

/// Answer to a score query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreReport {
    pub snapshot: MatchSnapshot,
    /// True when this query's reconciliation could not reach the sensor log.
    pub stale: bool,
}

pub struct MatchController {
    state: Mutex<MatchState>,
    source: Arc<dyn EventSource>,
    store: Arc<dyn MatchStore>,
    notifier: Arc<dyn Notifier>,
    clock: Clock,
}

impl MatchController {
    pub fn new(
        source: Arc<dyn EventSource>,
        store: Arc<dyn MatchStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            state: Mutex::new(MatchState::Idle),
            source,
            store,
            notifier,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Open a new match.
    ///
    /// The match record is persisted before the in-memory state changes; on a
    /// store failure the controller stays `Idle`.
    pub async fn start_match(
        &self,
        home_players: Vec<PlayerId>,
        away_players: Vec<PlayerId>,
    ) -> Result<MatchSnapshot, MatchError> {
        validate_rosters(&home_players, &away_players)?;

        let mut st = self.state.lock().await;
        if let Some(open) = st.open_match() {
            return Err(MatchError::InvalidRequest(format!(
                "match {} is already open; stop it first",
                open.match_id
            )));
        }

        let opened_at = (self.clock)();
        let record = NewMatchRecord {
            opened_at,
            home_players: home_players.clone(),
            away_players: away_players.clone(),
        };
        let match_id = self
            .store
            .create_match_record(&record)
            .await
            .map_err(|e| {
                error!(error = %format!("{e:#}"), "create match record failed");
                MatchError::PersistenceFailure(format!("{e:#}"))
            })?;

        let opened = OpenMatch::new(match_id, home_players, away_players, opened_at);
        let snapshot = opened.snapshot(MatchStatus::AwaitingKickoff);
        *st = MatchState::AwaitingKickoff(opened);

        info!(
            %match_id,
            home = ?snapshot.home_players,
            away = ?snapshot.away_players,
            checkpoint = %opened_at,
            "match opened; awaiting kickoff"
        );
        Ok(snapshot)
    }

    /// Persist the final score and close the match.
    ///
    /// Returns the final snapshot with status `Ended`. On a store failure the
    /// match stays open so the stop can be retried.
    pub async fn stop_match(&self) -> Result<MatchSnapshot, MatchError> {
        let mut st = self.state.lock().await;
        let (match_id, final_snapshot) = match st.open_match() {
            Some(open) => (open.match_id, open.snapshot(MatchStatus::Ended)),
            None => return Err(MatchError::NoActiveMatch),
        };

        let fin = FinalScore {
            home_score: final_snapshot.home_score,
            away_score: final_snapshot.away_score,
            ended_at: (self.clock)(),
        };
        self.store
            .finalize_match_record(match_id, &fin)
            .await
            .map_err(|e| {
                error!(%match_id, error = %format!("{e:#}"), "finalize match record failed");
                MatchError::PersistenceFailure(format!("{e:#}"))
            })?;

        st.close();
        info!(
            %match_id,
            home_score = fin.home_score,
            away_score = fin.away_score,
            "match finalized"
        );
        Ok(final_snapshot)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Pure read; never touches the sensor log.
    pub async fn snapshot(&self) -> Result<MatchSnapshot, MatchError> {
        self.state
            .lock()
            .await
            .snapshot()
            .ok_or(MatchError::NoActiveMatch)
    }

    pub async fn status(&self) -> MatchStatus {
        self.state.lock().await.status()
    }

    /// Reconcile once, then report the (possibly just updated) state.
    pub async fn query_score(&self) -> Result<ScoreReport, MatchError> {
        if self.state.lock().await.is_idle() {
            return Err(MatchError::NoActiveMatch);
        }
        let outcome = self.reconcile().await;
        let snapshot = self.snapshot().await?;
        Ok(ScoreReport {
            snapshot,
            stale: outcome.is_stale(),
        })
    }

    // -----------------------------------------------------------------------
    // Reconciliation
    // -----------------------------------------------------------------------

    /// One reconciliation pass against the sensor log.
    pub async fn reconcile(&self) -> ReconcileOutcome {
        let (cursor, query) = {
            let st = self.state.lock().await;
            match (st.cursor(), st.next_query()) {
                (Some(cursor), Some(query)) => (cursor, query),
                _ => return ReconcileOutcome::Idle,
            }
        };

        let events = match self.source.query_events_after(&query).await {
            Ok(events) => events,
            Err(e) => {
                warn!(
                    match_id = %cursor.match_id,
                    error = %format!("{e:#}"),
                    "sensor log unavailable; reconcile pass abandoned"
                );
                return ReconcileOutcome::SourceUnavailable;
            }
        };

        let mut st = self.state.lock().await;
        if st.cursor() != Some(cursor) {
            debug!(
                match_id = %cursor.match_id,
                "state moved during sensor read; dropping batch"
            );
            return ReconcileOutcome::Superseded;
        }

        let emitted = self.apply_locked(&mut st, &events);
        ReconcileOutcome::Applied { emitted }
    }

    /// Catch up with the sensor log after a live push was appended to it.
    ///
    /// Runs reconciliation passes under the state lock until one applies
    /// nothing, so events already logged but not yet polled are consumed in
    /// order together with the pushed one.
    pub async fn catch_up(&self) -> Result<ScoreReport, MatchError> {
        let mut st = self.state.lock().await;
        let mut stale = false;
        while let Some(query) = st.next_query() {
            match self.source.query_events_after(&query).await {
                Ok(events) => {
                    if self.apply_locked(&mut st, &events).is_empty() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %format!("{e:#}"), "sensor log unavailable after live push");
                    stale = true;
                    break;
                }
            }
        }
        let snapshot = st.snapshot().ok_or(MatchError::NoActiveMatch)?;
        Ok(ScoreReport { snapshot, stale })
    }

    /// Apply a pushed sensor event directly, for setups with no sensor log
    /// to catch up with.
    pub async fn ingest_live(&self, event: SensorEvent) -> Result<MatchSnapshot, MatchError> {
        let mut st = self.state.lock().await;
        if st.is_idle() {
            return Err(MatchError::NoActiveMatch);
        }
        self.check_push_time(event.timestamp)?;
        debug!(kind = %event.kind, ts = %event.timestamp, "live sensor push");
        self.apply_locked(&mut st, std::slice::from_ref(&event));
        st.snapshot().ok_or(MatchError::NoActiveMatch)
    }

    pub fn now(&self) -> Timestamp {
        (self.clock)()
    }

    /// Pushed events may not be stamped ahead of the controller clock by more
    /// than [`MAX_PUSH_SKEW_SECS`]; a future checkpoint would hide every real
    /// event until the clock caught up.
    pub fn check_push_time(&self, ts: Timestamp) -> Result<(), MatchError> {
        let limit = self.now() + chrono::Duration::seconds(MAX_PUSH_SKEW_SECS);
        if ts > limit {
            return Err(MatchError::InvalidRequest(format!(
                "sensor timestamp {ts} is ahead of the clock"
            )));
        }
        Ok(())
    }

    /// Caller holds the state lock.
    fn apply_locked(&self, st: &mut MatchState, events: &[SensorEvent]) -> Vec<MatchEvent> {
        let emitted = st.apply(events);
        if let Some(open) = st.open_match() {
            for ev in &emitted {
                match ev {
                    MatchEvent::MatchStarted { start_time } => {
                        info!(
                            match_id = %open.match_id,
                            %start_time,
                            "kickoff reconciled; match live"
                        );
                    }
                    MatchEvent::ScoreUpdated {
                        home_score,
                        away_score,
                        ..
                    } => {
                        info!(match_id = %open.match_id, home_score, away_score, "goal reconciled");
                    }
                }
                self.notifier.broadcast(ev);
            }
        }
        emitted
    }
}

/// Rosters must be non-empty and a player may appear only once.
pub fn validate_rosters(home: &[PlayerId], away: &[PlayerId]) -> Result<(), MatchError> {
    if home.is_empty() || away.is_empty() {
        return Err(MatchError::InvalidRequest(
            "both teams need at least one player".to_string(),
        ));
    }
    let mut seen = BTreeSet::new();
    for p in home.iter().chain(away) {
        if !seen.insert(*p) {
            return Err(MatchError::InvalidRequest(format!(
                "player {p} listed more than once"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rosters_reject_empty_and_duplicates() {
        assert!(validate_rosters(&[PlayerId(1)], &[PlayerId(2)]).is_ok());
        assert!(matches!(
            validate_rosters(&[], &[PlayerId(2)]),
            Err(MatchError::InvalidRequest(_))
        ));
        assert!(matches!(
            validate_rosters(&[PlayerId(1)], &[PlayerId(1)]),
            Err(MatchError::InvalidRequest(_))
        ));
        assert!(matches!(
            validate_rosters(&[PlayerId(3), PlayerId(3)], &[PlayerId(1)]),
            Err(MatchError::InvalidRequest(_))
        ));
    }
}
