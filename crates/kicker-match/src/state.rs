//! Match state machine.
//!
//! # Design
//!
//! The match is one explicit enum. Idle carries no match fields at all, and
//! "needs kickoff" is the `AwaitingKickoff` variant rather than a flag, so the
//! flag combinations of a boolean encoding cannot be represented.
//!
//! ```text
//!   open()                kickoff > checkpoint
//!   ──────► AwaitingKickoff ─────────────────────► Live
//!                ▲                                   │
//!                └──────── goal(s) > checkpoint ─────┘
//!
//!   close(): any open state ──► Idle
//! ```
//!
//! Every sensor event goes through [`MatchState::apply`]. Events at or before
//! the checkpoint are dropped, so re-applying an already applied batch is a
//! no-op. All logic is pure: no IO, no clock.

use crate::{
    Checkpoint, EventQuery, MatchEvent, MatchId, MatchSnapshot, MatchStatus, PlayerId,
    SensorEvent, SensorKind, Side, Timestamp,
};

// ---------------------------------------------------------------------------
// OpenMatch
// ---------------------------------------------------------------------------

/// Fields that exist only while a match is open.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenMatch {
    pub match_id: MatchId,
    pub home_players: Vec<PlayerId>,
    pub away_players: Vec<PlayerId>,
    pub home_score: u32,
    pub away_score: u32,
    /// Overwritten by every reconciled kickoff, re-kickoffs after goals
    /// included.
    pub start_time: Option<Timestamp>,
    pub checkpoint: Checkpoint,
}

impl OpenMatch {
    pub fn new(
        match_id: MatchId,
        home_players: Vec<PlayerId>,
        away_players: Vec<PlayerId>,
        opened_at: Timestamp,
    ) -> Self {
        Self {
            match_id,
            home_players,
            away_players,
            home_score: 0,
            away_score: 0,
            start_time: None,
            checkpoint: Checkpoint::starting_at(opened_at),
        }
    }

    pub fn snapshot(&self, status: MatchStatus) -> MatchSnapshot {
        MatchSnapshot {
            match_id: self.match_id,
            status,
            start_time: self.start_time,
            home_score: self.home_score,
            away_score: self.away_score,
            home_players: self.home_players.clone(),
            away_players: self.away_players.clone(),
            needs_kickoff: status == MatchStatus::AwaitingKickoff,
            last_checkpoint: self.checkpoint.last_consumed(),
        }
    }

    pub fn has_player(&self, player: PlayerId) -> bool {
        self.home_players.contains(&player) || self.away_players.contains(&player)
    }
}

// ---------------------------------------------------------------------------
// ReconcileCursor
// ---------------------------------------------------------------------------

/// Identity of the state a reconciliation query was planned against.
///
/// If the cursor changed between planning and applying, another pass already
/// consumed (part of) the batch and the stale batch must be dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconcileCursor {
    pub match_id: MatchId,
    pub status: MatchStatus,
    pub checkpoint: Timestamp,
}

// ---------------------------------------------------------------------------
// MatchState
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum MatchState {
    /// No match is open.
    #[default]
    Idle,
    /// Opened, or a goal was scored; goals are not counted until a kickoff.
    AwaitingKickoff(OpenMatch),
    /// Ball in play; goals are counted.
    Live(OpenMatch),
}

impl MatchState {
    /// A freshly opened match waiting for its first kickoff.
    pub fn open(
        match_id: MatchId,
        home_players: Vec<PlayerId>,
        away_players: Vec<PlayerId>,
        opened_at: Timestamp,
    ) -> Self {
        MatchState::AwaitingKickoff(OpenMatch::new(
            match_id,
            home_players,
            away_players,
            opened_at,
        ))
    }

    pub fn status(&self) -> MatchStatus {
        match self {
            MatchState::Idle => MatchStatus::Idle,
            MatchState::AwaitingKickoff(_) => MatchStatus::AwaitingKickoff,
            MatchState::Live(_) => MatchStatus::Live,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, MatchState::Idle)
    }

    pub fn open_match(&self) -> Option<&OpenMatch> {
        match self {
            MatchState::Idle => None,
            MatchState::AwaitingKickoff(m) | MatchState::Live(m) => Some(m),
        }
    }

    pub fn snapshot(&self) -> Option<MatchSnapshot> {
        self.open_match().map(|m| m.snapshot(self.status()))
    }

    pub fn cursor(&self) -> Option<ReconcileCursor> {
        self.open_match().map(|m| ReconcileCursor {
            match_id: m.match_id,
            status: self.status(),
            checkpoint: m.checkpoint.last_consumed(),
        })
    }

    /// The sensor-log query the next reconciliation pass needs, if any.
    pub fn next_query(&self) -> Option<EventQuery> {
        match self {
            MatchState::Idle => None,
            MatchState::AwaitingKickoff(m) => {
                Some(EventQuery::latest_kickoff(m.checkpoint.last_consumed()))
            }
            MatchState::Live(m) => Some(EventQuery::goals(m.checkpoint.last_consumed())),
        }
    }

    /// Apply a batch of sensor events and return the notifications to send.
    ///
    /// - `AwaitingKickoff`: the latest unseen kickoff starts play. Any goal in
    ///   the same batch is left for the next pass.
    /// - `Live`: every unseen goal is counted, in order, and the match goes
    ///   back to awaiting a kickoff. The checkpoint then moves to the last
    ///   applied goal.
    /// - `Idle`: nothing.
    pub fn apply(&mut self, events: &[SensorEvent]) -> Vec<MatchEvent> {
        let (next, emitted) = match std::mem::take(self) {
            MatchState::Idle => (MatchState::Idle, Vec::new()),
            MatchState::AwaitingKickoff(m) => apply_kickoff(m, events),
            MatchState::Live(m) => apply_goals(m, events),
        };
        *self = next;
        emitted
    }

    /// Close the match, returning its final fields. State becomes `Idle`.
    pub fn close(&mut self) -> Option<OpenMatch> {
        match std::mem::take(self) {
            MatchState::Idle => None,
            MatchState::AwaitingKickoff(m) | MatchState::Live(m) => Some(m),
        }
    }
}

fn apply_kickoff(mut m: OpenMatch, events: &[SensorEvent]) -> (MatchState, Vec<MatchEvent>) {
    let kickoff = events
        .iter()
        .filter(|e| e.kind == SensorKind::Kickoff && m.checkpoint.check(e).is_unseen())
        .max_by_key(|e| (e.timestamp, e.id));

    let Some(kickoff) = kickoff else {
        return (MatchState::AwaitingKickoff(m), Vec::new());
    };

    m.start_time = Some(kickoff.timestamp);
    m.checkpoint.advance_to(kickoff.timestamp);

    let started = MatchEvent::MatchStarted {
        start_time: kickoff.timestamp,
    };
    (MatchState::Live(m), vec![started])
}

fn apply_goals(mut m: OpenMatch, events: &[SensorEvent]) -> (MatchState, Vec<MatchEvent>) {
    let mut emitted = Vec::new();
    let mut last_applied: Option<Timestamp> = None;

    for event in events {
        let Some(side) = event.kind.goal_side() else {
            continue;
        };
        if !m.checkpoint.check(event).is_unseen() {
            continue;
        }

        match side {
            Side::Home => m.home_score = m.home_score.saturating_add(1),
            Side::Away => m.away_score = m.away_score.saturating_add(1),
        }
        emitted.push(MatchEvent::ScoreUpdated {
            home_score: m.home_score,
            away_score: m.away_score,
            needs_kickoff: true,
        });
        last_applied = Some(last_applied.map_or(event.timestamp, |t| t.max(event.timestamp)));
    }

    match last_applied {
        None => (MatchState::Live(m), emitted),
        Some(ts) => {
            m.checkpoint.advance_to(ts);
            (MatchState::AwaitingKickoff(m), emitted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn t(secs: i64) -> Timestamp {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(secs)
    }

    fn ev(id: i64, kind: SensorKind, secs: i64) -> SensorEvent {
        SensorEvent::new(id, kind, t(secs))
    }

    fn opened() -> MatchState {
        MatchState::open(MatchId(7), vec![PlayerId(1)], vec![PlayerId(2)], t(0))
    }

    fn live() -> MatchState {
        let mut st = opened();
        st.apply(&[ev(1, SensorKind::Kickoff, 1)]);
        assert_eq!(st.status(), MatchStatus::Live);
        st
    }

    #[test]
    fn idle_ignores_everything() {
        let mut st = MatchState::Idle;
        let out = st.apply(&[ev(1, SensorKind::Kickoff, 5), ev(2, SensorKind::GoalHome, 6)]);
        assert!(out.is_empty());
        assert!(st.is_idle());
        assert!(st.snapshot().is_none());
        assert!(st.next_query().is_none());
    }

    #[test]
    fn open_match_awaits_kickoff_at_zero() {
        let snap = opened().snapshot().unwrap();
        assert_eq!(snap.status, MatchStatus::AwaitingKickoff);
        assert_eq!(snap.score(), (0, 0));
        assert!(snap.needs_kickoff);
        assert_eq!(snap.start_time, None);
        assert_eq!(snap.last_checkpoint, t(0));
    }

    #[test]
    fn kickoff_goes_live_and_emits_one_started() {
        let mut st = opened();
        let out = st.apply(&[ev(1, SensorKind::Kickoff, 3)]);

        assert_eq!(out, vec![MatchEvent::MatchStarted { start_time: t(3) }]);
        let snap = st.snapshot().unwrap();
        assert_eq!(snap.status, MatchStatus::Live);
        assert!(!snap.needs_kickoff);
        assert_eq!(snap.start_time, Some(t(3)));
        assert_eq!(snap.last_checkpoint, t(3));
    }

    #[test]
    fn latest_kickoff_wins() {
        let mut st = opened();
        st.apply(&[ev(1, SensorKind::Kickoff, 3), ev(2, SensorKind::Kickoff, 8)]);
        assert_eq!(st.snapshot().unwrap().start_time, Some(t(8)));
    }

    #[test]
    fn kickoff_before_open_is_ignored() {
        let mut st = MatchState::open(MatchId(1), vec![PlayerId(1)], vec![PlayerId(2)], t(10));
        let out = st.apply(&[ev(1, SensorKind::Kickoff, 10), ev(2, SensorKind::Kickoff, 4)]);
        assert!(out.is_empty());
        assert_eq!(st.status(), MatchStatus::AwaitingKickoff);
    }

    #[test]
    fn goals_in_kickoff_batch_are_deferred() {
        let mut st = opened();
        let out = st.apply(&[ev(1, SensorKind::Kickoff, 2), ev(2, SensorKind::GoalHome, 3)]);
        assert_eq!(out.len(), 1);
        assert_eq!(st.snapshot().unwrap().score(), (0, 0));

        // The deferred goal is still after the checkpoint and counts next pass.
        let out = st.apply(&[ev(2, SensorKind::GoalHome, 3)]);
        assert_eq!(out.len(), 1);
        assert_eq!(st.snapshot().unwrap().score(), (1, 0));
    }

    #[test]
    fn goal_batch_is_applied_whole() {
        let mut st = live();
        let out = st.apply(&[ev(2, SensorKind::GoalHome, 5), ev(3, SensorKind::GoalAway, 9)]);

        assert_eq!(
            out,
            vec![
                MatchEvent::ScoreUpdated {
                    home_score: 1,
                    away_score: 0,
                    needs_kickoff: true
                },
                MatchEvent::ScoreUpdated {
                    home_score: 1,
                    away_score: 1,
                    needs_kickoff: true
                },
            ]
        );
        let snap = st.snapshot().unwrap();
        assert_eq!(snap.status, MatchStatus::AwaitingKickoff);
        assert!(snap.needs_kickoff);
        assert_eq!(snap.score(), (1, 1));
        assert_eq!(snap.last_checkpoint, t(9));
    }

    #[test]
    fn replayed_goal_batch_is_a_noop() {
        let mut st = live();
        let batch = [ev(2, SensorKind::GoalHome, 5)];
        st.apply(&batch);
        st.apply(&[ev(3, SensorKind::Kickoff, 6)]);

        let out = st.apply(&batch);
        assert!(out.is_empty());
        assert_eq!(st.snapshot().unwrap().score(), (1, 0));
    }

    #[test]
    fn goal_while_awaiting_kickoff_is_not_counted() {
        let mut st = opened();
        let out = st.apply(&[ev(1, SensorKind::GoalAway, 4)]);
        assert!(out.is_empty());
        assert_eq!(st.snapshot().unwrap().score(), (0, 0));
        assert_eq!(st.snapshot().unwrap().last_checkpoint, t(0));
    }

    #[test]
    fn goal_in_dead_window_is_lost_after_rekickoff() {
        let mut st = live();
        st.apply(&[ev(2, SensorKind::GoalHome, 5)]);
        // Kickoff at 8 is reconciled; the goal at 7 sits before the new checkpoint.
        st.apply(&[ev(4, SensorKind::Kickoff, 8)]);
        let out = st.apply(&[ev(3, SensorKind::GoalAway, 7)]);
        assert!(out.is_empty());
        assert_eq!(st.snapshot().unwrap().score(), (1, 0));
    }

    #[test]
    fn rekickoff_overwrites_start_time() {
        let mut st = live();
        st.apply(&[ev(2, SensorKind::GoalHome, 5)]);
        st.apply(&[ev(3, SensorKind::Kickoff, 12)]);
        assert_eq!(st.snapshot().unwrap().start_time, Some(t(12)));
    }

    #[test]
    fn next_query_follows_phase() {
        let st = opened();
        assert_eq!(st.next_query(), Some(EventQuery::latest_kickoff(t(0))));
        let st = live();
        assert_eq!(st.next_query(), Some(EventQuery::goals(t(1))));
    }

    #[test]
    fn close_returns_fields_and_resets() {
        let mut st = live();
        st.apply(&[ev(2, SensorKind::GoalAway, 5)]);
        let closed = st.close().unwrap();
        assert_eq!(closed.away_score, 1);
        assert!(st.is_idle());
        assert!(st.close().is_none());
    }
}
