//! Property: checkpoint monotonicity and at-most-once goals.
//!
//! Drives the pure state machine with arbitrary sensor streams, delivered in
//! arbitrary overlapping batches (the way repeated polls would see them).
//!
//! 1. `last_checkpoint` never regresses across any number of applies.
//! 2. Total score never exceeds the number of distinct goal events.
//! 3. Re-applying the full log after the fact never changes the score.

use chrono::{Duration, TimeZone, Utc};
use kicker_match::{MatchId, MatchState, PlayerId, SensorEvent, SensorKind, Timestamp};
use proptest::prelude::*;

fn base() -> Timestamp {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

fn kind_strategy() -> impl Strategy<Value = SensorKind> {
    prop_oneof![
        Just(SensorKind::Kickoff),
        Just(SensorKind::GoalHome),
        Just(SensorKind::GoalAway),
    ]
}

/// Strictly increasing timestamps, one second apart at minimum.
fn log_strategy() -> impl Strategy<Value = Vec<SensorEvent>> {
    prop::collection::vec((kind_strategy(), 1i64..5), 0..40).prop_map(|raw| {
        let mut ts = base();
        raw.into_iter()
            .enumerate()
            .map(|(i, (kind, gap))| {
                ts += Duration::seconds(gap);
                SensorEvent::new(i as i64 + 1, kind, ts)
            })
            .collect()
    })
}

/// Serve what the next reconciliation query would get from `log[..visible]`.
fn poll(st: &MatchState, log: &[SensorEvent], visible: usize) -> Vec<SensorEvent> {
    let Some(q) = st.next_query() else {
        return Vec::new();
    };
    let mut hits: Vec<SensorEvent> = log[..visible]
        .iter()
        .filter(|e| q.matches(e))
        .cloned()
        .collect();
    if q.limit == Some(1) {
        hits.sort_by_key(|e| std::cmp::Reverse(e.timestamp));
        hits.truncate(1);
    }
    hits
}

proptest! {
    #[test]
    fn checkpoint_never_regresses_and_goals_count_once(
        log in log_strategy(),
        steps in prop::collection::vec(0usize..6, 1..60),
    ) {
        let mut st = MatchState::open(MatchId(1), vec![PlayerId(1)], vec![PlayerId(2)], base());
        let mut last_cp = base();
        let mut visible = 0usize;

        for step in steps {
            visible = (visible + step).min(log.len());
            let batch = poll(&st, &log, visible);
            st.apply(&batch);

            let snap = st.snapshot().expect("match stays open");
            prop_assert!(snap.last_checkpoint >= last_cp);
            last_cp = snap.last_checkpoint;
        }

        let goals = log.iter().filter(|e| e.kind.goal_side().is_some()).count() as u32;
        let (home, away) = st.snapshot().unwrap().score();
        prop_assert!(home + away <= goals);

        // Replay everything already seen, verbatim: score must not move.
        let before = st.snapshot().unwrap().score();
        st.apply(
            &log[..visible]
                .iter()
                .filter(|e| e.timestamp <= last_cp)
                .cloned()
                .collect::<Vec<_>>(),
        );
        prop_assert_eq!(st.snapshot().unwrap().score(), before);
    }
}
