//! Scenario: sensor log outage during a live match.
//!
//! # Invariants under test
//!
//! 1. While the log is unreachable, score queries still answer with the last
//!    known state and flag it stale.
//! 2. The outage changes neither score, status, nor checkpoint.
//! 3. Once the log is back, goals recorded during the outage are counted.

use kicker_match::{MatchStatus, ReconcileOutcome, SensorKind};
use kicker_testkit::{at, players, Harness};

#[tokio::test]
async fn outage_reports_stale_and_leaves_state_alone() {
    let h = Harness::new();
    h.controller
        .start_match(players(&[1]), players(&[2]))
        .await
        .unwrap();
    h.log.push(SensorKind::Kickoff, at(1));
    h.controller.query_score().await.unwrap();
    let before = h.controller.snapshot().await.unwrap();

    h.log.set_unavailable(true);
    h.log.push(SensorKind::GoalHome, at(2));

    let report = h.controller.query_score().await.unwrap();
    assert!(report.stale);
    assert_eq!(report.snapshot, before);
    assert_eq!(
        h.controller.reconcile().await,
        ReconcileOutcome::SourceUnavailable
    );
    assert!(h.notifier.score_updates().is_empty());

    h.log.set_unavailable(false);
    let report = h.controller.query_score().await.unwrap();
    assert!(!report.stale);
    assert_eq!(report.snapshot.score(), (1, 0));
    assert_eq!(report.snapshot.status, MatchStatus::AwaitingKickoff);
}

#[tokio::test]
async fn idle_controller_never_queries_the_log() {
    let h = Harness::new();
    assert_eq!(h.controller.reconcile().await, ReconcileOutcome::Idle);
    assert!(h.controller.query_score().await.is_err());
    assert_eq!(h.log.query_count(), 0);
}
