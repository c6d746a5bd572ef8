use chrono::{Duration, SubsecRound, Utc};
use kicker_match::{EventQuery, EventSource, SensorKind};

/// The sensor log honours the reconciliation query contract:
/// - strictly-after lower bound
/// - kind filter
/// - newest-first + limit 1 for kickoff, oldest-first for goals
///
/// DB-backed test. Skips if KICKER_DATABASE_URL is not set.
#[tokio::test]
async fn event_source_filters_and_orders_like_reconcile_expects() -> anyhow::Result<()> {
    let url = match std::env::var(kicker_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: KICKER_DATABASE_URL not set");
            return Ok(());
        }
    };

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await?;

    kicker_db::migrate(&pool).await?;

    // Window strictly after every existing row so leftovers in a developer DB
    // never match. Rows are removed again at the end.
    let (max_ts,): (Option<chrono::DateTime<Utc>>,) =
        sqlx::query_as("select max(occurred_at_utc) from sensor_events")
            .fetch_one(&pool)
            .await?;
    let base =
        (max_ts.unwrap_or_else(Utc::now).max(Utc::now()) + Duration::days(1)).trunc_subsecs(0);
    let at = |s: i64| base + Duration::seconds(s);

    kicker_db::insert_sensor_event(&pool, SensorKind::Kickoff, Some(at(0))).await?;
    kicker_db::insert_sensor_event(&pool, SensorKind::GoalHome, Some(at(2))).await?;
    kicker_db::insert_sensor_event(&pool, SensorKind::Kickoff, Some(at(3))).await?;
    kicker_db::insert_sensor_event(&pool, SensorKind::GoalAway, Some(at(5))).await?;
    kicker_db::insert_sensor_event(&pool, SensorKind::GoalHome, Some(at(4))).await?;

    let source = kicker_db::PgEventSource::new(pool.clone());

    // Latest kickoff strictly after `base` is the one at +3s.
    let kick = source
        .query_events_after(&EventQuery::latest_kickoff(at(0)))
        .await?;
    assert_eq!(kick.len(), 1);
    assert_eq!(kick[0].kind, SensorKind::Kickoff);
    assert_eq!(kick[0].timestamp, at(3));

    // Goals after +2s (exclusive), ascending by time regardless of insert order.
    let goals = source.query_events_after(&EventQuery::goals(at(2))).await?;
    let got: Vec<_> = goals
        .iter()
        .filter(|e| e.timestamp < at(3600))
        .map(|e| (e.kind, e.timestamp))
        .collect();
    assert_eq!(
        got,
        vec![(SensorKind::GoalHome, at(4)), (SensorKind::GoalAway, at(5))]
    );

    sqlx::query("delete from sensor_events where occurred_at_utc >= $1")
        .bind(base)
        .execute(&pool)
        .await?;

    Ok(())
}
