use chrono::{Duration, Utc};
use kicker_match::{FinalScore, MatchStore, NewMatchRecord};

/// Recent matches:
/// - only finished records are listed; the open one is not
/// - ordered by end time, newest first, regardless of when they were opened
///
/// DB-backed test. Skips if KICKER_DATABASE_URL is not set.
#[tokio::test]
async fn recent_matches_lists_finished_by_end_time() -> anyhow::Result<()> {
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
    // Test DB only: clear anything a previous aborted run left open.
    kicker_db::close_orphaned_matches(&pool).await?;

    let home = kicker_db::add_player(&pool, "Test Recent Home").await?;
    let away = kicker_db::add_player(&pool, "Test Recent Away").await?;
    let store = kicker_db::PgMatchStore::new(pool.clone());
    let record = |opened_at| NewMatchRecord {
        opened_at,
        home_players: vec![home.player_id],
        away_players: vec![away.player_id],
    };

    // End times beyond anything already stored so these rows lead the list.
    let now = Utc::now();
    let far = now + Duration::days(2);

    // Opened first, ended last.
    let early = store.create_match_record(&record(now)).await?;
    store
        .finalize_match_record(
            early,
            &FinalScore {
                home_score: 1,
                away_score: 0,
                ended_at: far + Duration::hours(1),
            },
        )
        .await?;

    // Opened later, ended earlier.
    let late = store
        .create_match_record(&record(now + Duration::minutes(5)))
        .await?;
    store
        .finalize_match_record(
            late,
            &FinalScore {
                home_score: 0,
                away_score: 2,
                ended_at: far,
            },
        )
        .await?;

    let open = store
        .create_match_record(&record(now + Duration::minutes(10)))
        .await?;

    let recent = kicker_db::recent_matches(&pool, 5).await?;
    assert!(recent.len() <= 5);
    assert!(
        recent.iter().all(|r| r.ended_at_utc.is_some()),
        "open records must not be listed"
    );
    assert!(!recent.iter().any(|r| r.match_id == open));
    let ids: Vec<_> = recent.iter().take(2).map(|r| r.match_id).collect();
    assert_eq!(ids, vec![early, late]);

    // Cleanup.
    sqlx::query("delete from matches where match_id = any($1)")
        .bind(vec![early.0, late.0, open.0])
        .execute(&pool)
        .await?;
    kicker_db::delete_player(&pool, home.player_id).await?;
    kicker_db::delete_player(&pool, away.player_id).await?;

    Ok(())
}
