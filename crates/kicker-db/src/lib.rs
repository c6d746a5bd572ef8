//! kicker-db
//!
//! Postgres access for the kicker service: the sensor log (read side used by
//! reconciliation, write side used for bench testing), match records, the
//! player roster and aggregate statistics.
//!
//! All queries are runtime-checked `sqlx::query`; no compile-time DB needed.

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

mod events;
mod matches;
mod players;
mod stats;

pub use events::{insert_sensor_event, PgEventSource};
pub use matches::{close_orphaned_matches, fetch_open_match, recent_matches, MatchRow, PgMatchStore};
pub use players::{add_player, delete_player, fetch_player, list_players, PlayerRow};
pub use stats::{match_statistics, top_players, MatchStatistics, PlayerGames};

pub const ENV_DB_URL: &str = "KICKER_DATABASE_URL";

/// Connect to Postgres using KICKER_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL)
        .with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url).await
}

pub async fn connect(url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='matches'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_matches_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_matches_table: bool,
}
