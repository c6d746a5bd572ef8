use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kicker_match::{FinalScore, MatchId, MatchStore, NewMatchRecord, PlayerId};
use serde::Serialize;
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::warn;

/// Match record store backed by the `matches` table.
#[derive(Clone)]
pub struct PgMatchStore {
    pool: PgPool,
}

impl PgMatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MatchStore for PgMatchStore {
    async fn create_match_record(&self, record: &NewMatchRecord) -> Result<MatchId> {
        let res = sqlx::query_as::<_, (i64,)>(
            r#"
            insert into matches (opened_at_utc, home_players, away_players)
            values ($1, $2, $3)
            returning match_id
            "#,
        )
        .bind(record.opened_at)
        .bind(player_ids(&record.home_players))
        .bind(player_ids(&record.away_players))
        .fetch_one(&self.pool)
        .await;

        match res {
            Ok((id,)) => Ok(MatchId(id)),
            Err(e) => {
                // Keep the single-open-match violation recognisable for operators.
                if is_unique_constraint_violation(&e, "uq_matches_single_open") {
                    return Err(anyhow!("another match record is still open"));
                }
                Err(anyhow::Error::new(e).context("create_match_record failed"))
            }
        }
    }

    async fn finalize_match_record(&self, match_id: MatchId, fin: &FinalScore) -> Result<()> {
        let res = sqlx::query(
            r#"
            update matches
            set ended_at_utc = $2,
                home_score = $3,
                away_score = $4
            where match_id = $1
              and ended_at_utc is null
            "#,
        )
        .bind(match_id.0)
        .bind(fin.ended_at)
        .bind(score_to_db(fin.home_score)?)
        .bind(score_to_db(fin.away_score)?)
        .execute(&self.pool)
        .await
        .context("finalize_match_record failed")?;

        if res.rows_affected() == 0 {
            return Err(anyhow!("match record {match_id} is not open"));
        }
        Ok(())
    }
}

/// Detect a Postgres unique constraint violation by name.
fn is_unique_constraint_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint() == Some(constraint),
        _ => false,
    }
}

fn player_ids(players: &[PlayerId]) -> Vec<i64> {
    players.iter().map(|p| p.0).collect()
}

fn score_to_db(score: u32) -> Result<i32> {
    i32::try_from(score).map_err(|_| anyhow!("score {score} out of range"))
}

/// One persisted match, open or finished.
#[derive(Debug, Clone, Serialize)]
pub struct MatchRow {
    pub match_id: MatchId,
    pub opened_at_utc: DateTime<Utc>,
    pub ended_at_utc: Option<DateTime<Utc>>,
    pub home_players: Vec<PlayerId>,
    pub away_players: Vec<PlayerId>,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
}

fn match_row(row: &PgRow) -> Result<MatchRow> {
    let home: Vec<i64> = row.try_get("home_players")?;
    let away: Vec<i64> = row.try_get("away_players")?;
    Ok(MatchRow {
        match_id: MatchId(row.try_get("match_id")?),
        opened_at_utc: row.try_get("opened_at_utc")?,
        ended_at_utc: row.try_get("ended_at_utc")?,
        home_players: home.into_iter().map(PlayerId).collect(),
        away_players: away.into_iter().map(PlayerId).collect(),
        home_score: row.try_get("home_score")?,
        away_score: row.try_get("away_score")?,
    })
}

/// Finished matches, most recently ended first. Open records are excluded.
pub async fn recent_matches(pool: &PgPool, limit: i64) -> Result<Vec<MatchRow>> {
    let rows = sqlx::query(
        r#"
        select match_id, opened_at_utc, ended_at_utc, home_players, away_players,
               home_score, away_score
        from matches
        where ended_at_utc is not null
        order by ended_at_utc desc, match_id desc
        limit $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("recent_matches failed")?;

    rows.iter().map(match_row).collect()
}

pub async fn fetch_open_match(pool: &PgPool) -> Result<Option<MatchRow>> {
    let row = sqlx::query(
        r#"
        select match_id, opened_at_utc, ended_at_utc, home_players, away_players,
               home_score, away_score
        from matches
        where ended_at_utc is null
        "#,
    )
    .fetch_optional(pool)
    .await
    .context("fetch_open_match failed")?;

    row.as_ref().map(match_row).transpose()
}

/// Finalize records left open by a previous process.
///
/// The live score only ever lived in memory, so an orphan is closed with
/// whatever score it carries (0:0 when none was written). Returns the number
/// of records closed.
pub async fn close_orphaned_matches(pool: &PgPool) -> Result<u64> {
    let res = sqlx::query(
        r#"
        update matches
        set ended_at_utc = now(),
            home_score = coalesce(home_score, 0),
            away_score = coalesce(away_score, 0)
        where ended_at_utc is null
        "#,
    )
    .execute(pool)
    .await
    .context("close_orphaned_matches failed")?;

    let n = res.rows_affected();
    if n > 0 {
        warn!(closed = n, "closed match records orphaned by a previous run");
    }
    Ok(n)
}
