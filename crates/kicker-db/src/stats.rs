use anyhow::{Context, Result};
use kicker_match::PlayerId;
use serde::Serialize;
use sqlx::{PgPool, Row};

/// Aggregates over finished matches only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchStatistics {
    pub total_games: i64,
    /// `None` when no match has finished yet.
    pub avg_home_goals: Option<f64>,
    pub avg_away_goals: Option<f64>,
    pub home_wins: i64,
    pub away_wins: i64,
    pub draws: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerGames {
    pub player_id: PlayerId,
    pub name: String,
    pub games_played: i64,
}

pub async fn match_statistics(pool: &PgPool) -> Result<MatchStatistics> {
    let row = sqlx::query(
        r#"
        select
          count(*)::bigint                                                    as total_games,
          avg(home_score)::float8                                             as avg_home_goals,
          avg(away_score)::float8                                             as avg_away_goals,
          coalesce(sum(case when home_score > away_score then 1 else 0 end), 0)::bigint as home_wins,
          coalesce(sum(case when away_score > home_score then 1 else 0 end), 0)::bigint as away_wins,
          coalesce(sum(case when home_score = away_score then 1 else 0 end), 0)::bigint as draws
        from matches
        where ended_at_utc is not null
        "#,
    )
    .fetch_one(pool)
    .await
    .context("match_statistics failed")?;

    Ok(MatchStatistics {
        total_games: row.try_get("total_games")?,
        avg_home_goals: row.try_get("avg_home_goals")?,
        avg_away_goals: row.try_get("avg_away_goals")?,
        home_wins: row.try_get("home_wins")?,
        away_wins: row.try_get("away_wins")?,
        draws: row.try_get("draws")?,
    })
}

/// Players with the most finished matches, either side.
pub async fn top_players(pool: &PgPool, limit: i64) -> Result<Vec<PlayerGames>> {
    let rows = sqlx::query(
        r#"
        select p.player_id, p.name, count(*)::bigint as games_played
        from matches m
        join players p
          on p.player_id = any(m.home_players)
          or p.player_id = any(m.away_players)
        where m.ended_at_utc is not null
        group by p.player_id, p.name
        order by games_played desc, p.name asc
        limit $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("top_players failed")?;

    rows.iter()
        .map(|row| -> Result<PlayerGames> {
            Ok(PlayerGames {
                player_id: PlayerId(row.try_get("player_id")?),
                name: row.try_get("name")?,
                games_played: row.try_get("games_played")?,
            })
        })
        .collect()
}
