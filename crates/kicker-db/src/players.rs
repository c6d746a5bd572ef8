use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use kicker_match::PlayerId;
use serde::Serialize;
use sqlx::{postgres::PgRow, PgPool, Row};

#[derive(Debug, Clone, Serialize)]
pub struct PlayerRow {
    pub player_id: PlayerId,
    pub name: String,
    pub created_at_utc: DateTime<Utc>,
}

fn player_row(row: &PgRow) -> Result<PlayerRow> {
    Ok(PlayerRow {
        player_id: PlayerId(row.try_get("player_id")?),
        name: row.try_get("name")?,
        created_at_utc: row.try_get("created_at_utc")?,
    })
}

/// All players, by name.
pub async fn list_players(pool: &PgPool) -> Result<Vec<PlayerRow>> {
    let rows = sqlx::query(
        r#"
        select player_id, name, created_at_utc
        from players
        order by name asc, player_id asc
        "#,
    )
    .fetch_all(pool)
    .await
    .context("list_players failed")?;

    rows.iter().map(player_row).collect()
}

pub async fn fetch_player(pool: &PgPool, player_id: PlayerId) -> Result<Option<PlayerRow>> {
    let row = sqlx::query(
        r#"
        select player_id, name, created_at_utc
        from players
        where player_id = $1
        "#,
    )
    .bind(player_id.0)
    .fetch_optional(pool)
    .await
    .context("fetch_player failed")?;

    row.as_ref().map(player_row).transpose()
}

/// Insert a player. Blank names are rejected before touching the DB.
pub async fn add_player(pool: &PgPool, name: &str) -> Result<PlayerRow> {
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("player name must not be blank"));
    }

    let row = sqlx::query(
        r#"
        insert into players (name)
        values ($1)
        returning player_id, name, created_at_utc
        "#,
    )
    .bind(name)
    .fetch_one(pool)
    .await
    .context("add_player failed")?;

    player_row(&row)
}

/// Delete a player. Returns `false` if no such player existed.
pub async fn delete_player(pool: &PgPool, player_id: PlayerId) -> Result<bool> {
    let res = sqlx::query("delete from players where player_id = $1")
        .bind(player_id.0)
        .execute(pool)
        .await
        .context("delete_player failed")?;

    Ok(res.rows_affected() > 0)
}
