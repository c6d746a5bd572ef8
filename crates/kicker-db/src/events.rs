use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use kicker_match::{EventOrder, EventQuery, EventSource, SensorEvent, SensorKind, Timestamp};
use sqlx::{postgres::PgRow, PgPool, Row};

/// Sensor log backed by the `sensor_events` table.
#[derive(Clone)]
pub struct PgEventSource {
    pool: PgPool,
}

impl PgEventSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventSource for PgEventSource {
    async fn query_events_after(&self, query: &EventQuery) -> Result<Vec<SensorEvent>> {
        let kinds: Vec<String> = query.kinds.iter().map(|k| k.as_str().to_string()).collect();
        let limit: Option<i64> = query.limit.map(i64::from);

        // Direction is a fixed keyword chosen here, never caller text.
        let sql = match query.order {
            EventOrder::NewestFirst => {
                r#"
                select event_id, kind, occurred_at_utc
                from sensor_events
                where occurred_at_utc > $1
                  and kind = any($2)
                order by occurred_at_utc desc, event_id desc
                limit $3
                "#
            }
            EventOrder::OldestFirst => {
                r#"
                select event_id, kind, occurred_at_utc
                from sensor_events
                where occurred_at_utc > $1
                  and kind = any($2)
                order by occurred_at_utc asc, event_id asc
                limit $3
                "#
            }
        };

        let rows = sqlx::query(sql)
            .bind(query.after)
            .bind(kinds)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .context("query_events_after failed")?;

        rows.iter().map(sensor_event_from_row).collect()
    }
}

/// Append one sensor event. `at = None` stamps it with the database clock.
///
/// The reconciliation engine never writes the log; this exists for bench
/// testing and sensor bridges.
pub async fn insert_sensor_event(
    pool: &PgPool,
    kind: SensorKind,
    at: Option<Timestamp>,
) -> Result<SensorEvent> {
    let row = sqlx::query(
        r#"
        insert into sensor_events (kind, occurred_at_utc)
        values ($1, coalesce($2, now()))
        returning event_id, kind, occurred_at_utc
        "#,
    )
    .bind(kind.as_str())
    .bind(at)
    .fetch_one(pool)
    .await
    .context("insert_sensor_event failed")?;

    sensor_event_from_row(&row)
}

fn sensor_event_from_row(row: &PgRow) -> Result<SensorEvent> {
    let raw_kind: String = row.try_get("kind")?;
    let kind = SensorKind::parse(&raw_kind)
        .ok_or_else(|| anyhow!("unknown sensor kind in log: {raw_kind}"))?;

    Ok(SensorEvent {
        id: row.try_get("event_id")?,
        kind,
        timestamp: row.try_get("occurred_at_utc")?,
    })
}
