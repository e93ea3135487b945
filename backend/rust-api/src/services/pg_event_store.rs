use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::database::DatabasePool;
use crate::models::{Event, EventStatus, NewEvent, OutboxEntry, OutboxEntryId};
use crate::services::event_store::EventStore;

/// PostgreSQL-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgEventStore {
    pool: DatabasePool,
}

impl PgEventStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn expect_outbox_row(rows_affected: u64, id: OutboxEntryId) -> anyhow::Result<()> {
    if rows_affected == 0 {
        anyhow::bail!("Outbox entry {} not found", id);
    }
    Ok(())
}

fn event_from_row(row: &PgRow) -> Result<Event, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(Event {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        date: row.try_get("event_date")?,
        time: row.try_get("event_time")?,
        location: row.try_get("location")?,
        max_seats: row.try_get("max_seats")?,
        tags: row.try_get("tags")?,
        image: row.try_get("image")?,
        status: EventStatus::parse(&status).unwrap_or_else(|| {
            tracing::warn!("Unknown event status '{}' in database, showing as upcoming", status);
            EventStatus::Upcoming
        }),
        registered_seats: row.try_get("registered_seats")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn create_event(&self, new_event: NewEvent) -> anyhow::Result<Event> {
        let event = Event::new(new_event);
        let payload = serde_json::to_value(&event)?;

        let mut tx = self.pool.begin().await.context("Failed to start transaction")?;

        sqlx::query(
            r#"
            INSERT INTO events
            (id, title, description, event_date, event_time, location, max_seats, tags, image, status, registered_seats, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.date)
        .bind(&event.time)
        .bind(&event.location)
        .bind(event.max_seats)
        .bind(&event.tags)
        .bind(&event.image)
        .bind(event.status.as_str())
        .bind(event.registered_seats)
        .bind(event.created_at)
        .execute(&mut *tx)
        .await
        .context("Failed to insert event")?;

        sqlx::query(
            r#"
            INSERT INTO notification_outbox (event_id, payload, attempts, next_attempt_at, created_at)
            VALUES ($1, $2, 0, $3, $3)
            "#
        )
        .bind(event.id)
        .bind(&payload)
        .bind(event.created_at)
        .execute(&mut *tx)
        .await
        .context("Failed to enqueue event notification")?;

        tx.commit().await.context("Failed to commit event")?;

        tracing::debug!("Stored event {} with pending notification", event.id);
        Ok(event)
    }

    async fn list_events(&self) -> anyhow::Result<Vec<Event>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, description, event_date, event_time, location, max_seats, tags,
                   image, status, registered_seats, created_at
            FROM events
            ORDER BY created_at ASC, id ASC
            "#
        )
        .fetch_all(&*self.pool)
        .await
        .context("Failed to load events")?;

        rows.iter()
            .map(event_from_row)
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to decode event row")
    }

    async fn due_notifications(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> anyhow::Result<Vec<OutboxEntry>> {
        let rows = sqlx::query_as::<_, (i64, Uuid, serde_json::Value, i32)>(
            r#"
            SELECT id, event_id, payload, attempts
            FROM notification_outbox
            WHERE delivered_at IS NULL AND abandoned_at IS NULL AND next_attempt_at <= $1
            ORDER BY id ASC
            LIMIT $2
            "#
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&*self.pool)
        .await
        .context("Failed to load due notifications")?;

        Ok(rows
            .into_iter()
            .map(|(id, event_id, payload, attempts)| OutboxEntry {
                id,
                event_id,
                payload,
                attempts,
            })
            .collect())
    }

    async fn mark_notification_delivered(&self, id: OutboxEntryId) -> anyhow::Result<()> {
        let result = sqlx::query(
            "UPDATE notification_outbox SET attempts = attempts + 1, delivered_at = NOW(), last_error = NULL WHERE id = $1"
        )
        .bind(id)
        .execute(&*self.pool)
        .await
        .context("Failed to mark notification delivered")?;
        expect_outbox_row(result.rows_affected(), id)
    }

    async fn record_notification_failure(
        &self,
        id: OutboxEntryId,
        error: &str,
        retry_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let result = sqlx::query(
            "UPDATE notification_outbox SET attempts = attempts + 1, next_attempt_at = $2, last_error = $3 WHERE id = $1"
        )
        .bind(id)
        .bind(retry_at)
        .bind(error)
        .execute(&*self.pool)
        .await
        .context("Failed to record notification failure")?;
        expect_outbox_row(result.rows_affected(), id)
    }

    async fn abandon_notification(&self, id: OutboxEntryId, error: &str) -> anyhow::Result<()> {
        let result = sqlx::query(
            "UPDATE notification_outbox SET attempts = attempts + 1, abandoned_at = NOW(), last_error = $2 WHERE id = $1"
        )
        .bind(id)
        .bind(error)
        .execute(&*self.pool)
        .await
        .context("Failed to abandon notification")?;
        expect_outbox_row(result.rows_affected(), id)
    }
}
