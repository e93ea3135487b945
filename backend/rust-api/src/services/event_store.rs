use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};

use crate::models::{Event, NewEvent, OutboxEntry, OutboxEntryId};

/// Persistence for events and their pending webhook notifications.
///
/// `create_event` must write the event and its outbox entry atomically so the
/// notification side never learns about an event the store does not hold.
/// Errors are unclassified: callers only see success or failure.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert a new event with a fresh id and enqueue its notification.
    async fn create_event(&self, new_event: NewEvent) -> anyhow::Result<Event>;

    /// All events in insertion order.
    async fn list_events(&self) -> anyhow::Result<Vec<Event>>;

    /// Undelivered, non-abandoned entries whose retry time is at or before `now`.
    async fn due_notifications(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> anyhow::Result<Vec<OutboxEntry>>;

    async fn mark_notification_delivered(&self, id: OutboxEntryId) -> anyhow::Result<()>;

    /// Bump the attempt counter and push the entry back until `retry_at`.
    async fn record_notification_failure(
        &self,
        id: OutboxEntryId,
        error: &str,
        retry_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    /// Stop retrying an entry. It stays in the outbox for inspection.
    async fn abandon_notification(&self, id: OutboxEntryId, error: &str) -> anyhow::Result<()>;
}

#[derive(Clone, Debug)]
struct OutboxRow {
    entry: OutboxEntry,
    next_attempt_at: DateTime<Utc>,
    delivered_at: Option<DateTime<Utc>>,
    abandoned_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

#[derive(Default)]
struct MemoryState {
    events: Vec<Event>,
    outbox: Vec<OutboxRow>,
    next_outbox_id: OutboxEntryId,
}

/// Process-local store. Used by tests and by `STORE_BACKEND=memory`;
/// everything is lost on restart.
#[derive(Default)]
pub struct MemoryEventStore {
    state: Mutex<MemoryState>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| anyhow::anyhow!("In-memory event store lock poisoned"))
    }

    fn with_row<F>(&self, id: OutboxEntryId, f: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut OutboxRow),
    {
        let mut state = self.lock()?;
        let row = state
            .outbox
            .iter_mut()
            .find(|row| row.entry.id == id)
            .ok_or_else(|| anyhow::anyhow!("Outbox entry {} not found", id))?;
        f(row);
        Ok(())
    }

    /// Last recorded delivery error for an entry, if any.
    pub fn last_notification_error(&self, id: OutboxEntryId) -> Option<String> {
        let state = self.lock().ok()?;
        state
            .outbox
            .iter()
            .find(|row| row.entry.id == id)
            .and_then(|row| row.last_error.clone())
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn create_event(&self, new_event: NewEvent) -> anyhow::Result<Event> {
        let event = Event::new(new_event);
        let payload = serde_json::to_value(&event)?;

        let mut state = self.lock()?;
        state.next_outbox_id += 1;
        let outbox_id = state.next_outbox_id;
        state.events.push(event.clone());
        state.outbox.push(OutboxRow {
            entry: OutboxEntry {
                id: outbox_id,
                event_id: event.id,
                payload,
                attempts: 0,
            },
            next_attempt_at: event.created_at,
            delivered_at: None,
            abandoned_at: None,
            last_error: None,
        });

        Ok(event)
    }

    async fn list_events(&self) -> anyhow::Result<Vec<Event>> {
        Ok(self.lock()?.events.clone())
    }

    async fn due_notifications(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> anyhow::Result<Vec<OutboxEntry>> {
        let state = self.lock()?;
        Ok(state
            .outbox
            .iter()
            .filter(|row| row.delivered_at.is_none() && row.abandoned_at.is_none())
            .filter(|row| row.next_attempt_at <= now)
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|row| row.entry.clone())
            .collect())
    }

    async fn mark_notification_delivered(&self, id: OutboxEntryId) -> anyhow::Result<()> {
        self.with_row(id, |row| {
            row.entry.attempts += 1;
            row.delivered_at = Some(Utc::now());
            row.last_error = None;
        })
    }

    async fn record_notification_failure(
        &self,
        id: OutboxEntryId,
        error: &str,
        retry_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        self.with_row(id, |row| {
            row.entry.attempts += 1;
            row.next_attempt_at = retry_at;
            row.last_error = Some(error.to_string());
        })
    }

    async fn abandon_notification(&self, id: OutboxEntryId, error: &str) -> anyhow::Result<()> {
        self.with_row(id, |row| {
            row.entry.attempts += 1;
            row.abandoned_at = Some(Utc::now());
            row.last_error = Some(error.to_string());
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventStatus;
    use chrono::Duration;
    use std::sync::Arc;

    fn sample(title: &str) -> NewEvent {
        NewEvent {
            title: title.to_string(),
            description: "d".to_string(),
            date: "2024-02-15".to_string(),
            time: "10:00".to_string(),
            location: "Hall".to_string(),
            max_seats: 50,
            tags: vec!["Tech".to_string()],
            image: "https://example.edu/banner.png".to_string(),
            status: EventStatus::Upcoming,
        }
    }

    fn far_future() -> DateTime<Utc> {
        Utc::now() + Duration::days(1)
    }

    #[tokio::test]
    async fn list_is_empty_initially() {
        let store = MemoryEventStore::new();
        assert!(store.list_events().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_then_list_keeps_insertion_order() {
        let store = MemoryEventStore::new();
        let first = store.create_event(sample("First")).await.unwrap();
        let second = store.create_event(sample("Second")).await.unwrap();

        let listed = store.list_events().await.unwrap();
        assert_eq!(listed, vec![first, second]);
    }

    #[tokio::test]
    async fn identical_inputs_get_distinct_ids() {
        let store = MemoryEventStore::new();
        let a = store.create_event(sample("Demo")).await.unwrap();
        let b = store.create_event(sample("Demo")).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.list_events().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn concurrent_creates_are_all_kept() {
        let store = Arc::new(MemoryEventStore::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.create_event(sample("Same")).await.unwrap() })
            })
            .collect();
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().id);
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 16);
        assert_eq!(store.due_notifications(far_future(), 100).await.unwrap().len(), 16);
    }

    #[tokio::test]
    async fn create_enqueues_one_notification_with_the_event_payload() {
        let store = MemoryEventStore::new();
        let event = store.create_event(sample("Demo")).await.unwrap();

        let due = store.due_notifications(far_future(), 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].event_id, event.id);
        assert_eq!(due[0].attempts, 0);
        assert_eq!(due[0].payload["title"], "Demo");
        assert_eq!(due[0].payload["id"], event.id.to_string());
    }

    #[tokio::test]
    async fn delivered_entries_are_no_longer_due() {
        let store = MemoryEventStore::new();
        store.create_event(sample("Demo")).await.unwrap();
        let entry = store.due_notifications(far_future(), 10).await.unwrap().remove(0);

        store.mark_notification_delivered(entry.id).await.unwrap();
        assert!(store.due_notifications(far_future(), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failures_are_rescheduled_and_abandoned_entries_drop_out() {
        let store = MemoryEventStore::new();
        store.create_event(sample("Demo")).await.unwrap();
        let entry = store.due_notifications(far_future(), 10).await.unwrap().remove(0);

        let retry_at = Utc::now() + Duration::minutes(5);
        store
            .record_notification_failure(entry.id, "502 Bad Gateway", retry_at)
            .await
            .unwrap();
        assert!(store.due_notifications(Utc::now(), 10).await.unwrap().is_empty());

        let later = store
            .due_notifications(retry_at + Duration::seconds(1), 10)
            .await
            .unwrap();
        assert_eq!(later[0].attempts, 1);
        assert_eq!(
            store.last_notification_error(entry.id).as_deref(),
            Some("502 Bad Gateway")
        );

        store.abandon_notification(entry.id, "gave up").await.unwrap();
        assert!(store.due_notifications(far_future(), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_outbox_entry_is_an_error() {
        let store = MemoryEventStore::new();
        assert!(store.mark_notification_delivered(42).await.is_err());
        assert!(store
            .record_notification_failure(42, "timeout", Utc::now())
            .await
            .is_err());
        assert!(store.abandon_notification(42, "gave up").await.is_err());
    }

    #[tokio::test]
    async fn due_notifications_respects_limit() {
        let store = MemoryEventStore::new();
        for i in 0..5 {
            store.create_event(sample(&format!("E{}", i))).await.unwrap();
        }
        assert_eq!(store.due_notifications(far_future(), 2).await.unwrap().len(), 2);
    }
}
