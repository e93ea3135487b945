//! Delivers queued event notifications to the external webhook.
//!
//! Delivery is at-least-once: an entry is marked delivered only after the
//! webhook answers 2xx, so a crash in between re-sends it on the next tick.

use chrono::{Duration, Utc};
use tracing::{error, info, warn};

use crate::services::event_store::EventStore;
use crate::services::notifier::Notifier;

/// Delay before the next attempt, indexed by attempts already made.
/// The last step repeats once the schedule is exhausted.
const RETRY_SCHEDULE_SECS: [i64; 6] = [5, 15, 30, 60, 300, 900];

#[derive(Clone, Debug)]
pub struct OutboxPolicy {
    pub batch_size: i64,
    pub max_attempts: i32,
}

impl Default for OutboxPolicy {
    fn default() -> Self {
        Self {
            batch_size: 50,
            max_attempts: 8,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub retried: usize,
    pub abandoned: usize,
}

impl DispatchReport {
    pub fn is_empty(&self) -> bool {
        self.delivered == 0 && self.retried == 0 && self.abandoned == 0
    }
}

pub fn retry_delay(attempts_made: i32) -> Duration {
    let index = usize::try_from(attempts_made)
        .unwrap_or(0)
        .min(RETRY_SCHEDULE_SECS.len() - 1);
    Duration::seconds(RETRY_SCHEDULE_SECS[index])
}

/// Sends every due notification once. Store errors abort the pass; webhook
/// errors are recorded per entry and never abort it.
pub async fn dispatch_due(
    store: &dyn EventStore,
    notifier: &dyn Notifier,
    policy: &OutboxPolicy,
) -> anyhow::Result<DispatchReport> {
    let due = store.due_notifications(Utc::now(), policy.batch_size).await?;
    let mut report = DispatchReport::default();

    for entry in due {
        match notifier.notify(&entry.payload).await {
            Ok(()) => {
                store.mark_notification_delivered(entry.id).await?;
                info!("Notification for event {} delivered", entry.event_id);
                report.delivered += 1;
            }
            Err(e) => {
                let message = e.to_string();
                let attempts = entry.attempts + 1;
                if attempts >= policy.max_attempts {
                    store.abandon_notification(entry.id, &message).await?;
                    error!(
                        "Giving up on notification for event {} after {} attempts: {}",
                        entry.event_id, attempts, message
                    );
                    report.abandoned += 1;
                } else {
                    let retry_at = Utc::now() + retry_delay(entry.attempts);
                    store
                        .record_notification_failure(entry.id, &message, retry_at)
                        .await?;
                    warn!(
                        "Notification for event {} failed (attempt {}), retrying at {}: {}",
                        entry.event_id, attempts, retry_at, message
                    );
                    report.retried += 1;
                }
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventStatus, NewEvent};
    use crate::services::event_store::MemoryEventStore;
    use crate::services::notifier::{DeliveryError, MockNotifier};

    fn sample() -> NewEvent {
        NewEvent {
            title: "Career Fair".to_string(),
            description: "Meet recruiters".to_string(),
            date: "2024-03-01".to_string(),
            time: "09:00".to_string(),
            location: "Main Hall".to_string(),
            max_seats: 200,
            tags: vec!["Career".to_string()],
            image: "https://example.edu/fair.png".to_string(),
            status: EventStatus::Upcoming,
        }
    }

    fn far_future() -> chrono::DateTime<Utc> {
        Utc::now() + Duration::days(1)
    }

    fn rejected() -> DeliveryError {
        DeliveryError::Rejected {
            status: 502,
            body: "bad gateway".to_string(),
        }
    }

    #[test]
    fn retry_delay_steps_then_plateaus() {
        assert_eq!(retry_delay(0), Duration::seconds(5));
        assert_eq!(retry_delay(2), Duration::seconds(30));
        assert_eq!(retry_delay(5), Duration::seconds(900));
        assert_eq!(retry_delay(40), Duration::seconds(900));
        assert_eq!(retry_delay(-1), Duration::seconds(5));
    }

    #[tokio::test]
    async fn successful_delivery_marks_entry_delivered() {
        let store = MemoryEventStore::new();
        let event = store.create_event(sample()).await.unwrap();

        let mut notifier = MockNotifier::new();
        let expected_id = event.id.to_string();
        notifier
            .expect_notify()
            .withf(move |payload| payload["id"] == expected_id.as_str())
            .times(1)
            .returning(|_| Ok(()));

        let report = dispatch_due(&store, &notifier, &OutboxPolicy::default()).await.unwrap();
        assert_eq!(report.delivered, 1);
        assert!(store.due_notifications(far_future(), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_delivery_is_rescheduled() {
        let store = MemoryEventStore::new();
        store.create_event(sample()).await.unwrap();

        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(1).returning(|_| Err(rejected()));

        let report = dispatch_due(&store, &notifier, &OutboxPolicy::default()).await.unwrap();
        assert_eq!(report.retried, 1);

        // Not due again right away, but still pending.
        assert!(store.due_notifications(Utc::now(), 10).await.unwrap().is_empty());
        let pending = store.due_notifications(far_future(), 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempts, 1);
        assert!(store
            .last_notification_error(pending[0].id)
            .unwrap()
            .contains("502"));
    }

    #[tokio::test]
    async fn last_allowed_failure_abandons_entry() {
        let store = MemoryEventStore::new();
        store.create_event(sample()).await.unwrap();

        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(1).returning(|_| Err(rejected()));

        let policy = OutboxPolicy {
            max_attempts: 1,
            ..OutboxPolicy::default()
        };
        let report = dispatch_due(&store, &notifier, &policy).await.unwrap();
        assert_eq!(report.abandoned, 1);
        assert!(store.due_notifications(far_future(), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_failure_does_not_block_the_rest() {
        let store = MemoryEventStore::new();
        store.create_event(sample()).await.unwrap();
        store.create_event(sample()).await.unwrap();

        let mut notifier = MockNotifier::new();
        let mut calls = 0;
        notifier.expect_notify().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(rejected())
            } else {
                Ok(())
            }
        });

        let report = dispatch_due(&store, &notifier, &OutboxPolicy::default()).await.unwrap();
        assert_eq!(
            report,
            DispatchReport {
                delivered: 1,
                retried: 1,
                abandoned: 0
            }
        );
    }

    #[tokio::test]
    async fn nothing_due_means_no_calls() {
        let store = MemoryEventStore::new();
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().never();

        let report = dispatch_due(&store, &notifier, &OutboxPolicy::default()).await.unwrap();
        assert!(report.is_empty());
    }
}
