use std::sync::Arc;
use std::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, warn};

use crate::background::outbox::{dispatch_due, OutboxPolicy};
use crate::config::Config;
use crate::services::event_store::EventStore;
use crate::services::notifier::Notifier;

pub struct BackgroundScheduler {
    scheduler: Arc<JobScheduler>,
}

impl BackgroundScheduler {
    /// Registers the outbox dispatch job when a notifier is configured and
    /// starts the scheduler. Without a notifier, notifications stay queued.
    pub async fn new(
        store: Arc<dyn EventStore>,
        notifier: Option<Arc<dyn Notifier>>,
        config: Arc<Config>,
    ) -> anyhow::Result<Self> {
        let scheduler = JobScheduler::new().await?;

        match notifier {
            Some(notifier) => {
                let policy = OutboxPolicy {
                    max_attempts: config.outbox_max_attempts,
                    ..OutboxPolicy::default()
                };
                let interval = Duration::from_secs(config.outbox_poll_seconds);
                // Ticks that fire while a dispatch is still running are skipped.
                let in_flight = Arc::new(tokio::sync::Mutex::new(()));

                scheduler
                    .add(Job::new_repeated_async(interval, move |_uuid, _l| {
                        let store = store.clone();
                        let notifier = notifier.clone();
                        let policy = policy.clone();
                        let in_flight = in_flight.clone();
                        Box::pin(async move {
                            let Ok(_guard) = in_flight.try_lock() else {
                                debug!("Outbox dispatch still running, skipping tick");
                                return;
                            };
                            match dispatch_due(store.as_ref(), notifier.as_ref(), &policy).await {
                                Ok(report) if report.is_empty() => {}
                                Ok(report) => info!(
                                    "Outbox dispatch: delivered={} retried={} abandoned={}",
                                    report.delivered, report.retried, report.abandoned
                                ),
                                Err(e) => error!("Outbox dispatch failed: {:?}", e),
                            }
                        })
                    })?)
                    .await?;
                info!(
                    "Outbox dispatcher scheduled every {}s (max {} attempts)",
                    config.outbox_poll_seconds, config.outbox_max_attempts
                );
            }
            None => {
                warn!("NOTIFICATION_WEBHOOK_URL not set; event notifications stay queued in the outbox");
            }
        }

        scheduler.start().await?;
        info!("Background scheduler started");

        Ok(Self {
            scheduler: Arc::new(scheduler),
        })
    }

    /// Stops the dispatch job. Undelivered notifications stay in the outbox
    /// and are picked up on the next start.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        let mut scheduler = JobScheduler::clone(&self.scheduler);
        scheduler.shutdown().await?;
        info!("Background scheduler stopped");
        Ok(())
    }
}
