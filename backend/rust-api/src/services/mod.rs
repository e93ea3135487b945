pub mod event_store;
pub mod notifier;
pub mod pg_event_store;

pub use event_store::{EventStore, MemoryEventStore};
pub use notifier::{DeliveryError, Notifier, WebhookNotifier};
pub use pg_event_store::PgEventStore;
