//! Event records, create payloads and notification outbox entries.

pub mod event;
pub mod ids;
pub mod outbox;

pub use event::{normalize_tags, CreateEventRequest, Event, EventStatus, NewEvent, TagsInput};
pub use ids::{EventId, OutboxEntryId};
pub use outbox::OutboxEntry;
