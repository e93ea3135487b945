//! Type aliases for record IDs. Use these for clarity where an ID is required.

use uuid::Uuid;

/// Assigned by the store when an event is created.
pub type EventId = Uuid;

/// Sequence number of a pending notification in the outbox.
pub type OutboxEntryId = i64;
