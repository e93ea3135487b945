use serde_json::Value;

use super::ids::{EventId, OutboxEntryId};

/// A notification waiting to be delivered to the external webhook.
/// `payload` is the stored event as it was serialized at creation time.
#[derive(Clone, Debug, PartialEq)]
pub struct OutboxEntry {
    pub id: OutboxEntryId,
    pub event_id: EventId,
    pub payload: Value,
    pub attempts: i32,
}
