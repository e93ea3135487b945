pub mod events;

pub use events::{create_event, list_events};
