pub mod outbox;
pub mod scheduler;
