//! Headless client for the CampusConnect event flow: the event submission
//! form, the dashboard event views, the events API client, the persisted
//! login session and the login webhook client.
//!
//! Rendering is left to the embedding UI; everything here is plain state.

pub mod api;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod form;
pub mod models;
pub mod session;

pub use api::{EventsApi, HttpEventsApi};
pub use auth::{LoginClient, LoginOutcome, LoginPortal};
pub use config::{ClientConfig, LoginEndpoints};
pub use dashboard::{DashboardError, DashboardKind, EventCard, EventsView, ViewState};
pub use error::ClientError;
pub use form::{EventForm, FormError, SubmitOutcome};
pub use models::{Event, EventStatus, NewEvent, Role, UserProfile, FALLBACK_IMAGE_URL};
pub use session::{MemorySessionStore, Session, SessionStore, SqliteSessionStore};
