//! Event lists on the user and admin dashboards.

use thiserror::Error;

use crate::api::EventsApi;
use crate::models::Event;
use crate::session::{Session, SessionStore};

pub const USER_EMPTY_MESSAGE: &str = "No upcoming events yet. Check back soon!";
pub const ADMIN_EMPTY_MESSAGE: &str =
    "No events created yet. Create your first event to get started.";
pub const LOAD_FAILED_MESSAGE: &str = "Could not load events. Please try again.";

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DashboardError {
    #[error("Please sign in to view events")]
    NotLoggedIn,
    #[error("Admin access required")]
    AccessDenied,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DashboardKind {
    User,
    Admin,
}

impl DashboardKind {
    pub fn empty_message(&self) -> &'static str {
        match self {
            DashboardKind::User => USER_EMPTY_MESSAGE,
            DashboardKind::Admin => ADMIN_EMPTY_MESSAGE,
        }
    }
}

/// Display-ready text for one event card.
#[derive(Clone, Debug, PartialEq)]
pub struct EventCard {
    pub id: String,
    pub title: String,
    pub description: String,
    pub schedule: String,
    pub location: String,
    pub seats: String,
    pub status: String,
    pub tags: Vec<String>,
    pub image: String,
}

impl From<&Event> for EventCard {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id.to_string(),
            title: event.title.clone(),
            description: event.description.clone(),
            schedule: format!("{} at {}", event.date, event.time),
            location: event.location.clone(),
            seats: format!("{}/{} seats", event.registered_seats, event.max_seats),
            status: event.status.as_str().to_string(),
            tags: event.tags.clone(),
            image: event.image.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ViewState {
    Loading,
    Ready(Vec<EventCard>),
    Empty(&'static str),
    Failed(String),
}

pub struct EventsView {
    kind: DashboardKind,
    state: ViewState,
    mounted: bool,
}

impl EventsView {
    pub fn new(kind: DashboardKind) -> Self {
        Self {
            kind,
            state: ViewState::Loading,
            mounted: false,
        }
    }

    pub fn for_user<S: SessionStore>(session: &Session<S>) -> Result<Self, DashboardError> {
        if !session.is_authenticated() {
            return Err(DashboardError::NotLoggedIn);
        }
        Ok(Self::new(DashboardKind::User))
    }

    pub fn for_admin<S: SessionStore>(session: &Session<S>) -> Result<Self, DashboardError> {
        match session.user() {
            None => Err(DashboardError::NotLoggedIn),
            Some(user) if !user.is_admin() => {
                log::warn!("Non-admin {} tried to open the admin dashboard", user.email);
                Err(DashboardError::AccessDenied)
            }
            Some(_) => Ok(Self::new(DashboardKind::Admin)),
        }
    }

    pub fn kind(&self) -> DashboardKind {
        self.kind
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// First display: lists once. Later calls are no-ops.
    pub async fn mount(&mut self, api: &dyn EventsApi) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        self.reload(api).await;
    }

    pub async fn reload(&mut self, api: &dyn EventsApi) {
        self.state = match api.list_events().await {
            Ok(events) if events.is_empty() => ViewState::Empty(self.kind.empty_message()),
            Ok(events) => ViewState::Ready(events.iter().map(EventCard::from).collect()),
            Err(e) => {
                log::error!("Error fetching events: {}", e);
                ViewState::Failed(LOAD_FAILED_MESSAGE.to_string())
            }
        };
    }
}
