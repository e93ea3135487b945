//! Wire types shared with the events API and the login webhooks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Banner used when the creator did not pick an image.
pub const FALLBACK_IMAGE_URL: &str =
    "https://images.unsplash.com/photo-1515187029135-18ee286d815b?w=400&h=200&fit=crop";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Upcoming => "upcoming",
            EventStatus::Ongoing => "ongoing",
            EventStatus::Completed => "completed",
            EventStatus::Cancelled => "cancelled",
        }
    }
}

/// Event as returned by `GET /api/events`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub max_seats: i32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub registered_seats: i32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /api/events`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub date: String,
    pub time: String,
    pub location: String,
    pub max_seats: i32,
    pub image: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Alumni,
    Mentor,
    Admin,
}

/// The signed-in user, persisted between launches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_tolerates_missing_optional_fields() {
        let event: Event = serde_json::from_value(json!({
            "id": "0f8fad5b-d9cb-469f-a165-70867728950e",
            "title": "Hack Night",
            "maxSeats": 40
        }))
        .unwrap();
        assert_eq!(event.max_seats, 40);
        assert_eq!(event.status, EventStatus::Upcoming);
        assert!(event.tags.is_empty());
        assert!(event.created_at.is_none());
    }

    #[test]
    fn new_event_uses_camel_case_keys() {
        let body = serde_json::to_value(NewEvent {
            title: "t".into(),
            description: "d".into(),
            tags: vec!["AI".into()],
            date: "2024-02-15".into(),
            time: "10:00".into(),
            location: "Hall".into(),
            max_seats: 50,
            image: FALLBACK_IMAGE_URL.into(),
        })
        .unwrap();
        assert_eq!(body["maxSeats"], json!(50));
        assert!(body.get("max_seats").is_none());
    }

    #[test]
    fn profile_role_defaults_to_student() {
        let profile: UserProfile =
            serde_json::from_value(json!({ "name": "Ada", "email": "ada@uni.edu" })).unwrap();
        assert_eq!(profile.role, Role::Student);
        assert!(!profile.is_admin());
    }
}
