use chrono::{DateTime, SubsecRound, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::ids::EventId;

/// Lifecycle label shown on event cards. Nothing in the API transitions it;
/// new events start as `upcoming` unless the creator says otherwise.
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

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "upcoming" => Some(EventStatus::Upcoming),
            "ongoing" => Some(EventStatus::Ongoing),
            "completed" => Some(EventStatus::Completed),
            "cancelled" => Some(EventStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored campus event (wire format is camelCase JSON).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub max_seats: i32,
    pub tags: Vec<String>,
    pub image: String,
    pub status: EventStatus,
    pub registered_seats: i32,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Assigns the id and creation time and applies the seat default.
    /// `created_at` is kept at microsecond precision, the resolution of
    /// a Postgres `TIMESTAMPTZ`, so the returned record equals the stored one.
    pub fn new(new_event: NewEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: new_event.title,
            description: new_event.description,
            date: new_event.date,
            time: new_event.time,
            location: new_event.location,
            max_seats: new_event.max_seats,
            tags: new_event.tags,
            image: new_event.image,
            status: new_event.status,
            registered_seats: 0,
            created_at: Utc::now().trunc_subsecs(6),
        }
    }
}

/// Normalized input for `EventStore::create_event`.
#[derive(Clone, Debug, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub max_seats: i32,
    pub tags: Vec<String>,
    pub image: String,
    pub status: EventStatus,
}

/// Tags arrive either as a JSON array or as the raw comma-separated form input.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Csv(String),
}

impl TagsInput {
    pub fn normalize(&self) -> Vec<String> {
        match self {
            TagsInput::List(items) => items
                .iter()
                .map(|tag| tag.trim())
                .filter(|tag| !tag.is_empty())
                .map(String::from)
                .collect(),
            TagsInput::Csv(raw) => normalize_tags(raw),
        }
    }
}

/// Split on commas, trim each piece and drop the empty ones. Order is kept.
pub fn normalize_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect()
}

/// POST /events body. The server does not validate required fields: absent
/// strings become empty and an absent seat count becomes 0.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
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
    #[serde(default, deserialize_with = "deserialize_seats")]
    pub max_seats: i32,
    #[serde(default)]
    pub tags: Option<TagsInput>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub status: Option<EventStatus>,
}

impl CreateEventRequest {
    pub fn into_new_event(self, fallback_image_url: &str) -> NewEvent {
        let image = self
            .image
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| fallback_image_url.to_string());

        NewEvent {
            title: self.title,
            description: self.description,
            date: self.date,
            time: self.time,
            location: self.location,
            max_seats: self.max_seats,
            tags: self.tags.map(|tags| tags.normalize()).unwrap_or_default(),
            image,
            status: self.status.unwrap_or_default(),
        }
    }
}

/// Accepts `50`, `50.9`, `"50"` or `"50.9"`; fractions are truncated.
/// Null and the empty string count as 0.
fn deserialize_seats<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let whole = match value {
        None | Some(Value::Null) => return Ok(0),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(|| de::Error::custom("maxSeats is not a finite number"))?,
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(0);
            }
            match trimmed.parse::<i64>() {
                Ok(whole) => whole,
                Err(_) => trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
                    .ok_or_else(|| de::Error::custom(format!("maxSeats '{}' is not a number", s)))?,
            }
        }
        Some(other) => {
            return Err(de::Error::custom(format!("maxSeats must be a number, got {}", other)))
        }
    };
    i32::try_from(whole).map_err(|_| de::Error::custom("maxSeats is out of range"))
}
