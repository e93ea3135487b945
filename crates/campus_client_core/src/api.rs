//! HTTP client for the events API.

use async_trait::async_trait;
use reqwest::{Client, Response};

use crate::error::ClientError;
use crate::models::{Event, NewEvent};

/// What the form and the dashboard need from the backend.
#[async_trait]
pub trait EventsApi: Send + Sync {
    /// GET /api/events
    async fn list_events(&self) -> Result<Vec<Event>, ClientError>;

    /// POST /api/events, returns the stored event.
    async fn create_event(&self, event: &NewEvent) -> Result<Event, ClientError>;
}

#[derive(Debug, Clone)]
pub struct HttpEventsApi {
    client: Client,
    base_url: String,
}

impl HttpEventsApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    fn events_url(&self) -> String {
        format!("{}/api/events", self.base_url)
    }
}

/// Non-2xx becomes `Status`, a body that is not the expected JSON becomes
/// `InvalidPayload`.
pub(crate) async fn read_json<T>(resp: Response) -> Result<T, ClientError>
where
    T: serde::de::DeserializeOwned,
{
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
            body: text,
        });
    }
    serde_json::from_str(&text).map_err(|e| ClientError::InvalidPayload(e.to_string()))
}

#[async_trait]
impl EventsApi for HttpEventsApi {
    async fn list_events(&self) -> Result<Vec<Event>, ClientError> {
        let resp = self.client.get(self.events_url()).send().await?;
        let events: Vec<Event> = read_json(resp).await?;
        log::debug!("Loaded {} events", events.len());
        Ok(events)
    }

    async fn create_event(&self, event: &NewEvent) -> Result<Event, ClientError> {
        let resp = self.client.post(self.events_url()).json(event).send().await?;
        let created: Event = read_json(resp).await?;
        log::info!("Created event {} ({})", created.id, created.title);
        Ok(created)
    }
}
