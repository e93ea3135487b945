use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde_json::Value;

use crate::models::{CreateEventRequest, Event};
use crate::AppState;

type ApiError = (StatusCode, Json<Value>);

fn internal_error(message: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": message })),
    )
}

/// GET /events - every stored event, oldest first. No filtering or paging.
pub async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let events = state.store.list_events().await.map_err(|e| {
        tracing::error!("Error listing events: {:?}", e);
        internal_error("Failed to load events")
    })?;

    tracing::debug!("Listing {} events", events.len());
    Ok(Json(events))
}

/// POST /events - stores the event and queues its webhook notification.
/// Identical bodies posted twice create two events.
pub async fn create_event(
    State(state): State<AppState>,
    Json(payload): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let new_event = payload.into_new_event(&state.config.fallback_image_url);

    let event = state.store.create_event(new_event).await.map_err(|e| {
        tracing::error!("Error creating event: {:?}", e);
        internal_error("Failed to create event")
    })?;

    tracing::info!("Event {} created: {}", event.id, event.title);
    Ok((StatusCode::CREATED, Json(event)))
}
