//! State behind the "Create New Event" dialog.
//!
//! The form collects raw text, turns it into a [`NewEvent`] and makes exactly
//! one create call. A UI that runs the request itself can use
//! [`EventForm::begin_submit`] and [`EventForm::finish_submit`]; everyone
//! else calls [`EventForm::submit`].

use std::path::PathBuf;

use thiserror::Error;

use crate::api::EventsApi;
use crate::error::ClientError;
use crate::models::{Event, NewEvent, FALLBACK_IMAGE_URL};

pub const CREATED_MESSAGE: &str = "Event created successfully!";
pub const FAILED_MESSAGE: &str = "Failed to create event. Please try again.";

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("Max seats must be a whole number, got '{0}'")]
    InvalidSeats(String),
    #[error("An event is already being created")]
    Busy,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    Created(Event),
    Invalid(FormError),
    Failed(String),
}

impl SubmitOutcome {
    /// Toast text for the outcome.
    pub fn message(&self) -> String {
        match self {
            SubmitOutcome::Created(_) => CREATED_MESSAGE.to_string(),
            SubmitOutcome::Invalid(e) => e.to_string(),
            SubmitOutcome::Failed(message) => message.clone(),
        }
    }
}

/// Split on commas, trim each piece and drop the empty ones.
pub fn normalize_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect()
}

/// Local preview reference for a picked file. The file itself is never uploaded.
pub fn image_url(image: Option<&PathBuf>) -> String {
    match image {
        Some(path) => format!("file://{}", path.display()),
        None => FALLBACK_IMAGE_URL.to_string(),
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventForm {
    pub title: String,
    pub description: String,
    pub tags: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub max_seats: String,
    pub image: Option<PathBuf>,
    submitting: bool,
}

impl EventForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// True between `begin_submit` and `finish_submit` ("Creating event...").
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Validates and normalizes the current input without touching state.
    pub fn to_new_event(&self) -> Result<NewEvent, FormError> {
        let required = [
            ("Title", &self.title),
            ("Description", &self.description),
            ("Date", &self.date),
            ("Time", &self.time),
            ("Location", &self.location),
            ("Max seats", &self.max_seats),
        ];
        for (label, value) in required {
            if value.trim().is_empty() {
                return Err(FormError::Missing(label));
            }
        }

        let max_seats = self
            .max_seats
            .trim()
            .parse::<i32>()
            .map_err(|_| FormError::InvalidSeats(self.max_seats.clone()))?;

        Ok(NewEvent {
            title: self.title.clone(),
            description: self.description.clone(),
            tags: normalize_tags(&self.tags),
            date: self.date.clone(),
            time: self.time.clone(),
            location: self.location.clone(),
            max_seats,
            image: image_url(self.image.as_ref()),
        })
    }

    /// Marks the form busy and hands out the payload to send.
    pub fn begin_submit(&mut self) -> Result<NewEvent, FormError> {
        if self.submitting {
            return Err(FormError::Busy);
        }
        let payload = self.to_new_event()?;
        self.submitting = true;
        Ok(payload)
    }

    /// Clears the busy flag. Fields are reset only on success so a failed
    /// submit can be sent again as-is.
    pub fn finish_submit(&mut self, result: Result<Event, ClientError>) -> SubmitOutcome {
        self.submitting = false;
        match result {
            Ok(event) => {
                self.reset();
                SubmitOutcome::Created(event)
            }
            Err(e) => {
                log::error!("Event creation failed: {}", e);
                SubmitOutcome::Failed(FAILED_MESSAGE.to_string())
            }
        }
    }

    pub async fn submit(&mut self, api: &dyn EventsApi) -> SubmitOutcome {
        let payload = match self.begin_submit() {
            Ok(payload) => payload,
            Err(e) => return SubmitOutcome::Invalid(e),
        };
        let result = api.create_event(&payload).await;
        self.finish_submit(result)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
