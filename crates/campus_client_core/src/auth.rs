//! Login through the external automation webhooks.
//!
//! Every endpoint answers with one versioned JSON shape:
//! `{"version": 1, "success": bool, "message"?: string, "user"?: {...}}`.
//! Any other body is rejected instead of guessed at.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::config::LoginEndpoints;
use crate::error::ClientError;
use crate::models::{Role, UserProfile};

pub const LOGIN_SCHEMA_VERSION: u32 = 1;
pub const REJECTED_MESSAGE: &str = "Invalid credentials. Please try again.";

const DEFAULT_YEAR: &str = "2024";
const DEFAULT_MAJOR: &str = "Computer Science";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginPortal {
    Student,
    Alumni,
    Admin,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct WebhookUser {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LoginResponse {
    pub version: u32,
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user: Option<WebhookUser>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LoginOutcome {
    Authenticated(UserProfile),
    /// Credentials accepted but the webhook knows no display name; the UI
    /// asks for one and calls [`complete_profile`].
    NeedsName { email: String },
    Rejected(String),
}

pub fn parse_login_response(text: &str) -> Result<LoginResponse, ClientError> {
    let response: LoginResponse = serde_json::from_str(text).map_err(|e| {
        log::warn!("Login webhook sent a non-conforming body: {}", e);
        ClientError::InvalidPayload(e.to_string())
    })?;
    if response.version != LOGIN_SCHEMA_VERSION {
        log::warn!("Login webhook answered with schema version {}", response.version);
        return Err(ClientError::InvalidPayload(format!(
            "unsupported login schema version {}",
            response.version
        )));
    }
    Ok(response)
}

/// `john.doe@uni.edu` -> `John Doe`
pub fn name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    local
        .split(|c: char| c == '.' || c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Builds the student/alumni profile once the user typed their name.
pub fn complete_profile(portal: LoginPortal, email: &str, name: &str) -> UserProfile {
    UserProfile {
        name: name.trim().to_string(),
        email: email.to_string(),
        year: Some(DEFAULT_YEAR.to_string()),
        major: Some(DEFAULT_MAJOR.to_string()),
        role: portal_role(portal),
    }
}

fn portal_role(portal: LoginPortal) -> Role {
    match portal {
        LoginPortal::Student => Role::Student,
        LoginPortal::Alumni => Role::Alumni,
        LoginPortal::Admin => Role::Admin,
    }
}

fn usable_name(user: Option<&WebhookUser>) -> Option<String> {
    user.and_then(|u| u.name.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "Student")
        .map(String::from)
}

/// Turns a parsed response into what the login page should do next.
pub fn resolve_login(portal: LoginPortal, email: &str, response: LoginResponse) -> LoginOutcome {
    if !response.success {
        return LoginOutcome::Rejected(
            response.message.unwrap_or_else(|| REJECTED_MESSAGE.to_string()),
        );
    }

    let user = response.user.as_ref();
    let email = user
        .and_then(|u| u.email.clone())
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| email.to_string());

    match portal {
        LoginPortal::Admin => LoginOutcome::Authenticated(UserProfile {
            name: usable_name(user).unwrap_or_else(|| name_from_email(&email)),
            email,
            year: Some("Admin".to_string()),
            major: Some("Administration".to_string()),
            role: Role::Admin,
        }),
        LoginPortal::Student | LoginPortal::Alumni => match usable_name(user) {
            Some(name) => LoginOutcome::Authenticated(UserProfile {
                name,
                email,
                year: Some(
                    user.and_then(|u| u.year.clone())
                        .unwrap_or_else(|| DEFAULT_YEAR.to_string()),
                ),
                major: Some(
                    user.and_then(|u| u.major.clone())
                        .unwrap_or_else(|| DEFAULT_MAJOR.to_string()),
                ),
                role: user
                    .and_then(|u| u.role)
                    .filter(|role| *role != Role::Admin)
                    .unwrap_or_else(|| portal_role(portal)),
            }),
            None => LoginOutcome::NeedsName { email },
        },
    }
}

#[derive(Debug, Clone)]
pub struct LoginClient {
    client: Client,
    endpoints: LoginEndpoints,
}

impl LoginClient {
    pub fn new(endpoints: LoginEndpoints) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self { client, endpoints })
    }

    fn endpoint(&self, portal: LoginPortal) -> &str {
        match portal {
            LoginPortal::Student => &self.endpoints.student,
            LoginPortal::Alumni => &self.endpoints.alumni,
            LoginPortal::Admin => &self.endpoints.admin,
        }
    }

    /// POSTs `{email, password}` to the portal's webhook.
    pub async fn login(
        &self,
        portal: LoginPortal,
        email: &str,
        password: &str,
    ) -> Result<LoginOutcome, ClientError> {
        let body = json!({ "email": email, "password": password });
        let resp = self.client.post(self.endpoint(portal)).json(&body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        let response = match parse_login_response(&text) {
            Ok(response) => response,
            // Error pages from the webhook host are not login answers.
            Err(_) if !status.is_success() => {
                return Err(ClientError::Status {
                    status: status.as_u16(),
                    body: text,
                })
            }
            Err(e) => return Err(e),
        };

        let outcome = resolve_login(portal, email, response);
        match &outcome {
            LoginOutcome::Rejected(message) => log::info!("Login rejected for {}: {}", email, message),
            _ => log::info!("Login accepted for {} via {:?} portal", email, portal),
        }
        Ok(outcome)
    }
}
