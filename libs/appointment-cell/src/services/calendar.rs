// libs/appointment-cell/src/services/calendar.rs
use std::fs;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use shared_config::AppConfig;

use crate::models::{Appointment, CalendarStatus};

const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_REFRESH_MARGIN_SECONDS: i64 = 60;

/// Failure of a best-effort calendar call. Callers log it and carry on.
#[derive(Debug, Error)]
pub enum CalendarSyncError {
    #[error("Google Calendar integration is disabled")]
    Disabled,

    #[error("Invalid Google credentials: {0}")]
    Credentials(String),

    #[error("Google token request failed: {0}")]
    Auth(String),

    #[error("Google Calendar request failed: {0}")]
    Request(String),

    #[error("Google Calendar API error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl From<reqwest::Error> for CalendarSyncError {
    fn from(error: reqwest::Error) -> Self {
        CalendarSyncError::Request(error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    #[serde(default, rename = "htmlLink")]
    pub html_link: Option<String>,
}

/// External calendar the appointment service mirrors its bookings into.
#[async_trait]
pub trait CalendarSync: Send + Sync {
    fn status(&self) -> CalendarStatus;

    async fn create_event(&self, appointment: &Appointment) -> Result<CalendarEvent, CalendarSyncError>;

    async fn update_event(&self, event_id: &str, appointment: &Appointment) -> Result<(), CalendarSyncError>;

    async fn cancel_event(&self, event_id: &str) -> Result<(), CalendarSyncError>;
}

pub struct DisabledCalendar;

#[async_trait]
impl CalendarSync for DisabledCalendar {
    fn status(&self) -> CalendarStatus {
        CalendarStatus {
            enabled: false,
            message: "Integração com Google Calendar não configurada".to_string(),
        }
    }

    async fn create_event(&self, _appointment: &Appointment) -> Result<CalendarEvent, CalendarSyncError> {
        Err(CalendarSyncError::Disabled)
    }

    async fn update_event(&self, _event_id: &str, _appointment: &Appointment) -> Result<(), CalendarSyncError> {
        Err(CalendarSyncError::Disabled)
    }

    async fn cancel_event(&self, _event_id: &str) -> Result<(), CalendarSyncError> {
        Err(CalendarSyncError::Disabled)
    }
}

// ==============================================================================
// GOOGLE CREDENTIALS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
}

impl ServiceAccountKey {
    pub fn from_file(path: &str) -> Result<Self, CalendarSyncError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| CalendarSyncError::Credentials(format!("{}: {}", path, e)))?;
        serde_json::from_str(&contents)
            .map_err(|e| CalendarSyncError::Credentials(format!("{}: {}", path, e)))
    }
}

#[derive(Debug, Clone)]
pub enum GoogleCredentials {
    OAuth {
        client_id: String,
        client_secret: String,
        refresh_token: Option<String>,
    },
    ServiceAccount(ServiceAccountKey),
}

impl GoogleCredentials {
    /// Service account key file wins over the OAuth client pair when both are set.
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>, CalendarSyncError> {
        if let Some(path) = &config.google_service_account_key_file {
            return Ok(Some(GoogleCredentials::ServiceAccount(ServiceAccountKey::from_file(path)?)));
        }

        match (&config.google_client_id, &config.google_client_secret) {
            (Some(client_id), Some(client_secret)) => Ok(Some(GoogleCredentials::OAuth {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                refresh_token: config.google_refresh_token.clone(),
            })),
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Serialize)]
struct ServiceAccountClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expiry")]
    expires_in: i64,
}

fn default_expiry() -> i64 {
    3600
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: chrono::DateTime<Utc>,
}

// ==============================================================================
// GOOGLE CALENDAR CLIENT
// ==============================================================================

pub struct GoogleCalendarClient {
    http: Client,
    credentials: GoogleCredentials,
    api_base_url: String,
    token_url: String,
    calendar_id: String,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleCalendarClient {
    pub fn new(config: &AppConfig, credentials: GoogleCredentials) -> Self {
        Self {
            http: Client::new(),
            credentials,
            api_base_url: config.google_api_base_url.trim_end_matches('/').to_string(),
            token_url: config.google_token_url.clone(),
            calendar_id: config.google_calendar_id.clone(),
            token: Mutex::new(None),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Option<Self>, CalendarSyncError> {
        Ok(GoogleCredentials::from_config(config)?
            .map(|credentials| Self::new(config, credentials)))
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.api_base_url,
            urlencoding::encode(&self.calendar_id)
        )
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), urlencoding::encode(event_id))
    }

    fn event_body(appointment: &Appointment) -> Value {
        let mut description = appointment.description.clone().unwrap_or_default();
        if let Some(link) = &appointment.meet_link {
            if !description.is_empty() {
                description.push_str("\n\n");
            }
            description.push_str(&format!("Link da consulta: {}", link));
        }

        json!({
            "summary": appointment.title,
            "description": description,
            "location": appointment.meet_link,
            "start": {
                "dateTime": appointment.appointment_date.to_rfc3339(),
                "timeZone": "UTC"
            },
            "end": {
                "dateTime": appointment.end_time().to_rfc3339(),
                "timeZone": "UTC"
            },
            "extendedProperties": {
                "private": {
                    "medflowAppointmentId": appointment.id.to_string()
                }
            }
        })
    }

    async fn access_token(&self) -> Result<String, CalendarSyncError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() + Duration::seconds(TOKEN_REFRESH_MARGIN_SECONDS) {
                return Ok(token.access_token.clone());
            }
        }

        let response = match &self.credentials {
            GoogleCredentials::OAuth { client_id, client_secret, refresh_token } => {
                let refresh_token = refresh_token.as_deref().ok_or_else(|| {
                    CalendarSyncError::Credentials("GOOGLE_REFRESH_TOKEN not set".to_string())
                })?;
                debug!("Refreshing Google OAuth access token");
                self.http
                    .post(&self.token_url)
                    .form(&[
                        ("grant_type", "refresh_token"),
                        ("client_id", client_id.as_str()),
                        ("client_secret", client_secret.as_str()),
                        ("refresh_token", refresh_token),
                    ])
                    .send()
                    .await?
            }
            GoogleCredentials::ServiceAccount(key) => {
                debug!("Requesting service account token for {}", key.client_email);
                let assertion = self.service_account_assertion(key)?;
                self.http
                    .post(&self.token_url)
                    .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
                    .send()
                    .await?
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CalendarSyncError::Auth(format!("{}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await?;
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        });

        Ok(token.access_token)
    }

    fn service_account_assertion(&self, key: &ServiceAccountKey) -> Result<String, CalendarSyncError> {
        let now = Utc::now().timestamp();
        let claims = ServiceAccountClaims {
            iss: &key.client_email,
            scope: CALENDAR_SCOPE,
            aud: &self.token_url,
            iat: now,
            exp: now + 3600,
        };

        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| CalendarSyncError::Credentials(e.to_string()))?;

        encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
            .map_err(|e| CalendarSyncError::Credentials(e.to_string()))
    }

    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, CalendarSyncError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(CalendarSyncError::Api { status: status.as_u16(), message })
    }
}

#[async_trait]
impl CalendarSync for GoogleCalendarClient {
    fn status(&self) -> CalendarStatus {
        let message = match &self.credentials {
            GoogleCredentials::ServiceAccount(_) => "Google Calendar integrado via conta de serviço",
            GoogleCredentials::OAuth { refresh_token: Some(_), .. } => "Google Calendar integrado via OAuth",
            GoogleCredentials::OAuth { refresh_token: None, .. } => {
                "Google Calendar configurado, aguardando autorização OAuth"
            }
        };

        CalendarStatus {
            enabled: true,
            message: message.to_string(),
        }
    }

    async fn create_event(&self, appointment: &Appointment) -> Result<CalendarEvent, CalendarSyncError> {
        let token = self.access_token().await?;
        let response = self.http
            .post(self.events_url())
            .bearer_auth(token)
            .json(&Self::event_body(appointment))
            .send()
            .await?;

        let event: CalendarEvent = Self::check_response(response).await?.json().await?;
        info!("Created calendar event {} for appointment {}", event.id, appointment.id);
        Ok(event)
    }

    async fn update_event(&self, event_id: &str, appointment: &Appointment) -> Result<(), CalendarSyncError> {
        let token = self.access_token().await?;
        let response = self.http
            .patch(self.event_url(event_id))
            .bearer_auth(token)
            .json(&Self::event_body(appointment))
            .send()
            .await?;

        Self::check_response(response).await?;
        info!("Updated calendar event {} for appointment {}", event_id, appointment.id);
        Ok(())
    }

    async fn cancel_event(&self, event_id: &str) -> Result<(), CalendarSyncError> {
        let token = self.access_token().await?;
        let response = self.http
            .delete(self.event_url(event_id))
            .bearer_auth(token)
            .send()
            .await?;

        // An event that is already gone counts as cancelled.
        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::GONE) {
            debug!("Calendar event {} already removed", event_id);
            return Ok(());
        }

        Self::check_response(response).await?;
        info!("Cancelled calendar event {}", event_id);
        Ok(())
    }
}
