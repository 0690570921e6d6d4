//! Google Calendar service implementation
//!
//! This service runs the OAuth consent flow for calendar access, stores the
//! resulting grant per user, and inserts stored events into the user's primary
//! calendar. An expired access token is refreshed once before pushing.

use std::sync::Arc;
use std::time::{Duration, Instant};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;
use crate::config::GoogleConfig;
use crate::database::{CalendarTokenStore, EventStore, UserStore};
use crate::models::{CalendarTokens, Event};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::format_rfc3339;
use crate::utils::logging::{log_api_error, log_upstream_call};

/// OAuth scope requested for calendar export
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";

const API_NAME: &str = "google_calendar";

/// Google Calendar event insert body
#[derive(Debug, Clone, Serialize)]
pub struct GoogleCalendarEvent {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: GoogleDateTime,
    pub end: GoogleDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoogleDateTime {
    #[serde(rename = "dateTime")]
    pub date_time: String,
    #[serde(rename = "timeZone")]
    pub time_zone: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertedEvent {
    html_link: Option<String>,
}

/// Encode a user id into the OAuth `state` parameter
pub fn encode_state(user_id: Uuid) -> String {
    URL_SAFE_NO_PAD.encode(user_id.to_string())
}

/// Decode the OAuth `state` parameter back into a user id
pub fn decode_state(state: &str) -> Result<Uuid> {
    let invalid = || EventHubError::validation("state", "Invalid OAuth state");
    let bytes = URL_SAFE_NO_PAD
        .decode(state.trim_end_matches('='))
        .map_err(|_| invalid())?;
    let text = String::from_utf8(bytes).map_err(|_| invalid())?;
    Uuid::parse_str(&text).map_err(|_| invalid())
}

/// Build the calendar body for an event; a missing end is one hour after the start
pub fn to_google_event(event: &Event) -> Result<GoogleCalendarEvent> {
    let end = event.end_date.unwrap_or(event.start_date + chrono::Duration::hours(1));
    if end <= event.start_date {
        return Err(EventHubError::InvalidDates(format!(
            "event {} ends before it starts",
            event.id
        )));
    }

    let location = [event.location.venue.as_str(), event.location.city.as_str()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(", ");

    Ok(GoogleCalendarEvent {
        summary: event.title.clone(),
        description: event.description.clone(),
        location: Some(location).filter(|l| !l.is_empty()),
        start: GoogleDateTime { date_time: format_rfc3339(event.start_date), time_zone: "UTC".to_string() },
        end: GoogleDateTime { date_time: format_rfc3339(end), time_zone: "UTC".to_string() },
    })
}

/// Google Calendar service for exporting events
#[derive(Clone)]
pub struct GoogleCalendarService {
    config: Option<GoogleConfig>,
    http_client: reqwest::Client,
    tokens: Arc<dyn CalendarTokenStore>,
    events: Arc<dyn EventStore>,
    users: Arc<dyn UserStore>,
}

impl GoogleCalendarService {
    /// `config` is `None` when calendar export is disabled
    pub fn new(
        config: Option<GoogleConfig>,
        tokens: Arc<dyn CalendarTokenStore>,
        events: Arc<dyn EventStore>,
        users: Arc<dyn UserStore>,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("EventHub/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { config, http_client, tokens, events, users })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_some()
    }

    fn config(&self) -> Result<&GoogleConfig> {
        self.config
            .as_ref()
            .ok_or(EventHubError::CalendarDisabled)
    }

    /// Where the browser is sent once the callback completes
    pub fn client_redirect_url(&self) -> Option<&str> {
        self.config.as_ref().map(|c| c.client_redirect_url.as_str())
    }

    /// Consent URL for a user
    pub fn authorize_url(&self, user_id: Uuid) -> Result<String> {
        let config = self.config()?;
        let url = Url::parse_with_params(
            &config.auth_url,
            &[
                ("client_id", config.client_id.as_str()),
                ("redirect_uri", config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", CALENDAR_SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", encode_state(user_id).as_str()),
            ],
        )?;
        Ok(url.to_string())
    }

    /// Exchange an authorization code and store the grant for the user in `state`
    pub async fn exchange_code(&self, code: &str, state: &str) -> Result<Uuid> {
        let user_id = decode_state(state)?;
        let config = self.config()?;
        if code.trim().is_empty() {
            return Err(EventHubError::validation("code", "Missing authorization code"));
        }
        if self.users.find_by_id(user_id).await?.is_none() {
            warn!(user_id = %user_id, "OAuth state names an unknown user");
            return Err(EventHubError::validation("state", "Invalid OAuth state"));
        }

        let response = self
            .request_token(&[
                ("code", code),
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("redirect_uri", config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .await
            .map_err(|e| EventHubError::UpstreamFailure(format!("Token exchange failed: {}", e)))?;

        let now = Utc::now();
        self.tokens
            .save(CalendarTokens {
                user_id,
                access_token: response.access_token,
                refresh_token: response.refresh_token,
                expires_at: expiry(now, response.expires_in),
                updated_at: now,
            })
            .await?;

        info!(user_id = %user_id, "Stored calendar grant");
        Ok(user_id)
    }

    /// Insert a stored event into the user's primary calendar and return its link
    pub async fn push(&self, user_id: Uuid, event_id: Uuid) -> Result<String> {
        let config = self.config()?;
        let tokens = self
            .tokens
            .find(user_id)
            .await?
            .ok_or_else(|| EventHubError::NotAuthorized("Calendar access has not been granted".to_string()))?;

        let event = self
            .events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| EventHubError::EventNotFound(event_id.to_string()))?;
        let body = to_google_event(&event)?;

        let access_token = self.fresh_access_token(tokens).await?;

        let endpoint = format!("{}/calendars/primary/events", config.api_base.trim_end_matches('/'));
        let started = Instant::now();
        let response = self
            .http_client
            .post(&endpoint)
            .bearer_auth(&access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                log_api_error(API_NAME, &e.to_string(), Some("insert"));
                EventHubError::UpstreamFailure("Google Calendar is unreachable".to_string())
            })?;

        let status = response.status();
        log_upstream_call(API_NAME, "calendars/primary/events", started.elapsed().as_millis() as u64, status.is_success());
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            log_api_error(API_NAME, &format!("status {}", status), Some(&detail));
            return Err(EventHubError::UpstreamFailure(format!("Google Calendar responded with {}", status)));
        }

        let inserted: InsertedEvent = response
            .json()
            .await
            .map_err(|e| EventHubError::UpstreamFailure(format!("Unreadable calendar response: {}", e)))?;

        info!(user_id = %user_id, event_id = %event_id, "Event added to calendar");
        Ok(inserted.html_link.unwrap_or_default())
    }

    /// Return a usable access token, refreshing and persisting it when expired
    async fn fresh_access_token(&self, tokens: CalendarTokens) -> Result<String> {
        let now = Utc::now();
        if !tokens.is_expired(now) {
            return Ok(tokens.access_token);
        }

        let config = self.config()?;
        let refresh_token = tokens
            .refresh_token
            .clone()
            .ok_or_else(|| EventHubError::NotAuthorized("Calendar access expired".to_string()))?;

        let refreshed = self
            .request_token(&[
                ("refresh_token", refresh_token.as_str()),
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .await
            .map_err(|e| {
                warn!(user_id = %tokens.user_id, error = %e, "Calendar token refresh failed");
                EventHubError::NotAuthorized("Calendar access expired".to_string())
            })?;

        self.tokens
            .save(CalendarTokens {
                user_id: tokens.user_id,
                access_token: refreshed.access_token.clone(),
                refresh_token: refreshed.refresh_token,
                expires_at: expiry(now, refreshed.expires_in),
                updated_at: now,
            })
            .await?;

        info!(user_id = %tokens.user_id, "Refreshed calendar access token");
        Ok(refreshed.access_token)
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let config = self.config()?;
        let started = Instant::now();
        let response = self.http_client.post(&config.token_url).form(form).send().await?;

        let status = response.status();
        log_upstream_call(API_NAME, "token", started.elapsed().as_millis() as u64, status.is_success());
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            log_api_error(API_NAME, &format!("token endpoint status {}", status), Some(&detail));
            return Err(EventHubError::UpstreamFailure(format!("token endpoint responded with {}", status)));
        }

        Ok(response.json::<TokenResponse>().await?)
    }
}

fn expiry(now: DateTime<Utc>, expires_in: Option<i64>) -> Option<DateTime<Utc>> {
    expires_in.map(|seconds| now + chrono::Duration::seconds(seconds))
}
