//! Calendar export routes

use axum::extract::{Query, State};
use axum::response::Redirect;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use crate::handlers::events::parse_event_id;
use crate::handlers::AppState;
use crate::middleware::AuthUser;
use crate::utils::errors::{EventHubError, Result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthUrlResponse {
    pub auth_url: String,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddEventRequest {
    pub event_id: String,
}

pub async fn oauth_url(State(state): State<AppState>, user: AuthUser) -> Result<Json<OAuthUrlResponse>> {
    let auth_url = state.services.calendar_service.authorize_url(user.id)?;
    Ok(Json(OAuthUrlResponse { auth_url }))
}

pub async fn oauth_callback(
    State(state): State<AppState>,
    Query(params): Query<OAuthCallbackParams>,
) -> Result<Redirect> {
    let calendar = &state.services.calendar_service;
    let client_url = calendar
        .client_redirect_url()
        .ok_or(EventHubError::CalendarDisabled)?
        .to_string();

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "Calendar consent was not granted");
        return Ok(Redirect::to(&with_status(&client_url, "denied")));
    }

    let code = params
        .code
        .ok_or_else(|| EventHubError::validation("code", "Missing authorization code"))?;
    let oauth_state = params
        .state
        .ok_or_else(|| EventHubError::validation("state", "Missing OAuth state"))?;

    calendar.exchange_code(&code, &oauth_state).await?;
    Ok(Redirect::to(&with_status(&client_url, "connected")))
}

pub async fn add_event(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<AddEventRequest>,
) -> Result<Json<serde_json::Value>> {
    let event_id = parse_event_id(&request.event_id)?;
    let link = state.services.calendar_service.push(user.id, event_id).await?;
    Ok(Json(json!({ "message": "Event added to Google Calendar", "htmlLink": link })))
}

fn with_status(base: &str, status: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}calendar={}", base, separator, status)
}
