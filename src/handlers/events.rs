//! Public event routes and attendance

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::handlers::AppState;
use crate::middleware::AuthUser;
use crate::models::{Event, ExternalEvent};
use crate::services::{EventListing, EventSearch, SourceFilter};
use crate::utils::errors::{EventHubError, Result};

#[derive(Debug, Default, Deserialize)]
pub struct ListEventsQuery {
    pub keyword: Option<String>,
    pub city: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub source: Option<SourceFilter>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: &'static str,
    pub event: Event,
}

/// Stored ids are UUIDs; anything else cannot name an event
pub(crate) fn parse_event_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| EventHubError::EventNotFound(raw.to_string()))
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<EventListing>> {
    let search = EventSearch {
        keyword: query.keyword,
        city: query.city,
        page: query.page.unwrap_or(0),
        size: query.size.filter(|s| *s > 0),
        source: query.source.unwrap_or_default(),
    };
    Ok(Json(state.services.event_service.search(&search).await?))
}

pub async fn get_event(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Event>> {
    let id = parse_event_id(&id)?;
    Ok(Json(state.services.event_service.get(id).await?))
}

pub async fn get_external_event(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
) -> Result<Json<ExternalEvent>> {
    Ok(Json(state.services.event_service.get_external(&external_id).await?))
}

pub async fn signup(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SignupResponse>> {
    let id = parse_event_id(&id)?;
    let event = state.services.signup_service.signup(id, user.id).await?;
    Ok(Json(SignupResponse { message: "Signed up successfully", event }))
}

pub async fn signup_external(
    State(state): State<AppState>,
    user: AuthUser,
    Path(external_id): Path<String>,
) -> Result<Json<SignupResponse>> {
    let event = state.services.signup_service.signup_external(&external_id, user.id).await?;
    Ok(Json(SignupResponse { message: "Signed up successfully", event }))
}

pub async fn my_events(State(state): State<AppState>, user: AuthUser) -> Result<Json<Vec<Event>>> {
    Ok(Json(state.services.signup_service.list_signed_up(user.id).await?))
}
