//! HTTP handlers module
//!
//! This module contains the axum handlers organized by area:
//! - Public event listing, lookups and attendance
//! - Staff authoring of manual events
//! - Account signup and login
//! - Google Calendar export

pub mod auth;
pub mod calendar;
pub mod events;
pub mod staff;

use std::sync::Arc;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use tower_http::services::ServeDir;
use crate::config::Settings;
use crate::middleware::{cors_layer, http_trace_layer};
use crate::services::ServiceFactory;

/// Multipart overhead allowed on top of the image size cap
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<ServiceFactory>,
}

impl AppState {
    pub fn new(services: ServiceFactory) -> Self {
        Self { services: Arc::new(services) }
    }
}

/// Build the application router
pub fn router(state: AppState, settings: &Settings) -> Router {
    let uploads_dir = state.services.assets.dir().clone();
    let upload_limit = settings.uploads.max_bytes + FORM_OVERHEAD_BYTES;

    let staff_routes = Router::new()
        .route("/", get(staff::list_authored).post(staff::create_event))
        .route("/:id", put(staff::update_event).delete(staff::delete_event))
        .layer(DefaultBodyLimit::max(upload_limit));

    Router::new()
        .route("/health", get(health))
        .route("/api/events", get(events::list_events))
        .route("/api/events/mine", get(events::my_events))
        .route("/api/events/:id", get(events::get_event))
        .route("/api/events/:id/signup", post(events::signup))
        .route("/api/events/ticketmaster/:external_id", get(events::get_external_event))
        .route("/api/events/ticketmaster/:external_id/signup", post(events::signup_external))
        .nest("/api/staff/events", staff_routes)
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/calendar/oauth", get(calendar::oauth_url))
        .route("/api/calendar/callback", get(calendar::oauth_callback))
        .route("/api/calendar/add-event", post(calendar::add_event))
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(http_trace_layer())
        .layer(cors_layer(&settings.server.cors_origins))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.services.health_check().await;
    let code = if status.is_healthy() { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        code,
        Json(serde_json::json!({
            "status": if status.is_healthy() { "ok" } else { "degraded" },
            "version": crate::VERSION,
            "services": status,
        })),
    )
}
