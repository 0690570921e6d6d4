//! Error handling for EventHub
//!
//! This module defines the main error type used throughout the application,
//! its classification helpers, and the mapping onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

/// Main error type for EventHub
#[derive(Error, Debug)]
pub enum EventHubError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation failed on {field}: {message}")]
    ValidationFailed { field: &'static str, message: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Event not found or not owned by caller")]
    NotFoundOrForbidden,

    #[error("Event not found: {0}")]
    EventNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(uuid::Uuid),

    #[error("User is already signed up for this event")]
    AlreadySignedUp,

    #[error("Event has already started and can no longer be changed")]
    EventStarted,

    #[error("Calendar access not authorized: {0}")]
    NotAuthorized(String),

    #[error("Google Calendar integration is disabled")]
    CalendarDisabled,

    #[error("Authentication error: {0}")]
    Unauthorized(String),

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Invalid event dates: {0}")]
    InvalidDates(String),

    #[error("Upstream service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream request failed: {0}")]
    UpstreamFailure(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for EventHub operations
pub type Result<T> = std::result::Result<T, EventHubError>;

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl EventHubError {
    /// Create a validation error for the given field
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        EventHubError::ValidationFailed { field, message: message.into() }
    }

    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            EventHubError::Database(_) => false,
            EventHubError::Migration(_) => false,
            EventHubError::Config(_) => false,
            EventHubError::ValidationFailed { .. } => false,
            EventHubError::Conflict(_) => false,
            EventHubError::NotFoundOrForbidden => false,
            EventHubError::EventNotFound(_) => false,
            EventHubError::UserNotFound(_) => false,
            EventHubError::AlreadySignedUp => false,
            EventHubError::EventStarted => false,
            EventHubError::NotAuthorized(_) => true,
            EventHubError::CalendarDisabled => false,
            EventHubError::Unauthorized(_) => false,
            EventHubError::Forbidden(_) => false,
            EventHubError::InvalidDates(_) => false,
            EventHubError::UpstreamUnavailable(_) => true,
            EventHubError::UpstreamFailure(_) => true,
            EventHubError::RateLimitExceeded => true,
            EventHubError::Token(_) => false,
            EventHubError::Http(_) => true,
            EventHubError::Serialization(_) => false,
            EventHubError::Io(_) => true,
            EventHubError::UrlParse(_) => false,
            EventHubError::Internal(_) => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EventHubError::Database(_) => ErrorSeverity::Critical,
            EventHubError::Migration(_) => ErrorSeverity::Critical,
            EventHubError::Config(_) => ErrorSeverity::Critical,
            EventHubError::ValidationFailed { .. }
            | EventHubError::Conflict(_)
            | EventHubError::NotFoundOrForbidden
            | EventHubError::EventNotFound(_)
            | EventHubError::UserNotFound(_)
            | EventHubError::AlreadySignedUp
            | EventHubError::EventStarted
            | EventHubError::NotAuthorized(_)
            | EventHubError::CalendarDisabled
            | EventHubError::InvalidDates(_) => ErrorSeverity::Info,
            EventHubError::Unauthorized(_) => ErrorSeverity::Warning,
            EventHubError::Forbidden(_) => ErrorSeverity::Warning,
            EventHubError::RateLimitExceeded => ErrorSeverity::Warning,
            EventHubError::Token(_) => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// HTTP status code this error is reported with
    pub fn status_code(&self) -> StatusCode {
        match self {
            EventHubError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            EventHubError::InvalidDates(_) => StatusCode::BAD_REQUEST,
            EventHubError::Conflict(_) => StatusCode::CONFLICT,
            EventHubError::AlreadySignedUp => StatusCode::CONFLICT,
            EventHubError::NotFoundOrForbidden => StatusCode::NOT_FOUND,
            EventHubError::EventNotFound(_) => StatusCode::NOT_FOUND,
            EventHubError::UserNotFound(_) => StatusCode::NOT_FOUND,
            EventHubError::EventStarted => StatusCode::FORBIDDEN,
            EventHubError::Forbidden(_) => StatusCode::FORBIDDEN,
            EventHubError::NotAuthorized(_) => StatusCode::UNAUTHORIZED,
            EventHubError::CalendarDisabled => StatusCode::UNAUTHORIZED,
            EventHubError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            EventHubError::Token(_) => StatusCode::UNAUTHORIZED,
            EventHubError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            EventHubError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            EventHubError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message; infrastructure details stay in the logs
    fn public_message(&self) -> (String, Option<String>) {
        match self {
            EventHubError::ValidationFailed { field, message } => {
                (format!("Validation failed: {}", field), Some(message.clone()))
            }
            EventHubError::NotAuthorized(_) => (
                self.to_string(),
                Some("/api/calendar/oauth".to_string()),
            ),
            EventHubError::Token(_) => ("Invalid or expired token".to_string(), None),
            EventHubError::Database(_) | EventHubError::Migration(_) => {
                ("Database operation failed".to_string(), None)
            }
            EventHubError::Config(_) => ("Server configuration error".to_string(), None),
            EventHubError::Http(_)
            | EventHubError::Serialization(_)
            | EventHubError::Io(_)
            | EventHubError::UrlParse(_)
            | EventHubError::Internal(_) => ("Internal server error".to_string(), None),
            _ => (self.to_string(), None),
        }
    }
}

impl IntoResponse for EventHubError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self.severity() {
            ErrorSeverity::Critical | ErrorSeverity::Error => {
                error!(error = %self, severity = %self.severity(), status = status.as_u16(), "Request failed");
            }
            ErrorSeverity::Warning => {
                warn!(error = %self, status = status.as_u16(), "Request rejected");
            }
            ErrorSeverity::Info => {
                info!(error = %self, status = status.as_u16(), "Request rejected");
            }
        }

        let (error, details) = self.public_message();
        (status, Json(ErrorResponse { error, details })).into_response()
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
