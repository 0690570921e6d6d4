//! Services module
//!
//! This module contains business logic services

pub mod assets;
pub mod auth;
pub mod events;
pub mod google;
pub mod signup;
pub mod ticketmaster;

// Re-export commonly used services
pub use assets::{AssetStore, ImageUpload};
pub use auth::{AuthService, Claims};
pub use events::{EventListing, EventSearch, EventService, SourceFilter};
pub use google::GoogleCalendarService;
pub use signup::SignupService;
pub use ticketmaster::{ExternalSearch, TicketmasterService};

use serde::Serialize;
use crate::config::settings::Settings;
use crate::database::DatabaseService;
use crate::utils::errors::Result;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub auth_service: AuthService,
    pub event_service: EventService,
    pub signup_service: SignupService,
    pub calendar_service: GoogleCalendarService,
    pub assets: AssetStore,
    database: DatabaseService,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(settings: &Settings, database: DatabaseService) -> Result<Self> {
        let ticketmaster = TicketmasterService::new(settings.ticketmaster.clone())?;
        let assets = AssetStore::new(&settings.uploads);

        let google_config = if settings.google_calendar_enabled() {
            settings.google.clone()
        } else {
            None
        };

        Ok(Self {
            auth_service: AuthService::new(settings.auth.clone(), database.users.clone()),
            event_service: EventService::new(database.events.clone(), ticketmaster.clone(), assets.clone()),
            signup_service: SignupService::new(database.events.clone(), ticketmaster),
            calendar_service: GoogleCalendarService::new(
                google_config,
                database.calendar_tokens.clone(),
                database.events.clone(),
                database.users.clone(),
            )?,
            assets,
            database,
        })
    }

    /// Health check for all services
    pub async fn health_check(&self) -> ServiceHealthStatus {
        let database_healthy = match self.database.health_check().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Database health check failed");
                false
            }
        };

        ServiceHealthStatus {
            database_healthy,
            google_calendar_enabled: self.calendar_service.is_enabled(),
        }
    }
}

/// Health status for all services
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealthStatus {
    pub database_healthy: bool,
    pub google_calendar_enabled: bool,
}

impl ServiceHealthStatus {
    /// Check if all critical services are healthy
    pub fn is_healthy(&self) -> bool {
        self.database_healthy
    }
}
