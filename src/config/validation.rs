//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{EventHubError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_database_config(&settings.database)?;
    validate_auth_config(&settings.auth)?;
    validate_ticketmaster_config(&settings.ticketmaster)?;
    validate_uploads_config(&settings.uploads)?;
    validate_logging_config(&settings.logging)?;

    if let Some(ref google_config) = settings.google {
        validate_google_config(google_config)?;
    } else if settings.features.google_calendar {
        return Err(EventHubError::Config(
            "Google Calendar feature is enabled but the google section is missing".to_string()
        ));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(EventHubError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(EventHubError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(EventHubError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate session token configuration
fn validate_auth_config(config: &super::AuthConfig) -> Result<()> {
    if config.jwt_secret.is_empty() {
        return Err(EventHubError::Config(
            "JWT secret is required".to_string()
        ));
    }

    if config.token_ttl_hours <= 0 {
        return Err(EventHubError::Config(
            "Token lifetime must be greater than 0".to_string()
        ));
    }

    if config.login_attempts_per_minute == 0 {
        return Err(EventHubError::Config(
            "Login attempts per minute must be greater than 0".to_string()
        ));
    }

    if matches!(config.staff_invite_code.as_deref(), Some("")) {
        return Err(EventHubError::Config(
            "Staff invite code cannot be empty; leave it unset to close staff signup".to_string()
        ));
    }

    Ok(())
}

/// Validate Ticketmaster configuration
fn validate_ticketmaster_config(config: &super::TicketmasterConfig) -> Result<()> {
    if config.api_key.is_empty() {
        return Err(EventHubError::Config(
            "Ticketmaster API key is required".to_string()
        ));
    }

    url::Url::parse(&config.base_url)?;

    if config.country_code.len() != 2 {
        return Err(EventHubError::Config(
            format!("Invalid Ticketmaster country code: {}", config.country_code)
        ));
    }

    if config.timeout_seconds == 0 {
        return Err(EventHubError::Config(
            "Ticketmaster timeout must be greater than 0".to_string()
        ));
    }

    if config.default_page_size == 0 {
        return Err(EventHubError::Config(
            "Ticketmaster page size must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate Google Calendar configuration
fn validate_google_config(config: &super::GoogleConfig) -> Result<()> {
    if config.client_id.is_empty() || config.client_secret.is_empty() {
        return Err(EventHubError::Config(
            "Google client id and secret are required".to_string()
        ));
    }

    url::Url::parse(&config.redirect_uri)?;
    url::Url::parse(&config.client_redirect_url)?;
    url::Url::parse(&config.auth_url)?;
    url::Url::parse(&config.token_url)?;
    url::Url::parse(&config.api_base)?;

    Ok(())
}

/// Validate uploads configuration
fn validate_uploads_config(config: &super::UploadsConfig) -> Result<()> {
    if config.dir.is_empty() {
        return Err(EventHubError::Config(
            "Uploads directory is required".to_string()
        ));
    }

    if config.max_bytes == 0 {
        return Err(EventHubError::Config(
            "Upload size limit must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(EventHubError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(EventHubError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}
