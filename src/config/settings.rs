//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub ticketmaster: TicketmasterConfig,
    pub google: Option<GoogleConfig>,
    pub uploads: UploadsConfig,
    pub logging: LoggingConfig,
    pub features: FeaturesConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty means permissive
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Postgres connection string, or `memory://` for the in-process store
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl DatabaseConfig {
    pub fn is_in_memory(&self) -> bool {
        self.url.starts_with("memory:")
    }
}

/// Session token configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// Code that grants the staff role at signup; staff signup is closed when unset
    pub staff_invite_code: Option<String>,
    pub login_attempts_per_minute: u32,
}

/// Ticketmaster Discovery API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TicketmasterConfig {
    pub api_key: String,
    pub base_url: String,
    pub country_code: String,
    pub timeout_seconds: u64,
    pub default_page_size: u32,
}

/// Google Calendar OAuth configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Where the browser lands after the OAuth callback
    pub client_redirect_url: String,
    #[serde(default = "default_google_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_google_token_url")]
    pub token_url: String,
    #[serde(default = "default_google_api_base")]
    pub api_base: String,
}

fn default_google_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_google_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_google_api_base() -> String {
    "https://www.googleapis.com/calendar/v3".to_string()
}

/// Uploaded image storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadsConfig {
    pub dir: String,
    pub public_base: String,
    pub max_bytes: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: String,
    #[serde(default)]
    pub json: bool,
}

/// Feature flags configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeaturesConfig {
    pub google_calendar: bool,
}

impl Settings {
    /// Load settings from configuration file and environment variables.
    ///
    /// Environment variables use the `EVENTHUB` prefix and `__` between
    /// sections, e.g. `EVENTHUB__AUTH__JWT_SECRET`.
    pub fn new() -> Result<Self, config::ConfigError> {
        Self::from_file("config")
    }

    /// Load settings layered over the defaults from the given file stem
    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&Settings::default())?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("EVENTHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::EventHubError> {
        super::validation::validate_settings(self)
    }

    /// Whether calendar export can be offered at all
    pub fn google_calendar_enabled(&self) -> bool {
        self.features.google_calendar && self.google.is_some()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
                cors_origins: vec![],
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/eventhub".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
                token_ttl_hours: 24,
                staff_invite_code: None,
                login_attempts_per_minute: 10,
            },
            ticketmaster: TicketmasterConfig {
                api_key: String::new(),
                base_url: "https://app.ticketmaster.com".to_string(),
                country_code: "GB".to_string(),
                timeout_seconds: 10,
                default_page_size: 20,
            },
            google: None,
            uploads: UploadsConfig {
                dir: "uploads".to_string(),
                public_base: "/uploads".to_string(),
                max_bytes: 5 * 1024 * 1024,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: "logs".to_string(),
                json: false,
            },
            features: FeaturesConfig {
                google_calendar: false,
            },
        }
    }
}
