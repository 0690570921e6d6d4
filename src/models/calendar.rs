//! Calendar grant model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// OAuth tokens a user granted for calendar export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarTokens {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl CalendarTokens {
    /// Whether the access token is expired or about to expire
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - Duration::seconds(60) <= now,
            None => false,
        }
    }
}
