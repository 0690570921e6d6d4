//! Calendar grant repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use crate::models::calendar::CalendarTokens;
use crate::utils::errors::Result;
use super::CalendarTokenStore;

#[derive(Debug, FromRow)]
struct CalendarTokenRow {
    user_id: Uuid,
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl From<CalendarTokenRow> for CalendarTokens {
    fn from(row: CalendarTokenRow) -> Self {
        CalendarTokens {
            user_id: row.user_id,
            access_token: row.access_token,
            refresh_token: row.refresh_token,
            expires_at: row.expires_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CalendarTokenRepository {
    pool: PgPool,
}

impl CalendarTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CalendarTokenStore for CalendarTokenRepository {
    async fn save(&self, tokens: CalendarTokens) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO calendar_tokens (user_id, access_token, refresh_token, expires_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE
            SET access_token = EXCLUDED.access_token,
                refresh_token = COALESCE(EXCLUDED.refresh_token, calendar_tokens.refresh_token),
                expires_at = EXCLUDED.expires_at,
                updated_at = EXCLUDED.updated_at
            "#
        )
        .bind(tokens.user_id)
        .bind(&tokens.access_token)
        .bind(&tokens.refresh_token)
        .bind(tokens.expires_at)
        .bind(tokens.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, user_id: Uuid) -> Result<Option<CalendarTokens>> {
        let row = sqlx::query_as::<_, CalendarTokenRow>(
            "SELECT user_id, access_token, refresh_token, expires_at, updated_at FROM calendar_tokens WHERE user_id = $1"
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CalendarTokens::from))
    }
}
