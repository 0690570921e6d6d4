//! Event repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use crate::database::connection::{sql_state, violated_constraint, FOREIGN_KEY_VIOLATION, UNIQUE_VIOLATION};
use crate::models::event::{Event, EventFilter, EventPatch, Location, NewEvent};
use crate::utils::errors::{EventHubError, Result};
use super::EventStore;

const EVENT_COLUMNS: &str = r#"
    e.id, e.external_id, e.title, e.description, e.start_date, e.end_date, e.venue, e.city,
    e.image, e.url, e.created_by, e.source, e.created_at, e.updated_at,
    ARRAY(
        SELECT a.user_id FROM event_attendees a
        WHERE a.event_id = e.id
        ORDER BY a.signed_up_at, a.user_id
    ) AS attendees
"#;

#[derive(Debug, FromRow)]
struct EventRow {
    id: Uuid,
    external_id: String,
    title: String,
    description: Option<String>,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    venue: String,
    city: String,
    image: Option<String>,
    url: Option<String>,
    created_by: Option<Uuid>,
    source: String,
    attendees: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = EventHubError;

    fn try_from(row: EventRow) -> Result<Self> {
        Ok(Event {
            id: row.id,
            external_id: row.external_id,
            title: row.title,
            description: row.description,
            start_date: row.start_date,
            end_date: row.end_date,
            location: Location { venue: row.venue, city: row.city },
            image: row.image,
            url: row.url,
            created_by: row.created_by,
            source: row.source.parse()?,
            attendees: row.attendees,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_events(rows: Vec<EventRow>) -> Result<Vec<Event>> {
    rows.into_iter().map(Event::try_from).collect()
}

#[derive(Clone, Debug)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_where(&self, clause: &str, id: Uuid, other: Option<Uuid>) -> Result<Option<Event>> {
        let sql = format!("SELECT {} FROM events e WHERE {}", EVENT_COLUMNS, clause);
        let mut query = sqlx::query_as::<_, EventRow>(&sql).bind(id);
        if let Some(other) = other {
            query = query.bind(other);
        }
        let row = query.fetch_optional(&self.pool).await?;

        row.map(Event::try_from).transpose()
    }
}

#[async_trait]
impl EventStore for EventRepository {
    /// Create a new event
    async fn insert(&self, event: NewEvent) -> Result<Event> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            INSERT INTO events (id, external_id, title, description, start_date, end_date, venue, city, image, url, created_by, source, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
            RETURNING id, external_id, title, description, start_date, end_date, venue, city, image, url, created_by, source,
                      ARRAY[]::uuid[] AS attendees, created_at, updated_at
            "#
        )
        .bind(Uuid::new_v4())
        .bind(&event.external_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(&event.location.venue)
        .bind(&event.location.city)
        .bind(&event.image)
        .bind(&event.url)
        .bind(event.created_by)
        .bind(event.source.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if sql_state(&e).as_deref() == Some(UNIQUE_VIOLATION) {
                EventHubError::Conflict(format!("externalId {} already exists", event.external_id))
            } else {
                EventHubError::Database(e)
            }
        })?;

        Event::try_from(row)
    }

    /// Insert or refresh a provider event
    async fn upsert_external(&self, event: NewEvent) -> Result<Event> {
        let id: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO events (id, external_id, title, description, start_date, end_date, venue, city, image, url, created_by, source, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NULL, $11, $12, $12)
            ON CONFLICT (external_id) DO UPDATE
            SET title = EXCLUDED.title,
                description = EXCLUDED.description,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date,
                venue = EXCLUDED.venue,
                city = EXCLUDED.city,
                image = EXCLUDED.image,
                url = EXCLUDED.url,
                updated_at = EXCLUDED.updated_at
            WHERE events.source = EXCLUDED.source
            RETURNING id
            "#
        )
        .bind(Uuid::new_v4())
        .bind(&event.external_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(&event.location.venue)
        .bind(&event.location.city)
        .bind(&event.image)
        .bind(&event.url)
        .bind(event.source.as_str())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        // No row back means the id is held by an event of another source
        let id = id.ok_or_else(|| {
            EventHubError::Conflict(format!("externalId {} belongs to another event source", event.external_id))
        })?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| EventHubError::EventNotFound(id.to_string()))
    }

    /// Find event by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        self.fetch_where("e.id = $1", id, None).await
    }

    async fn find_owned(&self, id: Uuid, owner: Uuid) -> Result<Option<Event>> {
        self.fetch_where("e.id = $1 AND e.created_by = $2 AND e.source = 'manual'", id, Some(owner))
            .await
    }

    async fn list_manual(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let sql = format!(
            r#"
            SELECT {} FROM events e
            WHERE e.source = 'manual'
              AND ($1::text IS NULL OR e.title ILIKE '%' || $1 || '%' OR e.description ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR LOWER(e.city) = LOWER($2))
            ORDER BY e.start_date ASC, e.created_at ASC
            "#,
            EVENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(filter.keyword.as_deref())
            .bind(filter.city.as_deref().map(str::trim))
            .fetch_all(&self.pool)
            .await?;

        into_events(rows)
    }

    /// Get events created by user
    async fn list_owned(&self, owner: Uuid) -> Result<Vec<Event>> {
        let sql = format!(
            "SELECT {} FROM events e WHERE e.created_by = $1 AND e.source = 'manual' ORDER BY e.start_date ASC",
            EVENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;

        into_events(rows)
    }

    /// Get events user is registered for
    async fn list_attending(&self, user_id: Uuid) -> Result<Vec<Event>> {
        let sql = format!(
            r#"
            SELECT {} FROM events e
            INNER JOIN event_attendees ea ON e.id = ea.event_id
            WHERE ea.user_id = $1
            ORDER BY e.start_date ASC
            "#,
            EVENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        into_events(rows)
    }

    async fn update_owned(&self, id: Uuid, owner: Uuid, patch: &EventPatch, now: DateTime<Utc>) -> Result<Option<Event>> {
        let updated: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE events
            SET title = COALESCE($3, title),
                description = COALESCE($4, description),
                start_date = COALESCE($5, start_date),
                end_date = COALESCE($6, end_date),
                venue = COALESCE($7, venue),
                city = COALESCE($8, city),
                image = COALESCE($9, image),
                updated_at = $10
            WHERE id = $1 AND created_by = $2 AND source = 'manual' AND start_date > $10
            RETURNING id
            "#
        )
        .bind(id)
        .bind(owner)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(patch.start_date)
        .bind(patch.end_date)
        .bind(&patch.venue)
        .bind(&patch.city)
        .bind(&patch.image)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(id) => self.find_by_id(id).await,
            None => Ok(None),
        }
    }

    async fn delete_owned(&self, id: Uuid, owner: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM events WHERE id = $1 AND created_by = $2 AND source = 'manual' AND start_date > $3"
        )
        .bind(id)
        .bind(owner)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Register participant for event
    async fn add_attendee(&self, event_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO event_attendees (event_id, user_id, signed_up_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (event_id, user_id) DO NOTHING
            "#
        )
        .bind(event_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if sql_state(&e).as_deref() == Some(FOREIGN_KEY_VIOLATION) {
                match violated_constraint(&e).as_deref() {
                    Some("event_attendees_user_id_fkey") => EventHubError::UserNotFound(user_id),
                    _ => EventHubError::EventNotFound(event_id.to_string()),
                }
            } else {
                EventHubError::Database(e)
            }
        })?;

        Ok(result.rows_affected() == 1)
    }
}
