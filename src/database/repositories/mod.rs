//! Database repositories module
//!
//! This module defines the storage contracts used by the services and
//! contains their Postgres implementations.

pub mod user;
pub mod event;
pub mod calendar;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::models::{CalendarTokens, Event, EventFilter, EventPatch, NewEvent, NewUser, User};
use crate::utils::errors::Result;

// Re-export repositories
pub use user::UserRepository;
pub use event::EventRepository;
pub use calendar::CalendarTokenRepository;

/// Storage for events and their attendee sets
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert a new event; a taken `external_id` yields `Conflict`
    async fn insert(&self, event: NewEvent) -> Result<Event>;

    /// Insert or refresh a provider event keyed by `external_id`
    async fn upsert_external(&self, event: NewEvent) -> Result<Event>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>>;

    /// Lookup scoped to manual events created by `owner`
    async fn find_owned(&self, id: Uuid, owner: Uuid) -> Result<Option<Event>>;

    /// Manual events ordered by start date
    async fn list_manual(&self, filter: &EventFilter) -> Result<Vec<Event>>;

    async fn list_owned(&self, owner: Uuid) -> Result<Vec<Event>>;

    async fn list_attending(&self, user_id: Uuid) -> Result<Vec<Event>>;

    /// Apply `patch` only while the event is owned by `owner` and has not
    /// started at `now`; `None` when either condition fails
    async fn update_owned(&self, id: Uuid, owner: Uuid, patch: &EventPatch, now: DateTime<Utc>) -> Result<Option<Event>>;

    /// Delete under the same conditions as `update_owned`
    async fn delete_owned(&self, id: Uuid, owner: Uuid, now: DateTime<Utc>) -> Result<bool>;

    /// Add `user_id` to the attendee set in one atomic step.
    ///
    /// Returns `false` when the user was already present and
    /// `EventNotFound` when the event does not exist.
    async fn add_attendee(&self, event_id: Uuid, user_id: Uuid) -> Result<bool>;
}

/// Storage for user accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user; a taken email yields `Conflict`
    async fn create(&self, user: NewUser) -> Result<User>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Lookup by normalized email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
}

/// Storage for per-user calendar grants
#[async_trait]
pub trait CalendarTokenStore: Send + Sync {
    /// Insert or replace; an absent refresh token keeps the stored one
    async fn save(&self, tokens: CalendarTokens) -> Result<()>;

    async fn find(&self, user_id: Uuid) -> Result<Option<CalendarTokens>>;
}
