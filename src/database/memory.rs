//! In-process store
//!
//! Backs the service when `database.url` is `memory://` and in tests. Every
//! operation runs inside a single write-lock critical section, which gives the
//! same check-and-write atomicity as the conditional SQL statements.

use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;
use crate::database::repositories::{CalendarTokenStore, EventStore, UserStore};
use crate::models::{CalendarTokens, Editability, Event, EventFilter, EventPatch, EventSource, NewEvent, NewUser, User};
use crate::utils::errors::{EventHubError, Result};

#[derive(Default)]
struct MemoryState {
    events: HashMap<Uuid, Event>,
    users: HashMap<Uuid, User>,
    calendar_tokens: HashMap<Uuid, CalendarTokens>,
}

impl MemoryState {
    fn external_id_taken(&self, external_id: &str) -> Option<&Event> {
        self.events.values().find(|e| e.external_id == external_id)
    }

    fn owned_mut(&mut self, id: Uuid, owner: Uuid) -> Option<&mut Event> {
        self.events
            .get_mut(&id)
            .filter(|e| e.is_manual() && e.created_by == Some(owner))
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by_start(mut events: Vec<Event>) -> Vec<Event> {
    events.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.created_at.cmp(&b.created_at)));
    events
}

fn materialize(event: NewEvent, now: DateTime<Utc>) -> Event {
    Event {
        id: Uuid::new_v4(),
        external_id: event.external_id,
        title: event.title,
        description: event.description,
        start_date: event.start_date,
        end_date: event.end_date,
        location: event.location,
        image: event.image,
        url: event.url,
        created_by: event.created_by,
        source: event.source,
        attendees: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert(&self, event: NewEvent) -> Result<Event> {
        let mut state = self.state.write().await;
        if state.external_id_taken(&event.external_id).is_some() {
            return Err(EventHubError::Conflict(format!("externalId {} already exists", event.external_id)));
        }

        let event = materialize(event, Utc::now());
        state.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn upsert_external(&self, event: NewEvent) -> Result<Event> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        let existing_id = state.external_id_taken(&event.external_id).map(|e| (e.id, e.source));
        match existing_id {
            Some((id, source)) if source == event.source => {
                let stored = state
                    .events
                    .get_mut(&id)
                    .ok_or_else(|| EventHubError::EventNotFound(id.to_string()))?;
                stored.title = event.title;
                stored.description = event.description;
                stored.start_date = event.start_date;
                stored.end_date = event.end_date;
                stored.location = event.location;
                stored.image = event.image;
                stored.url = event.url;
                stored.updated_at = now;
                Ok(stored.clone())
            }
            Some(_) => Err(EventHubError::Conflict(format!(
                "externalId {} belongs to another event source",
                event.external_id
            ))),
            None => {
                let event = materialize(event, now);
                state.events.insert(event.id, event.clone());
                Ok(event)
            }
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        Ok(self.state.read().await.events.get(&id).cloned())
    }

    async fn find_owned(&self, id: Uuid, owner: Uuid) -> Result<Option<Event>> {
        let state = self.state.read().await;
        Ok(state
            .events
            .get(&id)
            .filter(|e| e.is_manual() && e.created_by == Some(owner))
            .cloned())
    }

    async fn list_manual(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let state = self.state.read().await;
        let events = state
            .events
            .values()
            .filter(|e| e.source == EventSource::Manual && filter.matches(e))
            .cloned()
            .collect();
        Ok(sorted_by_start(events))
    }

    async fn list_owned(&self, owner: Uuid) -> Result<Vec<Event>> {
        let state = self.state.read().await;
        let events = state
            .events
            .values()
            .filter(|e| e.is_manual() && e.created_by == Some(owner))
            .cloned()
            .collect();
        Ok(sorted_by_start(events))
    }

    async fn list_attending(&self, user_id: Uuid) -> Result<Vec<Event>> {
        let state = self.state.read().await;
        let events = state
            .events
            .values()
            .filter(|e| e.has_attendee(user_id))
            .cloned()
            .collect();
        Ok(sorted_by_start(events))
    }

    async fn update_owned(&self, id: Uuid, owner: Uuid, patch: &EventPatch, now: DateTime<Utc>) -> Result<Option<Event>> {
        let mut state = self.state.write().await;
        match state.owned_mut(id, owner) {
            Some(event) if event.editability(now) == Editability::Upcoming => {
                patch.apply(event, now);
                Ok(Some(event.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_owned(&self, id: Uuid, owner: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let mut state = self.state.write().await;
        let deletable = matches!(
            state.owned_mut(id, owner),
            Some(event) if event.editability(now) == Editability::Upcoming
        );
        if deletable {
            state.events.remove(&id);
        }
        Ok(deletable)
    }

    async fn add_attendee(&self, event_id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let event = state
            .events
            .get_mut(&event_id)
            .ok_or_else(|| EventHubError::EventNotFound(event_id.to_string()))?;

        if event.has_attendee(user_id) {
            return Ok(false);
        }
        event.attendees.push(user_id);
        Ok(true)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(EventHubError::Conflict("Email is already registered".to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl CalendarTokenStore for MemoryStore {
    async fn save(&self, mut tokens: CalendarTokens) -> Result<()> {
        let mut state = self.state.write().await;
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = state
                .calendar_tokens
                .get(&tokens.user_id)
                .and_then(|t| t.refresh_token.clone());
        }
        state.calendar_tokens.insert(tokens.user_id, tokens);
        Ok(())
    }

    async fn find(&self, user_id: Uuid) -> Result<Option<CalendarTokens>> {
        Ok(self.state.read().await.calendar_tokens.get(&user_id).cloned())
    }
}
