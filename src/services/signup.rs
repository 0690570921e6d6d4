//! Attendance tracking
//!
//! Signups are append-only. The membership check and the append happen in a
//! single store operation, so concurrent signups for one pair cannot both win.

use std::sync::Arc;
use uuid::Uuid;
use crate::database::EventStore;
use crate::models::Event;
use crate::services::ticketmaster::TicketmasterService;
use crate::utils::errors::{EventHubError, Result};
use crate::utils::logging::log_event_action;

#[derive(Clone)]
pub struct SignupService {
    events: Arc<dyn EventStore>,
    ticketmaster: TicketmasterService,
}

impl SignupService {
    pub fn new(events: Arc<dyn EventStore>, ticketmaster: TicketmasterService) -> Self {
        Self { events, ticketmaster }
    }

    /// Add `user_id` to a stored event's attendees
    pub async fn signup(&self, event_id: Uuid, user_id: Uuid) -> Result<Event> {
        if !self.events.add_attendee(event_id, user_id).await? {
            return Err(EventHubError::AlreadySignedUp);
        }
        log_event_action(event_id, "signup", user_id, None);

        self.events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| EventHubError::EventNotFound(event_id.to_string()))
    }

    /// Materialize a provider event and sign up for it
    pub async fn signup_external(&self, external_id: &str, user_id: Uuid) -> Result<Event> {
        let external = self.ticketmaster.get_event(external_id).await?;
        let event = self.events.upsert_external(external.into_new_event()).await?;
        self.signup(event.id, user_id).await
    }

    /// Events the user is attending
    pub async fn list_signed_up(&self, user_id: Uuid) -> Result<Vec<Event>> {
        self.events.list_attending(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TicketmasterConfig;
    use crate::database::MemoryStore;
    use crate::models::{EventSource, Location, NewEvent};
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(store: &MemoryStore, base_url: &str) -> SignupService {
        let ticketmaster = TicketmasterService::new(TicketmasterConfig {
            api_key: "key".into(),
            base_url: base_url.into(),
            country_code: "GB".into(),
            timeout_seconds: 5,
            default_page_size: 20,
        })
        .unwrap();
        SignupService::new(Arc::new(store.clone()), ticketmaster)
    }

    async fn stored_event(store: &MemoryStore) -> Event {
        let start = Utc::now() + Duration::days(1);
        store
            .insert(NewEvent {
                external_id: "manual-swing".into(),
                title: "Swing Social".into(),
                description: Some("Social dance".into()),
                start_date: start,
                end_date: Some(start + Duration::hours(2)),
                location: Location { venue: "Hall A".into(), city: "London".into() },
                image: Some("/uploads/s.png".into()),
                url: None,
                created_by: Some(Uuid::new_v4()),
                source: EventSource::Manual,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_second_signup_is_rejected() {
        let store = MemoryStore::new();
        let signups = service(&store, "http://127.0.0.1:9");
        let event = stored_event(&store).await;
        let user = Uuid::new_v4();

        let joined = signups.signup(event.id, user).await.unwrap();
        assert_eq!(joined.attendees, vec![user]);
        assert_matches!(signups.signup(event.id, user).await, Err(EventHubError::AlreadySignedUp));

        let attending = signups.list_signed_up(user).await.unwrap();
        assert_eq!(attending.len(), 1);
        assert_eq!(attending[0].attendees.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_signups_exactly_one_wins() {
        let store = MemoryStore::new();
        let signups = service(&store, "http://127.0.0.1:9");
        let event = stored_event(&store).await;
        let user = Uuid::new_v4();

        let (a, b) = tokio::join!(signups.signup(event.id, user), signups.signup(event.id, user));
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_event() {
        let store = MemoryStore::new();
        let signups = service(&store, "http://127.0.0.1:9");
        assert_matches!(
            signups.signup(Uuid::new_v4(), Uuid::new_v4()).await,
            Err(EventHubError::EventNotFound(_))
        );
    }

    #[tokio::test]
    async fn test_external_signup_materializes_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/discovery/v2/events/G5v.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "G5v",
                "name": "Big Band Live",
                "dates": {"start": {"dateTime": "2030-05-01T19:30:00Z"}}
            })))
            .mount(&server)
            .await;

        let store = MemoryStore::new();
        let signups = service(&store, &server.uri());
        let first = signups.signup_external("G5v", Uuid::new_v4()).await.unwrap();
        let second = signups.signup_external("G5v", Uuid::new_v4()).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.attendees.len(), 2);
        assert_eq!(second.source, EventSource::Ticketmaster);
    }
}
