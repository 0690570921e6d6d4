//! Property tests for listing and attendance over the in-memory store

use std::sync::Arc;
use chrono::{Duration, Utc};
use eventhub::config::{TicketmasterConfig, UploadsConfig};
use eventhub::database::MemoryStore;
use eventhub::models::{EventFilter, ManualEventPayload};
use eventhub::services::{AssetStore, EventService, ImageUpload, SignupService, TicketmasterService};
use proptest::prelude::*;
use uuid::Uuid;

fn ticketmaster() -> TicketmasterService {
    TicketmasterService::new(TicketmasterConfig {
        api_key: "key".into(),
        base_url: "http://127.0.0.1:9".into(),
        country_code: "GB".into(),
        timeout_seconds: 1,
        default_page_size: 20,
    })
    .unwrap()
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn created_event_is_listed_exactly_once(
        title in "[A-Za-z][A-Za-z ]{2,30}",
        city in "[A-Za-z]{3,12}",
        hours_ahead in 1i64..2000,
        length in 1i64..12,
    ) {
        let uploads = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        let service = EventService::new(
            Arc::new(store),
            ticketmaster(),
            AssetStore::new(&UploadsConfig {
                dir: uploads.path().to_string_lossy().into_owned(),
                public_base: "/uploads".into(),
                max_bytes: 1024,
            }),
        );
        let start = Utc::now() + Duration::hours(hours_ahead);
        let payload = ManualEventPayload {
            title: Some(title.clone()),
            description: Some("Generated".into()),
            start_date: Some(start),
            end_date: Some(start + Duration::hours(length)),
            venue: Some("Hall".into()),
            city: Some(city.clone()),
            ..Default::default()
        };
        let image = ImageUpload {
            bytes: vec![1, 2, 3],
            file_name: Some("p.png".into()),
            content_type: Some("image/png".into()),
        };

        let (created, listed) = runtime().block_on(async {
            let created = service.create(payload, Some(image), Uuid::new_v4()).await.unwrap();
            let filter = EventFilter { keyword: None, city: Some(city.to_uppercase()) };
            let listed = service.list_manual(&filter).await.unwrap();
            (created, listed)
        });

        prop_assert_eq!(listed.iter().filter(|e| e.id == created.id).count(), 1);
        prop_assert_eq!(&created.title, title.trim());
    }

    #[test]
    fn repeated_signups_leave_one_attendee(attempts in 1usize..6) {
        let store = MemoryStore::new();
        let events = Arc::new(store);
        let signups = SignupService::new(events.clone(), ticketmaster());
        let user = Uuid::new_v4();

        let (successes, attendees) = runtime().block_on(async {
            let start = Utc::now() + Duration::days(1);
            let event = eventhub::database::EventStore::insert(
                events.as_ref(),
                eventhub::models::NewEvent {
                    external_id: format!("manual-{}", Uuid::new_v4()),
                    title: "Swing".into(),
                    description: None,
                    start_date: start,
                    end_date: Some(start + Duration::hours(1)),
                    location: eventhub::models::Location { venue: "Hall".into(), city: "Leeds".into() },
                    image: None,
                    url: None,
                    created_by: Some(Uuid::new_v4()),
                    source: eventhub::models::EventSource::Manual,
                },
            )
            .await
            .unwrap();

            let mut successes = 0;
            for _ in 0..attempts {
                if signups.signup(event.id, user).await.is_ok() {
                    successes += 1;
                }
            }
            let stored = eventhub::database::EventStore::find_by_id(events.as_ref(), event.id)
                .await
                .unwrap()
                .unwrap();
            (successes, stored.attendees)
        });

        prop_assert_eq!(successes, 1);
        prop_assert_eq!(attendees, vec![user]);
    }
}
