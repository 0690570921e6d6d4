//! Event service implementation
//!
//! Staff authoring of manual events behind the ownership and temporal gates,
//! single-event lookups, and the merged listing of stored and live events.

use std::sync::Arc;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;
use crate::database::EventStore;
use crate::models::event::{Editability, Event, EventFilter, EventPatch, ExternalEvent, ExternalEventPage, ManualEventPayload};
use crate::services::assets::{AssetStore, ImageUpload};
use crate::services::ticketmaster::{ExternalSearch, TicketmasterService};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::logging::{log_access_denied, log_event_action};

/// Stands in for an upload until the text fields have passed validation
const PENDING_IMAGE: &str = "pending-upload";

/// Which sources a listing draws from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFilter {
    #[default]
    All,
    Manual,
    Ticketmaster,
}

/// Query for the merged listing
#[derive(Debug, Clone, Default)]
pub struct EventSearch {
    pub keyword: Option<String>,
    pub city: Option<String>,
    pub page: u32,
    pub size: Option<u32>,
    pub source: SourceFilter,
}

/// Stored manual events next to one page of live provider events
#[derive(Debug, Clone, Serialize)]
pub struct EventListing {
    pub manual: Vec<Event>,
    pub external: Option<ExternalEventPage>,
}

#[derive(Clone)]
pub struct EventService {
    events: Arc<dyn EventStore>,
    ticketmaster: TicketmasterService,
    assets: AssetStore,
}

impl EventService {
    pub fn new(events: Arc<dyn EventStore>, ticketmaster: TicketmasterService, assets: AssetStore) -> Self {
        Self { events, ticketmaster, assets }
    }

    /// Create a manual event owned by `owner`.
    ///
    /// Text fields are validated before the upload is written, so the image is
    /// always the last field reported.
    pub async fn create(&self, mut payload: ManualEventPayload, image: Option<ImageUpload>, owner: Uuid) -> Result<Event> {
        payload.image = image.as_ref().map(|_| PENDING_IMAGE.to_string());
        let mut new_event = payload.validate(owner, Utc::now())?;

        let upload = image.ok_or_else(|| EventHubError::validation("image", "image is required"))?;
        let stored_image = self.assets.store(upload).await?;
        new_event.image = Some(stored_image.clone());

        match self.events.insert(new_event).await {
            Ok(event) => {
                log_event_action(event.id, "create", owner, Some(&event.external_id));
                Ok(event)
            }
            Err(e) => {
                self.assets.discard(&stored_image).await;
                Err(e)
            }
        }
    }

    /// Update a manual event; ownership is checked before the start-time lock
    pub async fn update(&self, id: Uuid, owner: Uuid, mut patch: EventPatch, image: Option<ImageUpload>) -> Result<Event> {
        let now = Utc::now();
        let current = self.gate(id, owner, now, "update").await?;

        if image.is_some() {
            patch.image = Some(PENDING_IMAGE.to_string());
        }
        if patch.is_empty() {
            return Err(EventHubError::validation("body", "No fields to update"));
        }
        let mut patch = patch.validate_against(&current, now)?;

        let stored_image = match image {
            Some(upload) => Some(self.assets.store(upload).await?),
            None => None,
        };
        if stored_image.is_some() {
            patch.image = stored_image.clone();
        }

        let result = match self.events.update_owned(current.id, owner, &patch, now).await {
            Ok(Some(event)) => Ok(event),
            Ok(None) => Err(self.explain_rejection(current.id, owner).await),
            Err(e) => Err(e),
        };
        match result {
            Ok(event) => {
                log_event_action(event.id, "update", owner, None);
                if let (Some(_), Some(previous)) = (&stored_image, &current.image) {
                    self.assets.discard(previous).await;
                }
                Ok(event)
            }
            Err(e) => {
                if let Some(url) = stored_image {
                    self.assets.discard(&url).await;
                }
                Err(e)
            }
        }
    }

    /// Delete a manual event under the same gates as `update`
    pub async fn delete(&self, id: Uuid, owner: Uuid) -> Result<()> {
        let now = Utc::now();
        let current = self.gate(id, owner, now, "delete").await?;

        if !self.events.delete_owned(id, owner, now).await? {
            return Err(self.explain_rejection(id, owner).await);
        }

        if let Some(image) = &current.image {
            self.assets.discard(image).await;
        }
        log_event_action(id, "delete", owner, None);
        Ok(())
    }

    /// Ownership first, then the temporal lock
    async fn gate(&self, id: Uuid, owner: Uuid, now: chrono::DateTime<Utc>, action: &str) -> Result<Event> {
        let event = match self.events.find_owned(id, owner).await? {
            Some(event) => event,
            None => {
                log_access_denied(owner, action, "not found or not owner");
                return Err(EventHubError::NotFoundOrForbidden);
            }
        };

        if event.editability(now) == Editability::Started {
            log_access_denied(owner, action, "event already started");
            return Err(EventHubError::EventStarted);
        }
        Ok(event)
    }

    /// The conditional write matched nothing; report which gate closed meanwhile
    async fn explain_rejection(&self, id: Uuid, owner: Uuid) -> EventHubError {
        match self.events.find_owned(id, owner).await {
            Ok(Some(_)) => EventHubError::EventStarted,
            Ok(None) => EventHubError::NotFoundOrForbidden,
            Err(e) => e,
        }
    }

    /// Stored event by id
    pub async fn get(&self, id: Uuid) -> Result<Event> {
        self.events
            .find_by_id(id)
            .await?
            .ok_or_else(|| EventHubError::EventNotFound(id.to_string()))
    }

    /// Live provider event by its external id
    pub async fn get_external(&self, external_id: &str) -> Result<ExternalEvent> {
        self.ticketmaster.get_event(external_id).await
    }

    /// Events authored by `owner`
    pub async fn list_owned(&self, owner: Uuid) -> Result<Vec<Event>> {
        self.events.list_owned(owner).await
    }

    pub async fn list_manual(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        self.events.list_manual(filter).await
    }

    /// Merged listing of stored manual events and one page of live events.
    ///
    /// With `source = all` a provider failure leaves `external` empty instead
    /// of failing the whole listing.
    pub async fn search(&self, search: &EventSearch) -> Result<EventListing> {
        let filter = EventFilter {
            keyword: search.keyword.clone().filter(|k| !k.trim().is_empty()),
            city: search.city.clone().filter(|c| !c.trim().is_empty()),
        };
        let external_search = ExternalSearch {
            keyword: filter.keyword.clone(),
            city: filter.city.clone(),
            page: search.page,
            size: search.size.unwrap_or_else(|| self.ticketmaster.default_page_size()),
        };

        debug!(source = ?search.source, keyword = ?filter.keyword, city = ?filter.city, "Listing events");
        match search.source {
            SourceFilter::Manual => Ok(EventListing {
                manual: self.list_manual(&filter).await?,
                external: None,
            }),
            SourceFilter::Ticketmaster => Ok(EventListing {
                manual: Vec::new(),
                external: Some(self.ticketmaster.search(&external_search).await?),
            }),
            SourceFilter::All => {
                let (manual, external) = futures::join!(
                    self.list_manual(&filter),
                    self.ticketmaster.search(&external_search)
                );
                let external = match external {
                    Ok(page) => Some(page),
                    Err(e) => {
                        warn!(error = %e, "Live events unavailable; returning stored events only");
                        None
                    }
                };
                Ok(EventListing { manual: manual?, external })
            }
        }
    }
}
