//! Event model
//!
//! One schema covers both staff-authored events and events materialized from
//! Ticketmaster. Validation of authoring payloads lives here so that every
//! store implementation enforces the same rules.

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::{generate_manual_external_id, namespace_manual_id};

/// Maximum description length for manually authored events
pub const MAX_DESCRIPTION_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    Ticketmaster,
    Manual,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::Ticketmaster => "ticketmaster",
            EventSource::Manual => "manual",
        }
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventSource {
    type Err = EventHubError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ticketmaster" => Ok(EventSource::Ticketmaster),
            "manual" => Ok(EventSource::Manual),
            other => Err(EventHubError::Internal(format!("Unknown event source: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub venue: String,
    pub city: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: Location,
    pub image: Option<String>,
    pub url: Option<String>,
    pub created_by: Option<Uuid>,
    pub source: EventSource,
    pub attendees: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Whether a manual event may still be changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Editability {
    Upcoming,
    Started,
}

impl Event {
    pub fn is_manual(&self) -> bool {
        self.source == EventSource::Manual
    }

    /// Editability at `now`; an event is frozen from its start time on
    pub fn editability(&self, now: DateTime<Utc>) -> Editability {
        if self.start_date > now {
            Editability::Upcoming
        } else {
            Editability::Started
        }
    }

    pub fn has_attendee(&self, user_id: Uuid) -> bool {
        self.attendees.contains(&user_id)
    }
}

/// A fully validated record ready to be inserted
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: Location,
    pub image: Option<String>,
    pub url: Option<String>,
    pub created_by: Option<Uuid>,
    pub source: EventSource,
}

/// Authoring payload for a manual event, as received from staff
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualEventPayload {
    pub external_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub venue: Option<String>,
    pub city: Option<String>,
    /// Public URL of the already stored image
    pub image: Option<String>,
}

impl ManualEventPayload {
    /// Validate the payload and build the record owned by `owner`.
    ///
    /// Checks run in a fixed order and the first failure is reported.
    pub fn validate(self, owner: Uuid, now: DateTime<Utc>) -> Result<NewEvent> {
        let title = required_text("title", self.title)?;
        let description = validate_description(required_text("description", self.description)?)?;
        let venue = required_text("venue", self.venue)?;
        let city = required_text("city", self.city)?;

        let start_date = self
            .start_date
            .ok_or_else(|| EventHubError::validation("startDate", "startDate is required"))?;
        let end_date = self
            .end_date
            .ok_or_else(|| EventHubError::validation("endDate", "endDate is required"))?;
        check_date_order(start_date, end_date)?;
        check_in_future(start_date, now)?;

        let image = required_text("image", self.image)?;

        let external_id = match self.external_id {
            Some(id) if !id.trim().is_empty() => namespace_manual_id(id.trim()),
            _ => generate_manual_external_id(),
        };

        Ok(NewEvent {
            external_id,
            title,
            description: Some(description),
            start_date,
            end_date: Some(end_date),
            location: Location { venue, city },
            image: Some(image),
            url: None,
            created_by: Some(owner),
            source: EventSource::Manual,
        })
    }
}

/// Partial update of a manual event
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub venue: Option<String>,
    pub city: Option<String>,
    pub image: Option<String>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.venue.is_none()
            && self.city.is_none()
            && self.image.is_none()
    }

    /// Validate the patch against the event it will be applied to.
    ///
    /// Present fields follow the creation rules; the merged dates must stay
    /// ordered and a moved start must still lie in the future.
    pub fn validate_against(mut self, current: &Event, now: DateTime<Utc>) -> Result<EventPatch> {
        if let Some(title) = self.title.take() {
            self.title = Some(required_text("title", Some(title))?);
        }
        if let Some(description) = self.description.take() {
            let description = required_text("description", Some(description))?;
            self.description = Some(validate_description(description)?);
        }
        if let Some(venue) = self.venue.take() {
            self.venue = Some(required_text("venue", Some(venue))?);
        }
        if let Some(city) = self.city.take() {
            self.city = Some(required_text("city", Some(city))?);
        }

        let start = self.start_date.unwrap_or(current.start_date);
        if let Some(end) = self.end_date.or(current.end_date) {
            check_date_order(start, end)?;
        }
        if let Some(new_start) = self.start_date {
            if new_start != current.start_date {
                check_in_future(new_start, now)?;
            }
        }

        if let Some(image) = self.image.take() {
            self.image = Some(required_text("image", Some(image))?);
        }

        Ok(self)
    }

    /// Apply the patch to an event in place
    pub fn apply(&self, event: &mut Event, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            event.title = title.clone();
        }
        if let Some(description) = &self.description {
            event.description = Some(description.clone());
        }
        if let Some(start) = self.start_date {
            event.start_date = start;
        }
        if let Some(end) = self.end_date {
            event.end_date = Some(end);
        }
        if let Some(venue) = &self.venue {
            event.location.venue = venue.clone();
        }
        if let Some(city) = &self.city {
            event.location.city = city.clone();
        }
        if let Some(image) = &self.image {
            event.image = Some(image.clone());
        }
        event.updated_at = now;
    }
}

/// An event as returned live by the ticketing provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalEvent {
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: Location,
    pub image: Option<String>,
    pub url: Option<String>,
    pub source: EventSource,
}

impl ExternalEvent {
    /// Record used to materialize this event into the store
    pub fn into_new_event(self) -> NewEvent {
        NewEvent {
            external_id: self.external_id,
            title: self.title,
            description: self.description,
            start_date: self.start_date,
            end_date: self.end_date,
            location: self.location,
            image: self.image,
            url: self.url,
            created_by: None,
            source: EventSource::Ticketmaster,
        }
    }
}

/// Paging information reported by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    pub number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalEventPage {
    pub events: Vec<ExternalEvent>,
    pub page: PageInfo,
}

/// Filters for listing stored manual events
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub keyword: Option<String>,
    pub city: Option<String>,
}

impl EventFilter {
    /// Whether an event passes the filter; comparisons ignore case
    pub fn matches(&self, event: &Event) -> bool {
        let keyword_ok = match &self.keyword {
            Some(k) => {
                let k = k.to_lowercase();
                event.title.to_lowercase().contains(&k)
                    || event
                        .description
                        .as_deref()
                        .map(|d| d.to_lowercase().contains(&k))
                        .unwrap_or(false)
            }
            None => true,
        };
        let city_ok = match &self.city {
            Some(c) => event.location.city.eq_ignore_ascii_case(c.trim()),
            None => true,
        };
        keyword_ok && city_ok
    }
}

fn required_text(field: &'static str, value: Option<String>) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(EventHubError::validation(field, format!("{} is required", field))),
    }
}

fn validate_description(description: String) -> Result<String> {
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(EventHubError::validation(
            "description",
            format!("description must be at most {} characters", MAX_DESCRIPTION_CHARS),
        ));
    }
    Ok(description)
}

fn check_date_order(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if end <= start {
        return Err(EventHubError::validation("endDate", "endDate must be after startDate"));
    }
    Ok(())
}

fn check_in_future(start: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
    if start <= now {
        return Err(EventHubError::validation("startDate", "startDate must be in the future"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;

    fn jazz_night(now: DateTime<Utc>) -> ManualEventPayload {
        ManualEventPayload {
            external_id: None,
            title: Some("Jazz Night".to_string()),
            description: Some("Live jazz in the main hall".to_string()),
            start_date: Some(now + Duration::days(1)),
            end_date: Some(now + Duration::days(1) + Duration::hours(2)),
            venue: Some("Hall A".to_string()),
            city: Some("London".to_string()),
            image: Some("/uploads/jazz.png".to_string()),
        }
    }

    fn stored(new_event: NewEvent, now: DateTime<Utc>) -> Event {
        Event {
            id: Uuid::new_v4(),
            external_id: new_event.external_id,
            title: new_event.title,
            description: new_event.description,
            start_date: new_event.start_date,
            end_date: new_event.end_date,
            location: new_event.location,
            image: new_event.image,
            url: new_event.url,
            created_by: new_event.created_by,
            source: new_event.source,
            attendees: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_valid_payload_builds_manual_event() {
        let now = Utc::now();
        let owner = Uuid::new_v4();
        let event = jazz_night(now).validate(owner, now).unwrap();

        assert_eq!(event.title, "Jazz Night");
        assert_eq!(event.source, EventSource::Manual);
        assert_eq!(event.created_by, Some(owner));
        assert!(event.external_id.starts_with("manual-"));
    }

    #[test]
    fn test_supplied_external_id_is_namespaced() {
        let now = Utc::now();
        let mut payload = jazz_night(now);
        payload.external_id = Some(" jazz-2026 ".to_string());
        let event = payload.clone().validate(Uuid::new_v4(), now).unwrap();
        assert_eq!(event.external_id, "manual-jazz-2026");

        payload.external_id = Some("manual-jazz-2026".to_string());
        let event = payload.validate(Uuid::new_v4(), now).unwrap();
        assert_eq!(event.external_id, "manual-jazz-2026");
    }

    #[test]
    fn test_first_failing_field_is_reported() {
        let now = Utc::now();
        let mut payload = jazz_night(now);
        payload.title = Some("   ".to_string());
        payload.image = None;
        assert_matches!(
            payload.validate(Uuid::new_v4(), now),
            Err(EventHubError::ValidationFailed { field: "title", .. })
        );
    }

    #[test]
    fn test_description_length_bound() {
        let now = Utc::now();
        let mut payload = jazz_night(now);
        payload.description = Some("x".repeat(MAX_DESCRIPTION_CHARS));
        assert!(payload.clone().validate(Uuid::new_v4(), now).is_ok());

        payload.description = Some("x".repeat(MAX_DESCRIPTION_CHARS + 1));
        assert_matches!(
            payload.validate(Uuid::new_v4(), now),
            Err(EventHubError::ValidationFailed { field: "description", .. })
        );
    }

    #[test]
    fn test_end_before_start_rejected() {
        let now = Utc::now();
        let mut payload = jazz_night(now);
        payload.end_date = Some(now + Duration::hours(1));
        assert_matches!(
            payload.validate(Uuid::new_v4(), now),
            Err(EventHubError::ValidationFailed { field: "endDate", message }) if message.contains("after startDate")
        );
    }

    #[test]
    fn test_past_start_rejected() {
        let now = Utc::now();
        let mut payload = jazz_night(now);
        payload.start_date = Some(now - Duration::hours(3));
        payload.end_date = Some(now - Duration::hours(1));
        assert_matches!(
            payload.validate(Uuid::new_v4(), now),
            Err(EventHubError::ValidationFailed { field: "startDate", .. })
        );
    }

    #[test]
    fn test_missing_image_rejected_last() {
        let now = Utc::now();
        let mut payload = jazz_night(now);
        payload.image = None;
        assert_matches!(
            payload.validate(Uuid::new_v4(), now),
            Err(EventHubError::ValidationFailed { field: "image", .. })
        );
    }

    #[test]
    fn test_editability_follows_wall_clock() {
        let now = Utc::now();
        let event = stored(jazz_night(now).validate(Uuid::new_v4(), now).unwrap(), now);

        assert_eq!(event.editability(now), Editability::Upcoming);
        assert_eq!(event.editability(event.start_date), Editability::Started);
        assert_eq!(event.editability(now + Duration::days(2)), Editability::Started);
    }

    #[test]
    fn test_patch_merged_dates_must_stay_ordered() {
        let now = Utc::now();
        let event = stored(jazz_night(now).validate(Uuid::new_v4(), now).unwrap(), now);

        let patch = EventPatch {
            start_date: Some(event.end_date.unwrap() + Duration::hours(1)),
            ..Default::default()
        };
        assert_matches!(
            patch.validate_against(&event, now),
            Err(EventHubError::ValidationFailed { field: "endDate", .. })
        );
    }

    #[test]
    fn test_patch_apply() {
        let now = Utc::now();
        let mut event = stored(jazz_night(now).validate(Uuid::new_v4(), now).unwrap(), now);

        let patch = EventPatch {
            title: Some("  Late Jazz ".to_string()),
            city: Some("Leeds".to_string()),
            ..Default::default()
        }
        .validate_against(&event, now)
        .unwrap();

        let later = now + Duration::minutes(5);
        patch.apply(&mut event, later);
        assert_eq!(event.title, "Late Jazz");
        assert_eq!(event.location.city, "Leeds");
        assert_eq!(event.location.venue, "Hall A");
        assert_eq!(event.updated_at, later);
    }

    #[test]
    fn test_filter_matching() {
        let now = Utc::now();
        let event = stored(jazz_night(now).validate(Uuid::new_v4(), now).unwrap(), now);

        assert!(EventFilter::default().matches(&event));
        assert!(EventFilter { keyword: Some("jazz".into()), city: None }.matches(&event));
        assert!(EventFilter { keyword: None, city: Some("london".into()) }.matches(&event));
        assert!(!EventFilter { keyword: None, city: Some("Paris".into()) }.matches(&event));
        assert!(!EventFilter { keyword: Some("opera".into()), city: None }.matches(&event));
    }

    #[test]
    fn test_source_round_trip() {
        assert_eq!("manual".parse::<EventSource>().unwrap(), EventSource::Manual);
        assert_eq!(EventSource::Ticketmaster.to_string(), "ticketmaster");
        assert!("other".parse::<EventSource>().is_err());
    }
}
