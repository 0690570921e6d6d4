//! Staff authoring routes
//!
//! Create and update take `multipart/form-data` so that the event image can
//! travel with the text fields.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::json;
use crate::handlers::events::parse_event_id;
use crate::handlers::AppState;
use crate::middleware::StaffUser;
use crate::models::{Event, EventPatch, ManualEventPayload};
use crate::services::ImageUpload;
use crate::utils::errors::{EventHubError, Result};

/// Text fields and image of an authoring form
#[derive(Debug, Default)]
struct EventForm {
    external_id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    venue: Option<String>,
    city: Option<String>,
    image: Option<ImageUpload>,
}

impl EventForm {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = EventForm::default();
        while let Some(field) = multipart.next_field().await.map_err(form_error)? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "image" {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(form_error)?;
                if !bytes.is_empty() {
                    form.image = Some(ImageUpload { bytes: bytes.to_vec(), file_name, content_type });
                }
                continue;
            }

            let value = field.text().await.map_err(form_error)?;
            match name.as_str() {
                "externalId" => form.external_id = Some(value),
                "title" => form.title = Some(value),
                "description" => form.description = Some(value),
                "startDate" => form.start_date = Some(value),
                "endDate" => form.end_date = Some(value),
                "venue" | "location[venue]" => form.venue = Some(value),
                "city" | "location[city]" => form.city = Some(value),
                _ => {}
            }
        }
        Ok(form)
    }

    fn into_payload(self) -> Result<(ManualEventPayload, Option<ImageUpload>)> {
        let payload = ManualEventPayload {
            external_id: self.external_id,
            title: self.title,
            description: self.description,
            start_date: parse_date("startDate", self.start_date)?,
            end_date: parse_date("endDate", self.end_date)?,
            venue: self.venue,
            city: self.city,
            image: None,
        };
        Ok((payload, self.image))
    }

    /// Blank fields are treated as absent on update
    fn into_patch(self) -> Result<(EventPatch, Option<ImageUpload>)> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let patch = EventPatch {
            title: present(self.title),
            description: present(self.description),
            start_date: parse_date("startDate", present(self.start_date))?,
            end_date: parse_date("endDate", present(self.end_date))?,
            venue: present(self.venue),
            city: present(self.city),
            image: None,
        };
        Ok((patch, self.image))
    }
}

fn form_error(e: axum::extract::multipart::MultipartError) -> EventHubError {
    EventHubError::validation("body", e.body_text())
}

/// Accepts RFC 3339, or a zone-less local form value interpreted as UTC
fn parse_date(field: &'static str, value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&raw, format) {
            return Ok(Some(naive.and_utc()));
        }
    }
    Err(EventHubError::validation(field, format!("{} is not a valid date", field)))
}

pub async fn list_authored(State(state): State<AppState>, StaffUser(user): StaffUser) -> Result<Json<Vec<Event>>> {
    Ok(Json(state.services.event_service.list_owned(user.id).await?))
}

pub async fn create_event(
    State(state): State<AppState>,
    StaffUser(user): StaffUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Event>)> {
    let (payload, image) = EventForm::read(multipart).await?.into_payload()?;
    let event = state.services.event_service.create(payload, image, user.id).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn update_event(
    State(state): State<AppState>,
    StaffUser(user): StaffUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Event>> {
    let id = parse_event_id(&id).map_err(|_| EventHubError::NotFoundOrForbidden)?;
    let (patch, image) = EventForm::read(multipart).await?.into_patch()?;
    let event = state.services.event_service.update(id, user.id, patch, image).await?;
    Ok(Json(event))
}

pub async fn delete_event(
    State(state): State<AppState>,
    StaffUser(user): StaffUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let id = parse_event_id(&id).map_err(|_| EventHubError::NotFoundOrForbidden)?;
    state.services.event_service.delete(id, user.id).await?;
    Ok(Json(json!({ "message": "Event deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_date_formats() {
        let rfc = parse_date("startDate", Some("2030-01-02T18:00:00+01:00".into())).unwrap().unwrap();
        assert_eq!(rfc.to_rfc3339(), "2030-01-02T17:00:00+00:00");

        let local = parse_date("startDate", Some("2030-01-02T18:00".into())).unwrap().unwrap();
        assert_eq!(local.to_rfc3339(), "2030-01-02T18:00:00+00:00");

        assert_eq!(parse_date("endDate", Some("  ".into())).unwrap(), None);
        assert_matches!(
            parse_date("endDate", Some("next tuesday".into())),
            Err(EventHubError::ValidationFailed { field: "endDate", .. })
        );
    }

    #[test]
    fn test_blank_fields_are_absent_in_patch() {
        let form = EventForm {
            title: Some("  ".into()),
            city: Some("York".into()),
            ..Default::default()
        };
        let (patch, image) = form.into_patch().unwrap();
        assert!(patch.title.is_none());
        assert_eq!(patch.city.as_deref(), Some("York"));
        assert!(image.is_none());
    }
}
