//! Test data helpers
//!
//! Builders for request bodies and randomized account data.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::Name;
use fake::Fake;
use serde_json::{json, Value};
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "correct horse battery";
pub const STAFF_CODE: &str = "staff-invite";

/// Random account data for a signup body
pub fn signup_body(staff: bool) -> Value {
    let name: String = Name().fake();
    let email: String = SafeEmail().fake();
    json!({
        "name": name,
        "email": format!("{}.{}", Uuid::new_v4().simple(), email),
        "password": TEST_PASSWORD,
        "staffCode": if staff { Some(STAFF_CODE) } else { None },
    })
}

pub fn rfc3339(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Minimal PNG signature bytes; content is never decoded
pub fn png_bytes() -> Vec<u8> {
    vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0]
}

/// Multipart body builder for authoring requests
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self {
            boundary: format!("eventhub-{}", Uuid::new_v4().simple()),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                self.boundary, name, file_name, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Content-Type header value and the finished body
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (format!("multipart/form-data; boundary={}", self.boundary), self.body)
    }
}

/// The "Jazz Night" authoring form: tomorrow, two hours, Hall A in London
pub fn jazz_night_form() -> MultipartForm {
    let start = Utc::now() + Duration::days(1);
    event_form("Jazz Night", start, start + Duration::hours(2))
}

/// A complete authoring form with an image
pub fn event_form(title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> MultipartForm {
    let description: String = Sentence(3..8).fake();
    MultipartForm::new()
        .text("title", title)
        .text("description", &description)
        .text("startDate", &rfc3339(start))
        .text("endDate", &rfc3339(end))
        .text("venue", "Hall A")
        .text("city", "London")
        .file("image", "poster.png", "image/png", &png_bytes())
}

/// A Ticketmaster Discovery event as returned on the wire
pub fn ticketmaster_event(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "info": "Doors at seven",
        "url": format!("https://ticketmaster.example/event/{}", id),
        "images": [{"url": "https://img.example/wide.jpg", "width": 2048}],
        "dates": {"start": {"dateTime": "2031-06-01T19:00:00Z"}},
        "_embedded": {"venues": [{"name": "Roundhouse", "city": {"name": "London"}}]}
    })
}
