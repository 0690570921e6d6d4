//! Ticketmaster Discovery API adapter
//!
//! Fetches upcoming events live and normalizes them into the shared event
//! shape. Results are never cached; a single attempt is made per call.

use std::time::{Duration, Instant};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};
use crate::config::TicketmasterConfig;
use crate::models::event::{EventSource, ExternalEvent, ExternalEventPage, Location, PageInfo};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::format_provider_timestamp;
use crate::utils::logging::{log_api_error, log_upstream_call};

const API_NAME: &str = "ticketmaster";

/// Search parameters for the provider
#[derive(Debug, Clone, Default)]
pub struct ExternalSearch {
    pub keyword: Option<String>,
    pub city: Option<String>,
    pub page: u32,
    pub size: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "_embedded")]
    embedded: Option<SearchEmbedded>,
    page: Option<WirePage>,
}

#[derive(Debug, Deserialize)]
struct SearchEmbedded {
    #[serde(default)]
    events: Vec<WireEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePage {
    #[serde(default)]
    size: u32,
    #[serde(default)]
    total_elements: u64,
    #[serde(default)]
    total_pages: u32,
    #[serde(default)]
    number: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    id: String,
    name: String,
    info: Option<String>,
    please_note: Option<String>,
    url: Option<String>,
    #[serde(default)]
    images: Vec<WireImage>,
    dates: Option<WireDates>,
    #[serde(rename = "_embedded")]
    embedded: Option<WireEventEmbedded>,
}

#[derive(Debug, Deserialize)]
struct WireImage {
    url: String,
    width: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WireDates {
    start: Option<WireDate>,
    end: Option<WireDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDate {
    date_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct WireEventEmbedded {
    #[serde(default)]
    venues: Vec<WireVenue>,
}

#[derive(Debug, Deserialize)]
struct WireVenue {
    name: Option<String>,
    city: Option<WireCity>,
}

#[derive(Debug, Deserialize)]
struct WireCity {
    name: Option<String>,
}

impl WireEvent {
    /// Normalize a provider event; events without a start time are dropped
    fn normalize(self) -> Option<ExternalEvent> {
        let dates = self.dates?;
        let start_date = dates.start.and_then(|d| d.date_time)?;
        let end_date = dates.end.and_then(|d| d.date_time);

        let venue = self
            .embedded
            .and_then(|e| e.venues.into_iter().next());
        let location = match venue {
            Some(v) => Location {
                venue: v.name.unwrap_or_default(),
                city: v.city.and_then(|c| c.name).unwrap_or_default(),
            },
            None => Location { venue: String::new(), city: String::new() },
        };

        let image = self
            .images
            .into_iter()
            .max_by_key(|i| i.width.unwrap_or(0))
            .map(|i| i.url);

        Some(ExternalEvent {
            external_id: self.id,
            title: self.name,
            description: self.info.or(self.please_note),
            start_date,
            end_date,
            location,
            image,
            url: self.url,
            source: EventSource::Ticketmaster,
        })
    }
}

#[derive(Clone)]
pub struct TicketmasterService {
    config: TicketmasterConfig,
    http_client: reqwest::Client,
}

impl TicketmasterService {
    pub fn new(config: TicketmasterConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("EventHub/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { config, http_client })
    }

    pub fn default_page_size(&self) -> u32 {
        self.config.default_page_size
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/discovery/v2/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Search upcoming events starting from now
    pub async fn search(&self, search: &ExternalSearch) -> Result<ExternalEventPage> {
        let size = if search.size == 0 { self.config.default_page_size } else { search.size };
        let mut query: Vec<(&str, String)> = vec![
            ("apikey", self.config.api_key.clone()),
            ("countryCode", self.config.country_code.clone()),
            ("startDateTime", format_provider_timestamp(Utc::now())),
            ("sort", "date,asc".to_string()),
            ("page", search.page.to_string()),
            ("size", size.to_string()),
        ];
        if let Some(keyword) = search.keyword.as_deref().filter(|k| !k.trim().is_empty()) {
            query.push(("keyword", keyword.trim().to_string()));
        }
        if let Some(city) = search.city.as_deref().filter(|c| !c.trim().is_empty()) {
            query.push(("city", city.trim().to_string()));
        }

        debug!(keyword = ?search.keyword, city = ?search.city, page = search.page, size, "Searching Ticketmaster");
        let response = self.send(self.http_client.get(self.endpoint("events.json")).query(&query), "events.json").await?;
        let body: SearchResponse = decode(response).await?;

        let events: Vec<ExternalEvent> = body
            .embedded
            .map(|e| e.events)
            .unwrap_or_default()
            .into_iter()
            .filter_map(WireEvent::normalize)
            .collect();

        let page = body
            .page
            .map(|p| PageInfo {
                size: p.size,
                total_elements: p.total_elements,
                total_pages: p.total_pages,
                number: p.number,
            })
            .unwrap_or(PageInfo { size, number: search.page, ..Default::default() });

        info!(count = events.len(), page = page.number, "Ticketmaster search completed");
        Ok(ExternalEventPage { events, page })
    }

    /// Fetch a single event by its provider id
    pub async fn get_event(&self, external_id: &str) -> Result<ExternalEvent> {
        let path = format!("events/{}.json", urlencoding::encode(external_id));
        let request = self
            .http_client
            .get(self.endpoint(&path))
            .query(&[("apikey", self.config.api_key.as_str())]);

        let started = Instant::now();
        let response = request.send().await.map_err(|e| {
            log_upstream_call(API_NAME, &path, started.elapsed().as_millis() as u64, false);
            log_api_error(API_NAME, &e.to_string(), Some(external_id));
            EventHubError::UpstreamUnavailable("Ticketmaster is unreachable".to_string())
        })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            log_upstream_call(API_NAME, &path, started.elapsed().as_millis() as u64, true);
            return Err(EventHubError::EventNotFound(external_id.to_string()));
        }
        let response = check_status(response, &path, started)?;

        let event: WireEvent = decode(response).await?;
        event
            .normalize()
            .ok_or_else(|| EventHubError::EventNotFound(external_id.to_string()))
    }

    async fn send(&self, request: reqwest::RequestBuilder, endpoint: &str) -> Result<reqwest::Response> {
        let started = Instant::now();
        let response = request.send().await.map_err(|e| {
            log_upstream_call(API_NAME, endpoint, started.elapsed().as_millis() as u64, false);
            log_api_error(API_NAME, &e.to_string(), None);
            EventHubError::UpstreamUnavailable("Ticketmaster is unreachable".to_string())
        })?;
        check_status(response, endpoint, started)
    }
}

fn check_status(response: reqwest::Response, endpoint: &str, started: Instant) -> Result<reqwest::Response> {
    let elapsed = started.elapsed().as_millis() as u64;
    let status = response.status();
    if !status.is_success() {
        log_upstream_call(API_NAME, endpoint, elapsed, false);
        log_api_error(API_NAME, &format!("status {}", status), Some(endpoint));
        return Err(EventHubError::UpstreamUnavailable(format!("Ticketmaster responded with {}", status)));
    }
    log_upstream_call(API_NAME, endpoint, elapsed, true);
    Ok(response)
}

async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    response.json::<T>().await.map_err(|e| {
        log_api_error(API_NAME, &e.to_string(), Some("decode"));
        EventHubError::UpstreamUnavailable("Ticketmaster returned an unreadable response".to_string())
    })
}
