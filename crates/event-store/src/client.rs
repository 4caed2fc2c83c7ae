//! Client for the DIBI v3 web API.
//!
//! Event listings come from the DataTables endpoint behind the public search
//! page. Coordinates are only published on each event's detail page, so those
//! are scraped from its form inputs.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::NaiveTime;
use regex::Regex;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use sources::CachedHttpClient;
use tracing::{debug, instrument, warn};

use crate::codes::{DisasterType, JawaBaratDistrict, Province};
use crate::{DibiEvent, EventStoreError, Result};

pub const DEFAULT_BASE_URL: &str = "https://dibi.bnpb.go.id";

const EVENTS_PATH: &str = "dibi3x/get_dibi3x";
const DETAIL_PATH: &str = "d/r";
const EARLIEST_YEAR: i32 = 1800;
const LATEST_YEAR: i32 = 2100;

/// Filters for one events listing request. Unset filters match everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    /// Pagination offset.
    pub start: u32,
    /// Maximum number of rows.
    pub length: u32,
    pub province: Option<Province>,
    pub district: Option<JawaBaratDistrict>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub disaster_type: Option<DisasterType>,
    /// Free-text search.
    pub search: String,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            start: 0,
            length: 5,
            province: None,
            district: None,
            year: None,
            month: None,
            disaster_type: None,
            search: String::new(),
        }
    }
}

impl EventQuery {
    pub fn validate(&self) -> Result<()> {
        if self.length == 0 {
            return Err(EventStoreError::InvalidQuery("length must be positive".to_string()));
        }
        if let Some(year) = self.year {
            if !(EARLIEST_YEAR..=LATEST_YEAR).contains(&year) {
                return Err(EventStoreError::InvalidQuery(format!(
                    "year {} outside {}..={}",
                    year, EARLIEST_YEAR, LATEST_YEAR
                )));
            }
        }
        if let Some(month) = self.month {
            if !(1..=12).contains(&month) {
                return Err(EventStoreError::InvalidQuery(format!("month {} outside 1..=12", month)));
            }
        }
        Ok(())
    }

    /// Form fields in the order the search page sends them.
    pub fn to_form(&self) -> Vec<(String, String)> {
        let opt = |v: Option<String>| v.unwrap_or_default();
        vec![
            ("start".to_string(), self.start.to_string()),
            ("length".to_string(), self.length.to_string()),
            ("search[value]".to_string(), String::new()),
            ("search[regex]".to_string(), "false".to_string()),
            ("pr".to_string(), opt(self.province.map(|p| p.code().to_string()))),
            ("kb".to_string(), opt(self.district.map(|d| d.code().to_string()))),
            ("th".to_string(), opt(self.year.map(|y| y.to_string()))),
            ("bl".to_string(), opt(self.month.map(|m| m.to_string()))),
            ("jn".to_string(), opt(self.disaster_type.map(|t| t.code().to_string()))),
            ("cr".to_string(), self.search.clone()),
        ]
    }
}

/// Fields scraped from an event's detail page.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDetails {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub submitter: Option<String>,
    pub time: Option<NaiveTime>,
}

#[derive(Deserialize)]
struct ListingResponse {
    #[serde(rename = "aaData", default)]
    rows: Vec<Value>,
}

#[derive(Clone)]
pub struct DibiClient {
    http: CachedHttpClient,
    base_url: String,
}

impl DibiClient {
    pub fn new(http: CachedHttpClient) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn events_url(&self) -> Result<Url> {
        parse_url(&format!("{}/{}", self.base_url, EVENTS_PATH))
    }

    pub fn detail_url(&self, incident_id: u64) -> Result<Url> {
        parse_url(&format!("{}/{}/{}", self.base_url, DETAIL_PATH, incident_id))
    }

    /// Fetch one page of events matching `query`.
    ///
    /// The endpoint answers queries with no matches with a non-JSON body,
    /// which is returned as an empty list.
    #[instrument(skip(self), fields(province = ?query.province, year = ?query.year))]
    pub async fn fetch_events(&self, query: &EventQuery) -> Result<Vec<DibiEvent>> {
        query.validate()?;
        let body = self.http.post_form(self.events_url()?, &query.to_form()).await?;

        let listing: ListingResponse = match serde_json::from_slice(&body) {
            Ok(listing) => listing,
            Err(e) => {
                debug!(error = %e, "Listing is not JSON, treating as no events");
                return Ok(Vec::new());
            }
        };

        let events = listing
            .rows
            .iter()
            .enumerate()
            .map(|(row, value)| DibiEvent::from_row(value).map_err(|source| EventStoreError::Parse { row, source }))
            .collect::<Result<Vec<_>>>()?;

        debug!(events = events.len(), "Parsed listing");
        Ok(events)
    }

    /// Fetch and scrape the detail page of one event.
    #[instrument(skip(self))]
    pub async fn fetch_event_details(&self, incident_id: u64) -> Result<EventDetails> {
        let body = self.http.get(self.detail_url(incident_id)?).await?;
        parse_details(incident_id, &String::from_utf8_lossy(&body))
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| EventStoreError::InvalidQuery(format!("bad url '{}': {}", url, e)))
}

fn input_tag() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"(?is)<input\b[^>]*>").unwrap_or_else(|e| panic!("invalid pattern: {}", e)))
}

fn attribute() -> &'static Regex {
    static ATTR: OnceLock<Regex> = OnceLock::new();
    ATTR.get_or_init(|| {
        Regex::new(r#"(?i)\b(name|value)\s*=\s*"([^"]*)""#).unwrap_or_else(|e| panic!("invalid pattern: {}", e))
    })
}

/// Map of `<input name=... value=...>` pairs in `html`.
fn input_values(html: &str) -> HashMap<String, String> {
    input_tag()
        .find_iter(html)
        .filter_map(|tag| {
            let mut name = None;
            let mut value = String::new();
            for caps in attribute().captures_iter(tag.as_str()) {
                match caps[1].to_ascii_lowercase().as_str() {
                    "name" => name = Some(caps[2].to_string()),
                    _ => value = caps[2].to_string(),
                }
            }
            name.map(|n| (n, value))
        })
        .collect()
}

/// Extract coordinates, submitter and time from a detail page.
///
/// The coordinate inputs must be present; an empty value means the event was
/// never geolocated.
pub fn parse_details(incident_id: u64, html: &str) -> Result<EventDetails> {
    let inputs = input_values(html);
    let required = |field: &'static str| {
        inputs
            .get(field)
            .map(|v| v.trim())
            .ok_or(EventStoreError::MissingDetail { incident_id, field })
    };

    let coordinate = |field: &'static str| -> Result<Option<f64>> {
        let raw = required(field)?;
        if raw.is_empty() {
            return Ok(None);
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => {
                warn!(incident_id, field, value = raw, "Unparseable coordinate");
                Ok(None)
            }
        }
    };

    let latitude = coordinate("f[lat]")?;
    let longitude = coordinate("f[lng]")?;

    let submitter = inputs
        .get("f[input_oleh]")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let time = inputs
        .get("f[jam]")
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .and_then(|s| {
            NaiveTime::parse_from_str(s, "%H.%M")
                .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
                .ok()
        });

    Ok(EventDetails {
        latitude,
        longitude,
        submitter,
        time,
    })
}
