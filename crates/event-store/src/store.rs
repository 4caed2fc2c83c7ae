//! In-memory store of historical events used as backtest ground truth.

use std::collections::BTreeSet;

use areas::GadmLocationManager;
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::client::{DibiClient, EventQuery};
use crate::codes::{DisasterType, Province};
use crate::{DibiEvent, EventStoreError, Result};

/// Rows requested per listing; large enough that no query is paginated.
pub const MAX_EVENTS: u32 = 100_000;

/// Which listings to load. Empty lists leave that filter unset.
#[derive(Debug, Clone, Default)]
pub struct StoreQuery {
    pub provinces: Vec<Province>,
    pub years: Vec<i32>,
    pub disaster_types: Vec<DisasterType>,
}

fn or_unset<T: Copy>(values: &[T]) -> Vec<Option<T>> {
    if values.is_empty() {
        vec![None]
    } else {
        values.iter().copied().map(Some).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DibiEventStore {
    events: Vec<DibiEvent>,
}

impl DibiEventStore {
    pub fn from_events(events: Vec<DibiEvent>) -> Self {
        Self { events }
    }

    /// Load every province × year × disaster type combination in `query` and
    /// assign each event its GADM district.
    ///
    /// Events whose names do not match a district get their detail page
    /// fetched and are located by coordinates instead.
    pub async fn load(client: &DibiClient, query: &StoreQuery, locations: &GadmLocationManager) -> Result<Self> {
        let mut events = Vec::new();

        for province in or_unset(&query.provinces) {
            for year in or_unset(&query.years) {
                for disaster_type in or_unset(&query.disaster_types) {
                    info!(province = ?province, year = ?year, "Retrieving events");
                    let listing = EventQuery {
                        length: MAX_EVENTS,
                        province,
                        year,
                        disaster_type,
                        ..Default::default()
                    };
                    events.extend(client.fetch_events(&listing).await?);
                    debug!(total = events.len(), "Cumulative events");
                }
            }
        }

        for event in &mut events {
            assign_district(client, locations, event).await?;
        }

        let unmapped = events.iter().filter(|e| e.location.gadm_gid2.is_none()).count();
        if unmapped > 0 {
            warn!(unmapped, total = events.len(), "Events without a GADM district");
        }
        Ok(Self { events })
    }

    pub fn events(&self) -> &[DibiEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events_on(&self, date: NaiveDate) -> impl Iterator<Item = &DibiEvent> {
        self.events.iter().filter(move |e| e.date == date)
    }

    /// GADM `GID_2`s of districts with an event on `date`.
    pub fn gid2s_on(&self, date: NaiveDate) -> BTreeSet<String> {
        self.events_on(date)
            .filter_map(|e| e.location.gadm_gid2.clone())
            .collect()
    }
}

async fn assign_district(client: &DibiClient, locations: &GadmLocationManager, event: &mut DibiEvent) -> Result<()> {
    let (province, district) = (&event.location.province, &event.location.district);
    if let Some(gid) = locations.district_gid2(province, district, None) {
        event.location.gadm_gid2 = Some(gid);
        return Ok(());
    }

    let details = match client.fetch_event_details(event.incident_id).await {
        Ok(details) => details,
        Err(EventStoreError::MissingDetail { incident_id, field }) => {
            warn!(incident_id, field, "Detail page incomplete, event left unmapped");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    event.location.latitude = details.latitude;
    event.location.longitude = details.longitude;
    event.submitter = details.submitter;
    event.time = details.time;
    event.location.gadm_gid2 = locations.district_gid2(
        &event.location.province,
        &event.location.district,
        event.location.lon_lat(),
    );
    Ok(())
}
