//! Historical disaster events from the BNPB DIBI database.
//!
//! Events are the ground truth for backtesting hazard indices: each one is
//! mapped to a GADM district so it can be compared with predicted areas.

pub mod client;
pub mod codes;
pub mod error;
pub mod event;
pub mod store;

pub use client::{parse_details, DibiClient, EventDetails, EventQuery, DEFAULT_BASE_URL};
pub use codes::{DisasterType, JawaBaratDistrict, Province, BACKTEST_PROVINCES};
pub use error::{EventStoreError, ParseError, Result};
pub use event::{incident_id_from_html, DibiEvent, FacilityDamage, HouseDamage, Location, Victims};
pub use store::{DibiEventStore, StoreQuery, MAX_EVENTS};
