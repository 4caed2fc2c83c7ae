//! Remote raster sources for the flood hazard pipeline.
//!
//! Each adapter implements [`Source`]: it plans a request in the provider's
//! native CRS, fetches it through a [`CachedHttpClient`], decodes the payload
//! and warps it onto the caller's grid in EPSG:32662.
//!
//! | Source | Provider | Native CRS |
//! |--------|----------|------------|
//! | [`InaRiskSource`] | BNPB InaRISK ImageServer | EPSG:3395 |
//! | [`GfsSource`] | NOAA NOMADS OPeNDAP | EPSG:4326 |
//! | [`ChirpsSource`] | UCSB CHC daily GeoTIFF | EPSG:4326 |
//! | [`BmkgSource`] | BMKG ArcGIS WMS | EPSG:3395 |

pub mod bmkg;
pub mod chirps;
pub mod client;
pub mod decode;
pub mod error;
pub mod gfs;
pub mod inarisk;
pub mod opendap;
pub mod plan;
pub mod source;

pub use bmkg::{BmkgSource, BMKG_ID};
pub use chirps::{ChirpsSource, CHIRPS_ID};
pub use client::{CachedHttpClient, DEFAULT_TIMEOUT};
pub use error::{Result, SourceError};
pub use gfs::{GfsCycle, GfsSource, GFS_ID};
pub use inarisk::{InaRiskSource, INARISK_ID};
pub use plan::{FetchPlan, NativeGrid, DESTINATION_CRS};
pub use source::Source;
