//! Common types and utilities shared across the flood hazard pipeline.
//!
//! Everything here is plain data: extents, grid resolutions, CRS codes and the
//! single geotransform used to address raster pixels.

pub mod crs;
pub mod error;
pub mod extent;
pub mod grid;

pub use crs::CrsCode;
pub use error::{FloodError, FloodResult};
pub use extent::Extent;
pub use grid::{GeoTransform, Resolution};

/// Identifier a source registers under, e.g. `noaa-gfs-rain-data`.
pub type SourceId = String;

/// Identifier a hazard index registers under, e.g. `h-mhews-flood-risk-index`.
pub type HazardIndexId = String;
