//! Coordinate reference system transformations.
//!
//! Implements the handful of projections the pipeline needs from scratch:
//! geographic WGS84, Plate Carrée, spherical Web Mercator and ellipsoidal
//! World Mercator. Every transform between two projected CRSs goes through
//! geographic coordinates.

pub mod error;
pub mod mercator;
pub mod plate_carree;
pub mod transform;

pub use error::{ProjectionError, ProjectionResult};
pub use mercator::{WebMercator, WorldMercator};
pub use plate_carree::{Geographic, PlateCarree};
pub use transform::{projection_for, reproject_extent, transform_point, Projection};

/// WGS84 semi-major axis in metres.
pub const WGS84_A: f64 = 6_378_137.0;

/// WGS84 first eccentricity.
pub const WGS84_E: f64 = 0.081_819_190_842_621_49;
