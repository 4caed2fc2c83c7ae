//! Equirectangular projections.
//!
//! [`Geographic`] is the identity on longitude/latitude degrees (EPSG:4326).
//! [`PlateCarree`] scales degrees to metres on the WGS84 semi-major axis
//! (EPSG:32662), which is the CRS every source is warped into.

use flood_common::CrsCode;

use crate::transform::Projection;
use crate::{ProjectionError, ProjectionResult, WGS84_A};

fn check_geographic(crs: CrsCode, lon: f64, lat: f64) -> ProjectionResult<()> {
    if !lon.is_finite() || !lat.is_finite() || lat.abs() > 90.0 {
        return Err(ProjectionError::OutOfDomain { crs, x: lon, y: lat });
    }
    Ok(())
}

/// Longitude/latitude in degrees.
#[derive(Debug, Clone, Copy, Default)]
pub struct Geographic;

impl Projection for Geographic {
    fn crs(&self) -> CrsCode {
        CrsCode::Epsg4326
    }

    fn project(&self, lon: f64, lat: f64) -> ProjectionResult<(f64, f64)> {
        check_geographic(self.crs(), lon, lat)?;
        Ok((lon, lat))
    }

    fn unproject(&self, x: f64, y: f64) -> ProjectionResult<(f64, f64)> {
        check_geographic(self.crs(), x, y)?;
        Ok((x, y))
    }
}

/// Plate Carrée: `x = a·λ`, `y = a·φ` with angles in radians.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlateCarree;

impl Projection for PlateCarree {
    fn crs(&self) -> CrsCode {
        CrsCode::Epsg32662
    }

    fn project(&self, lon: f64, lat: f64) -> ProjectionResult<(f64, f64)> {
        check_geographic(self.crs(), lon, lat)?;
        Ok((WGS84_A * lon.to_radians(), WGS84_A * lat.to_radians()))
    }

    fn unproject(&self, x: f64, y: f64) -> ProjectionResult<(f64, f64)> {
        let lon = (x / WGS84_A).to_degrees();
        let lat = (y / WGS84_A).to_degrees();
        check_geographic(self.crs(), lon, lat)?;
        Ok((lon, lat))
    }
}
