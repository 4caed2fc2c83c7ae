//! Coordinate Reference System codes used by the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::FloodError;

/// Well-known CRS codes the pipeline can transform between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsCode {
    /// WGS84 geographic (lon/lat in degrees)
    Epsg4326,
    /// Plate Carrée on the WGS84 semi-major axis (metres). The common target grid.
    Epsg32662,
    /// Spherical Web Mercator (metres)
    Epsg3857,
    /// Ellipsoidal World Mercator (metres)
    Epsg3395,
}

impl CrsCode {
    /// Look up a CRS by its numeric EPSG code.
    pub fn from_epsg(code: u32) -> Result<Self, FloodError> {
        match code {
            4326 => Ok(CrsCode::Epsg4326),
            32662 => Ok(CrsCode::Epsg32662),
            3857 | 900913 => Ok(CrsCode::Epsg3857),
            3395 => Ok(CrsCode::Epsg3395),
            other => Err(FloodError::UnsupportedCrs(format!("EPSG:{}", other))),
        }
    }

    /// Numeric EPSG code, as used in `bboxSR`/`imageSR` style request parameters.
    pub fn epsg(&self) -> u32 {
        match self {
            CrsCode::Epsg4326 => 4326,
            CrsCode::Epsg32662 => 32662,
            CrsCode::Epsg3857 => 3857,
            CrsCode::Epsg3395 => 3395,
        }
    }

    /// Check if this is a geographic (lat/lon) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsCode::Epsg4326)
    }
}

impl FromStr for CrsCode {
    type Err = FloodError;

    /// Accepts "EPSG:4326", "epsg:3395", "CRS:84" or a bare code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        if normalized == "CRS:84" {
            return Ok(CrsCode::Epsg4326);
        }
        let digits = normalized.strip_prefix("EPSG:").unwrap_or(&normalized);
        digits
            .parse::<u32>()
            .map_err(|_| FloodError::UnsupportedCrs(s.to_string()))
            .and_then(Self::from_epsg)
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}
