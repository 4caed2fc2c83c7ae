//! Rectangular extents and operations on them.

use serde::{Deserialize, Serialize};

use crate::{FloodError, FloodResult, Resolution};

/// Quotients closer than this to an integer are treated as that integer when
/// snapping to a resolution, so aligned bounds stay where they are.
const SNAP_EPSILON: f64 = 1e-9;

/// An axis-aligned rectangle.
///
/// For geographic CRS (EPSG:4326) the bounds are degrees. The same type is
/// used for extents reprojected into a metric CRS, in which case `lon_*` is
/// the x axis and `lat_*` the y axis.
///
/// Extents are immutable: every derived operation returns a new value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawExtent", into = "RawExtent")]
pub struct Extent {
    lon_min: f64,
    lon_max: f64,
    lat_min: f64,
    lat_max: f64,
}

impl Extent {
    /// Create an extent, rejecting empty, inverted or non-finite bounds.
    pub fn new(lon_min: f64, lon_max: f64, lat_min: f64, lat_max: f64) -> FloodResult<Self> {
        if ![lon_min, lon_max, lat_min, lat_max].iter().all(|v| v.is_finite()) {
            return Err(FloodError::InvalidExtent(format!(
                "non-finite bounds ({}, {}, {}, {})",
                lon_min, lon_max, lat_min, lat_max
            )));
        }
        if lon_min >= lon_max {
            return Err(FloodError::InvalidExtent(format!(
                "lon_min {} must be less than lon_max {}",
                lon_min, lon_max
            )));
        }
        if lat_min >= lat_max {
            return Err(FloodError::InvalidExtent(format!(
                "lat_min {} must be less than lat_max {}",
                lat_min, lat_max
            )));
        }

        Ok(Self {
            lon_min,
            lon_max,
            lat_min,
            lat_max,
        })
    }

    /// Create an extent from `(minx, miny, maxx, maxy)` bounds order.
    pub fn from_bounds(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> FloodResult<Self> {
        Self::new(min_x, max_x, min_y, max_y)
    }

    /// Parse a bbox parameter string: "minx,miny,maxx,maxy"
    pub fn from_bbox_string(s: &str) -> FloodResult<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(FloodError::InvalidBbox(s.to_string()));
        }

        let mut values = [0.0; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part
                .parse()
                .map_err(|_| FloodError::InvalidBbox(s.to_string()))?;
        }

        Self::from_bounds(values[0], values[1], values[2], values[3])
    }

    pub fn lon_min(&self) -> f64 {
        self.lon_min
    }

    pub fn lon_max(&self) -> f64 {
        self.lon_max
    }

    pub fn lat_min(&self) -> f64 {
        self.lat_min
    }

    pub fn lat_max(&self) -> f64 {
        self.lat_max
    }

    /// `(lon_min, lon_max, lat_min, lat_max)`
    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.lon_min, self.lon_max, self.lat_min, self.lat_max)
    }

    /// `(minx, miny, maxx, maxy)`, the order most HTTP APIs expect.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (self.lon_min, self.lat_min, self.lon_max, self.lat_max)
    }

    /// Width in coordinate units.
    pub fn width(&self) -> f64 {
        self.lon_max - self.lon_min
    }

    /// Height in coordinate units.
    pub fn height(&self) -> f64 {
        self.lat_max - self.lat_min
    }

    /// Get the center point `(lon, lat)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.lon_min + self.lon_max) / 2.0,
            (self.lat_min + self.lat_max) / 2.0,
        )
    }

    /// Snap the bounds outward to multiples of `resolution`.
    ///
    /// Minimums are floored and maximums ceiled, so the result always covers
    /// `self` and has no fractional edge pixels. Growing an already grown
    /// extent returns it unchanged.
    pub fn grow_to_resolution(&self, resolution: f64) -> FloodResult<Self> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(FloodError::InvalidResolution(format!(
                "angular resolution must be positive, got {}",
                resolution
            )));
        }

        let floor = |v: f64| snap_quotient(v / resolution).floor() * resolution;
        let ceil = |v: f64| snap_quotient(v / resolution).ceil() * resolution;

        Self::new(
            floor(self.lon_min),
            ceil(self.lon_max),
            floor(self.lat_min),
            ceil(self.lat_max),
        )
    }

    /// Size of one pixel `(width, height)` when this extent is split into `resolution`.
    pub fn pixel_size(&self, resolution: &Resolution) -> (f64, f64) {
        (
            self.width() / resolution.cols() as f64,
            self.height() / resolution.rows() as f64,
        )
    }

    /// Check if this extent intersects another.
    pub fn intersects(&self, other: &Extent) -> bool {
        self.lon_min < other.lon_max
            && self.lon_max > other.lon_min
            && self.lat_min < other.lat_max
            && self.lat_max > other.lat_min
    }

    /// Compute the intersection of two extents.
    pub fn intersection(&self, other: &Extent) -> Option<Extent> {
        if !self.intersects(other) {
            return None;
        }

        Some(Extent {
            lon_min: self.lon_min.max(other.lon_min),
            lon_max: self.lon_max.min(other.lon_max),
            lat_min: self.lat_min.max(other.lat_min),
            lat_max: self.lat_max.min(other.lat_max),
        })
    }

    /// Check if a point is contained within this extent (edges inclusive).
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.lon_min && lon <= self.lon_max && lat >= self.lat_min && lat <= self.lat_max
    }

    /// Expand the extent by a buffer on every side.
    pub fn expand(&self, buffer: f64) -> Self {
        Self {
            lon_min: self.lon_min - buffer,
            lon_max: self.lon_max + buffer,
            lat_min: self.lat_min - buffer,
            lat_max: self.lat_max + buffer,
        }
    }

    /// Format as `minx,miny,maxx,maxy` with 6 decimals.
    pub fn to_bbox_string(&self) -> String {
        format!(
            "{:.6},{:.6},{:.6},{:.6}",
            self.lon_min, self.lat_min, self.lon_max, self.lat_max
        )
    }
}

fn snap_quotient(q: f64) -> f64 {
    let nearest = q.round();
    if (q - nearest).abs() <= SNAP_EPSILON * nearest.abs().max(1.0) {
        nearest
    } else {
        q
    }
}

/// Serialized form, validated on the way in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawExtent {
    lon_min: f64,
    lon_max: f64,
    lat_min: f64,
    lat_max: f64,
}

impl TryFrom<RawExtent> for Extent {
    type Error = FloodError;

    fn try_from(raw: RawExtent) -> Result<Self, Self::Error> {
        Extent::new(raw.lon_min, raw.lon_max, raw.lat_min, raw.lat_max)
    }
}

impl From<Extent> for RawExtent {
    fn from(extent: Extent) -> Self {
        RawExtent {
            lon_min: extent.lon_min,
            lon_max: extent.lon_max,
            lat_min: extent.lat_min,
            lat_max: extent.lat_max,
        }
    }
}
