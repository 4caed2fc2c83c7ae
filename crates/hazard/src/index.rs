//! Hazard indices: weighted combinations of aligned source rasters.

use std::collections::HashMap;

use grid_processor::RasterGrid;
use serde::{Deserialize, Serialize};
use sources::{CHIRPS_ID, GFS_ID, INARISK_ID};
use tracing::debug;

use crate::{HazardError, Result};

pub const HMHEWS_ID: &str = "h-mhews-flood-risk-index";
pub const HMHEWS_HISTORICAL_ID: &str = "h-mhews-historical-flood-risk-index";

/// Source rasters by identifier. Every grid shares one extent and shape.
pub type SourceRasters = HashMap<String, RasterGrid>;

/// A raster derived from source rasters.
pub trait HazardIndex: Send + Sync {
    /// Identifier of the index this produces.
    fn provides(&self) -> &str;

    /// Sources that must be present in the input of [`HazardIndex::calculate_index`].
    fn required_sources(&self) -> Vec<&str>;

    fn calculate_index(&self, rasters: &SourceRasters) -> Result<RasterGrid>;
}

/// Coefficients of the H-MHEWS flood hazard formula
/// `risk * risk_weight * risk_scale + rain * rain_weight`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HmhewsWeights {
    pub risk_weight: f32,
    /// Brings the `[0,1]` risk index onto the precipitation scale.
    pub risk_scale: f32,
    pub rain_weight: f32,
    /// Factor applied to daily historical totals to compare them with
    /// 3-hour forecast accumulations. Needs validation against observed
    /// events before it is tuned.
    pub historical_rain_scale: f32,
}

impl Default for HmhewsWeights {
    fn default() -> Self {
        Self {
            risk_weight: 0.2,
            risk_scale: 20.0,
            rain_weight: 0.8,
            historical_rain_scale: 0.125,
        }
    }
}

fn lookup<'a>(index: &str, rasters: &'a SourceRasters, source: &str) -> Result<&'a RasterGrid> {
    rasters.get(source).ok_or_else(|| HazardError::missing(index, source))
}

fn combine(id: &str, weights: &HmhewsWeights, risk: &RasterGrid, rain: &RasterGrid, rain_factor: f32) -> Result<RasterGrid> {
    let risk_term = risk.mul_scalar(weights.risk_weight * weights.risk_scale);
    let rain_term = rain.mul_scalar(rain_factor * weights.rain_weight);
    let index = risk_term.add(&rain_term).map_err(|e| HazardError::index(id, e))?;

    debug!(
        index = id,
        rows = index.rows(),
        cols = index.cols(),
        max = ?index.max_finite(),
        "Computed hazard index"
    );
    Ok(index.with_source(id))
}

/// Flood hazard from the InaRISK flood risk index and GFS forecast rain.
#[derive(Debug, Clone, Default)]
pub struct HmhewsFloodHazardIndex {
    weights: HmhewsWeights,
}

impl HmhewsFloodHazardIndex {
    pub fn new(weights: HmhewsWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &HmhewsWeights {
        &self.weights
    }
}

impl HazardIndex for HmhewsFloodHazardIndex {
    fn provides(&self) -> &str {
        HMHEWS_ID
    }

    fn required_sources(&self) -> Vec<&str> {
        vec![INARISK_ID, GFS_ID]
    }

    fn calculate_index(&self, rasters: &SourceRasters) -> Result<RasterGrid> {
        let risk = lookup(HMHEWS_ID, rasters, INARISK_ID)?;
        let rain = lookup(HMHEWS_ID, rasters, GFS_ID)?;
        combine(HMHEWS_ID, &self.weights, risk, rain, 1.0)
    }
}

/// The H-MHEWS formula with CHIRPS daily totals in place of forecast rain.
#[derive(Debug, Clone, Default)]
pub struct HmhewsHistoricalFloodHazardIndex {
    weights: HmhewsWeights,
}

impl HmhewsHistoricalFloodHazardIndex {
    pub fn new(weights: HmhewsWeights) -> Self {
        Self { weights }
    }
}

impl HazardIndex for HmhewsHistoricalFloodHazardIndex {
    fn provides(&self) -> &str {
        HMHEWS_HISTORICAL_ID
    }

    fn required_sources(&self) -> Vec<&str> {
        vec![INARISK_ID, CHIRPS_ID]
    }

    fn calculate_index(&self, rasters: &SourceRasters) -> Result<RasterGrid> {
        let risk = lookup(HMHEWS_HISTORICAL_ID, rasters, INARISK_ID)?;
        let rain = lookup(HMHEWS_HISTORICAL_ID, rasters, CHIRPS_ID)?;
        combine(
            HMHEWS_HISTORICAL_ID,
            &self.weights,
            risk,
            rain,
            self.weights.historical_rain_scale,
        )
    }
}
