//! NOAA GFS 0.25° forecast via the NOMADS GrADS Data Server (OPeNDAP).

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use flood_common::{CrsCode, Extent, Resolution};
use grid_processor::{RasterGrid, ResamplingMethod};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::opendap::{parse_ascii, OpendapArray};
use crate::plan::{FetchPlan, NativeGrid};
use crate::{CachedHttpClient, Result, Source, SourceError};

pub const GFS_ID: &str = "noaa-gfs-rain-data";
pub const DEFAULT_BASE_URL: &str = "https://nomads.ncep.noaa.gov/dods/gfs_0p25";
pub const DEFAULT_VARIABLE: &str = "apcpsfc";

/// Grid spacing in degrees.
pub const DATA_RESOLUTION: f64 = 0.25;

/// Forecast steps are 3 hours apart.
const HOURS_PER_STEP: u32 = 3;
const LAT_POINTS: usize = 721;
const LON_POINTS: usize = 1440;
const GLOBAL_GRID: Resolution = Resolution::fixed(LAT_POINTS, LON_POINTS);

const NATIVE: NativeGrid = NativeGrid {
    crs: CrsCode::Epsg4326,
    data_resolution: Some(DATA_RESOLUTION),
};

/// One of the four daily model runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GfsCycle {
    #[serde(rename = "00")]
    Z00,
    #[serde(rename = "06")]
    Z06,
    #[serde(rename = "12")]
    Z12,
    #[serde(rename = "18")]
    Z18,
}

impl GfsCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            GfsCycle::Z00 => "00",
            GfsCycle::Z06 => "06",
            GfsCycle::Z12 => "12",
            GfsCycle::Z18 => "18",
        }
    }
}

impl fmt::Display for GfsCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GfsCycle {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "00" => Ok(GfsCycle::Z00),
            "06" => Ok(GfsCycle::Z06),
            "12" => Ok(GfsCycle::Z12),
            "18" => Ok(GfsCycle::Z18),
            other => Err(SourceError::InvalidRequest(format!(
                "GFS cycle must be one of 00, 06, 12, 18, got '{}'",
                other
            ))),
        }
    }
}

/// Index ranges (inclusive) into the global GFS grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridWindow {
    pub lat: (usize, usize),
    pub lon: (usize, usize),
}

impl GridWindow {
    /// Grid points covering `extent` (degrees, already aligned to the grid).
    ///
    /// Latitude index 0 is 90°S; longitude index 0 is 0°E.
    pub fn for_extent(extent: &Extent) -> Result<Self> {
        let lat_index = |lat: f64| (((lat + 90.0) / DATA_RESOLUTION).round() as usize).min(LAT_POINTS - 1);
        let lon_index =
            |lon: f64| ((lon.rem_euclid(360.0) / DATA_RESOLUTION).round() as usize).min(LON_POINTS - 1);

        let lon = (lon_index(extent.lon_min()), lon_index(extent.lon_max()));
        if lon.1 < lon.0 {
            return Err(SourceError::InvalidRequest(format!(
                "extent {} crosses the prime meridian",
                extent.to_bbox_string()
            )));
        }

        Ok(Self {
            lat: (lat_index(extent.lat_min()), lat_index(extent.lat_max())),
            lon,
        })
    }

    pub fn rows(&self) -> usize {
        self.lat.1 - self.lat.0 + 1
    }

    pub fn cols(&self) -> usize {
        self.lon.1 - self.lon.0 + 1
    }

    /// Extent covered by the window's cells, treating grid points as cell
    /// centres.
    pub fn cell_extent(&self) -> Result<Extent> {
        let half = DATA_RESOLUTION / 2.0;
        let lon = |i: usize| i as f64 * DATA_RESOLUTION;
        let lat = |i: usize| i as f64 * DATA_RESOLUTION - 90.0;
        Ok(Extent::new(
            lon(self.lon.0) - half,
            lon(self.lon.1) + half,
            lat(self.lat.0) - half,
            lat(self.lat.1) + half,
        )?)
    }
}

/// GFS accumulated precipitation for one forecast step.
pub struct GfsSource {
    client: CachedHttpClient,
    base_url: String,
    date: NaiveDate,
    cycle: GfsCycle,
    hours_ahead: u32,
    variable: String,
    resampling: ResamplingMethod,
}

impl GfsSource {
    pub fn new(client: CachedHttpClient, date: NaiveDate, cycle: GfsCycle, hours_ahead: u32) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            date,
            cycle,
            hours_ahead,
            variable: DEFAULT_VARIABLE.to_string(),
            resampling: ResamplingMethod::Bilinear,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = variable.into();
        self
    }

    pub fn with_resampling(mut self, resampling: ResamplingMethod) -> Self {
        self.resampling = resampling;
        self
    }

    /// Forecast step selected by `hours_ahead`, rounded down to 3 hours.
    pub fn time_index(&self) -> u32 {
        self.hours_ahead / HOURS_PER_STEP
    }

    /// OPeNDAP ASCII subset URL for `window`.
    pub fn request_url(&self, window: &GridWindow) -> Result<Url> {
        let url = format!(
            "{}/gfs{}/gfs_0p25_{}z.ascii?{}[{}][{}:{}][{}:{}]",
            self.base_url.trim_end_matches('/'),
            self.date.format("%Y%m%d"),
            self.cycle,
            self.variable,
            self.time_index(),
            window.lat.0,
            window.lat.1,
            window.lon.0,
            window.lon.1,
        );
        Url::parse(&url).map_err(|e| SourceError::InvalidRequest(format!("{}: {}", url, e)))
    }

    /// Values of `array` flipped so the northernmost row comes first.
    fn north_up(&self, array: &OpendapArray, window: &GridWindow) -> Result<(Vec<f32>, Resolution)> {
        let resolution = Resolution::new(window.rows(), window.cols())?;
        let dims = &array.shape[array.shape.len().saturating_sub(2)..];
        if dims.len() != 2 {
            return Err(SourceError::decode("gfs", format!("unexpected shape {:?}", array.shape)));
        }
        resolution.check_shape(dims[0], dims[1])?;
        resolution.check_len(array.values.len())?;

        let data = array
            .values
            .chunks(resolution.cols())
            .rev()
            .flatten()
            .copied()
            .collect();
        Ok((data, resolution))
    }
}

#[async_trait]
impl Source for GfsSource {
    fn provides(&self) -> &str {
        GFS_ID
    }

    fn max_resolution(&self) -> Resolution {
        GLOBAL_GRID
    }

    #[instrument(skip(self), fields(source = GFS_ID, date = %self.date, cycle = %self.cycle, hours_ahead = self.hours_ahead))]
    async fn fetch_data(&self, extent: &Extent, resolution: Resolution) -> Result<RasterGrid> {
        let plan = FetchPlan::new(NATIVE, extent, resolution)?;
        let window = GridWindow::for_extent(&plan.src_extent)?;

        let body = self.client.get(self.request_url(&window)?).await?;
        let text = std::str::from_utf8(&body).map_err(|e| SourceError::decode("gfs", e))?;
        let array = parse_ascii(text)?;
        if array.name != self.variable {
            return Err(SourceError::decode(
                "gfs",
                format!("expected variable '{}', got '{}'", self.variable, array.name),
            ));
        }

        let (data, src_resolution) = self.north_up(&array, &window)?;
        info!(rows = src_resolution.rows(), cols = src_resolution.cols(), "Fetched GFS subset");

        plan.finish(&data, src_resolution, window.cell_extent()?, self.resampling, GFS_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> GfsSource {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        GfsSource::new(CachedHttpClient::uncached().unwrap(), date, GfsCycle::Z06, 14)
    }

    #[test]
    fn test_cycle_parse() {
        assert_eq!("12".parse::<GfsCycle>().unwrap(), GfsCycle::Z12);
        assert!("03".parse::<GfsCycle>().is_err());
        assert!("6".parse::<GfsCycle>().is_err());
    }

    #[test]
    fn test_time_index_rounds_down() {
        assert_eq!(source().time_index(), 4);
    }

    #[test]
    fn test_window_for_java() {
        let java = Extent::new(104.5, 120.0, -10.0, -4.75).unwrap();
        let window = GridWindow::for_extent(&java).unwrap();
        assert_eq!(window.lat, (320, 341));
        assert_eq!(window.lon, (418, 480));
        assert_eq!(window.rows(), 22);
        assert_eq!(window.cols(), 63);
    }

    #[test]
    fn test_window_rejects_meridian_crossing() {
        let extent = Extent::new(-1.0, 1.0, 0.0, 1.0).unwrap();
        assert!(GridWindow::for_extent(&extent).is_err());
    }

    #[test]
    fn test_request_url() {
        let window = GridWindow {
            lat: (320, 321),
            lon: (418, 420),
        };
        let url = source().request_url(&window).unwrap();
        assert_eq!(
            url.as_str(),
            "https://nomads.ncep.noaa.gov/dods/gfs_0p25/gfs20240115/gfs_0p25_06z.ascii?apcpsfc[4][320:321][418:420]"
        );
    }
}
