//! CHIRPS 2.0 daily precipitation (global, 0.05°) from UCSB CHC.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use flood_common::{CrsCode, Extent, Resolution};
use grid_processor::projection::crop;
use grid_processor::{RasterGrid, ResamplingMethod};
use reqwest::Url;
use tracing::{debug, info, instrument};

use crate::decode::{gunzip, tiff_band, DecodedBand};
use crate::plan::{FetchPlan, NativeGrid};
use crate::{CachedHttpClient, Result, Source, SourceError};

pub const CHIRPS_ID: &str = "chirps-historical-rain-data";
pub const DEFAULT_BASE_URL: &str = "https://data.chc.ucsb.edu/products/CHIRPS-2.0/global_daily/tifs/p05";

/// Cell size in degrees.
pub const DATA_RESOLUTION: f64 = 0.05;

/// Global daily grid: 50°S to 50°N at 0.05°.
pub const GLOBAL_GRID: Resolution = Resolution::fixed(2000, 7200);

const SNAP_EPSILON: f64 = 1e-6;

const NATIVE: NativeGrid = NativeGrid {
    crs: CrsCode::Epsg4326,
    data_resolution: Some(DATA_RESOLUTION),
};

/// Bounds of the published grid in degrees.
pub fn data_extent() -> Result<Extent> {
    Ok(Extent::new(-180.0, 180.0, -50.0, 50.0)?)
}

/// A cropped piece of a decoded grid and the extent it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub data: Vec<f32>,
    pub resolution: Resolution,
    pub extent: Extent,
}

/// Crop the cells of `band` (covering `band_extent`) that cover `request`.
///
/// Returns `None` when `request` does not overlap the band.
pub fn window(band: &DecodedBand, band_extent: &Extent, request: &Extent) -> Result<Option<Window>> {
    let Some(overlap) = band_extent.intersection(request) else {
        return Ok(None);
    };

    let (pixel_width, pixel_height) = band_extent.pixel_size(&band.resolution);
    let start = |offset: f64, size: f64| (offset / size + SNAP_EPSILON).floor().max(0.0) as usize;
    let end = |offset: f64, size: f64, len: usize| ((offset / size - SNAP_EPSILON).ceil() as usize).min(len);

    let cols = start(overlap.lon_min() - band_extent.lon_min(), pixel_width)
        ..end(overlap.lon_max() - band_extent.lon_min(), pixel_width, band.resolution.cols());
    let rows = start(band_extent.lat_max() - overlap.lat_max(), pixel_height)
        ..end(band_extent.lat_max() - overlap.lat_min(), pixel_height, band.resolution.rows());

    if rows.is_empty() || cols.is_empty() {
        return Ok(None);
    }

    let extent = Extent::new(
        band_extent.lon_min() + cols.start as f64 * pixel_width,
        band_extent.lon_min() + cols.end as f64 * pixel_width,
        band_extent.lat_max() - rows.end as f64 * pixel_height,
        band_extent.lat_max() - rows.start as f64 * pixel_height,
    )?;
    let resolution = Resolution::new(rows.len(), cols.len())?;
    let data = crop(&band.data, &band.resolution, rows, cols)?;

    Ok(Some(Window {
        data,
        resolution,
        extent,
    }))
}

/// Daily CHIRPS rainfall totals (mm) for one date.
pub struct ChirpsSource {
    client: CachedHttpClient,
    base_url: String,
    date: NaiveDate,
    resampling: ResamplingMethod,
}

impl ChirpsSource {
    pub fn new(client: CachedHttpClient, date: NaiveDate) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            date,
            resampling: ResamplingMethod::Bilinear,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_resampling(mut self, resampling: ResamplingMethod) -> Self {
        self.resampling = resampling;
        self
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// URL of the gzipped GeoTIFF for this date.
    pub fn request_url(&self) -> Result<Url> {
        let url = format!(
            "{}/{}/chirps-v2.0.{}.tif.gz",
            self.base_url.trim_end_matches('/'),
            self.date.year(),
            self.date.format("%Y.%m.%d")
        );
        Url::parse(&url).map_err(|e| SourceError::InvalidRequest(format!("{}: {}", url, e)))
    }
}

#[async_trait]
impl Source for ChirpsSource {
    fn provides(&self) -> &str {
        CHIRPS_ID
    }

    fn max_resolution(&self) -> Resolution {
        GLOBAL_GRID
    }

    #[instrument(skip(self), fields(source = CHIRPS_ID, date = %self.date))]
    async fn fetch_data(&self, extent: &Extent, resolution: Resolution) -> Result<RasterGrid> {
        let plan = FetchPlan::new(NATIVE, extent, resolution)?;

        let body = self.client.get(self.request_url()?).await?;
        let band = tiff_band(&gunzip(&body)?)?;
        debug!(grid = %band.resolution, "Decoded CHIRPS grid");

        let Some(mut window) = window(&band, &data_extent()?, &plan.src_extent)? else {
            info!(extent = %extent.to_bbox_string(), "Request outside CHIRPS coverage");
            return Ok(plan.empty(CHIRPS_ID));
        };

        // Ocean and missing cells carry a large negative placeholder.
        for v in window.data.iter_mut().filter(|v| **v < 0.0) {
            *v = 0.0;
        }

        info!(window = %window.resolution, "Cropped CHIRPS window");
        plan.finish(&window.data, window.resolution, window.extent, self.resampling, CHIRPS_ID)
    }
}
