//! Core types for grid processing.

use std::fmt;

use flood_common::{Extent, FloodError, GeoTransform, Resolution};
use serde::{Deserialize, Serialize};

use crate::{GridProcessorError, Result};

/// Resampling method used when warping a raster onto a new grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResamplingMethod {
    /// Exact source values. Use for categorical rasters.
    #[default]
    Nearest,
    /// Smooth interpolation over the 4 nearest cell centres.
    Bilinear,
    /// Catmull-Rom over the 16 nearest cell centres.
    Cubic,
}

impl fmt::Display for ResamplingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResamplingMethod::Nearest => "nearest",
            ResamplingMethod::Bilinear => "bilinear",
            ResamplingMethod::Cubic => "cubic",
        };
        f.write_str(name)
    }
}

/// A north-up raster over a geographic extent.
///
/// Values are stored row-major with row 0 the northernmost row. NaN marks
/// cells with no data.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGrid {
    data: Vec<f32>,
    resolution: Resolution,
    extent: Extent,
    source: Option<String>,
}

impl RasterGrid {
    /// Wrap row-major `data`, checking it holds exactly `rows * cols` values.
    pub fn new(data: Vec<f32>, resolution: Resolution, extent: Extent) -> Result<Self> {
        resolution.check_len(data.len())?;
        Ok(Self {
            data,
            resolution,
            extent,
            source: None,
        })
    }

    /// Build a grid from nested rows, north first.
    pub fn from_rows(rows: Vec<Vec<f32>>, extent: Extent) -> Result<Self> {
        let row_count = rows.len();
        let col_count = rows.first().map(Vec::len).unwrap_or(0);
        let resolution = Resolution::new(row_count, col_count)?;

        if let Some(bad) = rows.iter().find(|row| row.len() != col_count) {
            return Err(FloodError::ShapeMismatch {
                rows: row_count,
                cols: col_count,
                actual_rows: row_count,
                actual_cols: bad.len(),
            }
            .into());
        }

        Self::new(rows.into_iter().flatten().collect(), resolution, extent)
    }

    /// A grid where every cell holds `value`.
    pub fn filled(value: f32, resolution: Resolution, extent: Extent) -> Self {
        Self {
            data: vec![value; resolution.len()],
            resolution,
            extent,
            source: None,
        }
    }

    /// Tag the grid with the identifier of the source that produced it.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn rows(&self) -> usize {
        self.resolution.rows()
    }

    pub fn cols(&self) -> usize {
        self.resolution.cols()
    }

    /// Get the value at a specific grid coordinate.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.rows() || col >= self.cols() {
            return None;
        }
        Some(self.data[row * self.cols() + col])
    }

    /// Transform from pixel to geographic coordinates for this grid.
    pub fn geotransform(&self) -> GeoTransform {
        GeoTransform::from_extent(&self.extent, &self.resolution)
    }

    /// Largest non-NaN value, or `None` if every cell is nodata.
    pub fn max_finite(&self) -> Option<f32> {
        self.data
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f32| m.max(v))))
    }

    /// Apply `f` to every cell.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            data: self.data.iter().map(|&v| f(v)).collect(),
            resolution: self.resolution,
            extent: self.extent,
            source: self.source.clone(),
        }
    }

    /// Cell-wise sum. Both grids must share extent and shape.
    pub fn add(&self, other: &RasterGrid) -> Result<RasterGrid> {
        self.zip_with(other, |a, b| a + b)
    }

    /// Cell-wise product. Both grids must share extent and shape.
    pub fn mul(&self, other: &RasterGrid) -> Result<RasterGrid> {
        self.zip_with(other, |a, b| a * b)
    }

    /// Add a constant to every cell.
    pub fn add_scalar(&self, value: f32) -> RasterGrid {
        self.map(|v| v + value)
    }

    /// Multiply every cell by a constant.
    pub fn mul_scalar(&self, value: f32) -> RasterGrid {
        self.map(|v| v * value)
    }

    fn check_aligned(&self, other: &RasterGrid) -> Result<()> {
        if self.extent != other.extent || self.resolution != other.resolution {
            return Err(GridProcessorError::alignment(
                self.describe(),
                other.describe(),
            ));
        }
        Ok(())
    }

    fn zip_with(&self, other: &RasterGrid, f: impl Fn(f32, f32) -> f32) -> Result<RasterGrid> {
        self.check_aligned(other)?;
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| f(a, b))
            .collect();
        Ok(RasterGrid {
            data,
            resolution: self.resolution,
            extent: self.extent,
            source: None,
        })
    }

    fn describe(&self) -> String {
        format!(
            "{} grid {} over {}",
            self.source.as_deref().unwrap_or("unnamed"),
            self.resolution,
            self.extent.to_bbox_string()
        )
    }
}
