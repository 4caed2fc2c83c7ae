//! Raster warping between coordinate reference systems.
//!
//! The warp loops over destination pixel centres, maps each one back into the
//! source CRS and samples the source grid there. Destination pixels that map
//! outside the source grid, or whose transform fails, are NaN.

use flood_common::{CrsCode, Extent, GeoTransform, Resolution};
use projection::transform_point;
use rayon::prelude::*;
use tracing::debug;

use super::interpolation::sample;
use crate::{GridProcessorError, ResamplingMethod, Result};

/// A north-up source raster in its native CRS.
#[derive(Debug, Clone, Copy)]
pub struct SourceRaster<'a> {
    /// Row-major values, row 0 northernmost.
    pub data: &'a [f32],
    pub resolution: Resolution,
    pub crs: CrsCode,
    /// Extent in `crs` units.
    pub extent: Extent,
}

/// The grid a warp writes into.
#[derive(Debug, Clone, Copy)]
pub struct WarpTarget {
    pub crs: CrsCode,
    /// Extent in `crs` units.
    pub extent: Extent,
    pub resolution: Resolution,
}

/// Warp `source` onto `target`, returning `target.resolution.len()` values in
/// row-major order.
///
/// # Arguments
/// * `source` - Source data with its CRS, extent and shape
/// * `target` - Destination CRS, extent (in destination units) and shape
/// * `method` - Resampling method
///
/// # Errors
/// Fails only when `source.data` does not match `source.resolution`. A target
/// that does not overlap the source yields an all-NaN result.
pub fn warp(source: &SourceRaster<'_>, target: &WarpTarget, method: ResamplingMethod) -> Result<Vec<f32>> {
    source.resolution.check_len(source.data.len())?;

    let src_gt = GeoTransform::from_extent(&source.extent, &source.resolution);
    let dst_gt = GeoTransform::from_extent(&target.extent, &target.resolution);
    let src_width = source.resolution.cols();
    let src_height = source.resolution.rows();
    let dst_width = target.resolution.cols();

    debug!(
        src_crs = %source.crs,
        dst_crs = %target.crs,
        src = %source.resolution,
        dst = %target.resolution,
        %method,
        "Warping raster"
    );

    let mut output = vec![f32::NAN; target.resolution.len()];
    output
        .par_chunks_mut(dst_width)
        .enumerate()
        .for_each(|(row, out_row)| {
            for (col, out) in out_row.iter_mut().enumerate() {
                let (x, y) = dst_gt.pixel_center(row, col);
                let Ok((sx, sy)) = transform_point(target.crs, source.crs, x, y) else {
                    continue;
                };
                let (src_col, src_row) = src_gt.world_to_pixel(sx, sy);
                *out = sample(method, source.data, src_width, src_height, src_col, src_row);
            }
        });

    Ok(output)
}

/// Crop a window out of a row-major grid.
///
/// `row_range` and `col_range` are half-open and must lie inside the grid.
pub fn crop(
    data: &[f32],
    resolution: &Resolution,
    row_range: std::ops::Range<usize>,
    col_range: std::ops::Range<usize>,
) -> Result<Vec<f32>> {
    resolution.check_len(data.len())?;
    if row_range.is_empty()
        || col_range.is_empty()
        || row_range.end > resolution.rows()
        || col_range.end > resolution.cols()
    {
        return Err(GridProcessorError::warp(format!(
            "crop window rows {:?} cols {:?} outside grid {}",
            row_range, col_range, resolution
        )));
    }

    let cols = resolution.cols();
    let mut out = Vec::with_capacity(row_range.len() * col_range.len());
    for row in row_range {
        out.extend_from_slice(&data[row * cols + col_range.start..row * cols + col_range.end]);
    }
    Ok(out)
}
