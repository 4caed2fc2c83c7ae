//! Planning shared by all adapters: what to request from a provider and how
//! to warp it back onto the caller's grid.

use flood_common::{CrsCode, Extent, Resolution};
use grid_processor::{warp, RasterGrid, ResamplingMethod, SourceRaster, WarpTarget};
use projection::reproject_extent;
use tracing::debug;

use crate::{Result, SourceError};

/// Every source is warped into this CRS.
pub const DESTINATION_CRS: CrsCode = CrsCode::Epsg32662;

const TRUNC_EPSILON: f64 = 1e-9;

/// How a provider stores its data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeGrid {
    pub crs: CrsCode,
    /// Cell size of the underlying data in `crs` units, if the provider has one.
    pub data_resolution: Option<f64>,
}

/// What to request from a provider for one `fetch_data` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchPlan {
    /// Requested extent in degrees.
    pub extent: Extent,
    pub resolution: Resolution,
    /// Requested extent in [`DESTINATION_CRS`] units.
    pub dst_extent: Extent,
    pub src_crs: CrsCode,
    /// Requested extent in source units, grown to the data resolution.
    pub src_extent: Extent,
    /// Pixels to request so source pixel density matches the destination.
    pub src_resolution: Resolution,
}

impl FetchPlan {
    /// Build the plan for `extent`/`resolution`.
    pub fn new(native: NativeGrid, extent: &Extent, resolution: Resolution) -> Result<Self> {
        let src_extent = reproject_extent(extent, CrsCode::Epsg4326, native.crs)?;
        let dst_extent = reproject_extent(extent, CrsCode::Epsg4326, DESTINATION_CRS)?;

        // Destination pixel size in source units, measured before growing.
        let (psize_x, psize_y) = src_extent.pixel_size(&resolution);

        let src_extent = match native.data_resolution {
            Some(res) => src_extent.grow_to_resolution(res)?,
            None => src_extent,
        };

        let count = |span: f64, psize: f64| ((span / psize + TRUNC_EPSILON).trunc() as usize).max(1);
        let src_resolution = Resolution::new(
            count(src_extent.height(), psize_y),
            count(src_extent.width(), psize_x),
        )?;

        debug!(
            src_crs = %native.crs,
            src_extent = %src_extent.to_bbox_string(),
            src = %src_resolution,
            dst = %resolution,
            "Planned fetch"
        );

        Ok(Self {
            extent: *extent,
            resolution,
            dst_extent,
            src_crs: native.crs,
            src_extent,
            src_resolution,
        })
    }

    /// Fail if the planned request is larger than the provider serves.
    ///
    /// Only providers that render to the requested pixel size need this;
    /// providers serving their native grid are bounded by that grid.
    pub fn ensure_within(&self, max: Resolution) -> Result<()> {
        if self.src_resolution.rows() > max.rows() || self.src_resolution.cols() > max.cols() {
            return Err(SourceError::ResolutionTooLarge {
                requested: self.src_resolution,
                max,
            });
        }
        Ok(())
    }

    /// Warp fetched source data onto the destination grid and tag it.
    ///
    /// `data` covers `src_extent` (in `self.src_crs` units) with
    /// `src_resolution` cells; adapters that fetch a different window than
    /// planned pass that window here.
    pub fn finish(
        &self,
        data: &[f32],
        src_resolution: Resolution,
        src_extent: Extent,
        method: ResamplingMethod,
        provides: &str,
    ) -> Result<RasterGrid> {
        let source = SourceRaster {
            data,
            resolution: src_resolution,
            crs: self.src_crs,
            extent: src_extent,
        };
        let target = WarpTarget {
            crs: DESTINATION_CRS,
            extent: self.dst_extent,
            resolution: self.resolution,
        };

        let output = warp(&source, &target, method)?;
        Ok(RasterGrid::new(output, self.resolution, self.extent)?.with_source(provides))
    }

    /// An all-NaN grid for requests the provider has no data for.
    pub fn empty(&self, provides: &str) -> RasterGrid {
        RasterGrid::filled(f32::NAN, self.resolution, self.extent).with_source(provides)
    }
}
