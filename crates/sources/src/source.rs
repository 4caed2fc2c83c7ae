//! The capability shared by every raster provider.

use async_trait::async_trait;
use flood_common::{Extent, Resolution};
use grid_processor::RasterGrid;

use crate::Result;

/// A remote raster provider.
///
/// `fetch_data` returns a grid in EPSG:32662 with exactly `resolution` cells,
/// tagged with [`Source::provides`] and carrying `extent` in degrees.
#[async_trait]
pub trait Source: Send + Sync {
    /// Identifier of the data this source produces.
    fn provides(&self) -> &str;

    /// Largest request, in source pixels, the provider will serve.
    fn max_resolution(&self) -> Resolution;

    /// Fetch data covering `extent` (degrees) resampled to `resolution`.
    async fn fetch_data(&self, extent: &Extent, resolution: Resolution) -> Result<RasterGrid>;
}
