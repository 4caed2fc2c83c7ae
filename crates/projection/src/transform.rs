//! CRS-to-CRS transforms.

use flood_common::{CrsCode, Extent};

use crate::{
    Geographic, PlateCarree, ProjectionError, ProjectionResult, WebMercator, WorldMercator,
};

/// A map projection with a forward and an inverse transform.
///
/// `project` takes longitude/latitude in degrees and returns CRS units;
/// `unproject` is the inverse. Both fail with
/// [`ProjectionError::OutOfDomain`] for points the CRS cannot represent.
pub trait Projection: Send + Sync {
    fn crs(&self) -> CrsCode;

    fn project(&self, lon: f64, lat: f64) -> ProjectionResult<(f64, f64)>;

    fn unproject(&self, x: f64, y: f64) -> ProjectionResult<(f64, f64)>;
}

/// Look up the projection implementing `crs`.
pub fn projection_for(crs: CrsCode) -> &'static dyn Projection {
    match crs {
        CrsCode::Epsg4326 => &Geographic,
        CrsCode::Epsg32662 => &PlateCarree,
        CrsCode::Epsg3857 => &WebMercator,
        CrsCode::Epsg3395 => &WorldMercator,
    }
}

/// Transform a single point from `src` to `dst`, going through geographic
/// coordinates.
pub fn transform_point(src: CrsCode, dst: CrsCode, x: f64, y: f64) -> ProjectionResult<(f64, f64)> {
    if src == dst {
        return Ok((x, y));
    }
    let (lon, lat) = projection_for(src).unproject(x, y)?;
    projection_for(dst).project(lon, lat)
}

/// Reproject an extent by transforming its lower-left and upper-right
/// corners independently.
///
/// This is not a full polygon reprojection. It is exact only for CRSs that
/// keep axis-aligned rectangles axis-aligned, which holds for every CRS in
/// [`CrsCode`].
pub fn reproject_extent(extent: &Extent, src: CrsCode, dst: CrsCode) -> ProjectionResult<Extent> {
    if src == dst {
        return Ok(*extent);
    }
    let (x_min, y_min) = transform_point(src, dst, extent.lon_min(), extent.lat_min())?;
    let (x_max, y_max) = transform_point(src, dst, extent.lon_max(), extent.lat_max())?;
    Extent::new(x_min, x_max, y_min, y_max).map_err(ProjectionError::from)
}
