//! Reprojection and resampling of raster grids.

pub mod interpolation;
pub mod reproject;

pub use interpolation::{bilinear_interpolate, cubic_interpolate, nearest_interpolate, sample};
pub use reproject::{crop, warp, SourceRaster, WarpTarget};
