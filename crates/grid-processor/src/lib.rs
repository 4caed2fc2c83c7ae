//! Raster grids for the flood hazard pipeline.
//!
//! - [`RasterGrid`]: a north-up `f32` raster tied to an extent, with checked
//!   cell-wise arithmetic
//! - [`projection::warp`]: reprojection and resampling between CRSs
//! - [`vectorize`]: turning cells above a threshold into polygons
//!
//! # Example
//!
//! ```ignore
//! use grid_processor::{vectorize, RasterGrid};
//!
//! let hazard = risk.mul_scalar(4.0).add(&rain.mul_scalar(0.8))?;
//! let hot = vectorize(&hazard, 32.0);
//! for cell in hot.iter() {
//!     println!("{} {} {}", cell.row, cell.col, cell.value);
//! }
//! ```

pub mod error;
pub mod projection;
pub mod types;
pub mod vectorize;

// Re-export commonly used types at crate root
pub use error::{GridProcessorError, Result};
pub use projection::{warp, SourceRaster, WarpTarget};
pub use types::{RasterGrid, ResamplingMethod};
pub use vectorize::{vectorize, CellPolygon, HotCells};
