//! Error types for the shared geometry model.

use thiserror::Error;

/// Result type alias using FloodError.
pub type FloodResult<T> = Result<T, FloodError>;

/// Validation errors for extents, resolutions and CRS identifiers.
#[derive(Debug, Error, PartialEq)]
pub enum FloodError {
    #[error("Invalid extent: {0}")]
    InvalidExtent(String),

    #[error("Invalid resolution: {0}")]
    InvalidResolution(String),

    #[error("Raster shape {actual_rows}x{actual_cols} does not match resolution {rows}x{cols}")]
    ShapeMismatch {
        rows: usize,
        cols: usize,
        actual_rows: usize,
        actual_cols: usize,
    },

    #[error("Raster has {actual} values, resolution {rows}x{cols} needs {expected}")]
    LengthMismatch {
        rows: usize,
        cols: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid bbox string '{0}'. Expected 'minx,miny,maxx,maxy'")]
    InvalidBbox(String),

    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),
}
