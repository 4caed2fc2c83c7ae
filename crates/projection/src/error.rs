//! Projection error types.

use flood_common::{CrsCode, FloodError};
use thiserror::Error;

pub type ProjectionResult<T> = Result<T, ProjectionError>;

#[derive(Debug, Error, PartialEq)]
pub enum ProjectionError {
    /// The point cannot be represented in the target CRS.
    #[error("Point ({x}, {y}) is outside the domain of {crs}")]
    OutOfDomain { crs: CrsCode, x: f64, y: f64 },

    /// Corner transform produced an empty or inverted rectangle.
    #[error("Reprojected extent is invalid: {0}")]
    InvalidExtent(#[from] FloodError),
}
