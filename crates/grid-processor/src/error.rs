//! Error types for grid processing.

use flood_common::FloodError;
use projection::ProjectionError;
use thiserror::Error;

/// Errors that can occur during grid processing.
#[derive(Error, Debug, PartialEq)]
pub enum GridProcessorError {
    /// Two grids combined arithmetically do not share extent and shape.
    #[error("alignment error: {left} vs {right}")]
    Alignment { left: String, right: String },

    /// Data length or shape disagrees with the declared resolution.
    #[error("invalid grid: {0}")]
    InvalidGrid(#[from] FloodError),

    /// Projection error.
    #[error("projection error: {0}")]
    Projection(#[from] ProjectionError),

    /// Warp could not be set up.
    #[error("warp error: {0}")]
    Warp(String),
}

impl GridProcessorError {
    /// Create an Alignment error from two grid descriptions.
    pub fn alignment(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self::Alignment {
            left: left.into(),
            right: right.into(),
        }
    }

    /// Create a Warp error.
    pub fn warp(msg: impl Into<String>) -> Self {
        Self::Warp(msg.into())
    }
}

/// Result type for grid processor operations.
pub type Result<T> = std::result::Result<T, GridProcessorError>;
