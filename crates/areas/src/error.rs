//! Error types for cadastre loading.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AreaError {
    #[error("failed to read cadastre file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid GeoJSON: {0}")]
    GeoJson(String),

    #[error("feature {index} has no '{property}' property")]
    MissingProperty { index: usize, property: String },

    #[error("feature {index} has no polygon geometry")]
    UnsupportedGeometry { index: usize },

    #[error("unknown administrative level {0}, expected 1, 2 or 3")]
    UnknownLevel(u8),

    #[error("buffer must be a finite, non-negative distance in degrees, got {0}")]
    InvalidBuffer(f64),
}

impl From<geojson::Error> for AreaError {
    fn from(e: geojson::Error) -> Self {
        AreaError::GeoJson(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AreaError>;
