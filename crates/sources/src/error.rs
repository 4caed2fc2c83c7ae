//! Error types for source adapters.

use flood_common::{FloodError, Resolution};
use grid_processor::GridProcessorError;
use projection::ProjectionError;
use storage::StorageError;
use thiserror::Error;

/// Errors raised while fetching or preparing a source raster.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Non-success HTTP status.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// Connection, timeout or body read failure.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The response body could not be decoded.
    #[error("failed to decode {what}: {message}")]
    Decode { what: String, message: String },

    /// The request needs more pixels than the provider serves.
    #[error("requested resolution {requested} exceeds provider maximum {max}")]
    ResolutionTooLarge {
        requested: Resolution,
        max: Resolution,
    },

    /// Source configuration or request parameters are invalid.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Geometry(#[from] FloodError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error(transparent)]
    Grid(#[from] GridProcessorError),

    #[error(transparent)]
    Cache(#[from] StorageError),
}

impl SourceError {
    pub fn decode(what: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            what: what.into(),
            message: message.to_string(),
        }
    }

    pub fn transport(url: impl Into<String>, err: impl ToString) -> Self {
        Self::Transport {
            url: url.into(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SourceError>;
