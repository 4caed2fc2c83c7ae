//! Error types for hazard computation and orchestration.

use areas::AreaError;
use event_store::EventStoreError;
use grid_processor::GridProcessorError;
use sources::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HazardError {
    /// A component needs an input nobody registered or produced.
    #[error("{component} requires '{missing}', which is not available")]
    MissingDependency { component: String, missing: String },

    #[error("source '{id}' failed: {source}")]
    Source {
        id: String,
        #[source]
        source: SourceError,
    },

    #[error("hazard index '{id}' failed: {source}")]
    Index {
        id: String,
        #[source]
        source: GridProcessorError,
    },

    #[error("notifier '{name}' failed: {source}")]
    Notifier {
        name: String,
        #[source]
        source: Box<HazardError>,
    },

    #[error("alert delivery via {backend} failed: {message}")]
    Delivery { backend: &'static str, message: String },

    #[error(transparent)]
    Events(#[from] EventStoreError),

    #[error(transparent)]
    Areas(#[from] AreaError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl HazardError {
    pub fn missing(component: impl Into<String>, missing: impl Into<String>) -> Self {
        Self::MissingDependency {
            component: component.into(),
            missing: missing.into(),
        }
    }

    pub fn source(id: impl Into<String>, source: SourceError) -> Self {
        Self::Source { id: id.into(), source }
    }

    pub fn index(id: impl Into<String>, source: GridProcessorError) -> Self {
        Self::Index { id: id.into(), source }
    }

    pub fn delivery(backend: &'static str, message: impl ToString) -> Self {
        Self::Delivery {
            backend,
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HazardError>;
