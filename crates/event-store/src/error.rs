//! Error types for the DIBI client.

use sources::SourceError;
use thiserror::Error;

/// A DIBI row that does not have the expected shape.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("invalid value {value} for '{field}': {reason}")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: String,
    },
}

impl ParseError {
    pub fn invalid(field: &'static str, value: impl ToString, reason: impl ToString) -> Self {
        Self::InvalidField {
            field,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error(transparent)]
    Fetch(#[from] SourceError),

    #[error("row {row}: {source}")]
    Parse {
        row: usize,
        #[source]
        source: ParseError,
    },

    #[error("event {incident_id} detail page has no '{field}' input")]
    MissingDetail { incident_id: u64, field: &'static str },

    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

pub type Result<T> = std::result::Result<T, EventStoreError>;
