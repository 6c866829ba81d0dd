use std::{fmt, io, path::PathBuf};

use thiserror::Error;

/// Why a raw record did not decode into an event
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty record")]
    Empty,
    #[error("record matches neither the json nor the compact grammar")]
    UnrecognizedFormat,
    #[error("json decode error: {0}")]
    Json(String),
    #[error("malformed compact record: {0}")]
    Malformed(String),
    #[error("invalid number in field '{field}': {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("unknown event code: {0}")]
    UnknownEventCode(u32),
    #[error("unknown info code: {0}")]
    UnknownInfoCode(u32),
    #[error("record carries more than one payload field")]
    AmbiguousPayload,
}

pub type ParseResult<T> = Result<T, ParseError>;

impl ParseError {
    pub fn malformed(details: impl fmt::Display) -> Self {
        Self::Malformed(details.to_string())
    }

    pub fn invalid_number(field: &'static str, value: &str) -> Self {
        Self::InvalidNumber {
            field,
            value: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        ParseError::Json(err.to_string())
    }
}

/// Failure handing a report to a renderer
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("report serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl SinkError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
