//! Capture errors

use crate::value::{ErrorValue, Value};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("depth out of range: {0}")]
    OutOfRange(f64),

    #[error("no object named \"{0}\" in scope")]
    MissingTarget(String),

    #[error("\"{0}\" is not an object")]
    NotAnObject(String),

    #[error("member not found: {0}")]
    MissingMember(String),

    #[error("member \"{0}\" is not callable")]
    NotCallable(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CaptureError {
    /// The error a page script observes when this is thrown across the
    /// publication boundary.
    pub fn to_thrown(&self) -> Value {
        let error = match self {
            CaptureError::OutOfRange(_) => ErrorValue::range_error(self.to_string()),
            _ => ErrorValue::type_error(self.to_string()),
        };
        Value::Error(error)
    }
}

impl From<serde_json::Error> for CaptureError {
    fn from(e: serde_json::Error) -> Self {
        CaptureError::Config(e.to_string())
    }
}
