//! Error types for the S3 browser core crate.
//!
//! Navigation failures are recoverable by design: the controller turns them
//! into an [`ErrorInfo`] stored in the directory state instead of bubbling
//! them up to the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for operations outside the navigation state machine
/// (configuration loading and the like).
#[derive(Error, Debug)]
pub enum CoreError {
    /// A listing request failed.
    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    /// A configuration error (invalid values, missing fields, parse failures).
    #[error("Config error: {0}")]
    Config(String),

    /// A low-level I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for errors that don't fit other categories.
    #[error("{0}")]
    Other(String),
}

/// Errors raised while fetching a directory listing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    /// The request never completed (connection refused, DNS, offline, ...).
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The backend answered, but the body was not a valid listing.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Category of a navigation failure, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Network,
    Status,
    Malformed,
}

/// Structured, serializable description of the last navigation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
}

impl From<&NavigationError> for ErrorInfo {
    fn from(err: &NavigationError) -> Self {
        match err {
            NavigationError::Network(msg) => ErrorInfo {
                kind: ErrorKind::Network,
                status: None,
                message: msg.clone(),
            },
            NavigationError::Status { status, message } => ErrorInfo {
                kind: ErrorKind::Status,
                status: Some(*status),
                message: message.clone(),
            },
            NavigationError::Malformed(msg) => ErrorInfo {
                kind: ErrorKind::Malformed,
                status: None,
                message: msg.clone(),
            },
        }
    }
}
