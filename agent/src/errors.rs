//! Error types for the caching agent.

use thiserror::Error;

use crate::lifecycle::LifecycleState;

/// Failures of the cache storage backend.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Bucket ids double as file names on disk.
    #[error("Invalid cache id: {0}")]
    InvalidCacheId(String),

    #[error("Corrupt cache entry in {cache}: {reason}")]
    Corrupt { cache: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A request that never produced a response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Request to {url} failed: {reason}")]
    Failed { url: String, reason: String },

    #[error("Offline")]
    Offline,
}

/// Lifecycle errors of a cache generation.
#[derive(Error, Debug)]
pub enum AgentError {
    /// A manifest asset could not be fetched; the generation is discarded.
    #[error("Install failed for {path}: {reason}")]
    Install { path: String, reason: String },

    #[error("Invalid lifecycle transition: expected {expected:?}, was {actual:?}")]
    InvalidState {
        expected: LifecycleState,
        actual: LifecycleState,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// The agent host task is gone.
    #[error("Agent host stopped")]
    HostClosed,
}

/// What an intercepted request resolves to when no response can be produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("{0}")]
    Network(#[from] NetworkError),

    #[error("Agent host stopped")]
    HostClosed,
}
