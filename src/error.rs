//! Error types for the Riak HTTP client

use thiserror::Error;

/// Errors that can occur when talking to a Riak node
#[derive(Error, Debug)]
pub enum Error {
    /// Key was empty or otherwise unusable; nothing was sent
    #[error("Invalid key: {0:?}")]
    InvalidKey(String),

    /// Malformed argument (batch input, configuration, index name)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O or connection failure reported by the transport
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Transport-imposed deadline elapsed
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// Riak answered with a status the operation does not handle
    #[error("riak returned status code: {status}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL could not be built from the configuration and key
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A header name or value could not be represented on the wire
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

impl Error {
    /// Returns the HTTP status carried by [`Error::UnexpectedStatus`]
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::UnexpectedStatus { status } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;
