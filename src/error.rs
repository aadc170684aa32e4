use std::io;
use thiserror::Error;

/// Result type for matrix link operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for matrix link
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    IO(#[from] io::Error),

    /// TCP connect attempt failed
    #[error("Failed to connect to {host}:{port}: {source}")]
    ConnectFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// Write or flush failed on an established connection
    #[error("Write failed: {0}")]
    WriteFailed(#[source] io::Error),

    /// Operation timed out
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Routing index outside the 1-based range
    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    /// Source name that does not name a usable input
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    /// Malformed endpoint string
    #[error("Invalid endpoint: {0}")]
    Endpoint(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

impl Error {
    /// Whether this error came from the transport rather than the request
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::ConnectFailed { .. } | Self::WriteFailed(_) | Self::Timeout(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Deserialize(err.to_string())
    }
}
