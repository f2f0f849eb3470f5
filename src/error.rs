//! Error types for the export pipeline

use thiserror::Error;

/// Result type alias for export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while snapshotting, capturing or packaging
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or unusable capture target, or an otherwise invalid argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Rasterization failed (unsupported color, undecodable image, empty surface)
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// A data URI payload that is not valid base64
    #[error("Malformed data URI payload: {0}")]
    MalformedPayload(String),

    /// Another capture is still running on the same driver
    #[error("A capture is already in progress")]
    CaptureInProgress,

    /// Network error while fetching a remote resource
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The upload endpoint rejected the request
    #[error("Upload failed ({status}): {message}")]
    UploadError { status: u16, message: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "remote")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}
