//! Error types for the Brick client

use thiserror::Error;

/// Result type alias using Brick's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in the Brick client
#[derive(Error, Debug)]
pub enum Error {
    /// Connection refused, DNS failure, timeout, or a body that stopped mid-read
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered outside the 2xx range
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Status code carried by an HTTP error
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a retry could plausibly succeed.
    ///
    /// Transport failures, unreadable upload files, request timeouts,
    /// rate limiting and server-side errors qualify. Any other 4xx is the
    /// server rejecting the request itself and will not change on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Io(_) => true,
            Self::Http { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
