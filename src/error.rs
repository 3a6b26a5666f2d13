//! Error types for the panowall library.

use thiserror::Error;

/// Errors that can occur while scanning folders or transferring files.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request error, including non-success status codes.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The URL could not be parsed or does not name a file.
    #[error("Invalid URL: {url}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
    },

    /// The transfer was aborted by a cancellation request.
    #[error("Transfer cancelled")]
    Cancelled,
}

/// A specialized `Result` type for panowall operations.
pub type Result<T> = std::result::Result<T, Error>;
