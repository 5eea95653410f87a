//! Error types for boyadl
//!
//! This module provides the error taxonomy used across the library:
//! - Per-stage errors for a single lesson (transfer, transcode, filesystem)
//! - Lesson-list scraping errors
//! - The top-level [`Error`] that carries the failing lesson's name

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for boyadl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for boyadl
///
/// Task-level failures are wrapped in [`Error::Download`] together with the
/// lesson they belong to, so a caller can always say which lesson failed.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "parallelism")
        key: Option<String>,
    },

    /// Invalid scheduling parameters, raised before any worker starts
    #[error("scheduling error: {0}")]
    Scheduling(String),

    /// The lesson list could not be extracted from the listing page
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    /// A lesson failed to download, transcode or persist
    #[error("lesson '{lesson}' failed ({}): {source}", .source.kind())]
    Download {
        /// Name of the failing lesson
        lesson: String,
        /// What went wrong
        #[source]
        source: DownloadError,
    },

    /// The output directory could not be created
    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        /// The directory that was requested
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error outside of a lesson transfer (e.g. fetching the listing page)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a task-level error with the lesson it belongs to
    pub fn download(lesson: impl Into<String>, source: DownloadError) -> Self {
        Error::Download {
            lesson: lesson.into(),
            source,
        }
    }

    /// Name of the failing lesson, if this error belongs to one
    pub fn lesson(&self) -> Option<&str> {
        match self {
            Error::Download { lesson, .. } => Some(lesson),
            _ => None,
        }
    }
}

/// Terminal failure of a single lesson's worker
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network failure while streaming the lesson audio
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// The downloaded audio could not be re-encoded
    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    /// The encoded file could not be written to its destination
    #[error("failed to write {path}: {source}")]
    Filesystem {
        /// The path that could not be written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The worker stopped without producing an outcome (panic or runtime shutdown)
    #[error("worker aborted: {0}")]
    Aborted(String),
}

impl DownloadError {
    /// Short machine-readable name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            DownloadError::Transfer(_) => "transfer",
            DownloadError::Transcode(_) => "transcode",
            DownloadError::Filesystem { .. } => "filesystem",
            DownloadError::Aborted(_) => "aborted",
        }
    }
}

/// Errors raised while streaming bytes from the source URL
#[derive(Debug, Error)]
pub enum TransferError {
    /// The connection could not be established or the request could not be sent
    #[error("failed to connect to {url}: {reason}")]
    Connect {
        /// Requested URL
        url: String,
        /// The reason reported by the HTTP client
        reason: String,
    },

    /// The server answered with a non-success status
    #[error("server returned HTTP {status} for {url}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The stream broke off mid-body
    #[error("transfer from {url} interrupted: {reason}")]
    Interrupted {
        /// Requested URL
        url: String,
        /// The reason reported by the HTTP client
        reason: String,
    },

    /// The body ended before (or after) the declared Content-Length
    #[error("transfer from {url} incomplete: expected {expected} bytes, received {received}")]
    Incomplete {
        /// Requested URL
        url: String,
        /// Declared size in bytes
        expected: u64,
        /// Bytes actually received
        received: u64,
    },
}

/// Errors raised while re-encoding a downloaded buffer
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// The encoder binary could not be found or executed
    #[error("transcoder unavailable: {0}")]
    ToolUnavailable(String),

    /// The requested quality is outside the encoder's accepted range
    #[error("quality {quality} is not accepted by the {format} encoder (expected 0..={max})")]
    InvalidQuality {
        /// Target format
        format: String,
        /// Requested quality
        quality: u8,
        /// Highest accepted value
        max: u8,
    },

    /// The encoder rejected the input (not decodable audio, unsupported codec, ...)
    #[error("encoder rejected input: {0}")]
    Rejected(String),

    /// The encoder exited successfully but produced no data
    #[error("encoder produced no output")]
    EmptyOutput,
}

/// Errors raised while extracting the lesson list from a listing page
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The page carries no lesson payload
    #[error("list of lessons not found")]
    NotFound,

    /// The page carries several candidate payloads
    #[error("ambiguous list of lessons ({count} candidates)")]
    Ambiguous {
        /// Number of candidate payloads found
        count: usize,
    },

    /// The payload is not the expected JSON document
    #[error("invalid lesson payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
}
