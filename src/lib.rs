//! # boyadl
//!
//! Bulk downloader for the audio lessons that accompany a textbook.
//!
//! A book's listing page embeds the list of its lessons. boyadl extracts that
//! list, streams every lesson's audio concurrently with a bounded number of
//! workers, re-encodes each one to VBR mp3 and writes one file per lesson,
//! while a live view shows per-file and overall progress.
//!
//! ## Quick Start
//!
//! ```no_run
//! use boyadl::{Config, HttpFetcher, LessonDownloader, LogView, catalog};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.download.output_dir = "lessons".into();
//!     config.download.parallelism = 4;
//!
//!     let http = HttpFetcher::new(&config.http)?;
//!     let lessons = catalog::fetch_lessons(http.client(), "https://example.com/book/1").await?;
//!
//!     let downloader = LessonDownloader::new(config)?;
//!     let written = downloader.execute(&lessons, LogView::new()).await?;
//!     println!("Downloaded {} mp3 files", written);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Lesson list extraction
pub mod catalog;
/// Configuration types
pub mod config;
/// Concurrent download orchestration
pub mod downloader;
/// Error types
pub mod error;
/// Streaming HTTP transfers
pub mod fetcher;
/// Worker-to-reporter progress messages
pub mod progress;
/// Live progress rendering
pub mod report;
/// Audio re-encoding
pub mod transcode;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, DownloadConfig, HttpConfig, TranscodeConfig};
pub use downloader::{LessonDownloader, SchedulerState};
pub use error::{DownloadError, Error, Result, ScrapeError, TranscodeError, TransferError};
pub use fetcher::{Fetcher, HttpFetcher, Transfer};
pub use report::{
    IndicatifView, LogView, ReportFrame, ReportOutcome, ReportView, Reporter, SuspendingWriter,
    TaskRow,
};
pub use transcode::{FfmpegTranscoder, TranscodeOptions, Transcoder};
pub use types::{Lesson, LessonTask, Lessons, OverallState, ProgressSample, TaskId};
