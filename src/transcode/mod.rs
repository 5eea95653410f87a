//! Audio re-encoding
//!
//! Downloaded lessons are re-encoded from a complete in-memory buffer. The
//! [`Transcoder`] trait keeps the encoder pluggable:
//!
//! - [`FfmpegTranscoder`]: pipes the buffer through an external `ffmpeg` binary
//!
//! ## Usage
//!
//! ```no_run
//! use boyadl::transcode::{FfmpegTranscoder, TranscodeOptions, Transcoder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transcoder = FfmpegTranscoder::from_path().expect("ffmpeg binary not found");
//!
//!     let raw = std::fs::read("lesson.m4a")?;
//!     let mp3 = transcoder.transcode(raw, &TranscodeOptions::default()).await?;
//!     std::fs::write("lesson.mp3", mp3)?;
//!
//!     Ok(())
//! }
//! ```

mod ffmpeg;
mod traits;

pub use ffmpeg::FfmpegTranscoder;
pub use traits::{TranscodeOptions, Transcoder};
