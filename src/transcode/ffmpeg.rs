//! Transcoder backed by an external ffmpeg binary

use super::traits::{TranscodeOptions, Transcoder};
use crate::config::MAX_MP3_QUALITY;
use crate::error::TranscodeError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// CLI-based transcoder using an external `ffmpeg` binary
///
/// The input buffer is piped to ffmpeg's stdin and the encoded file is read
/// back from its stdout, so nothing is staged on disk.
///
/// # Examples
///
/// ```no_run
/// use boyadl::transcode::FfmpegTranscoder;
/// use std::path::PathBuf;
///
/// // Create with explicit path
/// let transcoder = FfmpegTranscoder::new(PathBuf::from("/usr/bin/ffmpeg"));
///
/// // Or auto-discover from PATH
/// let transcoder = FfmpegTranscoder::from_path().expect("ffmpeg not found in PATH");
/// ```
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary_path: PathBuf,
}

impl FfmpegTranscoder {
    /// Create a new transcoder with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find ffmpeg in PATH
    ///
    /// Uses the `which` crate to search for the `ffmpeg` binary in the system PATH.
    pub fn from_path() -> Option<Self> {
        which::which("ffmpeg").ok().map(Self::new)
    }

    /// Path of the binary this transcoder runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    fn arguments(options: &TranscodeOptions) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            // MP4 lessons may keep their index after the sample data, so the
            // demuxer needs to seek back within stdin
            "-read_ahead_limit".to_string(),
            "-1".to_string(),
            "-i".to_string(),
            "cache:pipe:0".to_string(),
            // Drop embedded cover art, lessons are audio only
            "-vn".to_string(),
            "-f".to_string(),
            options.format.clone(),
            "-q:a".to_string(),
            options.quality.to_string(),
            "pipe:1".to_string(),
        ]
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        input: Vec<u8>,
        options: &TranscodeOptions,
    ) -> Result<Vec<u8>, TranscodeError> {
        if options.format == "mp3" && options.quality > MAX_MP3_QUALITY {
            return Err(TranscodeError::InvalidQuality {
                format: options.format.clone(),
                quality: options.quality,
                max: MAX_MP3_QUALITY,
            });
        }

        let input_len = input.len();
        let mut child = Command::new(&self.binary_path)
            .args(Self::arguments(options))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TranscodeError::ToolUnavailable(format!("failed to execute ffmpeg: {}", e)))?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            TranscodeError::ToolUnavailable("ffmpeg stdin was not captured".to_string())
        })?;

        // Feed stdin while stdout is drained, otherwise both pipes can fill up
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        });

        let output = child.wait_with_output().await.map_err(|e| {
            TranscodeError::ToolUnavailable(format!("failed to wait for ffmpeg: {}", e))
        })?;
        let fed = writer.await;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = match stderr.trim() {
                "" => format!("ffmpeg exited with {}", output.status),
                message => message.to_string(),
            };
            return Err(TranscodeError::Rejected(reason));
        }

        match fed {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(TranscodeError::Rejected(format!(
                    "failed to feed input to ffmpeg: {}",
                    e
                )));
            }
            Err(e) => {
                return Err(TranscodeError::Rejected(format!(
                    "input writer stopped: {}",
                    e
                )));
            }
        }

        if output.stdout.is_empty() {
            return Err(TranscodeError::EmptyOutput);
        }

        tracing::debug!(
            input_bytes = input_len,
            output_bytes = output.stdout.len(),
            format = %options.format,
            quality = options.quality,
            "Transcode finished"
        );

        Ok(output.stdout)
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}
