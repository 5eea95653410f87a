//! Traits and types for audio re-encoding

use async_trait::async_trait;

use crate::config::TranscodeConfig;
use crate::error::TranscodeError;

/// Target encoding for a transcode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeOptions {
    /// Target container format (e.g. "mp3")
    pub format: String,
    /// VBR quality index, 0 is best
    pub quality: u8,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self::from(&TranscodeConfig::default())
    }
}

impl From<&TranscodeConfig> for TranscodeOptions {
    fn from(config: &TranscodeConfig) -> Self {
        Self {
            format: config.format.clone(),
            quality: config.quality,
        }
    }
}

/// Trait for re-encoding a complete audio buffer
///
/// Implementations must not touch the filesystem: the worker owns the
/// destination file and writes the returned bytes itself.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Decode `input` and re-encode it with the given options
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input is not a decodable audio container
    /// - The encoder rejects the requested quality
    /// - The encoder cannot be executed (for CLI implementations)
    async fn transcode(
        &self,
        input: Vec<u8>,
        options: &TranscodeOptions,
    ) -> Result<Vec<u8>, TranscodeError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
