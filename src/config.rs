//! Configuration types for boyadl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Highest VBR quality index accepted by the mp3 encoder (0 = best)
pub const MAX_MP3_QUALITY: u8 = 9;

/// Download behavior configuration (output directory, concurrency, display cadence)
///
/// Used as a flattened sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Output directory (default: ".")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Maximum number of lessons downloaded at the same time (default: 4)
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Interval between progress display refreshes (default: 250ms)
    #[serde(default = "default_refresh_interval", with = "duration_millis_serde")]
    pub refresh_interval: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            parallelism: default_parallelism(),
            refresh_interval: default_refresh_interval(),
        }
    }
}

/// Audio re-encoding settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TranscodeConfig {
    /// Path to the ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for ffmpeg if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Target container format, also used as the output file extension (default: "mp3")
    #[serde(default = "default_format")]
    pub format: String,

    /// VBR quality index, 0 is best (default: 0)
    #[serde(default)]
    pub quality: u8,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            search_path: true,
            format: default_format(),
            quality: 0,
        }
    }
}

/// HTTP client settings shared by the page fetch and lesson transfers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// TCP connect timeout (default: 30s)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

/// Main configuration for [`LessonDownloader`](crate::LessonDownloader)
///
/// Download settings are flattened so the common keys (`output_dir`,
/// `parallelism`) sit at the top level of a config file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Output directory, concurrency and display cadence
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// Re-encoding settings
    #[serde(default)]
    pub transcode: TranscodeConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    /// Load a configuration from a JSON file, filling missing keys with defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Output directory
    pub fn output_dir(&self) -> &Path {
        &self.download.output_dir
    }

    /// Check the settings that would otherwise fail deep inside a run
    ///
    /// Parallelism is not checked here; the scheduler rejects it when a run starts.
    pub fn validate(&self) -> Result<()> {
        if self.download.refresh_interval.is_zero() {
            return Err(Error::Config {
                message: "refresh_interval must be greater than zero".to_string(),
                key: Some("refresh_interval".to_string()),
            });
        }
        if self.transcode.format.is_empty()
            || !self
                .transcode
                .format
                .chars()
                .all(|c| c.is_ascii_alphanumeric())
        {
            return Err(Error::Config {
                message: format!("invalid target format '{}'", self.transcode.format),
                key: Some("transcode.format".to_string()),
            });
        }
        if self.transcode.quality > MAX_MP3_QUALITY {
            return Err(Error::Config {
                message: format!(
                    "quality must be between 0 and {}, got {}",
                    MAX_MP3_QUALITY, self.transcode.quality
                ),
                key: Some("transcode.quality".to_string()),
            });
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_parallelism() -> usize {
    4
}

fn default_refresh_interval() -> Duration {
    Duration::from_millis(250)
}

fn default_format() -> String {
    "mp3".to_string()
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Millisecond Duration serialization helper (sub-second display cadence)
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
