//! Concurrent lesson downloading
//!
//! [`LessonDownloader`] wires the pieces of a run together:
//! - [`scheduler`] - bounded launching of workers and first-error selection
//! - [`worker`] - the per-lesson stream, transcode and write pipeline
//! - [`crate::report`] - live progress, running next to the scheduler

mod scheduler;
mod worker;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use scheduler::SchedulerState;

use std::sync::Arc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::progress;
use crate::report::{ReportView, Reporter};
use crate::transcode::{FfmpegTranscoder, TranscodeOptions, Transcoder};
use crate::types::{LessonTask, Lessons};
use scheduler::Scheduler;
use worker::WorkerContext;

/// Downloads a set of lessons concurrently and reports progress while doing so
///
/// Cloning is cheap; all collaborators are shared.
#[derive(Clone)]
pub struct LessonDownloader {
    config: Arc<Config>,
    fetcher: Arc<dyn Fetcher>,
    transcoder: Arc<dyn Transcoder>,
}

impl std::fmt::Debug for LessonDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LessonDownloader")
            .field("config", &self.config)
            .field("fetcher", &self.fetcher.name())
            .field("transcoder", &self.transcoder.name())
            .finish()
    }
}

impl LessonDownloader {
    /// Create a downloader using HTTP and an ffmpeg binary
    ///
    /// The ffmpeg binary is `transcode.ffmpeg_path` if set, otherwise it is
    /// searched in `PATH` (unless `transcode.search_path` is false).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid or no ffmpeg
    /// binary can be found.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(&config.http)?);

        let transcoder: Arc<dyn Transcoder> = if let Some(ref ffmpeg_path) =
            config.transcode.ffmpeg_path
        {
            Arc::new(FfmpegTranscoder::new(ffmpeg_path.clone()))
        } else if config.transcode.search_path {
            Arc::new(FfmpegTranscoder::from_path().ok_or_else(|| Error::Config {
                message: "ffmpeg not found in PATH".to_string(),
                key: Some("transcode.ffmpeg_path".to_string()),
            })?)
        } else {
            return Err(Error::Config {
                message: "no ffmpeg binary configured and PATH search is disabled".to_string(),
                key: Some("transcode.ffmpeg_path".to_string()),
            });
        };

        Self::with_components(config, fetcher, transcoder)
    }

    /// Create a downloader with custom collaborators
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn with_components(
        config: Config,
        fetcher: Arc<dyn Fetcher>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Result<Self> {
        config.validate()?;

        tracing::info!(
            fetcher = fetcher.name(),
            transcoder = transcoder.name(),
            output_dir = %config.output_dir().display(),
            parallelism = config.download.parallelism,
            "Lesson downloader initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            transcoder,
        })
    }

    /// The active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The tasks a run over `lessons` would execute, in launch order
    pub fn tasks(&self, lessons: &Lessons) -> Vec<LessonTask> {
        lessons.to_tasks(self.config.output_dir(), &self.config.transcode.format)
    }

    /// Download, transcode and save every lesson, rendering progress on `view`
    ///
    /// Returns the number of files written. On failure the error of the worker
    /// that failed first is returned, after every started worker has ended;
    /// files of lessons that succeeded stay on disk.
    ///
    /// # Errors
    ///
    /// - [`Error::Scheduling`] if parallelism is 0 (nothing is fetched)
    /// - [`Error::OutputDir`] if the output directory cannot be created
    /// - [`Error::Download`] naming the first lesson that failed
    pub async fn execute<V: ReportView>(&self, lessons: &Lessons, view: V) -> Result<usize> {
        let parallelism = self.config.download.parallelism;
        if parallelism == 0 {
            return Err(Error::Scheduling(
                "parallelism must be at least 1".to_string(),
            ));
        }

        let output_dir = self.config.output_dir();
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|source| Error::OutputDir {
                path: output_dir.to_path_buf(),
                source,
            })?;

        let tasks = self.tasks(lessons);
        let state = Arc::new(SchedulerState::new(tasks.len()));
        let (hub, rx) = progress::channel();

        let reporter = Reporter::new(
            rx,
            Arc::clone(&state),
            &tasks,
            self.config.download.refresh_interval,
            view,
        );

        let ctx = Arc::new(WorkerContext {
            fetcher: Arc::clone(&self.fetcher),
            transcoder: Arc::clone(&self.transcoder),
            options: TranscodeOptions::from(&self.config.transcode),
        });
        let scheduler = Scheduler::new(Arc::clone(&state), ctx, hub);

        let run = async {
            let result = scheduler.run_all(tasks, parallelism).await;
            // Make sure the reporter stops even if the scheduler bailed out early
            if result.is_err() {
                state.mark_failed();
            }
            result
        };

        let (result, _view) = tokio::join!(run, reporter.run());
        tracing::debug!(
            peak_in_flight = state.peak_in_flight(),
            finished = state.overall().finished_tasks,
            "Run finished"
        );
        result
    }
}
