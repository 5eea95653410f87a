//! Shared fakes for exercising downloads without network or ffmpeg.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use crate::config::Config;
use crate::downloader::LessonDownloader;
use crate::error::{TranscodeError, TransferError};
use crate::fetcher::{Fetcher, Transfer};
use crate::report::{ReportFrame, ReportOutcome, ReportView};
use crate::transcode::{TranscodeOptions, Transcoder};
use crate::types::Lessons;

/// Ordered record of what the fakes were asked to do, shared between them
#[derive(Clone, Debug, Default)]
pub(crate) struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub(crate) fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }
}

/// How a [`StaticFetcher`] serves one URL
#[derive(Clone, Debug, Default)]
pub(crate) struct Resource {
    pub(crate) chunks: Vec<Vec<u8>>,
    /// Declared size; `None` serves the body without a size
    pub(crate) declared: Option<u64>,
    /// Pause before every chunk
    pub(crate) delay: Duration,
    /// Break the stream after this many chunks
    pub(crate) fail_after: Option<usize>,
    /// Refuse the connection
    pub(crate) refuse: bool,
}

impl Resource {
    /// A body served in `chunk_count` equal chunks with a correct declared size
    pub(crate) fn body(body: &[u8], chunk_count: usize) -> Self {
        let size = body.len().div_ceil(chunk_count.max(1)).max(1);
        Self {
            chunks: body.chunks(size).map(<[u8]>::to_vec).collect(),
            declared: Some(body.len() as u64),
            ..Self::default()
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn undeclared(mut self) -> Self {
        self.declared = None;
        self
    }

    pub(crate) fn failing_after(mut self, chunks: usize) -> Self {
        self.fail_after = Some(chunks);
        self
    }

    pub(crate) fn refused() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }
}

/// In-memory [`Fetcher`] serving canned bodies keyed by URL
#[derive(Clone, Debug, Default)]
pub(crate) struct StaticFetcher {
    resources: HashMap<String, Resource>,
    log: EventLog,
}

impl StaticFetcher {
    pub(crate) fn new(log: EventLog) -> Self {
        Self {
            resources: HashMap::new(),
            log,
        }
    }

    pub(crate) fn serve(mut self, url: &str, resource: Resource) -> Self {
        self.resources.insert(url.to_string(), resource);
        self
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Transfer, TransferError> {
        self.log.push(format!("open:{url}"));

        let Some(resource) = self.resources.get(url).cloned() else {
            return Err(TransferError::Status {
                url: url.to_string(),
                status: 404,
            });
        };
        if resource.refuse {
            return Err(TransferError::Connect {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }

        let mut items: Vec<Result<Bytes, TransferError>> = resource
            .chunks
            .into_iter()
            .map(|chunk| Ok(Bytes::from(chunk)))
            .collect();
        if let Some(n) = resource.fail_after {
            items.truncate(n);
            items.push(Err(TransferError::Interrupted {
                url: url.to_string(),
                reason: "connection reset".to_string(),
            }));
        }

        let delay = resource.delay;
        let chunks = futures::stream::iter(items)
            .then(move |item| async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                item
            })
            .boxed();

        Ok(Transfer {
            total: resource.declared,
            chunks,
        })
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// [`Transcoder`] that prefixes its input with `MP3:` and logs the body it saw
#[derive(Clone, Debug, Default)]
pub(crate) struct TaggingTranscoder {
    pub(crate) log: EventLog,
    pub(crate) delay: Duration,
}

#[async_trait]
impl Transcoder for TaggingTranscoder {
    async fn transcode(
        &self,
        input: Vec<u8>,
        _options: &TranscodeOptions,
    ) -> Result<Vec<u8>, TranscodeError> {
        self.log
            .push(format!("transcode:{}", String::from_utf8_lossy(&input)));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let mut output = b"MP3:".to_vec();
        output.extend_from_slice(&input);
        Ok(output)
    }

    fn name(&self) -> &'static str {
        "tagging"
    }
}

/// [`Transcoder`] that rejects inputs containing a marker and tags the rest
#[derive(Clone, Debug)]
pub(crate) struct RejectingTranscoder {
    pub(crate) marker: &'static str,
}

#[async_trait]
impl Transcoder for RejectingTranscoder {
    async fn transcode(
        &self,
        input: Vec<u8>,
        _options: &TranscodeOptions,
    ) -> Result<Vec<u8>, TranscodeError> {
        if String::from_utf8_lossy(&input).contains(self.marker) {
            return Err(TranscodeError::Rejected("invalid data found".to_string()));
        }
        let mut output = b"MP3:".to_vec();
        output.extend_from_slice(&input);
        Ok(output)
    }

    fn name(&self) -> &'static str {
        "rejecting"
    }
}

/// [`Transcoder`] that panics, to exercise worker isolation
#[derive(Clone, Debug)]
pub(crate) struct PanickingTranscoder;

#[async_trait]
impl Transcoder for PanickingTranscoder {
    async fn transcode(
        &self,
        _input: Vec<u8>,
        _options: &TranscodeOptions,
    ) -> Result<Vec<u8>, TranscodeError> {
        panic!("decoder blew up");
    }

    fn name(&self) -> &'static str {
        "panicking"
    }
}

/// [`ReportView`] that keeps every frame it was asked to draw
#[derive(Debug, Default)]
pub(crate) struct RecordingView {
    pub(crate) frames: Vec<ReportFrame>,
    pub(crate) outcome: Option<ReportOutcome>,
}

impl ReportView for RecordingView {
    fn render(&mut self, frame: &ReportFrame) {
        self.frames.push(frame.clone());
    }

    fn finish(&mut self, outcome: ReportOutcome) {
        assert!(self.outcome.is_none(), "finish must be called once");
        self.outcome = Some(outcome);
    }
}

/// Config writing into `output_dir` with a fast refresh
pub(crate) fn test_config(output_dir: &Path, parallelism: usize) -> Config {
    let mut config = Config::default();
    config.download.output_dir = output_dir.to_path_buf();
    config.download.parallelism = parallelism;
    config.download.refresh_interval = Duration::from_millis(5);
    config
}

/// Downloader over the given fakes
pub(crate) fn create_test_downloader(
    output_dir: &Path,
    parallelism: usize,
    fetcher: impl Fetcher + 'static,
    transcoder: impl Transcoder + 'static,
) -> LessonDownloader {
    LessonDownloader::with_components(
        test_config(output_dir, parallelism),
        Arc::new(fetcher),
        Arc::new(transcoder),
    )
    .unwrap()
}

/// `n` lessons named `Lesson 1..=n` at `http://audio.test/<i>.m4a`
pub(crate) fn numbered_lessons(n: usize) -> Lessons {
    (1..=n)
        .map(|i| (format!("Lesson {i}"), lesson_url(i)))
        .collect()
}

pub(crate) fn lesson_url(i: usize) -> String {
    format!("http://audio.test/{i}.m4a")
}
