//! Single-lesson pipeline: stream, transcode, persist

use std::sync::Arc;

use futures::StreamExt;

use crate::error::{DownloadError, TransferError};
use crate::fetcher::{Fetcher, Transfer};
use crate::progress::ProgressSender;
use crate::transcode::{TranscodeOptions, Transcoder};
use crate::types::LessonTask;
use crate::utils::write_atomically;

/// Upper bound for the buffer reserved up front from a declared size
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

/// Shared collaborators every worker of a run uses
pub(crate) struct WorkerContext {
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) transcoder: Arc<dyn Transcoder>,
    pub(crate) options: TranscodeOptions,
}

/// Download one lesson into memory, re-encode it and write the result
///
/// The destination is only ever created by an atomic rename, so it holds either
/// the complete encoded file or nothing from this run.
pub(crate) async fn run_lesson(
    ctx: &WorkerContext,
    task: &LessonTask,
    mut progress: ProgressSender,
) -> Result<(), DownloadError> {
    tracing::debug!(task_id = %task.id, lesson = %task.name, url = %task.source_url, "Worker started");

    let Transfer { total, mut chunks } = ctx.fetcher.fetch(&task.source_url).await?;
    progress.start(total);

    let capacity = total.unwrap_or(0).min(MAX_PREALLOCATION) as usize;
    let mut buffer = Vec::with_capacity(capacity);
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        buffer.extend_from_slice(&chunk);
        progress.advance(chunk.len() as u64);
    }
    drop(chunks);

    let received = buffer.len() as u64;
    if let Some(expected) = total
        && expected != received
    {
        return Err(TransferError::Incomplete {
            url: task.source_url.clone(),
            expected,
            received,
        }
        .into());
    }
    progress.finish();

    tracing::debug!(
        task_id = %task.id,
        lesson = %task.name,
        bytes = received,
        transcoder = ctx.transcoder.name(),
        "Transfer complete, transcoding"
    );
    let encoded = ctx.transcoder.transcode(buffer, &ctx.options).await?;

    write_atomically(&task.destination_path, &encoded)
        .await
        .map_err(|source| DownloadError::Filesystem {
            path: task.destination_path.clone(),
            source,
        })?;

    tracing::info!(
        task_id = %task.id,
        lesson = %task.name,
        path = %task.destination_path.display(),
        "Lesson saved"
    );
    Ok(())
}
