//! Utility functions for file names and atomic file writes

use std::path::{Path, PathBuf};

/// Replacement for characters that are not allowed in file names
const REPLACEMENT_CHAR: char = '_';

/// Suffix of the temporary file an encoded lesson is written to before the rename
const PARTIAL_SUFFIX: &str = ".part";

/// Make a lesson title safe to use as a single file name component
///
/// Path separators, characters reserved on Windows and control characters are
/// replaced with `_`. Leading dots and surrounding whitespace are stripped so the
/// result can neither be hidden nor escape the output directory. An empty
/// result becomes `"lesson"`.
///
/// # Examples
///
/// ```
/// use boyadl::utils::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("第一课 你好"), "第一课 你好");
/// assert_eq!(sanitize_file_name("Unit 1/2: Greetings"), "Unit 1_2_ Greetings");
/// assert_eq!(sanitize_file_name("../secret"), "_secret");
/// ```
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => REPLACEMENT_CHAR,
            c if c.is_control() => REPLACEMENT_CHAR,
            c => c,
        })
        .collect();

    let trimmed = replaced.trim().trim_start_matches('.').trim();
    if trimmed.is_empty() {
        "lesson".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Hidden sibling path a file is staged at before being renamed into place
///
/// `/out/Lesson 1.mp3` is staged as `/out/.Lesson 1.mp3.part`.
#[must_use]
pub fn partial_path(destination: &Path) -> PathBuf {
    let file_name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{}{}", file_name, PARTIAL_SUFFIX))
}

/// Write `contents` so that `destination` either holds all of it or is untouched
///
/// The data is written to [`partial_path`] first and then renamed over the
/// destination. On failure the staging file is removed.
pub async fn write_atomically(destination: &Path, contents: &[u8]) -> std::io::Result<()> {
    let staging = partial_path(destination);

    if let Err(e) = tokio::fs::write(&staging, contents).await {
        remove_staging(&staging).await;
        return Err(e);
    }

    if let Err(e) = tokio::fs::rename(&staging, destination).await {
        remove_staging(&staging).await;
        return Err(e);
    }

    Ok(())
}

async fn remove_staging(staging: &Path) {
    if let Err(e) = tokio::fs::remove_file(staging).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %staging.display(), error = %e, "Failed to remove staging file");
    }
}
