use std::path::Path;
use std::time::Duration;

use crate::downloader::test_helpers::{EventLog, Resource, StaticFetcher, lesson_url};


/// Body served for lesson `i`
fn body(i: usize) -> Vec<u8> {
    format!("audio-{i}").into_bytes()
}

/// Fetcher serving `body(i)` for lessons `1..=n`, split into `chunks` chunks
fn fetcher_for(n: usize, chunks: usize, delay: Duration, log: &EventLog) -> StaticFetcher {
    (1..=n).fold(StaticFetcher::new(log.clone()), |fetcher, i| {
        fetcher.serve(
            &lesson_url(i),
            Resource::body(&body(i), chunks).with_delay(delay),
        )
    })
}

/// File names in `dir`, sorted
fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
