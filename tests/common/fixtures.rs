//! Listing pages, audio endpoints and a stand-in encoder

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use boyadl::{Config, TranscodeError, TranscodeOptions, Transcoder};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the listing page is served at
pub const BOOK_PATH: &str = "/book/1";

/// Audio body for lesson `i` (1-based)
pub fn audio_body(i: usize) -> Vec<u8> {
    format!("audio-{i}-").repeat(512).into_bytes()
}

/// Audio path for lesson `i` (1-based)
pub fn audio_path(i: usize) -> String {
    format!("/audio/{i}.m4a")
}

/// A listing page whose payload links `titles[i]` to `audio_path(i + 1)`
///
/// Slashes in URLs are escaped with a doubled backslash, like the real pages do.
pub fn listing_page(base_url: &str, titles: &[&str]) -> String {
    let items: Vec<String> = titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            let url = format!("{}{}", base_url, audio_path(i + 1)).replace('/', "\\\\/");
            format!(r#"{{"item":{{"title":"{title}","play_url":"{url}"}}}}"#)
        })
        .collect();

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<script>\nvar data = {{\"book\":\"Boya 1\",\"tree_list\":[{}]}}\n</script>\n</head>\n<body></body>\n</html>\n",
        items.join(",")
    )
}

/// Serve a book: the listing page plus one audio endpoint per title
pub async fn mount_book(server: &MockServer, titles: &[&str], delay: Duration) {
    Mock::given(method("GET"))
        .and(path(BOOK_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(listing_page(&server.uri(), titles)),
        )
        .mount(server)
        .await;

    for i in 1..=titles.len() {
        Mock::given(method("GET"))
            .and(path(audio_path(i)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(audio_body(i))
                    .set_delay(delay),
            )
            .mount(server)
            .await;
    }
}

/// Encoder stand-in: prefixes the input with `MP3:`
#[derive(Debug, Clone, Copy)]
pub struct TagTranscoder;

#[async_trait]
impl Transcoder for TagTranscoder {
    async fn transcode(
        &self,
        input: Vec<u8>,
        _options: &TranscodeOptions,
    ) -> Result<Vec<u8>, TranscodeError> {
        let mut output = b"MP3:".to_vec();
        output.extend_from_slice(&input);
        Ok(output)
    }

    fn name(&self) -> &'static str {
        "tag"
    }
}

/// Config writing into `output_dir`
pub fn test_config(output_dir: &Path, parallelism: usize) -> Config {
    let mut config = Config::default();
    config.download.output_dir = output_dir.to_path_buf();
    config.download.parallelism = parallelism;
    config.download.refresh_interval = Duration::from_millis(10);
    config
}
