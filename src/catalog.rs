//! Lesson list extraction from a book's listing page
//!
//! The listing page embeds its lessons as a JavaScript assignment
//! (`var data = {...}`) whose JSON carries a `tree_list` of items, each with a
//! `title` and a `play_url`.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result, ScrapeError};
use crate::types::Lessons;

const PAYLOAD_PATTERN: &str = r"(?m)^var data\s?=\s?(\{.*play_url.*http.*\})";

fn payload_regex() -> Option<&'static Regex> {
    static PAYLOAD: OnceLock<Option<Regex>> = OnceLock::new();
    PAYLOAD
        .get_or_init(|| match Regex::new(PAYLOAD_PATTERN) {
            Ok(regex) => Some(regex),
            Err(e) => {
                tracing::error!(error = %e, "Invalid lesson payload pattern");
                None
            }
        })
        .as_ref()
}

#[derive(Debug, Deserialize)]
struct Payload {
    tree_list: Vec<Node>,
}

#[derive(Debug, Deserialize)]
struct Node {
    item: Item,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: String,
    play_url: String,
}

/// Extract the lessons embedded in a listing page
///
/// Lessons keep the page's order; a repeated title keeps its first position
/// and takes the last URL.
///
/// # Errors
///
/// - [`ScrapeError::NotFound`] if no line assigns a lesson payload
/// - [`ScrapeError::Ambiguous`] if several lines do
/// - [`ScrapeError::InvalidPayload`] if the payload is not the expected JSON
pub fn extract_lessons(page: &str) -> std::result::Result<Lessons, ScrapeError> {
    let regex = payload_regex().ok_or(ScrapeError::NotFound)?;
    let candidates: Vec<&str> = regex
        .captures_iter(page)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect();

    let raw = match candidates.as_slice() {
        [] => return Err(ScrapeError::NotFound),
        [raw] => *raw,
        many => return Err(ScrapeError::Ambiguous { count: many.len() }),
    };

    // The page double-escapes backslashes inside the JSON literal
    let json = raw.replace("\\\\", "\\");
    let payload: Payload = serde_json::from_str(&json).map_err(ScrapeError::InvalidPayload)?;

    let lessons: Lessons = payload
        .tree_list
        .into_iter()
        .map(|node| (node.item.title, node.item.play_url))
        .collect();

    tracing::debug!(lessons = lessons.len(), "Extracted lesson list");
    Ok(lessons)
}

/// Download a listing page and extract its lessons
///
/// # Errors
///
/// Returns [`Error::Network`] if the page cannot be fetched (including HTTP
/// error statuses) and [`Error::Scrape`] if it carries no usable lesson list.
pub async fn fetch_lessons(client: &reqwest::Client, url: &str) -> Result<Lessons> {
    tracing::info!(url = %url, "Fetching lesson list");

    let page = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    extract_lessons(&page).map_err(Error::from)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<html><head><script>
var config = {"debug": false};
var data = {"title":"Book 1","tree_list":[{"item":{"title":"Lesson 1","play_url":"http://cdn.example.com/1.m4a"}},{"item":{"title":"Lesson 2","play_url":"http://cdn.example.com/2.m4a"}}]}
</script></head></html>"#;

    #[test]
    fn extracts_lessons_in_page_order() {
        let lessons = extract_lessons(PAGE).unwrap();

        let names: Vec<_> = lessons.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Lesson 1", "Lesson 2"]);
        assert_eq!(lessons.get("Lesson 2"), Some("http://cdn.example.com/2.m4a"));
    }

    #[test]
    fn page_without_payload_is_not_found() {
        let page = "<html><script>var data = {\"tree_list\": []}</script></html>";
        assert!(matches!(extract_lessons(page), Err(ScrapeError::NotFound)));
        assert!(matches!(extract_lessons(""), Err(ScrapeError::NotFound)));
    }

    #[test]
    fn assignment_must_start_the_line() {
        let page = r#"  var data = {"tree_list":[{"item":{"title":"a","play_url":"http://x/a"}}]}"#;
        assert!(matches!(extract_lessons(page), Err(ScrapeError::NotFound)));
    }

    #[test]
    fn two_payloads_are_ambiguous() {
        let page = format!(
            "{line}\n{line}\n",
            line = r#"var data={"tree_list":[{"item":{"title":"a","play_url":"http://x/a"}}]}"#
        );
        assert!(matches!(
            extract_lessons(&page),
            Err(ScrapeError::Ambiguous { count: 2 })
        ));
    }

    #[test]
    fn double_escaped_backslashes_are_unescaped() {
        let page = r#"var data = {"tree_list":[{"item":{"title":"Lesson \\u4e00","play_url":"http:\\/\\/x\\/1.m4a"}}]}"#;

        let lessons = extract_lessons(page).unwrap();

        let lesson = lessons.iter().next().unwrap();
        assert_eq!(lesson.name, "Lesson \u{4e00}");
        assert_eq!(lesson.url, "http://x/1.m4a");
    }

    #[test]
    fn duplicate_titles_keep_last_url() {
        let page = r#"var data = {"tree_list":[{"item":{"title":"a","play_url":"http://x/1"}},{"item":{"title":"b","play_url":"http://x/2"}},{"item":{"title":"a","play_url":"http://x/3"}}]}"#;

        let lessons = extract_lessons(page).unwrap();

        assert_eq!(lessons.len(), 2);
        assert_eq!(lessons.get("a"), Some("http://x/3"));
    }

    #[test]
    fn malformed_payload_is_reported() {
        let page = r#"var data = {"tree_list": "play_url http://x", }"#;
        assert!(matches!(
            extract_lessons(page),
            Err(ScrapeError::InvalidPayload(_))
        ));
    }

    #[tokio::test]
    async fn fetch_lessons_reads_listing_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/book/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let lessons = fetch_lessons(&reqwest::Client::new(), &format!("{}/book/1", server.uri()))
            .await
            .unwrap();

        assert_eq!(lessons.len(), 2);
    }

    #[tokio::test]
    async fn fetch_lessons_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string(PAGE))
            .mount(&server)
            .await;

        let result = fetch_lessons(&reqwest::Client::new(), &server.uri()).await;

        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn fetch_lessons_surfaces_scrape_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let result = fetch_lessons(&reqwest::Client::new(), &server.uri()).await;

        assert!(matches!(result, Err(Error::Scrape(ScrapeError::NotFound))));
    }
}
