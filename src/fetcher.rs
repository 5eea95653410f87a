//! Streaming HTTP transfers
//!
//! A [`Fetcher`] opens one GET request and hands back the declared size together
//! with a lazy stream of body chunks. The worker drives the stream, so bytes
//! are only pulled as fast as it consumes them.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;

use crate::config::HttpConfig;
use crate::error::{Error, TransferError};

/// An open transfer: the declared size and the body as a chunk stream
pub struct Transfer {
    /// Content-Length reported by the server, if any
    pub total: Option<u64>,
    /// Body chunks in arrival order
    pub chunks: BoxStream<'static, Result<Bytes, TransferError>>,
}

impl std::fmt::Debug for Transfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transfer")
            .field("total", &self.total)
            .finish_non_exhaustive()
    }
}

/// Abstraction over streaming downloads, enabling testability
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Open a streaming GET for `url`
    ///
    /// # Errors
    ///
    /// Returns a [`TransferError`] if the connection cannot be established or
    /// the server answers with a non-success status. Errors after the headers
    /// arrive are reported through the chunk stream.
    async fn fetch(&self, url: &str) -> Result<Transfer, TransferError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Production [`Fetcher`] backed by a shared `reqwest` client
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher with the configured user agent and connect timeout
    pub fn new(config: &HttpConfig) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(Error::Network)?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// The underlying client, for one-off requests such as the listing page
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Transfer, TransferError> {
        let response =
            self.client
                .get(url)
                .send()
                .await
                .map_err(|e| TransferError::Connect {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length();
        tracing::debug!(url, total = ?total, "Transfer opened");

        let url = url.to_string();
        let chunks = response
            .bytes_stream()
            .map(move |chunk| {
                chunk.map_err(|e| TransferError::Interrupted {
                    url: url.clone(),
                    reason: e.to_string(),
                })
            })
            .boxed();

        Ok(Transfer { total, chunks })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
