use crate::config::FetchConfig;
use crate::feed::parser::{parse, CanonicalFeed, ParseError};
use futures::stream::StreamExt;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while retrieving and decoding one feed.
///
/// Every variant aborts ingestion of that feed for the current pass only.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The origin could not be reached (DNS, connection, TLS, ...)
    #[error("Request failed: {0}")]
    Transport(#[source] reqwest::Error),
    /// The request exceeded the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// The response body stream failed mid-read
    #[error("Failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
    /// Response body exceeded the configured size limit
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    /// The body is neither RSS nor Atom
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// HTTP retrieval of feed documents.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_body_bytes: usize,
}

impl Fetcher {
    /// Build a fetcher with a client that sends the configured `User-Agent`.
    ///
    /// Some origins reject requests without one.
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            timeout: config.request_timeout,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Fetch `url` and parse the body as a feed.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Transport`] / [`FetchError::Timeout`] - origin unreachable or too slow
    /// - [`FetchError::HttpStatus`] - non-2xx response
    /// - [`FetchError::Body`] / [`FetchError::ResponseTooLarge`] - body could not be read in full
    /// - [`FetchError::Parse`] - body is not a valid RSS or Atom document
    pub async fn fetch(&self, url: &str) -> Result<CanonicalFeed, FetchError> {
        let bytes = tokio::time::timeout(self.timeout, self.fetch_bytes(url))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;

        let feed = parse(&bytes)?;
        tracing::debug!(url = %url, items = feed.items.len(), "Fetched feed");
        Ok(feed)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e, FetchError::Transport))?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        self.read_limited_bytes(response).await
    }

    async fn read_limited_bytes(&self, response: reqwest::Response) -> Result<Vec<u8>, FetchError> {
        let limit = self.max_body_bytes;

        // Fast path: check Content-Length header
        if let Some(len) = response.content_length() {
            if len > limit as u64 {
                return Err(FetchError::ResponseTooLarge(limit));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.classify(e, FetchError::Body))?;
            if bytes.len().saturating_add(chunk.len()) > limit {
                return Err(FetchError::ResponseTooLarge(limit));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(bytes)
    }

    fn classify(&self, err: reqwest::Error, otherwise: fn(reqwest::Error) -> FetchError) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            otherwise(err)
        }
    }
}
