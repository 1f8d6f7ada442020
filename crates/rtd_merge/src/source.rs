//! HTTP POST source — one outbound exchange, response body handed back as a
//! reader.
//!
//! The response status is logged but never checked: whatever body comes back
//! is returned, and JSON validation further down the pipeline decides whether
//! it is usable.

use crate::error::SourceError;
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::CONTENT_TYPE;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Response body stream. Dropping it releases the underlying connection.
pub type BodyReader = Box<dyn AsyncRead + Send + Unpin>;

/// Produces the raw response stream for one request.
#[async_trait]
pub trait Source: Send + Sync {
    async fn get_stream(&self, cancel: &CancellationToken) -> Result<BodyReader, SourceError>;
}

/// POSTs a fixed JSON body to a fixed URL.
#[derive(Debug, Clone)]
pub struct HttpPostSource {
    url: String,
    body: Vec<u8>,
    client: reqwest::Client,
}

impl HttpPostSource {
    /// The client carries the overall deadline; see `config::build_client`.
    pub fn new(url: impl Into<String>, body: impl Into<Vec<u8>>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
            client,
        }
    }
}

#[async_trait]
impl Source for HttpPostSource {
    async fn get_stream(&self, cancel: &CancellationToken) -> Result<BodyReader, SourceError> {
        let request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(self.body.clone())
            .build()
            .map_err(SourceError::Request)?;

        debug!(url = %self.url, body_bytes = self.body.len(), "sending POST");

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(url = %self.url, "exchange cancelled");
                return Err(SourceError::Cancelled);
            }
            res = self.client.execute(request) => res.map_err(SourceError::Exchange)?,
        };

        info!(status = response.status().as_u16(), "response received");

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::new(StreamReader::new(Box::pin(stream))))
    }
}
