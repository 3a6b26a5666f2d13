//! Network transport abstraction.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::Result;

/// Abstraction over the network so the pipeline can run against fakes.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Streams the body of `url` into `sink`, calling `on_progress` with
    /// `(bytes_received, total_bytes)` after every chunk.
    ///
    /// Returns the number of bytes written.
    async fn fetch(
        &self,
        url: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
        on_progress: &(dyn Fn(u64, Option<u64>) + Send + Sync),
    ) -> Result<u64>;
}

/// Builds a configured HTTP client.
fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("panowall/", env!("CARGO_PKG_VERSION")))
        .pool_idle_timeout(Duration::from_secs(60))
        .tcp_keepalive(Duration::from_secs(30))
        .build()
}

/// `reqwest`-backed transport. One client is shared by every transfer of a run.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with the default client settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(
        &self,
        url: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
        on_progress: &(dyn Fn(u64, Option<u64>) + Send + Sync),
    ) -> Result<u64> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let total = response.content_length();
        let mut stream = response.bytes_stream();
        let mut received = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            sink.write_all(&chunk).await?;
            received += chunk.len() as u64;
            on_progress(received, total);
        }
        sink.flush().await?;

        log::debug!("Fetched {url} ({received} bytes)");
        Ok(received)
    }
}
