//! Size-capped HTTP download of thumbnail images.

use std::time::Duration;

use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// HTTP GET client that refuses bodies larger than `max_bytes`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpFetcher {
    pub fn new(max_bytes: usize, timeout: Duration) -> MediaResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("kobalt/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, max_bytes })
    }

    /// GET `url` and return the full body. Non-2xx statuses are errors.
    pub async fn fetch(&self, url: &str) -> MediaResult<Vec<u8>> {
        let mut response = self.client.get(url).send().await?.error_for_status()?;

        if let Some(len) = response.content_length() {
            if len > self.max_bytes as u64 {
                return Err(MediaError::ResponseTooLarge(self.max_bytes));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(MediaError::ResponseTooLarge(self.max_bytes));
            }
            body.extend_from_slice(&chunk);
        }

        debug!(url = %url, bytes = body.len(), "Fetched remote file");
        Ok(body)
    }
}
