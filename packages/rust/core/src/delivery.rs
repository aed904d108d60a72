//! Discord webhook delivery.
//!
//! Each chunk is one `POST {"content": .., "username": ..}`. Any non-2xx
//! response aborts delivery; there are no retries.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument};
use url::Url;

use eventdigest_shared::{EventDigestError, Result};

/// Request timeout for a single webhook call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
}

/// A configured webhook target.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
    url: Url,
    username: Option<String>,
}

impl WebhookClient {
    /// Build a client for `webhook_url`. The URL must be absolute http(s).
    pub fn new(webhook_url: &str, username: Option<String>) -> Result<Self> {
        let url = Url::parse(webhook_url.trim())
            .map_err(|e| EventDigestError::config(format!("invalid webhook URL: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(EventDigestError::config(format!(
                "webhook URL must be http(s), got {}",
                url.scheme()
            )));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("eventdigest/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EventDigestError::Network(format!("client build: {e}")))?;

        Ok(Self {
            client,
            url,
            username,
        })
    }

    /// Post a single message.
    pub async fn post(&self, content: &str) -> Result<()> {
        let body = WebhookMessage {
            content,
            username: self.username.as_deref(),
        };

        let response = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| EventDigestError::Network(format!("webhook: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EventDigestError::Network(format!(
                "webhook: HTTP {status} {}",
                detail.trim()
            )));
        }

        debug!(%status, chars = content.chars().count(), "webhook accepted message");
        Ok(())
    }

    /// Post every chunk in order, stopping at the first failure.
    #[instrument(skip_all, fields(chunks = chunks.len()))]
    pub async fn deliver<S: AsRef<str>>(
        &self,
        chunks: &[S],
        mut on_posted: impl FnMut(usize, usize),
    ) -> Result<usize> {
        let total = chunks.len();
        for (i, chunk) in chunks.iter().enumerate() {
            self.post(chunk.as_ref()).await?;
            on_posted(i + 1, total);
        }
        info!(chunks = total, "webhook delivery complete");
        Ok(total)
    }
}
