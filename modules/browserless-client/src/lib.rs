pub mod error;

pub use error::{BrowserlessError, Result};

use std::time::Duration;

use tracing::debug;

/// HTTP client for the Browserless `/content` endpoint.
///
/// Browserless drives a pooled headless Chrome session server-side and
/// returns the fully rendered DOM, so callers never manage a browser or
/// its cookie state themselves.
pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    page_timeout: Duration,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        Self::with_timeout(base_url, token, Duration::from_secs(30))
    }

    /// Build a client with an explicit bounded wait per page. The HTTP
    /// request timeout sits slightly above the page timeout so the
    /// page-level signal fires first.
    pub fn with_timeout(base_url: &str, token: Option<&str>, page_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(page_timeout + Duration::from_secs(5))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
            page_timeout,
        }
    }

    /// Fetch fully-rendered HTML content for a URL.
    ///
    /// Waits for the page to settle up to the configured timeout; a stalled
    /// page yields `BrowserlessError::Timeout` rather than hanging.
    pub async fn content(&self, url: &str) -> Result<String> {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        let body = serde_json::json!({
            "url": url,
            "gotoOptions": {
                "waitUntil": "networkidle2",
                "timeout": self.page_timeout.as_millis() as u64,
            },
        });

        debug!(url, endpoint = endpoint.as_str(), "Requesting rendered content");

        let resp = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BrowserlessError::Timeout {
                        seconds: self.page_timeout.as_secs(),
                    }
                } else {
                    BrowserlessError::Network(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            // Browserless reports a page navigation timeout as 408
            if status.as_u16() == 408 {
                return Err(BrowserlessError::Timeout {
                    seconds: self.page_timeout.as_secs(),
                });
            }
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }
}
