use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use spider_transformations::transformation::content::{
    transform_content_input, ReturnFormat, TransformConfig, TransformInput,
};
use tracing::{info, warn};

use crate::traits::{Page, PageFetcher};

/// Fetcher backed by a Browserless service: raw rendered HTML from the
/// `/content` endpoint, visible text via Readability extraction.
pub struct BrowserlessFetcher {
    client: browserless_client::BrowserlessClient,
}

impl BrowserlessFetcher {
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Self {
        info!(base_url, "Using BrowserlessFetcher");
        Self {
            client: browserless_client::BrowserlessClient::with_timeout(base_url, token, timeout),
        }
    }
}

#[async_trait]
impl PageFetcher for BrowserlessFetcher {
    async fn fetch(&self, url: &str) -> Result<Page> {
        info!(url, fetcher = "browserless", "Fetching page");

        let html = self
            .client
            .content(url)
            .await
            .context("Browserless content request failed")?;

        if html.is_empty() {
            warn!(url, fetcher = "browserless", "Empty HTML response");
            return Ok(Page::default());
        }

        let parsed_url = url::Url::parse(url).ok();
        let config = TransformConfig {
            readability: true,
            main_content: true,
            return_format: ReturnFormat::Markdown,
            filter_images: true,
            filter_svg: true,
            clean_html: true,
        };
        let input = TransformInput {
            url: parsed_url.as_ref(),
            content: html.as_bytes(),
            screenshot_bytes: None,
            encoding: None,
            selector_config: None,
            ignore_tags: None,
        };

        let text = transform_content_input(input, &config);

        if text.trim().is_empty() {
            warn!(url, fetcher = "browserless", "Empty text after Readability extraction");
        }

        info!(url, bytes = html.len(), "Fetched page");
        Ok(Page { html, text })
    }
}
