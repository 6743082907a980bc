use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use tagwatch_common::{MonitorConfig, TagwatchError};

use crate::extract::Extractor;
use crate::notify::{Notifier, NotifyChannel};
use crate::reconcile;
use crate::traits::{PageFetcher, PostStore};

/// Counters for one pipeline run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunStats {
    pub posts_discovered: usize,
    pub posts_scraped: usize,
    pub posts_created: usize,
    pub posts_updated: usize,
    pub posts_notified: usize,
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "discovered={} scraped={} created={} updated={} notified={}",
            self.posts_discovered,
            self.posts_scraped,
            self.posts_created,
            self.posts_updated,
            self.posts_notified
        )
    }
}

/// One full extract → reconcile → notify pass over the monitored account.
///
/// Runs as a single sequential unit of work; concurrent runs against the
/// same store are assumed to be serialized by whoever invokes `run`.
pub struct Scout {
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn PostStore>,
    extractor: Extractor,
    notifier: Notifier,
    profile_url: String,
}

impl Scout {
    pub fn new(
        config: &MonitorConfig,
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn PostStore>,
        channel: Option<Arc<dyn NotifyChannel>>,
        request_delay: Duration,
    ) -> Self {
        Self {
            extractor: Extractor::new(config, request_delay),
            notifier: Notifier::new(channel),
            profile_url: format!("https://www.instagram.com/{}/", config.account),
            fetcher,
            store,
        }
    }

    /// Run the pipeline once. Extraction and delivery problems degrade
    /// locally to empty/default results; only a store failure surfaces as
    /// a failed run.
    pub async fn run(&self) -> Result<RunStats, TagwatchError> {
        let run_id = Uuid::new_v4();
        let mut stats = RunStats::default();

        info!(run_id = %run_id, profile = self.profile_url.as_str(), "Starting scrape run");

        let profile = match self.fetcher.fetch(&self.profile_url).await {
            Ok(page) => page,
            Err(e) => {
                warn!(run_id = %run_id, error = %e, "Failed to fetch profile page, nothing to do");
                return Ok(stats);
            }
        };

        stats.posts_discovered = self
            .extractor
            .discover_post_urls(&profile, &self.profile_url)
            .len();

        let records = self
            .extractor
            .extract(self.fetcher.as_ref(), &profile, &self.profile_url)
            .await;
        stats.posts_scraped = records.len();

        let outcome = reconcile::reconcile(&records, self.store.as_ref())
            .await
            .map_err(|e| TagwatchError::Store(e.to_string()))?;
        stats.posts_created = outcome.created;
        stats.posts_updated = outcome.updated;

        let notified = self
            .notifier
            .dispatch_pending(self.store.as_ref())
            .await
            .map_err(|e| TagwatchError::Store(e.to_string()))?;
        stats.posts_notified = notified.len();

        info!(run_id = %run_id, %stats, "Scrape run complete");
        Ok(stats)
    }
}
