// Trait abstractions for pipeline dependencies.
//
// PageFetcher puts all page fetching behind one trait; PostStore does the
// same for record-store access. These enable deterministic testing with
// StaticFetcher and MemoryPostStore: no network, no database.

use anyhow::Result;
use async_trait::async_trait;

use tagwatch_common::PostRecord;

// ---------------------------------------------------------------------------
// PageFetcher
// ---------------------------------------------------------------------------

/// Rendered content for one page: the raw markup plus the visible text the
/// renderer produced from it.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub html: String,
    pub text: String,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Navigate to a URL and return its rendered content. Bounded wait: a
    /// stalled page fails with a timeout error instead of hanging the run.
    async fn fetch(&self, url: &str) -> Result<Page>;
}

// ---------------------------------------------------------------------------
// PostStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn find_by_shortcode(&self, shortcode: &str) -> Result<Option<PostRecord>>;

    async fn insert(&self, record: &PostRecord) -> Result<()>;

    /// Overwrite the mutable fields of an existing record. Must not touch
    /// `shortcode`, `id`, `created_at`, or `notified`.
    async fn update(&self, record: &PostRecord) -> Result<()>;

    /// All records, most recently scraped first.
    async fn list_all(&self) -> Result<Vec<PostRecord>>;

    /// Records with a hashtag match that have not been notified yet.
    async fn list_pending(&self) -> Result<Vec<PostRecord>>;

    /// Flip `notified` to true for one record. Monotonic.
    async fn mark_notified(&self, shortcode: &str) -> Result<()>;
}

#[async_trait]
impl PostStore for tagwatch_store::PostgresPostStore {
    async fn find_by_shortcode(&self, shortcode: &str) -> Result<Option<PostRecord>> {
        self.find_by_shortcode(shortcode).await
    }

    async fn insert(&self, record: &PostRecord) -> Result<()> {
        self.insert(record).await
    }

    async fn update(&self, record: &PostRecord) -> Result<()> {
        self.update(record).await
    }

    async fn list_all(&self) -> Result<Vec<PostRecord>> {
        self.list_all().await
    }

    async fn list_pending(&self) -> Result<Vec<PostRecord>> {
        self.list_pending().await
    }

    async fn mark_notified(&self, shortcode: &str) -> Result<()> {
        self.mark_notified(shortcode).await
    }
}
