//! Deterministic in-memory fakes for pipeline tests: no network, no
//! database, no browser.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use tagwatch_common::PostRecord;

use crate::notify::NotifyChannel;
use crate::traits::{Page, PageFetcher, PostStore};

// ---------------------------------------------------------------------------
// StaticFetcher
// ---------------------------------------------------------------------------

/// Serves pre-registered pages by URL; unknown URLs fail like a dead fetch.
#[derive(Default)]
pub struct StaticFetcher {
    pages: Mutex<HashMap<String, Page>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: &str, html: &str, text: &str) {
        self.pages.lock().unwrap().insert(
            url.to_string(),
            Page {
                html: html.to_string(),
                text: text.to_string(),
            },
        );
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Page> {
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("no page registered for {url}"))
    }
}

// ---------------------------------------------------------------------------
// MemoryPostStore
// ---------------------------------------------------------------------------

/// HashMap-backed store honoring the same write contract as Postgres:
/// `update` only touches mutable fields, `mark_notified` is the only path
/// that sets the flag.
#[derive(Default)]
pub struct MemoryPostStore {
    posts: Mutex<HashMap<String, PostRecord>>,
}

impl MemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a record directly, bypassing reconciliation. Test setup only.
    pub fn seed(&self, record: PostRecord) {
        self.posts
            .lock()
            .unwrap()
            .insert(record.shortcode.clone(), record);
    }
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn find_by_shortcode(&self, shortcode: &str) -> Result<Option<PostRecord>> {
        Ok(self.posts.lock().unwrap().get(shortcode).cloned())
    }

    async fn insert(&self, record: &PostRecord) -> Result<()> {
        let mut posts = self.posts.lock().unwrap();
        if posts.contains_key(&record.shortcode) {
            return Err(anyhow!("duplicate shortcode {}", record.shortcode));
        }
        posts.insert(record.shortcode.clone(), record.clone());
        Ok(())
    }

    async fn update(&self, record: &PostRecord) -> Result<()> {
        let mut posts = self.posts.lock().unwrap();
        let existing = posts
            .get_mut(&record.shortcode)
            .ok_or_else(|| anyhow!("no record for shortcode {}", record.shortcode))?;
        existing.caption = record.caption.clone();
        existing.likes_count = record.likes_count;
        existing.comments_count = record.comments_count;
        existing.url = record.url.clone();
        existing.has_target_hashtag = record.has_target_hashtag;
        existing.scraped_at = record.scraped_at;
        existing.updated_at = record.updated_at;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<PostRecord>> {
        let mut records: Vec<PostRecord> = self.posts.lock().unwrap().values().cloned().collect();
        records.sort_by(|a, b| b.scraped_at.cmp(&a.scraped_at));
        Ok(records)
    }

    async fn list_pending(&self) -> Result<Vec<PostRecord>> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.has_target_hashtag && !p.notified)
            .cloned()
            .collect())
    }

    async fn mark_notified(&self, shortcode: &str) -> Result<()> {
        let mut posts = self.posts.lock().unwrap();
        let existing = posts
            .get_mut(shortcode)
            .ok_or_else(|| anyhow!("no record for shortcode {shortcode}"))?;
        existing.notified = true;
        existing.updated_at = chrono::Utc::now();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingChannel
// ---------------------------------------------------------------------------

/// Captures sent messages; optionally fails the first N sends.
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<String>>,
    failures_remaining: AtomicUsize,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel whose first `failures` sends return an error.
    pub fn failing(failures: usize) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failures_remaining: AtomicUsize::new(failures),
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotifyChannel for RecordingChannel {
    async fn send(&self, text: &str) -> Result<()> {
        if self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(anyhow!("simulated delivery failure"));
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
