use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single scraped post. `shortcode` is the natural key taken from the
/// post URL; `id` is derived from it and both are immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: String,
    pub shortcode: String,
    pub caption: String,
    pub likes_count: i64,
    pub comments_count: i64,
    pub url: String,
    pub has_target_hashtag: bool,
    /// Flipped to true exactly once, after a successful delivery. Never reset.
    pub notified: bool,
    pub scraped_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostRecord {
    /// Fresh record with extraction defaults: empty caption, zero counts,
    /// no hashtag match, not notified.
    pub fn new(shortcode: &str, url: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: format!("post_{shortcode}"),
            shortcode: shortcode.to_string(),
            caption: String::new(),
            likes_count: 0,
            comments_count: 0,
            url: url.to_string(),
            has_target_hashtag: false,
            notified: false,
            scraped_at: now,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Immutable per-run input: which account to watch, which hashtags trigger
/// a notification, and how many posts one run may visit.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub account: String,
    /// Lowercased, deduplicated, in configuration order.
    pub hashtags: Vec<String>,
    pub max_posts: usize,
}

impl MonitorConfig {
    pub fn new(account: &str, hashtags: &[String], max_posts: usize) -> Self {
        let mut seen = std::collections::HashSet::new();
        let hashtags = hashtags
            .iter()
            .map(|t| t.trim().trim_start_matches('#').to_lowercase())
            .filter(|t| !t.is_empty() && seen.insert(t.clone()))
            .collect();
        Self {
            account: account.to_string(),
            hashtags,
            max_posts,
        }
    }
}
