use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use tagwatch_common::PostRecord;

use crate::traits::PostStore;

/// Outbound message delivery. The channel may be entirely absent when no
/// credentials are configured.
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

#[async_trait]
impl NotifyChannel for telegram_client::TelegramClient {
    async fn send(&self, text: &str) -> Result<()> {
        Ok(self.send_message(text).await?)
    }
}

/// Caption prefix length in notification messages.
const CAPTION_PREVIEW_CHARS: usize = 100;

/// Dispatches at-most-once notifications for matching posts.
pub struct Notifier {
    channel: Option<Arc<dyn NotifyChannel>>,
}

impl Notifier {
    pub fn new(channel: Option<Arc<dyn NotifyChannel>>) -> Self {
        Self { channel }
    }

    /// Send a notification for every eligible record (hashtag match, not
    /// yet notified), one at a time, marking each notified only after its
    /// delivery succeeds. A failed delivery leaves that record pending and
    /// does not block the rest. Returns the records notified this run.
    pub async fn dispatch_pending(&self, store: &dyn PostStore) -> Result<Vec<PostRecord>> {
        let Some(channel) = &self.channel else {
            warn!("Notification channel not configured, skipping delivery");
            return Ok(Vec::new());
        };

        let pending = store.list_pending().await?;
        if pending.is_empty() {
            info!("No new posts to notify about");
            return Ok(Vec::new());
        }

        info!(count = pending.len(), "Dispatching notifications");

        let mut notified = Vec::new();
        for post in pending {
            let message = compose_message(&post);
            match channel.send(&message).await {
                Ok(()) => {
                    store.mark_notified(&post.shortcode).await?;
                    info!(shortcode = post.shortcode.as_str(), "Notification sent");
                    let mut post = post;
                    post.notified = true;
                    notified.push(post);
                }
                Err(e) => {
                    warn!(
                        shortcode = post.shortcode.as_str(),
                        error = %e,
                        "Failed to send notification, record stays pending"
                    );
                }
            }
        }

        Ok(notified)
    }
}

fn compose_message(post: &PostRecord) -> String {
    let preview: String = post.caption.chars().take(CAPTION_PREVIEW_CHARS).collect();
    let ellipsis = if post.caption.chars().count() > CAPTION_PREVIEW_CHARS {
        "..."
    } else {
        ""
    };

    format!(
        "\u{1F514} New post with target hashtag!\n\n\
         \u{1F4DD} Caption: {preview}{ellipsis}\n\
         \u{1F44D} Likes: {}\n\
         \u{1F4AC} Comments: {}\n\
         \u{1F517} Link: {}",
        post.likes_count, post.comments_count, post.url
    )
}
