//! End-to-end pipeline scenarios: synthetic pages → Scout::run() → asserts
//! on store state and delivered notifications. No network, no database.

use std::sync::Arc;
use std::time::Duration;

use tagwatch_common::MonitorConfig;
use tagwatch_scout::notify::NotifyChannel;
use tagwatch_scout::scout::Scout;
use tagwatch_scout::testing::{MemoryPostStore, RecordingChannel, StaticFetcher};
use tagwatch_scout::traits::PostStore;

const PROFILE_URL: &str = "https://www.instagram.com/telegraph/";

fn profile_html(links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|l| format!(r#"<a href="{l}">post</a>"#))
        .collect();
    format!("<html><body><article>{anchors}</article></body></html>")
}

fn post_html(caption: &str, extras: &str) -> String {
    format!(
        r#"<html><head><meta property="og:description" content="{caption}"></head>
        <body><article><span>{caption}</span>{extras}</article></body></html>"#
    )
}

fn scout(
    fetcher: Arc<StaticFetcher>,
    store: Arc<MemoryPostStore>,
    channel: Option<Arc<dyn NotifyChannel>>,
) -> Scout {
    let config = MonitorConfig::new("telegraph", &["ukraine".to_string(), "us".to_string()], 10);
    Scout::new(&config, fetcher, store, channel, Duration::ZERO)
}

#[tokio::test]
async fn scenario_two_posts_one_matching() {
    let fetcher = Arc::new(StaticFetcher::new());
    fetcher.insert(
        PROFILE_URL,
        &profile_html(&["/p/AAA111/", "/p/BBB222/"]),
        "",
    );
    fetcher.insert(
        "https://www.instagram.com/p/AAA111/",
        &post_html(
            "Frontline report #ukraine",
            "<span>100 likes</span><span>10 comments</span>",
        ),
        "Frontline report #ukraine 100 likes 10 comments",
    );
    fetcher.insert(
        "https://www.instagram.com/p/BBB222/",
        &post_html("Morning skyline", ""),
        "Morning skyline",
    );

    let store = Arc::new(MemoryPostStore::new());
    let channel = Arc::new(RecordingChannel::new());
    let scout = scout(fetcher, store.clone(), Some(channel.clone()));

    let stats = scout.run().await.unwrap();
    assert_eq!(stats.posts_discovered, 2);
    assert_eq!(stats.posts_scraped, 2);
    assert_eq!(stats.posts_created, 2);
    assert_eq!(stats.posts_notified, 1);

    let a = store.find_by_shortcode("AAA111").await.unwrap().unwrap();
    assert!(a.has_target_hashtag);
    assert_eq!(a.likes_count, 100);
    assert_eq!(a.comments_count, 10);
    assert!(a.notified);

    let b = store.find_by_shortcode("BBB222").await.unwrap().unwrap();
    assert!(!b.has_target_hashtag);
    assert_eq!(b.likes_count, 0);
    assert_eq!(b.comments_count, 0);
    assert!(!b.notified);

    assert_eq!(channel.sent().len(), 1);
    assert!(channel.sent()[0].contains("/p/AAA111/"));
}

#[tokio::test]
async fn scenario_late_hashtag_edit_notifies_once() {
    let fetcher = Arc::new(StaticFetcher::new());
    fetcher.insert(PROFILE_URL, &profile_html(&["/p/BBB222/"]), "");
    fetcher.insert(
        "https://www.instagram.com/p/BBB222/",
        &post_html("Morning skyline", ""),
        "Morning skyline",
    );

    let store = Arc::new(MemoryPostStore::new());
    let channel = Arc::new(RecordingChannel::new());
    let scout = scout(fetcher.clone(), store.clone(), Some(channel.clone()));

    // First run: no hashtag, no notification
    let stats = scout.run().await.unwrap();
    assert_eq!(stats.posts_created, 1);
    assert_eq!(stats.posts_notified, 0);

    // The caption gains a monitored hashtag
    fetcher.insert(
        "https://www.instagram.com/p/BBB222/",
        &post_html("Morning skyline #ukraine", ""),
        "Morning skyline #ukraine",
    );

    let stats = scout.run().await.unwrap();
    assert_eq!(stats.posts_updated, 1);
    assert_eq!(stats.posts_notified, 1);

    let b = store.find_by_shortcode("BBB222").await.unwrap().unwrap();
    assert!(b.has_target_hashtag);
    assert!(b.notified);

    // A third run re-extracts the same content but must not resend
    let stats = scout.run().await.unwrap();
    assert_eq!(stats.posts_notified, 0);
    assert_eq!(channel.sent().len(), 1);
}

#[tokio::test]
async fn scenario_empty_profile_is_a_noop() {
    let fetcher = Arc::new(StaticFetcher::new());
    fetcher.insert(PROFILE_URL, "<html><body><p>nothing here</p></body></html>", "");

    let store = Arc::new(MemoryPostStore::new());
    let channel = Arc::new(RecordingChannel::new());
    let scout = scout(fetcher, store.clone(), Some(channel.clone()));

    let stats = scout.run().await.unwrap();
    assert_eq!(stats.posts_discovered, 0);
    assert_eq!(stats.posts_scraped, 0);
    assert_eq!(stats.posts_created, 0);
    assert_eq!(stats.posts_notified, 0);
    assert!(store.list_all().await.unwrap().is_empty());
    assert!(channel.sent().is_empty());
}

#[tokio::test]
async fn profile_fetch_failure_yields_empty_run() {
    // Nothing registered at all: the profile fetch itself fails
    let fetcher = Arc::new(StaticFetcher::new());
    let store = Arc::new(MemoryPostStore::new());
    let scout = scout(fetcher, store.clone(), None);

    let stats = scout.run().await.unwrap();
    assert_eq!(stats.posts_scraped, 0);
    assert!(store.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_post_fetch_skips_only_that_post() {
    let fetcher = Arc::new(StaticFetcher::new());
    fetcher.insert(
        PROFILE_URL,
        &profile_html(&["/p/GONE00/", "/p/AAA111/"]),
        "",
    );
    // GONE00 is not registered; AAA111 is
    fetcher.insert(
        "https://www.instagram.com/p/AAA111/",
        &post_html("Still here #us", ""),
        "Still here #us",
    );

    let store = Arc::new(MemoryPostStore::new());
    let scout = scout(fetcher, store.clone(), None);

    let stats = scout.run().await.unwrap();
    assert_eq!(stats.posts_discovered, 2);
    assert_eq!(stats.posts_scraped, 1);
    assert!(store.find_by_shortcode("AAA111").await.unwrap().is_some());
    assert!(store.find_by_shortcode("GONE00").await.unwrap().is_none());
}
