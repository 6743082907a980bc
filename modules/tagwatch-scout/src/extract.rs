use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{info, warn};

use tagwatch_common::{MonitorConfig, PostRecord};

use crate::hashtags::HashtagMatcher;
use crate::traits::{Page, PageFetcher};

/// Path marker that identifies a post link.
const POST_PATH_MARKER: &str = "/p/";

/// Caption container patterns, most specific first. The class names track
/// the markup the platform currently serves; when it shifts, the later
/// fallbacks carry the load.
const CAPTION_CONTAINER_PATTERNS: &[&str] = &[
    r#"(?is)<div[^>]*class="[^"]*_a9zr[^"]*"[^>]*>.*?<span[^>]*>(.*?)</span>"#,
    r#"(?is)<div[^>]*class="[^"]*C4VMK[^"]*"[^>]*>.*?<span[^>]*>(.*?)</span>"#,
    r#"(?is)<h1[^>]*>.*?</h1>\s*<div[^>]*>\s*<span[^>]*>(.*?)</span>"#,
];

/// Like-count phrasings, tried in order against lowercased markup.
/// "views" is a last-resort proxy for video posts that hide like counts.
const LIKES_PATTERNS: &[&str] = &[
    r"(\d+[,.]?\d*[km]?)\s+likes",
    r"liked by\s+(\d+[,.]?\d*[km]?)",
    r"(\d+[,.]?\d*[km]?)\s+like this",
    r"(\d+[,.]?\d*[km]?)\s+views",
];

/// Comment-count phrasings. Only pure digit matches are accepted.
const COMMENTS_PATTERNS: &[&str] = &[
    r"(\d+,?\d*)\s+comments",
    r"view all\s+(\d+,?\d*)\s+comments",
    r"(\d+,?\d*)\s+comment",
];

/// Turns rendered pages into typed post records. All extraction is
/// best-effort: a field that cannot be parsed keeps its default, and only a
/// post URL without a shortcode disqualifies a candidate entirely.
pub struct Extractor {
    matcher: HashtagMatcher,
    max_posts: usize,
    request_delay: Duration,
    caption_patterns: Vec<Regex>,
    likes_patterns: Vec<Regex>,
    comments_patterns: Vec<Regex>,
    article_re: Regex,
    href_re: Regex,
    meta_description_re: Regex,
}

impl Extractor {
    pub fn new(config: &MonitorConfig, request_delay: Duration) -> Self {
        let compile = |patterns: &[&str]| {
            patterns
                .iter()
                .map(|p| Regex::new(p).expect("valid regex"))
                .collect()
        };

        Self {
            matcher: HashtagMatcher::new(&config.hashtags),
            max_posts: config.max_posts,
            request_delay,
            caption_patterns: compile(CAPTION_CONTAINER_PATTERNS),
            likes_patterns: compile(LIKES_PATTERNS),
            comments_patterns: compile(COMMENTS_PATTERNS),
            article_re: Regex::new(r"(?is)<article[^>]*>(.*?)</article>").expect("valid regex"),
            href_re: Regex::new(r#"href\s*=\s*["']([^"']+)["']"#).expect("valid regex"),
            meta_description_re: Regex::new(
                r#"<meta property="og:description" content="([^"]+)""#,
            )
            .expect("valid regex"),
        }
    }

    /// Full extraction pass: discover candidate post links on the profile
    /// page, then fetch and extract the first `max_posts` of them. Fetch
    /// failures skip the affected post; the result may be empty.
    pub async fn extract(
        &self,
        fetcher: &dyn PageFetcher,
        profile: &Page,
        profile_url: &str,
    ) -> Vec<PostRecord> {
        let urls = self.discover_post_urls(profile, profile_url);
        if urls.is_empty() {
            warn!("No candidate post links found on profile page");
            return Vec::new();
        }
        info!(count = urls.len(), "Discovered candidate post links");

        let mut records = Vec::new();
        for (i, url) in urls.iter().take(self.max_posts).enumerate() {
            // Pacing between post fetches, to respect the source's cadence
            if i > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            let page = match fetcher.fetch(url).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(url = url.as_str(), error = %e, "Failed to fetch post page, skipping");
                    continue;
                }
            };

            if let Some(record) = self.extract_post(url, &page, Utc::now()) {
                info!(
                    shortcode = record.shortcode.as_str(),
                    likes = record.likes_count,
                    comments = record.comments_count,
                    matched = record.has_target_hashtag,
                    "Extracted post"
                );
                records.push(record);
            }
        }

        records
    }

    /// Collect distinct post URLs from the profile page. Primary query is
    /// restricted to `<article>` blocks; if that yields nothing the whole
    /// document is scanned. Zero results is a valid outcome.
    pub fn discover_post_urls(&self, profile: &Page, base_url: &str) -> Vec<String> {
        let mut article_scope = String::new();
        for cap in self.article_re.captures_iter(&profile.html) {
            article_scope.push_str(&cap[1]);
        }

        let urls = self.collect_post_links(&article_scope, base_url);
        if !urls.is_empty() {
            return urls;
        }
        self.collect_post_links(&profile.html, base_url)
    }

    fn collect_post_links(&self, html: &str, base_url: &str) -> Vec<String> {
        let base = url::Url::parse(base_url).ok();

        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for cap in self.href_re.captures_iter(html) {
            let raw = &cap[1];

            let resolved = if raw.starts_with("http://") || raw.starts_with("https://") {
                raw.to_string()
            } else if let Some(ref b) = base {
                match b.join(raw) {
                    Ok(u) => u.to_string(),
                    Err(_) => continue,
                }
            } else {
                continue;
            };

            if resolved.contains(POST_PATH_MARKER) && seen.insert(resolved.clone()) {
                links.push(resolved);
            }
        }

        links
    }

    /// Extract a record from one post page. Returns None only when the URL
    /// has no parseable shortcode; every field failure degrades to the
    /// field's default instead.
    pub fn extract_post(&self, url: &str, page: &Page, now: DateTime<Utc>) -> Option<PostRecord> {
        let shortcode = match parse_shortcode(url) {
            Some(code) => code,
            None => {
                warn!(url, "Post URL has no parseable shortcode, skipping");
                return None;
            }
        };

        let mut record = PostRecord::new(&shortcode, url, now);
        let html_lower = page.html.to_lowercase();

        record.caption = self.extract_caption(page);
        record.likes_count = self.extract_likes(&html_lower);
        record.comments_count = self.extract_comments(&html_lower);

        // Hashtags can hide in attributes that never render, so the match
        // runs over visible text, caption, and raw markup together.
        let combined = format!("{} {} {}", page.text, record.caption, page.html);
        record.has_target_hashtag = self.matcher.matches(&combined);

        Some(record)
    }

    /// Ordered caption strategies; first non-empty result wins, empty
    /// string is an acceptable final value.
    fn extract_caption(&self, page: &Page) -> String {
        let strategies: [&dyn Fn(&Page) -> Option<String>; 3] = [
            &|p| self.caption_from_containers(p),
            &|p| self.caption_from_article(p),
            &|p| self.caption_from_meta(p),
        ];

        for strategy in strategies {
            if let Some(caption) = strategy(page) {
                return caption;
            }
        }
        String::new()
    }

    fn caption_from_containers(&self, page: &Page) -> Option<String> {
        for re in &self.caption_patterns {
            if let Some(cap) = re.captures(&page.html) {
                let text = strip_tags(&cap[1]);
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
        None
    }

    fn caption_from_article(&self, page: &Page) -> Option<String> {
        let cap = self.article_re.captures(&page.html)?;
        let text = strip_tags(&cap[1]);
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    fn caption_from_meta(&self, page: &Page) -> Option<String> {
        let cap = self.meta_description_re.captures(&page.html)?;
        let text = cap[1].trim().to_string();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    fn extract_likes(&self, html_lower: &str) -> i64 {
        for re in &self.likes_patterns {
            if let Some(cap) = re.captures(html_lower) {
                return parse_count(&cap[1]);
            }
        }
        0
    }

    fn extract_comments(&self, html_lower: &str) -> i64 {
        for re in &self.comments_patterns {
            if let Some(cap) = re.captures(html_lower) {
                let cleaned = cap[1].replace(',', "");
                if cleaned.chars().all(|c| c.is_ascii_digit()) {
                    if let Ok(n) = cleaned.parse::<i64>() {
                        return n;
                    }
                }
            }
        }
        0
    }
}

/// The path segment immediately following the post marker, trimmed of
/// trailing separators. None when the URL has no such segment.
pub fn parse_shortcode(url: &str) -> Option<String> {
    let (_, rest) = url.split_once(POST_PATH_MARKER)?;
    let segment = rest
        .trim_end_matches('/')
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    if segment.is_empty() {
        None
    } else {
        Some(segment.to_string())
    }
}

/// Normalize noisy engagement text: strip thousands separators, expand a
/// K/M magnitude suffix, truncate to integer. Unparseable input yields 0.
pub fn parse_count(raw: &str) -> i64 {
    let cleaned = raw.trim().to_lowercase().replace(',', "");

    let (digits, factor) = if let Some(stripped) = cleaned.strip_suffix('k') {
        (stripped, 1_000.0)
    } else if let Some(stripped) = cleaned.strip_suffix('m') {
        (stripped, 1_000_000.0)
    } else {
        (cleaned.as_str(), 1.0)
    };

    match digits.parse::<f64>() {
        Ok(value) if value >= 0.0 => (value * factor) as i64,
        _ => 0,
    }
}

/// Drop markup tags and collapse whitespace, decoding the handful of
/// entities that show up in caption spans.
fn strip_tags(html: &str) -> String {
    let tag_re = Regex::new(r"<[^>]+>").expect("valid regex");
    let text = tag_re.replace_all(html, " ");
    let text = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagwatch_common::MonitorConfig;

    fn extractor(tags: &[&str]) -> Extractor {
        let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        let config = MonitorConfig::new("telegraph", &tags, 10);
        Extractor::new(&config, Duration::ZERO)
    }

    fn page(html: &str) -> Page {
        Page {
            html: html.to_string(),
            text: String::new(),
        }
    }

    // --- parse_count ---

    #[test]
    fn count_with_thousands_separator() {
        assert_eq!(parse_count("1,234"), 1234);
    }

    #[test]
    fn count_with_magnitude_suffixes() {
        assert_eq!(parse_count("2.5K"), 2500);
        assert_eq!(parse_count("2.5k"), 2500);
        assert_eq!(parse_count("3M"), 3_000_000);
        assert_eq!(parse_count("1.2m"), 1_200_000);
    }

    #[test]
    fn unparseable_count_defaults_to_zero() {
        assert_eq!(parse_count("a lot"), 0);
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("k"), 0);
    }

    // --- parse_shortcode ---

    #[test]
    fn shortcode_from_canonical_url() {
        assert_eq!(
            parse_shortcode("https://www.instagram.com/p/AbC123/").as_deref(),
            Some("AbC123")
        );
    }

    #[test]
    fn shortcode_survives_query_string() {
        assert_eq!(
            parse_shortcode("https://www.instagram.com/p/AbC123/?img_index=1").as_deref(),
            Some("AbC123")
        );
    }

    #[test]
    fn url_without_marker_has_no_shortcode() {
        assert_eq!(parse_shortcode("https://www.instagram.com/telegraph/"), None);
        assert_eq!(parse_shortcode("https://www.instagram.com/p/"), None);
    }

    // --- discovery ---

    #[test]
    fn discovery_prefers_article_links() {
        let ex = extractor(&[]);
        let profile = page(
            r#"<html><body>
            <nav><a href="/p/NAV000/">nav</a></nav>
            <article><a href="/p/AAA111/">a</a><a href="/p/BBB222/">b</a></article>
            </body></html>"#,
        );
        let urls = ex.discover_post_urls(&profile, "https://www.instagram.com/telegraph/");
        assert_eq!(
            urls,
            vec![
                "https://www.instagram.com/p/AAA111/",
                "https://www.instagram.com/p/BBB222/"
            ]
        );
    }

    #[test]
    fn discovery_falls_back_to_whole_document() {
        let ex = extractor(&[]);
        let profile = page(r#"<div><a href="https://www.instagram.com/p/CCC333/">c</a></div>"#);
        let urls = ex.discover_post_urls(&profile, "https://www.instagram.com/telegraph/");
        assert_eq!(urls, vec!["https://www.instagram.com/p/CCC333/"]);
    }

    #[test]
    fn discovery_dedupes_and_keeps_order() {
        let ex = extractor(&[]);
        let profile = page(
            r#"<article>
            <a href="/p/AAA111/">a</a>
            <a href="/p/AAA111/">a again</a>
            <a href="/p/BBB222/">b</a>
            <a href="/about/">not a post</a>
            </article>"#,
        );
        let urls = ex.discover_post_urls(&profile, "https://www.instagram.com/telegraph/");
        assert_eq!(urls.len(), 2);
        assert!(urls[0].ends_with("/p/AAA111/"));
        assert!(urls[1].ends_with("/p/BBB222/"));
    }

    #[test]
    fn empty_profile_yields_no_candidates() {
        let ex = extractor(&[]);
        let urls = ex.discover_post_urls(&page(""), "https://www.instagram.com/telegraph/");
        assert!(urls.is_empty());
    }

    // --- caption strategies ---

    #[test]
    fn caption_from_known_container() {
        let ex = extractor(&[]);
        let p = page(r#"<div class="x _a9zr y"><h2>user</h2><span>First caption</span></div>"#);
        assert_eq!(ex.extract_caption(&p), "First caption");
    }

    #[test]
    fn caption_falls_back_to_article_text() {
        let ex = extractor(&[]);
        let p = page("<article><div>Posted today: <b>big</b> news</div></article>");
        assert_eq!(ex.extract_caption(&p), "Posted today: big news");
    }

    #[test]
    fn caption_falls_back_to_meta_description() {
        let ex = extractor(&[]);
        let p = page(r#"<head><meta property="og:description" content="Meta caption here"></head>"#);
        assert_eq!(ex.extract_caption(&p), "Meta caption here");
    }

    #[test]
    fn missing_caption_is_empty_string() {
        let ex = extractor(&[]);
        assert_eq!(ex.extract_caption(&page("<html></html>")), "");
    }

    // --- counts ---

    #[test]
    fn likes_first_pattern_wins() {
        let ex = extractor(&[]);
        let html = "<span>1,234 likes</span> liked by 99".to_lowercase();
        assert_eq!(ex.extract_likes(&html), 1234);
    }

    #[test]
    fn likes_views_is_last_resort() {
        let ex = extractor(&[]);
        assert_eq!(ex.extract_likes("<span>12.5k views</span>"), 12_500);
    }

    #[test]
    fn comments_accept_only_digits() {
        let ex = extractor(&[]);
        assert_eq!(ex.extract_comments("view all 1,402 comments"), 1402);
        assert_eq!(ex.extract_comments("no counts here"), 0);
    }

    // --- whole-post extraction ---

    #[test]
    fn post_with_hashtag_and_counts() {
        let ex = extractor(&["ukraine"]);
        let p = Page {
            html: r#"<article><div class="_a9zr"><span>News #ukraine</span></div>
                     <span>100 likes</span><span>10 comments</span></article>"#
                .to_string(),
            text: "News #ukraine 100 likes 10 comments".to_string(),
        };
        let record = ex
            .extract_post("https://www.instagram.com/p/AAA111/", &p, Utc::now())
            .unwrap();
        assert_eq!(record.shortcode, "AAA111");
        assert_eq!(record.id, "post_AAA111");
        assert_eq!(record.caption, "News #ukraine");
        assert_eq!(record.likes_count, 100);
        assert_eq!(record.comments_count, 10);
        assert!(record.has_target_hashtag);
        assert!(!record.notified);
    }

    #[test]
    fn post_without_parseable_data_gets_defaults() {
        let ex = extractor(&["ukraine"]);
        let p = page("<article><span>just a photo</span></article>");
        let record = ex
            .extract_post("https://www.instagram.com/p/BBB222/", &p, Utc::now())
            .unwrap();
        assert_eq!(record.likes_count, 0);
        assert_eq!(record.comments_count, 0);
        assert!(!record.has_target_hashtag);
        assert_eq!(record.caption, "just a photo");
    }

    #[test]
    fn hashtag_hidden_in_markup_still_matches() {
        let ex = extractor(&["ukraine"]);
        let p = Page {
            html: r##"<article data-tags="#ukraine"><span>photo</span></article>"##.to_string(),
            text: "photo".to_string(),
        };
        let record = ex
            .extract_post("https://www.instagram.com/p/CCC333/", &p, Utc::now())
            .unwrap();
        assert!(record.has_target_hashtag);
    }

    #[test]
    fn malformed_url_is_skipped() {
        let ex = extractor(&[]);
        assert!(ex
            .extract_post("https://www.instagram.com/reel-ish/", &page(""), Utc::now())
            .is_none());
    }
}
