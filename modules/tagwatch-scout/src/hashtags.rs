use std::collections::HashSet;

use regex::Regex;
use tracing::debug;

/// Case-insensitive hashtag detector over free text.
///
/// Two independent detectors, either one sufficient: a token scan for
/// `#word` with set membership against the monitored tags, and a literal
/// search for `#tag` or the space-padded bare word (posts sometimes mention
/// a tag without the symbol).
pub struct HashtagMatcher {
    tags: Vec<String>,
    token_re: Regex,
}

impl HashtagMatcher {
    /// Tags are lowercased and deduplicated here, once, keeping
    /// configuration order. A leading `#` is tolerated and stripped.
    pub fn new(tags: &[String]) -> Self {
        let mut seen = HashSet::new();
        let tags = tags
            .iter()
            .map(|t| t.trim().trim_start_matches('#').to_lowercase())
            .filter(|t| !t.is_empty() && seen.insert(t.clone()))
            .collect();

        Self {
            tags,
            token_re: Regex::new(r"#(\w+)").expect("valid regex"),
        }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// True if any monitored hashtag appears in `text`.
    pub fn matches(&self, text: &str) -> bool {
        if text.is_empty() || self.tags.is_empty() {
            return false;
        }

        let lower = text.to_lowercase();

        // Detector 1: tokenize and test set membership
        let tokens: HashSet<&str> = self
            .token_re
            .captures_iter(&lower)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .collect();
        for tag in &self.tags {
            if tokens.contains(tag.as_str()) {
                debug!(tag = tag.as_str(), "Matched tokenized hashtag");
                return true;
            }
        }

        // Detector 2: literal substring, with and without the symbol
        let padded = format!(" {lower} ");
        for tag in &self.tags {
            if lower.contains(&format!("#{tag}")) {
                debug!(tag = tag.as_str(), "Matched literal hashtag");
                return true;
            }
            if padded.contains(&format!(" {tag} ")) {
                debug!(tag = tag.as_str(), "Matched bare keyword");
                return true;
            }
        }

        false
    }
}
