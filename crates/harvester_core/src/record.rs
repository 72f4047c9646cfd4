use std::fmt;

use serde::Serialize;
use url::Url;

/// Number of review text characters that take part in a review's identity.
pub const REVIEW_KEY_TEXT_PREFIX: usize = 100;

/// Stable identity of a record, used to collapse re-observed items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait Keyed {
    fn dedup_key(&self) -> DedupKey;
}

/// One venue from a results feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingRecord {
    pub name: String,
    pub rating: Option<f32>,
    pub review_count: Option<u32>,
    pub identity_url: String,
}

impl Keyed for ListingRecord {
    fn dedup_key(&self) -> DedupKey {
        DedupKey::new(self.identity_url.clone())
    }
}

/// One review from a venue's detail view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewRecord {
    pub subject_name: String,
    pub author: String,
    pub stars: Option<f32>,
    pub text: String,
}

impl Keyed for ReviewRecord {
    // Reviews carry no canonical URL.
    fn dedup_key(&self) -> DedupKey {
        let stars = self.stars.map(|s| s.to_string()).unwrap_or_default();
        let prefix: String = self.text.chars().take(REVIEW_KEY_TEXT_PREFIX).collect();
        DedupKey::new(format!("{}|{}|{}", self.author, stars, prefix))
    }
}

/// Collapse whitespace and newline runs to single spaces and trim the ends.
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical identity of a listing link: everything after the first `&` is
/// session noise. Relative links are resolved against `base`.
pub fn identity_url(href: &str, base: Option<&Url>) -> Option<String> {
    let trimmed = href.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let head = trimmed.split('&').next().unwrap_or(trimmed);
    match Url::parse(head) {
        Ok(url) => Some(url.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => base
            .and_then(|b| b.join(head).ok())
            .map(|u| u.to_string())
            .or_else(|| Some(head.to_string())),
        Err(_) => None,
    }
}
