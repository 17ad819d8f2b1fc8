//! Keyword tagging. Tags are lowercase and hyphenated ("live-music").

use std::collections::BTreeSet;

use regex::Regex;
use tracing::warn;

use eventsift_common::ExtractedEvent;

use crate::html::strip_tags;

/// Built-in keyword → tag map, used when the caller supplies none.
pub const DEFAULT_KEYWORDS: &[(&str, &str)] = &[
    ("concert", "music"),
    ("music", "music"),
    ("jazz", "music"),
    ("live music", "live-music"),
    ("band", "music"),
    ("dj", "music"),
    ("art", "arts"),
    ("gallery", "arts"),
    ("exhibit", "arts"),
    ("exhibition", "arts"),
    ("theater", "theater"),
    ("theatre", "theater"),
    ("comedy", "comedy"),
    ("film", "film"),
    ("movie", "film"),
    ("screening", "film"),
    ("festival", "festival"),
    ("fair", "festival"),
    ("market", "market"),
    ("farmers market", "farmers-market"),
    ("food", "food"),
    ("tasting", "food"),
    ("beer", "drinks"),
    ("wine", "drinks"),
    ("family", "family"),
    ("kids", "family"),
    ("children", "family"),
    ("workshop", "education"),
    ("class", "education"),
    ("lecture", "education"),
    ("talk", "education"),
    ("volunteer", "volunteer"),
    ("fundraiser", "fundraiser"),
    ("run", "sports"),
    ("5k", "sports"),
    ("marathon", "sports"),
    ("yoga", "fitness"),
    ("hike", "outdoors"),
    ("outdoor", "outdoors"),
    ("free", "free"),
];

/// Lowercase, with every run of non-alphanumerics collapsed to one hyphen.
pub fn normalize_tag(tag: &str) -> String {
    let mut out = String::with_capacity(tag.len());
    for c in tag.trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

fn keyword_pattern(keyword: &str) -> Option<Regex> {
    let words: Vec<String> = keyword.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return None;
    }
    match Regex::new(&format!(r"(?i)\b{}\b", words.join(r"\s+"))) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(keyword, error = %e, "Skipping tag keyword");
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct TagExtractor {
    rules: Vec<(Regex, String)>,
}

impl Default for TagExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS.iter().copied())
    }
}

impl TagExtractor {
    pub fn new<K, V>(keywords: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let rules = keywords
            .into_iter()
            .filter_map(|(keyword, tag)| {
                let tag = normalize_tag(tag.as_ref());
                if tag.is_empty() {
                    return None;
                }
                keyword_pattern(keyword.as_ref()).map(|re| (re, tag))
            })
            .collect();
        Self { rules }
    }

    /// Caller map when given and non-empty, the built-in map otherwise.
    pub fn with_keywords<K, V>(keywords: Option<impl IntoIterator<Item = (K, V)>>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        match keywords.map(Self::new) {
            Some(extractor) if !extractor.rules.is_empty() => extractor,
            _ => Self::default(),
        }
    }

    /// Sorted union of the explicit tags and every keyword hit in `texts`.
    pub fn tags(&self, texts: &[&str], explicit: &[String]) -> Vec<String> {
        let mut tags: BTreeSet<String> = explicit
            .iter()
            .map(|t| normalize_tag(t))
            .filter(|t| !t.is_empty())
            .collect();
        for (re, tag) in &self.rules {
            if tags.contains(tag) {
                continue;
            }
            if texts.iter().any(|text| re.is_match(text)) {
                tags.insert(tag.clone());
            }
        }
        tags.into_iter().collect()
    }

    /// Tags for a candidate from its title, description and location, plus
    /// the page text when HTML is available.
    pub fn for_event(&self, event: &ExtractedEvent, html: Option<&str>) -> Vec<String> {
        let page = html.map(strip_tags);
        let mut texts = vec![event.title.as_str()];
        texts.extend(event.description.as_deref());
        texts.extend(event.location.as_deref());
        texts.extend(page.as_deref());
        self.tags(&texts, &event.tags)
    }
}
