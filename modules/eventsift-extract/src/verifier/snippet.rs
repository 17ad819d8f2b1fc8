//! Raw-HTML fallback: rank windows around every occurrence of the title.

use super::keywords::Keywords;
use super::scoring::{score_snippet, year_match, BodyPosition, SnippetFacts, SnippetPenalty};
use crate::dates::has_date_pattern;
use crate::html::strip_tags;
use crate::places::has_place_pattern;

const BEFORE: usize = 2400;
const AFTER: usize = 3000;
const MAX_OCCURRENCES: usize = 50;

/// A window of raw HTML around one title occurrence.
#[derive(Debug, Clone)]
pub struct Snippet {
    pub html: String,
    /// Tag-stripped text of `html`.
    pub text: String,
    /// Byte offset of the title occurrence in the page.
    pub offset: usize,
    pub penalty: SnippetPenalty,
}

fn floor_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

fn escape_html(title: &str) -> String {
    title
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Byte offsets of every ASCII case-insensitive occurrence of the title,
/// written plainly or HTML-escaped.
fn occurrences(lower_html: &str, title_key: &str) -> Vec<(usize, usize)> {
    let mut needles = vec![title_key.to_string()];
    let escaped = escape_html(title_key);
    if escaped != title_key {
        needles.push(escaped);
    }
    let mut found: Vec<(usize, usize)> = needles
        .iter()
        .flat_map(|n| lower_html.match_indices(n.as_str()).map(|(at, m)| (at, m.len())))
        .collect();
    found.sort_unstable();
    found.dedup_by_key(|(at, _)| *at);
    found.truncate(MAX_OCCURRENCES);
    found
}

/// Lowest-penalty snippet around the title, or `None` when the title does
/// not occur in the HTML.
pub fn best_snippet(
    raw: &str,
    title_key: &str,
    keywords: &Keywords,
    expected_year: Option<i32>,
) -> Option<Snippet> {
    if title_key.is_empty() {
        return None;
    }
    let lower = raw.to_ascii_lowercase();
    let body_start = lower.find("<body");
    occurrences(&lower, title_key)
        .into_iter()
        .map(|(at, len)| {
            let start = floor_boundary(raw, at.saturating_sub(BEFORE));
            let end = ceil_boundary(raw, at + len + AFTER);
            let html = &raw[start..end];
            let text = strip_tags(html);
            let facts = SnippetFacts {
                year: year_match(&text, expected_year),
                has_date: has_date_pattern(&text),
                keyword_misses: keywords.misses(&text),
                position: BodyPosition::of(at, body_start),
                has_location: has_place_pattern(&text),
                title_recoverable: text.to_ascii_lowercase().contains(title_key),
            };
            Snippet {
                html: html.to_string(),
                text,
                offset: at,
                penalty: score_snippet(&facts),
            }
        })
        .min_by(|a, b| a.penalty.cmp_total(&b.penalty))
}
