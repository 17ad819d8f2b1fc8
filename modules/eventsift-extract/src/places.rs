//! "City, ST" grammar over visible text. Three surface forms are recognised
//! (comma, parenthesized state, dash) and every state token is validated
//! against the USPS table, full names included.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use eventsift_common::{collapse_whitespace, normalize_state};

const CITY: &str = r"([A-Z][\w.'’\-]*(?:[ \t]+[A-Z][\w.'’\-]*){0,3})";
const STATE: &str = r"([A-Z]{2}\b|[A-Z][a-z]+(?:[ \t]+(?:of[ \t]+)?[A-Z][a-z]+){0,2})";

static COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\b{CITY},[ \t]*{STATE}")).expect("valid regex"));
static PAREN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b{CITY}[ \t]*\([ \t]*{STATE}[ \t]*\)")).expect("valid regex")
});
static DASH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b{CITY}[ \t]+[-–—][ \t]+{STATE}")).expect("valid regex")
});
static LOOSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+){0,2})[ \t]+([A-Z]{2})\b").expect("valid regex")
});
static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+").expect("valid regex"));

/// Words that precede a city name inside a capitalized run ("Convention
/// Center Austin, TX"). Everything up to the last one is dropped.
const LEADING_NOISE: &[&str] = &[
    "amphitheater", "arena", "at", "auditorium", "ave", "avenue", "ballroom", "blvd",
    "boulevard", "building", "campus", "center", "centre", "church", "club", "college",
    "convention", "date", "downtown", "event", "events", "fairgrounds", "hall", "home", "hotel",
    "in", "library", "location", "museum", "online", "park", "pavilion", "plaza", "rd",
    "register", "road", "room", "school", "square", "stadium", "street", "suite", "the",
    "theater", "theatre", "tickets", "time", "university", "venue", "when", "where",
    "january", "february", "march", "april", "june", "july", "august", "september",
    "october", "november", "december", "jan", "feb", "mar", "apr", "jun", "jul", "aug",
    "sep", "sept", "oct", "nov", "dec", "monday", "tuesday", "wednesday", "thursday",
    "friday", "saturday", "sunday", "mon", "tue", "wed", "thu", "fri", "sat", "sun",
];

/// A validated city/state pair found in text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceMatch {
    pub city: String,
    /// USPS code.
    pub state: &'static str,
    /// Matched text as written (e.g. "Springfield, Illinois").
    pub text: String,
    pub range: Range<usize>,
}

impl PlaceMatch {
    /// Canonical "City, ST" form.
    pub fn label(&self) -> String {
        format!("{}, {}", self.city, self.state)
    }
}

fn is_noise(word: &str) -> bool {
    let bare = word
        .trim_end_matches(|c: char| !c.is_alphanumeric())
        .to_ascii_lowercase();
    LEADING_NOISE.contains(&bare.as_str())
}

/// Byte offset (within `city`) where the real city name starts, or `None`
/// when nothing plausible is left.
fn city_start(city: &str) -> Option<usize> {
    let words: Vec<_> = WORD_RE.find_iter(city).collect();
    let last = words.len().checked_sub(1)?;
    // The final word is always kept: "Oak Park" is a city, "Zilker Park Austin" is not.
    let keep_from = words[..last]
        .iter()
        .rposition(|w| is_noise(w.as_str()))
        .map(|i| i + 1)
        .unwrap_or(0);
    let first = words.get(keep_from)?;
    if is_noise(first.as_str()) && keep_from == last {
        return None;
    }
    Some(first.start())
}

/// Longest valid state prefix of a captured state token: `(code, byte_len)`.
fn resolve_state(token: &str) -> Option<(&'static str, usize)> {
    let words: Vec<_> = WORD_RE.find_iter(token).collect();
    (1..=words.len()).rev().find_map(|n| {
        let end = words[n - 1].end();
        normalize_state(&token[..end]).map(|code| (code, end))
    })
}

fn scan(re: &Regex, text: &str, out: &mut Vec<PlaceMatch>) {
    let mut pos = 0;
    while pos < text.len() {
        let Some(caps) = re.captures_at(text, pos) else {
            break;
        };
        let (Some(city_m), Some(state_m)) = (caps.get(1), caps.get(2)) else {
            break;
        };
        let resolved = resolve_state(state_m.as_str()).zip(city_start(city_m.as_str()));
        match resolved {
            Some(((state, state_len), offset)) => {
                let start = city_m.start() + offset;
                let end = state_m.start() + state_len;
                out.push(PlaceMatch {
                    city: collapse_whitespace(&text[start..city_m.end()]),
                    state,
                    text: text[start..end].to_string(),
                    range: start..end,
                });
                pos = end;
            }
            // The state token may itself start a real match ("Tickets, Austin, TX").
            None => pos = state_m.start(),
        }
    }
}

fn dedupe_overlaps(mut found: Vec<PlaceMatch>) -> Vec<PlaceMatch> {
    found.sort_by(|a, b| {
        a.range
            .start
            .cmp(&b.range.start)
            .then(b.range.end.cmp(&a.range.end))
    });
    let mut kept: Vec<PlaceMatch> = Vec::with_capacity(found.len());
    for m in found {
        if kept.last().is_some_and(|k| m.range.start < k.range.end) {
            continue;
        }
        kept.push(m);
    }
    kept
}

/// Every city/state mention in the text, in document order.
pub fn find_places(text: &str) -> Vec<PlaceMatch> {
    let mut found = Vec::new();
    scan(&COMMA_RE, text, &mut found);
    scan(&PAREN_RE, text, &mut found);
    scan(&DASH_RE, text, &mut found);
    dedupe_overlaps(found)
}

pub fn first_place(text: &str) -> Option<PlaceMatch> {
    find_places(text).into_iter().next()
}

pub fn has_place_pattern(text: &str) -> bool {
    !find_places(text).is_empty()
}

/// Place nearest to `anchor`, preferring mentions after it.
pub fn nearest_place(text: &str, anchor: usize) -> Option<PlaceMatch> {
    find_places(text).into_iter().min_by_key(|m| {
        if m.range.start >= anchor {
            m.range.start - anchor
        } else {
            anchor.saturating_sub(m.range.end) * 2
        }
    })
}

/// Comma-less "City ST" form, only trusted right after a matched date.
pub fn find_loose_place(text: &str) -> Option<PlaceMatch> {
    let mut found = Vec::new();
    scan(&LOOSE_RE, text, &mut found);
    found.into_iter().next()
}

/// Comma-less "City ST" within `span` bytes after `from`. Offsets in the
/// result are relative to `text`.
pub fn loose_place_after(text: &str, from: usize, span: usize) -> Option<PlaceMatch> {
    let tail = text.get(from..)?;
    let cut = tail
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| i >= span)
        .unwrap_or(tail.len());
    let mut m = find_loose_place(&tail[..cut])?;
    m.range = (m.range.start + from)..(m.range.end + from);
    Some(m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_state_name_normalizes() {
        let m = first_place("Held in Springfield, Illinois this spring").unwrap();
        assert_eq!(m.label(), "Springfield, IL");
        assert_eq!(m.text, "Springfield, Illinois");
    }

    #[test]
    fn parenthesized_and_dash_forms() {
        assert_eq!(first_place("Portland (OR)").unwrap().label(), "Portland, OR");
        assert_eq!(first_place("Boise - Idaho").unwrap().label(), "Boise, ID");
    }

    #[test]
    fn venue_words_are_trimmed_from_city() {
        let m = first_place("Palmer Convention Center Austin, TX").unwrap();
        assert_eq!(m.label(), "Austin, TX");
        assert_eq!(m.text, "Austin, TX");
    }

    #[test]
    fn multi_word_cities_survive() {
        assert_eq!(first_place("Salt Lake City, UT").unwrap().label(), "Salt Lake City, UT");
        assert_eq!(first_place("Oak Park, IL").unwrap().label(), "Oak Park, IL");
        assert_eq!(first_place("St. Paul, MN").unwrap().label(), "St. Paul, MN");
    }

    #[test]
    fn invalid_state_retries_from_state_token() {
        let m = first_place("Buy Tickets, Austin, TX").unwrap();
        assert_eq!(m.label(), "Austin, TX");
    }

    #[test]
    fn trailing_words_after_state_are_ignored() {
        let m = first_place("Dallas, Texas Tickets on sale").unwrap();
        assert_eq!(m.label(), "Dallas, TX");
        assert_eq!(m.text, "Dallas, Texas");
    }

    #[test]
    fn lowercase_codes_are_not_states() {
        assert!(first_place("Hello, in the park").is_none());
        assert!(!has_place_pattern("Welcome, Friends"));
    }

    #[test]
    fn loose_form_without_comma() {
        assert_eq!(find_loose_place("Mar 3 Denver CO").unwrap().label(), "Denver, CO");
    }

    #[test]
    fn loose_place_offsets_are_absolute() {
        let text = "Mar 3 Denver CO";
        let m = loose_place_after(text, 5, 80).unwrap();
        assert_eq!(&text[m.range.clone()], "Denver CO");
        assert!(loose_place_after(text, 5, 4).is_none());
    }

    #[test]
    fn nearest_place_prefers_following() {
        let text = "Reno, NV and many other words here ... Jazz Night ... Tucson, AZ";
        let anchor = text.find("Jazz Night").unwrap();
        assert_eq!(nearest_place(text, anchor).unwrap().label(), "Tucson, AZ");
    }
}
