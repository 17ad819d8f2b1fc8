//! Checks a generated location against the page before trusting it.

use regex::Regex;

use eventsift_common::{collapse_whitespace, normalize_state, state_name};

use crate::html::strip_tags;
use crate::strict::PageSource;

/// Non-tag characters tolerated between city and state in raw HTML
/// ("Austin</span> &middot; <span>TX").
const PROXIMITY_CHARS: usize = 80;
const CITY_STATE_GAP: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corroboration {
    Exact,
    Proximity,
    CityThenState,
    CoOccurrence,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corroborated {
    /// Canonical "City, ST" when the claim parsed, else the claim as given.
    pub label: String,
    pub evidence: String,
    pub how: Corroboration,
}

struct Claim {
    city: String,
    state: &'static str,
}

impl Claim {
    /// "City, ST" or "Venue, City, State"; the last two comma parts count.
    fn parse(location: &str) -> Option<Self> {
        let (head, state) = location.rsplit_once(',')?;
        let state = normalize_state(state.trim())?;
        let city = head.rsplit(',').next()?.trim();
        (!city.is_empty()).then(|| Claim {
            city: city.to_string(),
            state,
        })
    }

    fn label(&self) -> String {
        format!("{}, {}", self.city, self.state)
    }

    fn city_pattern(&self) -> String {
        format!(r"(?i:\b{}\b)", regex::escape(&self.city))
    }

    /// USPS code (case-sensitive) or full state name.
    fn state_pattern(&self) -> String {
        match state_name(self.state) {
            Some(name) => format!(r"(?:\b{}\b|(?i:\b{}\b))", self.state, regex::escape(name)),
            None => format!(r"\b{}\b", self.state),
        }
    }
}

fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}

fn exact(location: &str, text: &str) -> Option<String> {
    let at = find_ci(text, location)?;
    Some(text[at..at + location.len()].to_string())
}

fn proximity(claim: &Claim, raw: &str) -> Option<String> {
    let pattern = format!(
        r"{}(?:<[^>]*>|[^<]){{0,{PROXIMITY_CHARS}}}?{}",
        claim.city_pattern(),
        claim.state_pattern()
    );
    let re = Regex::new(&pattern).ok()?;
    let m = re.find(raw)?;
    let evidence = collapse_whitespace(&strip_tags(m.as_str()));
    (!evidence.is_empty()).then_some(evidence)
}

fn city_then_state(claim: &Claim, text: &str) -> Option<String> {
    let pattern = format!(
        r"{}.{{0,{CITY_STATE_GAP}}}?{}",
        claim.city_pattern(),
        claim.state_pattern()
    );
    let re = Regex::new(&pattern).ok()?;
    re.find(text).map(|m| m.as_str().to_string())
}

fn co_occurrence(claim: &Claim, region: &str) -> Option<String> {
    let city = Regex::new(&claim.city_pattern()).ok()?;
    let state = Regex::new(&claim.state_pattern()).ok()?;
    let m = city.find(region)?;
    state.is_match(region).then(|| m.as_str().to_string())
}

/// Try, in order: exact substring of the visible text, city and state close
/// together in raw HTML, city followed by state in visible text, and both
/// appearing anywhere in `region` (the text around the title).
pub fn corroborate(
    location: &str,
    page: &PageSource<'_>,
    region: Option<&str>,
) -> Option<Corroborated> {
    let location = collapse_whitespace(location);
    if location.is_empty() {
        return None;
    }
    let claim = Claim::parse(&location);
    let label = claim
        .as_ref()
        .map(Claim::label)
        .unwrap_or_else(|| location.clone());

    if let Some(evidence) = exact(&location, &page.text) {
        return Some(Corroborated {
            label,
            evidence,
            how: Corroboration::Exact,
        });
    }
    let claim = claim?;
    let found = proximity(&claim, page.raw)
        .map(|e| (e, Corroboration::Proximity))
        .or_else(|| {
            city_then_state(&claim, &page.text).map(|e| (e, Corroboration::CityThenState))
        })
        .or_else(|| {
            region
                .and_then(|r| co_occurrence(&claim, r))
                .map(|e| (e, Corroboration::CoOccurrence))
        });
    found.map(|(evidence, how)| Corroborated {
        label,
        evidence,
        how,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_keeps_page_casing() {
        let page = PageSource::parse("<body><p>AUSTIN, TX</p></body>");
        let c = corroborate("Austin, TX", &page, None).unwrap();
        assert_eq!(c.how, Corroboration::Exact);
        assert_eq!(c.evidence, "AUSTIN, TX");
        assert_eq!(c.label, "Austin, TX");
    }

    #[test]
    fn proximity_tolerates_venue_text_and_tags() {
        let page = PageSource::parse(
            "<body><span>Austin</span> &middot; <em>Moody Theater</em> &middot; \
             <span>Texas</span></body>",
        );
        let c = corroborate("Austin, TX", &page, None).unwrap();
        assert_eq!(c.how, Corroboration::Proximity);
        assert!(c.evidence.starts_with("Austin"));
        assert!(c.evidence.ends_with("Texas"));
    }

    #[test]
    fn co_occurrence_needs_region() {
        let filler = "x ".repeat(200);
        let html = format!("<body><p>Texas</p><p>{filler}</p><p>Austin</p></body>");
        let page = PageSource::parse(&html);
        assert!(corroborate("Austin, TX", &page, None).is_none());

        let c = corroborate("Austin, TX", &page, Some("Texas ... Austin")).unwrap();
        assert_eq!(c.how, Corroboration::CoOccurrence);
        assert_eq!(c.evidence, "Austin");
    }

    #[test]
    fn absent_location_is_rejected() {
        let page = PageSource::parse("<body><p>Jazz Night</p><p>Mar 3, 2026</p></body>");
        assert!(corroborate("Nashville, TN", &page, Some("Jazz Night Mar 3, 2026")).is_none());
    }

    #[test]
    fn lowercase_code_is_not_a_state() {
        let page = PageSource::parse("<body><p>Portland is lovely, or so they say</p></body>");
        assert!(corroborate("Portland, OR", &page, None).is_none());
    }
}
