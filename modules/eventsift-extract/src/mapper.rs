//! Raw generation output to candidates. Nothing is trusted yet: both
//! statuses start as `tbd` and only the verifier may confirm them.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::debug;
use url::Url;

use eventsift_common::{collapse_whitespace, DateSpan, ExtractedEvent, RawAgentEvent};

use crate::dates::parse_agent_date;

/// Second-level labels that sit under a country code ("example.co.uk").
const SECOND_LEVEL_SUFFIXES: &[&str] = &["ac", "co", "com", "edu", "gov", "net", "org"];

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(collapse_whitespace)
        .filter(|v| !v.is_empty())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Acronyms (three characters or fewer) are upper-cased, anything else is
/// capitalized.
fn source_case(name: &str) -> String {
    if name.chars().count() <= 3 {
        name.to_uppercase()
    } else {
        capitalize(name)
    }
}

/// Label of the registrable domain: "www.austintexas.gov" gives "austintexas",
/// "events.example.co.uk" gives "example".
pub fn registrable_label(host: &str) -> Option<&str> {
    let host = host.trim_end_matches('.');
    let host = host.strip_prefix("www.").unwrap_or(host);
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    match labels.as_slice() {
        [] => None,
        [only] => Some(*only),
        [.., sld, second, tld]
            if tld.len() == 2 && SECOND_LEVEL_SUFFIXES.contains(second) =>
        {
            Some(*sld)
        }
        [.., sld, _tld] => Some(*sld),
    }
}

/// Explicit source when given, otherwise the registrable domain of the page.
pub fn derive_source(explicit: Option<&str>, final_url: &str) -> Option<String> {
    if let Some(name) = non_empty(explicit) {
        return Some(source_case(&name));
    }
    let url = Url::parse(final_url).ok()?;
    let label = registrable_label(url.host_str()?)?;
    Some(source_case(label))
}

fn resolve_link(link: Option<&str>, final_url: &str) -> String {
    let base = Url::parse(final_url).ok();
    non_empty(link)
        .and_then(|l| match &base {
            Some(base) => base.join(&l).ok(),
            None => Url::parse(&l).ok(),
        })
        .map(|u| u.to_string())
        .unwrap_or_else(|| final_url.to_string())
}

/// One raw event to a candidate. `None` without a title.
pub fn map_event(raw: &RawAgentEvent, final_url: &str) -> Option<ExtractedEvent> {
    let title = non_empty(raw.title.as_deref())?;
    let mut event = ExtractedEvent::new(title, resolve_link(raw.link.as_deref(), final_url));

    let start = raw.start_date.as_deref().and_then(parse_agent_date);
    let end = raw.end_date.as_deref().and_then(parse_agent_date);
    if let Some(start) = start {
        let span = DateSpan::new(start, end.unwrap_or(start));
        event.start = Some(span.start);
        event.end = Some(span.end);
    }
    event.location = non_empty(raw.location.as_deref());
    event.description = non_empty(raw.description.as_deref());
    event.source = derive_source(raw.source.as_deref(), final_url);
    Some(event)
}

fn dedupe_key(event: &ExtractedEvent) -> (String, Option<NaiveDate>, String) {
    (
        event.title.to_lowercase(),
        event.start.map(|d| d.date()),
        event
            .location
            .as_deref()
            .unwrap_or_default()
            .to_lowercase(),
    )
}

/// Map a batch, dropping untitled entries and keeping the first of each
/// (title, start date, location) group.
pub fn map_events(raw: &[RawAgentEvent], final_url: &str) -> Vec<ExtractedEvent> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());
    for r in raw {
        let Some(event) = map_event(r, final_url) else {
            debug!(?r, "Dropping untitled event");
            continue;
        };
        if seen.insert(dedupe_key(&event)) {
            out.push(event);
        }
    }
    out
}
