use std::sync::LazyLock;

use chrono::NaiveTime;
use scraper::Selector;

use eventsift_common::{DateSpan, EventDate, EvidenceContext, StrictResult};

use super::{itemprop_value, jsonld, meta_value, EvidenceChain, EvidenceStrategy, PageSource};
use crate::dates::{first_date, nearest_date, parse_agent_date};
use crate::html::selector;

const META_START_KEYS: &[&str] = &[
    "event:start_time",
    "event:start_date",
    "og:event:start_time",
    "og:start_time",
    "startdate",
    "start_date",
    "event_start",
    "dtstart",
];

const META_END_KEYS: &[&str] = &[
    "event:end_time",
    "event:end_date",
    "og:event:end_time",
    "og:end_time",
    "enddate",
    "end_date",
    "event_end",
    "dtend",
];

static ITEMPROP_START_SEL: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[itemprop="startDate"]"#));
static ITEMPROP_END_SEL: LazyLock<Selector> = LazyLock::new(|| selector(r#"[itemprop="endDate"]"#));

/// Parse a structured date literal. Midnight timestamps carry no real
/// time of day and become calendar dates.
pub fn parse_structured_date(literal: &str) -> Option<EventDate> {
    match parse_agent_date(literal)? {
        EventDate::Instant { local, .. } if local.time() == NaiveTime::MIN => {
            Some(EventDate::CalendarDate(local.date()))
        }
        other => Some(other),
    }
}

fn span_from_literals(start: &str, end: Option<&str>) -> Option<DateSpan> {
    let start = parse_structured_date(start)?;
    let end = end.and_then(parse_structured_date).unwrap_or(start);
    Some(DateSpan::new(start, end))
}

// --- Structured data ---

pub struct JsonLdDates;

impl EvidenceStrategy<DateSpan> for JsonLdDates {
    fn context(&self) -> EvidenceContext {
        EvidenceContext::JsonLd
    }

    fn extract(&self, page: &PageSource<'_>) -> StrictResult<DateSpan> {
        let events = jsonld::events(&page.doc);
        let Some(event) = jsonld::select_event(&events, page.anchor.as_deref()) else {
            return StrictResult::tbd();
        };
        let Some(start) = event.start_date.as_deref() else {
            return StrictResult::tbd();
        };
        match span_from_literals(start, event.end_date.as_deref()) {
            Some(span) => StrictResult::confirmed(span, start, self.context()),
            None => StrictResult::tbd(),
        }
    }
}

// --- Meta tags and microdata ---

pub struct MetaTagDates;

impl EvidenceStrategy<DateSpan> for MetaTagDates {
    fn context(&self) -> EvidenceContext {
        EvidenceContext::MetaTags
    }

    fn extract(&self, page: &PageSource<'_>) -> StrictResult<DateSpan> {
        let start = meta_value(page, META_START_KEYS)
            .or_else(|| itemprop_value(page, &ITEMPROP_START_SEL));
        let Some(start) = start else {
            return StrictResult::tbd();
        };
        let end =
            meta_value(page, META_END_KEYS).or_else(|| itemprop_value(page, &ITEMPROP_END_SEL));
        match span_from_literals(&start, end.as_deref()) {
            Some(span) => StrictResult::confirmed(span, &start, self.context()),
            None => StrictResult::tbd(),
        }
    }
}

// --- Visible text ---

pub struct VisibleTextDates;

impl EvidenceStrategy<DateSpan> for VisibleTextDates {
    fn context(&self) -> EvidenceContext {
        EvidenceContext::VisibleText
    }

    fn extract(&self, page: &PageSource<'_>) -> StrictResult<DateSpan> {
        let found = match page.anchor_offset() {
            Some(at) => nearest_date(&page.text, at, page.reference_year),
            None => first_date(&page.text, page.reference_year),
        };
        match found {
            Some(m) => {
                let span = DateSpan::new(m.start.into(), m.end.into());
                StrictResult::confirmed(span, &m.text, self.context())
            }
            None => StrictResult::tbd(),
        }
    }
}

/// Structured data, then meta tags, then visible text.
pub struct StrictDateExtractor {
    chain: EvidenceChain<DateSpan>,
}

impl Default for StrictDateExtractor {
    fn default() -> Self {
        Self {
            chain: EvidenceChain::new(vec![
                Box::new(JsonLdDates),
                Box::new(MetaTagDates),
                Box::new(VisibleTextDates),
            ]),
        }
    }
}

impl StrictDateExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extract(&self, page: &PageSource<'_>) -> StrictResult<DateSpan> {
        self.chain.extract(page)
    }

    /// Convenience entry point over a full HTML document.
    pub fn extract_html(&self, html: &str) -> StrictResult<DateSpan> {
        self.extract(&PageSource::parse(html))
    }
}
