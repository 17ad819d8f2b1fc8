use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::EventSiftError;

// --- Provenance ---

/// Whether a field is backed by evidence found in the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldStatus {
    Confirmed,
    #[default]
    Tbd,
}

/// Where the evidence for a confirmed field was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvidenceContext {
    JsonLd,
    MetaTags,
    VisibleText,
    Description,
}

impl EvidenceContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceContext::JsonLd => "json-ld",
            EvidenceContext::MetaTags => "meta-tags",
            EvidenceContext::VisibleText => "visible-text",
            EvidenceContext::Description => "description",
        }
    }
}

impl fmt::Display for EvidenceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collapse runs of whitespace to single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// --- Dates ---

/// A date-only value or a timestamp. All-day-ness is carried by the variant
/// and only resolved into UTC instants by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EventDate {
    CalendarDate(NaiveDate),
    Instant {
        local: NaiveDateTime,
        offset: Option<FixedOffset>,
    },
}

const NAIVE_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const OFFSET_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
];

impl EventDate {
    /// Parse an ISO-8601 date or timestamp. A bare `YYYY-MM-DD` stays a
    /// calendar date; anything with a time component becomes an instant,
    /// keeping its UTC offset when one is written.
    pub fn parse_iso(literal: &str) -> Option<EventDate> {
        let s = literal.trim();
        if s.is_empty() {
            return None;
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Some(EventDate::CalendarDate(date));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(EventDate::Instant {
                local: dt.naive_local(),
                offset: Some(*dt.offset()),
            });
        }
        for fmt in OFFSET_TIMESTAMP_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                return Some(EventDate::Instant {
                    local: dt.naive_local(),
                    offset: Some(*dt.offset()),
                });
            }
        }
        for fmt in NAIVE_TIMESTAMP_FORMATS {
            if let Ok(local) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(EventDate::Instant {
                    local,
                    offset: None,
                });
            }
        }
        None
    }

    /// Calendar day in the literal's own frame.
    pub fn date(&self) -> NaiveDate {
        match self {
            EventDate::CalendarDate(date) => *date,
            EventDate::Instant { local, .. } => local.date(),
        }
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self, EventDate::CalendarDate(_))
    }

    /// Ordering key: calendar dates sort as local midnight.
    pub fn sort_key(&self) -> NaiveDateTime {
        match self {
            EventDate::CalendarDate(date) => date.and_hms_opt(0, 0, 0).unwrap_or_default(),
            EventDate::Instant { local, .. } => *local,
        }
    }

    pub fn to_iso_string(&self) -> String {
        match self {
            EventDate::CalendarDate(date) => date.format("%Y-%m-%d").to_string(),
            EventDate::Instant {
                local,
                offset: Some(offset),
            } => format!("{}{}", local.format("%Y-%m-%dT%H:%M:%S"), offset),
            EventDate::Instant {
                local,
                offset: None,
            } => local.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }
}

impl From<NaiveDate> for EventDate {
    fn from(date: NaiveDate) -> Self {
        EventDate::CalendarDate(date)
    }
}

impl fmt::Display for EventDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso_string())
    }
}

impl TryFrom<String> for EventDate {
    type Error = EventSiftError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        EventDate::parse_iso(&value).ok_or(EventSiftError::InvalidDate(value))
    }
}

impl From<EventDate> for String {
    fn from(value: EventDate) -> Self {
        value.to_iso_string()
    }
}

/// A start/end pair with `end >= start` enforced at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSpan {
    pub start: EventDate,
    pub end: EventDate,
}

impl DateSpan {
    pub fn new(start: EventDate, end: EventDate) -> Self {
        if end.sort_key() < start.sort_key() {
            return Self { start, end: start };
        }
        Self { start, end }
    }

    pub fn single(day: EventDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// True when the span covers more than one calendar day.
    pub fn is_multi_day(&self) -> bool {
        self.end.date() > self.start.date()
    }
}

// --- Strict extractor results ---

/// Outcome of one evidence-first extraction. `Confirmed` always carries
/// non-empty, whitespace-normalized evidence and its context.
#[derive(Debug, Clone, PartialEq)]
pub struct StrictResult<T> {
    pub value: Option<T>,
    pub status: FieldStatus,
    pub evidence: Option<String>,
    pub evidence_context: Option<EvidenceContext>,
}

impl<T> StrictResult<T> {
    pub fn confirmed(value: T, evidence: &str, context: EvidenceContext) -> Self {
        let evidence = collapse_whitespace(evidence);
        if evidence.is_empty() {
            return Self::tbd();
        }
        Self {
            value: Some(value),
            status: FieldStatus::Confirmed,
            evidence: Some(evidence),
            evidence_context: Some(context),
        }
    }

    pub fn tbd() -> Self {
        Self {
            value: None,
            status: FieldStatus::Tbd,
            evidence: None,
            evidence_context: None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == FieldStatus::Confirmed && self.value.is_some()
    }

    /// Re-label provenance, e.g. when a page extractor ran over a description.
    pub fn with_context(mut self, context: EvidenceContext) -> Self {
        if self.is_confirmed() {
            self.evidence_context = Some(context);
        }
        self
    }
}

impl<T> Default for StrictResult<T> {
    fn default() -> Self {
        Self::tbd()
    }
}

// --- Raw agent output ---

/// One event as returned by the text-generation step, before any
/// verification. Every field is optional because the output is untrusted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawAgentEvent {
    /// Event title exactly as written on the page
    #[serde(default)]
    pub title: Option<String>,
    /// Start date formatted as "Mon DD, YYYY"
    #[serde(default, alias = "start", alias = "startDate", alias = "date")]
    pub start_date: Option<String>,
    /// End date formatted as "Mon DD, YYYY"; null for single-day events
    #[serde(default, alias = "end", alias = "endDate")]
    pub end_date: Option<String>,
    /// "City, ST" with the USPS state code; null when virtual-only
    #[serde(default)]
    pub location: Option<String>,
    /// Absolute URL of the event detail page
    #[serde(default, alias = "url")]
    pub link: Option<String>,
    /// Organization publishing the listing
    #[serde(default)]
    pub source: Option<String>,
    /// Short plain-text description
    #[serde(default)]
    pub description: Option<String>,
}

// --- Candidate event ---

/// A candidate event carrying per-field provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEvent {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub date_status: FieldStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_context: Option<EvidenceContext>,
    /// Free-form marker attached to date evidence (e.g. "multi-day").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_note: Option<String>,
    #[serde(default)]
    pub location_status: FieldStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_evidence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_evidence_context: Option<EvidenceContext>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl ExtractedEvent {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            start: None,
            end: None,
            location: None,
            url: url.into(),
            description: None,
            source: None,
            date_status: FieldStatus::Tbd,
            evidence: None,
            evidence_context: None,
            evidence_note: None,
            location_status: FieldStatus::Tbd,
            location_evidence: None,
            location_evidence_context: None,
            tags: Vec::new(),
            country: None,
            region: None,
            city: None,
        }
    }

    pub fn is_date_confirmed(&self) -> bool {
        self.date_status == FieldStatus::Confirmed
    }

    pub fn is_location_confirmed(&self) -> bool {
        self.location_status == FieldStatus::Confirmed
    }

    /// Clear every date field. A `tbd` date never keeps stale values.
    pub fn clear_date(&mut self) {
        self.start = None;
        self.end = None;
        self.evidence = None;
        self.evidence_context = None;
        self.evidence_note = None;
        self.date_status = FieldStatus::Tbd;
    }

    pub fn clear_location(&mut self) {
        self.location = None;
        self.location_evidence = None;
        self.location_evidence_context = None;
        self.location_status = FieldStatus::Tbd;
    }

    /// Take a strict date result: confirmed values replace the candidate's,
    /// anything else clears the date.
    pub fn apply_date(&mut self, result: StrictResult<DateSpan>) {
        match (result.status, result.value, result.evidence) {
            (FieldStatus::Confirmed, Some(span), Some(evidence)) if !evidence.is_empty() => {
                let span = DateSpan::new(span.start, span.end);
                self.start = Some(span.start);
                self.end = Some(span.end);
                self.evidence = Some(evidence);
                self.evidence_context = result.evidence_context;
                self.evidence_note = None;
                self.date_status = FieldStatus::Confirmed;
            }
            _ => self.clear_date(),
        }
    }

    pub fn apply_location(&mut self, result: StrictResult<String>) {
        match (result.status, result.value, result.evidence) {
            (FieldStatus::Confirmed, Some(location), Some(evidence))
                if !evidence.is_empty() && !location.trim().is_empty() =>
            {
                self.location = Some(location);
                self.location_evidence = Some(evidence);
                self.location_evidence_context = result.evidence_context;
                self.location_status = FieldStatus::Confirmed;
            }
            _ => self.clear_location(),
        }
    }
}

// --- Normalized record ---

/// Canonical record handed to persistence. All-day events carry sentinel UTC
/// times: start 12:00, end 22:00.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub timezone: Option<String>,
    pub location: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub url: String,
    pub source: Option<String>,
    pub tags: Vec<String>,
    pub date_status: FieldStatus,
    pub evidence: Option<String>,
    pub evidence_context: Option<EvidenceContext>,
    /// "multi-day" when the end date was kept from the generated claim.
    pub evidence_note: Option<String>,
    pub location_status: FieldStatus,
    pub location_evidence: Option<String>,
    pub location_evidence_context: Option<EvidenceContext>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> EventDate {
        EventDate::CalendarDate(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn bare_date_stays_calendar_date() {
        assert_eq!(EventDate::parse_iso("2026-03-10"), Some(day(2026, 3, 10)));
    }

    #[test]
    fn timestamp_with_offset_keeps_offset() {
        let parsed = EventDate::parse_iso("2026-03-10T19:00:00-05:00").unwrap();
        match parsed {
            EventDate::Instant { local, offset } => {
                assert_eq!(local.format("%H:%M").to_string(), "19:00");
                assert_eq!(offset.unwrap().local_minus_utc(), -5 * 3600);
            }
            other => panic!("expected instant, got {other:?}"),
        }
        assert_eq!(parsed.to_iso_string(), "2026-03-10T19:00:00-05:00");
    }

    #[test]
    fn floating_timestamp_has_no_offset() {
        let parsed = EventDate::parse_iso("2026-03-10T19:30").unwrap();
        assert!(!parsed.is_all_day());
        assert_eq!(parsed.to_iso_string(), "2026-03-10T19:30:00");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(EventDate::parse_iso("next Tuesday").is_none());
        assert!(EventDate::parse_iso("").is_none());
    }

    #[test]
    fn event_date_serializes_as_iso_string() {
        let json = serde_json::to_string(&day(2026, 1, 29)).unwrap();
        assert_eq!(json, "\"2026-01-29\"");
        let back: EventDate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, day(2026, 1, 29));
    }

    #[test]
    fn span_never_ends_before_start() {
        let span = DateSpan::new(day(2026, 3, 12), day(2026, 3, 10));
        assert_eq!(span.end, day(2026, 3, 12));
        assert!(!span.is_multi_day());
    }

    #[test]
    fn confirmed_requires_evidence() {
        let result = StrictResult::confirmed("Austin, TX".to_string(), "   ", EvidenceContext::VisibleText);
        assert!(!result.is_confirmed());
        assert!(result.value.is_none());
    }

    #[test]
    fn confirmed_collapses_evidence_whitespace() {
        let result = StrictResult::confirmed(1, " Mar 10,\n  2026 ", EvidenceContext::VisibleText);
        assert_eq!(result.evidence.as_deref(), Some("Mar 10, 2026"));
    }

    #[test]
    fn apply_tbd_date_clears_stale_values() {
        let mut event = ExtractedEvent::new("Gala", "https://a.test/");
        event.start = Some(day(2026, 1, 1));
        event.end = Some(day(2026, 1, 2));
        event.evidence = Some("Jan 1".into());
        event.apply_date(StrictResult::tbd());
        assert_eq!(event.date_status, FieldStatus::Tbd);
        assert!(event.start.is_none() && event.end.is_none() && event.evidence.is_none());
    }

    #[test]
    fn raw_agent_event_accepts_aliases() {
        let raw: RawAgentEvent = serde_json::from_str(
            r#"{"title": "Expo", "startDate": "Mar 10, 2026", "url": "https://x.test/e", "location": null}"#,
        )
        .unwrap();
        assert_eq!(raw.start_date.as_deref(), Some("Mar 10, 2026"));
        assert_eq!(raw.link.as_deref(), Some("https://x.test/e"));
        assert!(raw.location.is_none());
    }

    #[test]
    fn evidence_context_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&EvidenceContext::JsonLd).unwrap(),
            "\"json-ld\""
        );
        assert_eq!(EvidenceContext::VisibleText.to_string(), "visible-text");
    }
}
