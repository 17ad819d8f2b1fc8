//! Verified candidates to canonical records.
//!
//! All-day events are stored at sentinel UTC times (12:00 start, 22:00 end)
//! on their calendar days, so a consumer can tell them apart from timed
//! events by the timestamp alone and no timezone shift can move them to a
//! neighbouring day.

use chrono::{
    DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Utc,
};
use chrono_tz::Tz;
use tracing::{debug, warn};

use eventsift_common::{EventDate, ExtractedEvent, NormalizedEvent};

use crate::error::NormalizeError;
use crate::geo::parse_location;
use crate::tags::TagExtractor;

const ALL_DAY_START_HOUR: i64 = 12;
const ALL_DAY_END_HOUR: i64 = 22;
const LAST_SECOND_OF_DAY: i64 = 86_399;

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default())
}

fn shifted(local: NaiveDateTime, offset: FixedOffset) -> DateTime<Utc> {
    Utc.from_utc_datetime(&(local - Duration::seconds(offset.local_minus_utc().into())))
}

fn sentinel(date: NaiveDate, hour: i64) -> DateTime<Utc> {
    Utc.from_utc_datetime(&(midnight(date) + Duration::hours(hour)))
}

/// Result of normalizing a batch: records plus one message per rejected
/// candidate.
#[derive(Debug, Default)]
pub struct NormalizeBatch {
    pub events: Vec<NormalizedEvent>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    zone: Tz,
    zone_name: Option<String>,
    tags: TagExtractor,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(None, TagExtractor::default())
    }
}

impl Normalizer {
    /// `default_timezone` is an IANA name applied to floating timed
    /// literals. An unknown name falls back to UTC.
    pub fn new(default_timezone: Option<&str>, tags: TagExtractor) -> Self {
        let (zone, zone_name) = match default_timezone.map(str::trim).filter(|z| !z.is_empty()) {
            Some(name) => match name.parse::<Tz>() {
                Ok(zone) => (zone, Some(zone.name().to_string())),
                Err(e) => {
                    warn!(timezone = name, error = %e, "Unknown timezone, using UTC");
                    (Tz::UTC, None)
                }
            },
            None => (Tz::UTC, None),
        };
        Self {
            zone,
            zone_name,
            tags,
        }
    }

    pub fn tags(&self) -> &TagExtractor {
        &self.tags
    }

    fn local_to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        match self.zone.from_local_datetime(&local) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
            // Skipped by a DST jump; read the wall clock as UTC.
            LocalResult::None => Utc.from_utc_datetime(&local),
        }
    }

    fn instant(&self, date: &EventDate) -> DateTime<Utc> {
        match *date {
            EventDate::CalendarDate(day) => self.local_to_utc(midnight(day)),
            EventDate::Instant {
                local,
                offset: Some(offset),
            } => shifted(local, offset),
            EventDate::Instant {
                local,
                offset: None,
            } => self.local_to_utc(local),
        }
    }

    fn end_of_day(&self, date: &EventDate) -> DateTime<Utc> {
        let last = midnight(date.date()) + Duration::seconds(LAST_SECOND_OF_DAY);
        match *date {
            EventDate::Instant {
                offset: Some(offset),
                ..
            } => shifted(last, offset),
            _ => self.local_to_utc(last),
        }
    }

    /// Zone recorded for timed events: the configured zone, else the
    /// literal's own offset, else UTC.
    fn timezone_label(&self, start: &EventDate) -> String {
        if let Some(name) = &self.zone_name {
            return name.clone();
        }
        match start {
            EventDate::Instant {
                offset: Some(offset),
                ..
            } => offset.to_string(),
            _ => "UTC".to_string(),
        }
    }

    pub fn normalize(
        &self,
        event: &ExtractedEvent,
        html: Option<&str>,
    ) -> Result<NormalizedEvent, NormalizeError> {
        let title = event.title.trim();
        if title.is_empty() {
            return Err(NormalizeError::MissingTitle);
        }
        let start = event
            .start
            .ok_or_else(|| NormalizeError::MissingStart(title.to_string()))?;

        let all_day = start.is_all_day() && event.end.map_or(true, |e| e.is_all_day());
        let (start_utc, end_utc, timezone) = if all_day {
            let start_day = start.date();
            let end_day = event.end.map_or(start_day, |e| e.date()).max(start_day);
            (
                sentinel(start_day, ALL_DAY_START_HOUR),
                sentinel(end_day, ALL_DAY_END_HOUR),
                None,
            )
        } else {
            let start_utc = self.instant(&start);
            let end_utc = match event.end {
                Some(end @ EventDate::Instant { .. }) => self.instant(&end),
                Some(end) => self.end_of_day(&end),
                None => self.end_of_day(&start),
            };
            (start_utc, end_utc.max(start_utc), Some(self.timezone_label(&start)))
        };

        let parsed = event
            .location
            .as_deref()
            .map(parse_location)
            .unwrap_or_default();
        let tags = if event.tags.is_empty() {
            self.tags.for_event(event, html)
        } else {
            self.tags.tags(&[], &event.tags)
        };

        Ok(NormalizedEvent {
            title: title.to_string(),
            description: event.description.clone(),
            start: start_utc,
            end: end_utc,
            all_day,
            timezone,
            location: event.location.clone(),
            city: event.city.clone().or(parsed.city),
            region: event.region.clone().or(parsed.region),
            country: event.country.clone().or(parsed.country),
            url: event.url.clone(),
            source: event.source.clone(),
            tags,
            date_status: event.date_status,
            evidence: event.evidence.clone(),
            evidence_context: event.evidence_context,
            evidence_note: event.evidence_note.clone(),
            location_status: event.location_status,
            location_evidence: event.location_evidence.clone(),
            location_evidence_context: event.location_evidence_context,
        })
    }

    /// Normalize every candidate; failures are collected and skipped.
    pub fn normalize_all(&self, events: &[ExtractedEvent], html: Option<&str>) -> NormalizeBatch {
        let mut batch = NormalizeBatch::default();
        for event in events {
            match self.normalize(event, html) {
                Ok(normalized) => batch.events.push(normalized),
                Err(e) => {
                    debug!(title = event.title.as_str(), error = %e, "Skipping candidate");
                    batch.errors.push(format!("{}: {e}", event.url));
                }
            }
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use chrono::Timelike;
    use eventsift_common::FieldStatus;

    use super::*;

    fn day(y: i32, m: u32, d: u32) -> EventDate {
        EventDate::CalendarDate(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, offset_hours: Option<i32>) -> EventDate {
        EventDate::Instant {
            local: NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(h, min, 0)
                .unwrap(),
            offset: offset_hours.map(|o| FixedOffset::east_opt(o * 3600).unwrap()),
        }
    }

    fn event(start: Option<EventDate>, end: Option<EventDate>) -> ExtractedEvent {
        let mut e = ExtractedEvent::new("Jazz Night", "https://x.org/jazz");
        e.start = start;
        e.end = end;
        e
    }

    #[test]
    fn all_day_uses_sentinel_times() {
        let n = Normalizer::default()
            .normalize(&event(Some(day(2026, 3, 10)), Some(day(2026, 3, 12))), None)
            .unwrap();
        assert!(n.all_day);
        assert_eq!(n.start.to_rfc3339(), "2026-03-10T12:00:00+00:00");
        assert_eq!(n.end.to_rfc3339(), "2026-03-12T22:00:00+00:00");
        assert_eq!(n.timezone, None);
    }

    #[test]
    fn all_day_end_never_precedes_start() {
        let n = Normalizer::default()
            .normalize(&event(Some(day(2026, 3, 10)), Some(day(2026, 3, 8))), None)
            .unwrap();
        assert_eq!(n.end.date_naive(), n.start.date_naive());
        assert_eq!(n.end.hour(), 22);
    }

    #[test]
    fn timed_with_offset_converts_by_offset() {
        let n = Normalizer::new(Some("America/New_York"), TagExtractor::default())
            .normalize(&event(Some(at(2026, 3, 10, 19, 0, Some(-5))), None), None)
            .unwrap();
        assert!(!n.all_day);
        assert_eq!(n.start.to_rfc3339(), "2026-03-11T00:00:00+00:00");
        assert_eq!(n.end.to_rfc3339(), "2026-03-11T04:59:59+00:00");
        assert_eq!(n.timezone.as_deref(), Some("America/New_York"));
    }

    #[test]
    fn floating_time_uses_default_zone() {
        let n = Normalizer::new(Some("America/Chicago"), TagExtractor::default())
            .normalize(&event(Some(at(2026, 7, 4, 20, 30, None)), None), None)
            .unwrap();
        assert_eq!(n.start.to_rfc3339(), "2026-07-05T01:30:00+00:00");
        assert_eq!(n.timezone.as_deref(), Some("America/Chicago"));
    }

    #[test]
    fn timezone_is_set_whenever_a_time_was_captured() {
        let n = Normalizer::default()
            .normalize(&event(Some(day(2026, 3, 10)), Some(at(2026, 3, 10, 21, 0, None))), None)
            .unwrap();
        assert!(!n.all_day);
        assert_eq!(n.timezone.as_deref(), Some("UTC"));
        assert_eq!(n.end.to_rfc3339(), "2026-03-10T21:00:00+00:00");
    }

    #[test]
    fn unknown_zone_falls_back_to_utc() {
        let n = Normalizer::new(Some("Mars/Olympus"), TagExtractor::default())
            .normalize(&event(Some(at(2026, 3, 10, 19, 0, None)), None), None)
            .unwrap();
        assert_eq!(n.start.to_rfc3339(), "2026-03-10T19:00:00+00:00");
        assert_eq!(n.timezone.as_deref(), Some("UTC"));
    }

    #[test]
    fn rejects_missing_title_and_start() {
        let normalizer = Normalizer::default();
        let mut untitled = event(Some(day(2026, 3, 10)), None);
        untitled.title = "  ".into();
        assert_eq!(normalizer.normalize(&untitled, None), Err(NormalizeError::MissingTitle));
        assert_eq!(
            normalizer.normalize(&event(None, None), None),
            Err(NormalizeError::MissingStart("Jazz Night".into()))
        );
    }

    #[test]
    fn batch_collects_errors_and_continues() {
        let batch = Normalizer::default().normalize_all(
            &[event(None, None), event(Some(day(2026, 3, 10)), None)],
            None,
        );
        assert_eq!(batch.events.len(), 1);
        assert_eq!(batch.errors.len(), 1);
        assert!(batch.errors[0].contains("Jazz Night"));
    }

    #[test]
    fn location_fields_parse_but_explicit_wins() {
        let mut e = event(Some(day(2026, 3, 10)), None);
        e.location = Some("Zilker Park, Austin, TX".into());
        e.city = Some("Zilker".into());
        e.location_status = FieldStatus::Confirmed;
        let n = Normalizer::default().normalize(&e, None).unwrap();
        assert_eq!(n.city.as_deref(), Some("Zilker"));
        assert_eq!(n.region.as_deref(), Some("TX"));
        assert_eq!(n.country.as_deref(), Some("US"));
    }

    #[test]
    fn tags_are_derived_only_when_absent() {
        let n = Normalizer::default()
            .normalize(&event(Some(day(2026, 3, 10)), None), None)
            .unwrap();
        assert_eq!(n.tags, vec!["music"]);

        let mut e = event(Some(day(2026, 3, 10)), None);
        e.tags = vec!["Members Only".into()];
        let n = Normalizer::default().normalize(&e, None).unwrap();
        assert_eq!(n.tags, vec!["members-only"]);
    }
}
