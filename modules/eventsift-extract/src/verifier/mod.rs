//! Evidence verification. Every generated date and location is either
//! traced back to the page or cleared to `tbd`. Nothing here returns an
//! error: missing evidence is a status, not a failure.

pub mod container;
pub mod corroborate;
pub mod keywords;
pub mod scoring;
pub mod snippet;

use chrono::Datelike;
use tracing::{debug, info};

use eventsift_common::{
    collapse_whitespace, DateSpan, EventDate, EvidenceContext, ExtractedEvent, StrictResult,
};

use crate::dates::{day_distance, nearest_year, DateMatch};
use crate::strict::{
    jsonld, EvidenceStrategy, JsonLdDates, JsonLdLocation, MetaTagDates, MetaTagLocation,
    PageSource, StrictDateExtractor, StrictLocationExtractor,
};

pub use corroborate::{corroborate, Corroborated, Corroboration};
pub use keywords::Keywords;

/// Marker set on `evidence_note` when the generated end date was kept.
pub const MULTI_DAY_NOTE: &str = "multi-day";
/// Largest start disagreement (days) for which a generated end is kept.
const MULTI_DAY_START_TOLERANCE: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Log every downgrade or replacement at info level.
    pub log_corrections: bool,
    /// Keep a generated multi-day end when text only shows the start day.
    pub preserve_multi_day: bool,
    /// Year for dates printed without one; current year when unset.
    pub reference_year: Option<i32>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            log_corrections: false,
            preserve_multi_day: true,
            reference_year: None,
        }
    }
}

/// What the generation step claimed before verification.
#[derive(Debug, Clone)]
struct Claims {
    start: Option<EventDate>,
    end: Option<EventDate>,
    location: Option<String>,
}

impl Claims {
    fn of(event: &ExtractedEvent) -> Self {
        Self {
            start: event.start,
            end: event.end,
            location: event.location.clone(),
        }
    }
}

/// Date resolution plus whether it came from a regex over text, which is the
/// only kind the multi-day rule may widen.
struct DateFinding {
    result: StrictResult<DateSpan>,
    from_text: bool,
}

impl DateFinding {
    fn none() -> Self {
        Self {
            result: StrictResult::tbd(),
            from_text: false,
        }
    }

    fn take(&mut self, result: StrictResult<DateSpan>) {
        if !self.result.is_confirmed() && result.is_confirmed() {
            self.from_text = matches!(
                result.evidence_context,
                Some(EvidenceContext::VisibleText | EvidenceContext::Description)
            );
            self.result = result;
        }
    }
}

fn text_date(m: &DateMatch) -> StrictResult<DateSpan> {
    let span = DateSpan::new(m.start.into(), m.end.into());
    StrictResult::confirmed(span, &m.text, EvidenceContext::VisibleText)
}

pub(crate) fn title_key(title: &str) -> String {
    collapse_whitespace(title).to_ascii_lowercase()
}

pub struct Verifier {
    options: VerifyOptions,
    dates: StrictDateExtractor,
    locations: StrictLocationExtractor,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new(VerifyOptions::default())
    }
}

impl Verifier {
    pub fn new(options: VerifyOptions) -> Self {
        Self {
            options,
            dates: StrictDateExtractor::new(),
            locations: StrictLocationExtractor::new(),
        }
    }

    pub fn options(&self) -> &VerifyOptions {
        &self.options
    }

    /// Verify every candidate against one page, parsing it once. Page-level
    /// meta tags only count when the page produced a single candidate.
    pub fn verify_all(&self, candidates: Vec<ExtractedEvent>, html: &str) -> Vec<ExtractedEvent> {
        let mut page = self.page(html);
        let page_level = candidates.len() == 1;
        candidates
            .into_iter()
            .map(|c| self.verify(c, &mut page, page_level))
            .collect()
    }

    /// Verify a single candidate; the page is treated as its detail page.
    pub fn verify_html(&self, candidate: ExtractedEvent, html: &str) -> ExtractedEvent {
        let mut page = self.page(html);
        self.verify(candidate, &mut page, true)
    }

    fn page<'a>(&self, html: &'a str) -> PageSource<'a> {
        let page = PageSource::parse(html);
        match self.options.reference_year {
            Some(year) => page.with_reference_year(year),
            None => page,
        }
    }

    pub fn verify(
        &self,
        candidate: ExtractedEvent,
        page: &mut PageSource<'_>,
        page_level: bool,
    ) -> ExtractedEvent {
        let mut event = candidate;
        let claims = Claims::of(&event);
        let key = title_key(&event.title);
        page.set_anchor(Some(&event.title));

        let keywords = Keywords::for_event(&event);
        let expected = claims.start.map(|d| d.date());
        let default_year = page
            .anchor_offset()
            .and_then(|at| nearest_year(&page.text, at))
            .unwrap_or(page.reference_year);

        // A title the page never names cannot be confirmed by it: neither
        // its structured data nor its meta tags describe that event.
        let on_page = page.anchor_offset().is_some()
            || jsonld::names_title(&jsonld::events(&page.doc), &key);

        let mut date = DateFinding::none();
        let mut location: StrictResult<String> = StrictResult::tbd();
        let mut text_location: StrictResult<String> = StrictResult::tbd();
        let mut region: Option<String> = None;

        if on_page {
            date.take(JsonLdDates.extract(page));
            location = JsonLdLocation.extract(page);
            if page_level {
                date.take(MetaTagDates.extract(page));
                if !location.is_confirmed() {
                    location = MetaTagLocation.extract(page);
                }
            }
        } else {
            debug!(title = %event.title, "Title not found in page");
        }

        if on_page && (!date.result.is_confirmed() || !location.is_confirmed()) {
            let refined = container::refine(page, &key, &keywords, expected, default_year);
            match refined {
                Some(refined) => {
                    if let Some(m) = &refined.date {
                        date.take(text_date(m));
                    }
                    if let Some(p) = &refined.place {
                        text_location = StrictResult::confirmed(
                            p.label(),
                            &p.text,
                            EvidenceContext::VisibleText,
                        );
                    }
                    region = Some(refined.window);
                }
                // No element holds the whole title; fall back to raw HTML.
                None => {
                    let expected_year = expected.map(|d| d.year());
                    if let Some(snip) =
                        snippet::best_snippet(page.raw, &key, &keywords, expected_year)
                    {
                        let fragment = PageSource::fragment(&snip.html)
                            .with_anchor(&event.title)
                            .with_reference_year(default_year);
                        date.take(self.dates.extract(&fragment));
                        text_location = self.locations.extract(&fragment);
                        region = Some(snip.text);
                    }
                }
            }
        }

        let unresolved = !date.result.is_confirmed()
            || !(location.is_confirmed() || text_location.is_confirmed());
        if unresolved {
            if let Some(description) = event.description.clone() {
                let desc = PageSource::fragment(&description).with_reference_year(default_year);
                date.take(
                    self.dates
                        .extract(&desc)
                        .with_context(EvidenceContext::Description),
                );
                if !text_location.is_confirmed() {
                    text_location = self
                        .locations
                        .extract(&desc)
                        .with_context(EvidenceContext::Description);
                }
            }
        }

        // Location: structured, then the corroborated claim, then text. A
        // title missing from the page cannot corroborate anything.
        if !location.is_confirmed() {
            let corroborated = claims
                .location
                .as_deref()
                .filter(|_| region.is_some())
                .and_then(|loc| corroborate(loc, page, region.as_deref()));
            location = match corroborated {
                Some(c) => {
                    debug!(title = %event.title, how = ?c.how, "Location corroborated");
                    StrictResult::confirmed(c.label, &c.evidence, EvidenceContext::VisibleText)
                }
                None => text_location,
            };
        }

        let from_text = date.from_text;
        event.apply_date(date.result);
        if from_text {
            self.preserve_multi_day(&mut event, &claims);
        }
        event.apply_location(location);

        self.log_corrections(&event, &claims);
        event
    }

    /// When text shows only the first day of a span the generation step
    /// reported as multi-day, and the starts agree within two days, keep the
    /// generated end.
    fn preserve_multi_day(&self, event: &mut ExtractedEvent, claims: &Claims) {
        if !self.options.preserve_multi_day || !event.is_date_confirmed() {
            return;
        }
        let (Some(claimed_start), Some(claimed_end)) = (claims.start, claims.end) else {
            return;
        };
        let (Some(start), Some(end)) = (event.start, event.end) else {
            return;
        };
        let claimed = DateSpan::new(claimed_start, claimed_end);
        let found = DateSpan::new(start, end);
        if !claimed.is_multi_day() || found.is_multi_day() {
            return;
        }
        if day_distance(start.date(), claimed_start.date()) > MULTI_DAY_START_TOLERANCE {
            return;
        }
        if claimed_end.date() <= start.date() {
            return;
        }
        event.end = Some(claimed_end);
        event.evidence_note = Some(MULTI_DAY_NOTE.to_string());
    }

    fn log_corrections(&self, event: &ExtractedEvent, claims: &Claims) {
        if !self.options.log_corrections {
            return;
        }
        if claims.start != event.start || claims.end != event.end {
            info!(
                title = %event.title,
                claimed_start = ?claims.start.map(|d| d.to_iso_string()),
                start = ?event.start.map(|d| d.to_iso_string()),
                status = ?event.date_status,
                "Corrected generated date"
            );
        }
        if claims.location != event.location {
            info!(
                title = %event.title,
                claimed = ?claims.location,
                location = ?event.location,
                status = ?event.location_status,
                "Corrected generated location"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use eventsift_common::FieldStatus;

    fn day(y: i32, m: u32, d: u32) -> EventDate {
        EventDate::CalendarDate(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn candidate(title: &str) -> ExtractedEvent {
        ExtractedEvent::new(title, "https://example.org/events")
    }

    fn verifier() -> Verifier {
        Verifier::new(VerifyOptions {
            reference_year: Some(2026),
            ..VerifyOptions::default()
        })
    }

    #[test]
    fn json_ld_confirms_date_and_location() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@type":"Event","startDate":"2026-03-10","endDate":"2026-03-12",
             "location":"Austin, TX"}
            </script></head><body><h1>SXSW Film</h1></body></html>"#;
        let mut c = candidate("SXSW Film");
        c.start = Some(day(2026, 3, 11));
        let v = verifier().verify_html(c, html);
        assert_eq!(v.date_status, FieldStatus::Confirmed);
        assert_eq!(v.start, Some(day(2026, 3, 10)));
        assert_eq!(v.end, Some(day(2026, 3, 12)));
        assert_eq!(v.evidence_context, Some(EvidenceContext::JsonLd));
        assert_eq!(v.location.as_deref(), Some("Austin, TX"));
        assert_eq!(v.location_status, FieldStatus::Confirmed);
    }

    #[test]
    fn fabricated_date_is_cleared() {
        let html = "<body><h2>Jazz Night</h2><p>Bring your own chair</p></body>";
        let mut c = candidate("Jazz Night");
        c.start = Some(day(2026, 3, 3));
        c.end = Some(day(2026, 3, 3));
        let v = verifier().verify_html(c, html);
        assert_eq!(v.date_status, FieldStatus::Tbd);
        assert!(v.start.is_none() && v.end.is_none() && v.evidence.is_none());
    }

    #[test]
    fn visible_card_confirms_date_near_title() {
        let html = "<body><ul>\
            <li><h3>Spring Fair</h3><p>Apr 4, 2026</p></li>\
            <li><h3>Jazz Night</h3><p>Mar 3, 2026</p><p>Austin, TX</p></li>\
            </ul></body>";
        let mut c = candidate("Jazz Night");
        c.start = Some(day(2026, 4, 4));
        let v = verifier().verify_html(c, html);
        assert_eq!(v.start, Some(day(2026, 3, 3)));
        assert_eq!(v.evidence.as_deref(), Some("Mar 3, 2026"));
        assert_eq!(v.evidence_context, Some(EvidenceContext::VisibleText));
        assert_eq!(v.location.as_deref(), Some("Austin, TX"));
    }

    #[test]
    fn unsupported_location_is_downgraded() {
        let html = "<body><h2>Jazz Night</h2><p>Mar 3, 2026</p></body>";
        let mut c = candidate("Jazz Night");
        c.location = Some("Nashville, TN".into());
        let v = verifier().verify_html(c, html);
        assert_eq!(v.location_status, FieldStatus::Tbd);
        assert!(v.location.is_none());
        assert!(v.location_evidence.is_none());
    }

    #[test]
    fn corroborated_claim_beats_nearby_text_place() {
        let html = "<body><h2>Jazz Night</h2><p>Mar 3, 2026</p><p>Dallas, TX</p>\
                    <footer>Touring from Austin, TX</footer></body>";
        let mut c = candidate("Jazz Night");
        c.location = Some("Austin, TX".into());
        let v = verifier().verify_html(c, html);
        assert_eq!(v.location.as_deref(), Some("Austin, TX"));
        assert_eq!(v.location_status, FieldStatus::Confirmed);
    }

    #[test]
    fn multi_day_end_is_preserved() {
        let html = "<body><h2>Folk Festival</h2><p>Jun 5, 2026</p></body>";
        let mut c = candidate("Folk Festival");
        c.start = Some(day(2026, 6, 5));
        c.end = Some(day(2026, 6, 7));
        let v = verifier().verify_html(c, html);
        assert_eq!(v.start, Some(day(2026, 6, 5)));
        assert_eq!(v.end, Some(day(2026, 6, 7)));
        assert_eq!(v.evidence.as_deref(), Some("Jun 5, 2026"));
        assert_eq!(v.evidence_note.as_deref(), Some(MULTI_DAY_NOTE));
    }

    #[test]
    fn multi_day_rule_can_be_disabled() {
        let html = "<body><h2>Folk Festival</h2><p>Jun 5, 2026</p></body>";
        let mut c = candidate("Folk Festival");
        c.start = Some(day(2026, 6, 5));
        c.end = Some(day(2026, 6, 7));
        let v = Verifier::new(VerifyOptions {
            preserve_multi_day: false,
            reference_year: Some(2026),
            ..VerifyOptions::default()
        })
        .verify_html(c, html);
        assert_eq!(v.end, Some(day(2026, 6, 5)));
        assert!(v.evidence_note.is_none());
    }

    #[test]
    fn multi_day_rule_ignores_distant_starts() {
        let html = "<body><h2>Folk Festival</h2><p>Jun 20, 2026</p></body>";
        let mut c = candidate("Folk Festival");
        c.start = Some(day(2026, 6, 5));
        c.end = Some(day(2026, 6, 7));
        let v = verifier().verify_html(c, html);
        assert_eq!(v.start, Some(day(2026, 6, 20)));
        assert_eq!(v.end, Some(day(2026, 6, 20)));
    }

    #[test]
    fn missing_title_falls_back_to_description() {
        let html = "<body><p>Nothing relevant</p></body>";
        let mut c = candidate("Garden Tour");
        c.start = Some(day(2026, 5, 1));
        c.description = Some("Guided walk on May 2, 2026 through Boise, Idaho gardens".into());
        let v = verifier().verify_html(c, html);
        assert_eq!(v.start, Some(day(2026, 5, 2)));
        assert_eq!(v.evidence_context, Some(EvidenceContext::Description));
        assert_eq!(v.location.as_deref(), Some("Boise, ID"));
        assert_eq!(v.location_evidence_context, Some(EvidenceContext::Description));
    }

    #[test]
    fn confirmed_evidence_is_in_the_page() {
        let html = "<body><div class=\"card\"><a href=\"/e/9\">Open Mic</a>\
                    <span>Sat, Nov 14</span><span>2026</span></div></body>";
        let v = verifier().verify_html(candidate("Open Mic"), html);
        let evidence = v.evidence.unwrap();
        assert!(html.contains(&evidence) || crate::html::strip_tags(html).contains(&evidence));
    }

    #[test]
    fn unnamed_structured_event_does_not_confirm_an_absent_title() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@type":"Event","startDate":"2026-03-10","location":"Austin, TX"}
            </script></head><body><h1>Real Festival</h1>
            <p>Mar 10, 2026 in Austin, TX</p></body></html>"#;
        let mut c = candidate("Totally Invented Gala");
        c.start = Some(day(2026, 3, 10));
        c.location = Some("Austin, TX".into());
        let v = verifier().verify_html(c, html);
        assert_eq!(v.date_status, FieldStatus::Tbd);
        assert!(v.start.is_none());
        assert_eq!(v.location_status, FieldStatus::Tbd);
        assert!(v.location.is_none());
    }

    #[test]
    fn meta_tags_do_not_confirm_an_absent_title() {
        let html = r#"<html><head><meta property="event:start_time" content="2026-05-02">
            <meta name="geo.placename" content="Boise, Idaho"></head>
            <body><p>Welcome to our site</p></body></html>"#;
        let mut c = candidate("Totally Invented Gala");
        c.start = Some(day(2026, 5, 2));
        let v = verifier().verify_html(c, html);
        assert_eq!(v.date_status, FieldStatus::Tbd);
        assert_eq!(v.location_status, FieldStatus::Tbd);
    }

    #[test]
    fn title_named_only_in_structured_data_still_confirms() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@type":"Event","name":"Harvest Supper","startDate":"2026-10-03"}
            </script></head><body><p>Tickets on sale now</p></body></html>"#;
        let v = verifier().verify_html(candidate("Harvest Supper"), html);
        assert_eq!(v.start, Some(day(2026, 10, 3)));
        assert_eq!(v.evidence_context, Some(EvidenceContext::JsonLd));
    }

    #[test]
    fn undated_listing_item_stays_tbd() {
        let html = "<body><ul>\
            <li><h3>Spring Fair</h3><p>Apr 4, 2026</p><p>Dallas, TX</p></li>\
            <li><h3>Book Swap</h3><p>Every week</p></li>\
            </ul></body>";
        let mut c = candidate("Book Swap");
        c.start = Some(day(2026, 4, 4));
        let v = Verifier::new(VerifyOptions {
            reference_year: Some(2026),
            ..VerifyOptions::default()
        })
        .verify_all(vec![candidate("Spring Fair"), c], html);
        assert_eq!(v[0].start, Some(day(2026, 4, 4)));
        assert_eq!(v[1].date_status, FieldStatus::Tbd);
        assert!(v[1].start.is_none());
        assert_eq!(v[1].location_status, FieldStatus::Tbd);
        assert!(v[1].location.is_none());
    }
}
