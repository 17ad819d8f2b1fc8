//! End-to-end runs through `Pipeline` with mocked collaborators: every
//! generated field either traces back to the page or ends up `tbd`.

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Timelike, Utc};

use eventsift_common::{EventDate, EvidenceContext, FieldStatus, RawAgentEvent};
use eventsift_extract::html::strip_tags;
use eventsift_extract::testing::{raw_event, MockFetcher, MockGenerator};
use eventsift_extract::{
    ExtractError, ExtractionRequest, MemorySink, Normalizer, Orchestrator, OrchestratorOptions,
    Pipeline, Verifier, VerifyOptions,
};

const URL: &str = "https://www.austinmakers.org/events";

const AUSTIN_PAGE: &str = r#"<html><head>
<script type="application/ld+json">
{"@type":"Event","startDate":"2026-03-10","endDate":"2026-03-12","location":"Austin, TX"}
</script>
</head><body>
<h1>Austin Maker Faire</h1>
<p>Three days of robots, crafts and a hands-on workshop.</p>
</body></html>"#;

fn day(y: i32, m: u32, d: u32) -> EventDate {
    EventDate::CalendarDate(NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn pipeline(html: &str, events: &[RawAgentEvent]) -> Pipeline {
    let fetcher = Arc::new(MockFetcher::new().on_page(URL, html));
    let generator = Arc::new(MockGenerator::new().respond_events(events));
    let orchestrator = Orchestrator::new(
        fetcher,
        generator,
        OrchestratorOptions {
            reference_year: Some(2026),
            ..OrchestratorOptions::default()
        },
    );
    let verifier = Verifier::new(VerifyOptions {
        reference_year: Some(2026),
        ..VerifyOptions::default()
    });
    Pipeline::new(orchestrator, verifier, Normalizer::default())
}

#[tokio::test]
async fn json_ld_event_is_confirmed_end_to_end() {
    let claimed = raw_event("Austin Maker Faire", Some("Mar 11, 2026"), Some("Dallas, TX"));
    let output = pipeline(AUSTIN_PAGE, &[claimed])
        .extract(&ExtractionRequest::new(URL))
        .await
        .unwrap();

    assert_eq!(output.events.len(), 1);
    let event = &output.events[0];
    assert_eq!(event.date_status, FieldStatus::Confirmed);
    assert_eq!(event.start, Some(day(2026, 3, 10)));
    assert_eq!(event.end, Some(day(2026, 3, 12)));
    assert_eq!(event.evidence_context, Some(EvidenceContext::JsonLd));
    assert_eq!(event.location.as_deref(), Some("Austin, TX"));
    assert_eq!(event.location_status, FieldStatus::Confirmed);
    assert_eq!(event.source.as_deref(), Some("Austinmakers"));
}

#[tokio::test]
async fn fabricated_location_is_downgraded() {
    let html = "<html><body><h2>Jazz Night</h2><p>Mar 3, 2026</p></body></html>";
    let claimed = raw_event("Jazz Night", Some("Mar 3, 2026"), Some("Nashville, TN"));
    let output = pipeline(html, &[claimed])
        .extract(&ExtractionRequest::new(URL))
        .await
        .unwrap();

    let event = &output.events[0];
    assert_eq!(event.date_status, FieldStatus::Confirmed);
    assert_eq!(event.evidence.as_deref(), Some("Mar 3, 2026"));
    assert_eq!(event.location_status, FieldStatus::Tbd);
    assert_eq!(event.location, None);
}

#[tokio::test]
async fn undated_title_is_tbd() {
    let html = "<html><body><h2>Poetry Slam</h2><p>Bring a poem to share.</p></body></html>";
    let claimed = raw_event("Poetry Slam", Some("Mar 5, 2026"), None);
    let output = pipeline(html, &[claimed])
        .extract(&ExtractionRequest::new(URL))
        .await
        .unwrap();

    let event = &output.events[0];
    assert_eq!(event.date_status, FieldStatus::Tbd);
    assert_eq!(event.start, None);
    assert_eq!(event.end, None);
    assert_eq!(event.evidence, None);
}

#[tokio::test]
async fn duplicate_candidates_collapse() {
    let html = "<html><body><h2>Jazz Night</h2><p>Mar 3, 2026</p></body></html>";
    let output = pipeline(
        html,
        &[
            raw_event("Jazz Night", Some("Mar 3, 2026"), None),
            raw_event("jazz night", Some("Mar 3, 2026"), None),
        ],
    )
    .extract(&ExtractionRequest::new(URL))
    .await
    .unwrap();

    assert_eq!(output.events.len(), 1);
}

#[tokio::test]
async fn confirmed_evidence_appears_in_the_page() {
    let html = r#"<html><body><ul>
        <li class="event"><h3>Spring Fair</h3><p>Apr 4, 2026</p><p>Dallas, TX</p></li>
        <li class="event"><h3>Jazz Night</h3><p>Sat,   Mar 14</p><p>Austin,
            TX</p></li>
        <li class="event"><h3>Book Swap</h3><p>Every week</p></li>
    </ul></body></html>"#;
    let output = pipeline(
        html,
        &[
            raw_event("Spring Fair", Some("Apr 4, 2026"), Some("Dallas, TX")),
            raw_event("Jazz Night", Some("Mar 14, 2026"), Some("Austin, TX")),
            raw_event("Book Swap", Some("Jan 1, 2026"), None),
        ],
    )
    .extract(&ExtractionRequest::new(URL))
    .await
    .unwrap();

    let text = strip_tags(html);
    let confirmed: Vec<_> = output
        .events
        .iter()
        .filter(|e| e.date_status == FieldStatus::Confirmed)
        .collect();
    assert!(!confirmed.is_empty());
    for event in confirmed {
        let evidence = event.evidence.as_deref().unwrap();
        assert!(!evidence.is_empty());
        assert_eq!(evidence, evidence.split_whitespace().collect::<Vec<_>>().join(" "));
        assert!(text.contains(evidence), "{evidence:?} not in page");
        if let (Some(start), Some(end)) = (event.start, event.end) {
            assert!(end.sort_key() >= start.sort_key());
        }
    }
    let swap = output.events.iter().find(|e| e.title == "Book Swap").unwrap();
    assert_eq!(swap.date_status, FieldStatus::Tbd);
    assert_eq!(swap.start, None);
    assert_eq!(swap.location, None);

    for event in &output.events {
        if event.location_status == FieldStatus::Confirmed {
            let evidence = event.location_evidence.as_deref().unwrap();
            assert!(text.contains(evidence), "{evidence:?} not in page");
        } else {
            assert_eq!(event.location, None);
        }
    }
}

#[tokio::test]
async fn ingest_normalizes_and_upserts() {
    let claimed = raw_event("Austin Maker Faire", Some("Mar 10, 2026"), Some("Austin, TX"));
    let pipeline = pipeline(AUSTIN_PAGE, &[claimed]);
    let sink = MemorySink::new();

    let report = pipeline
        .ingest(&ExtractionRequest::new(URL), &sink, true)
        .await
        .unwrap();

    assert_eq!(report.extracted, 1);
    assert_eq!(report.upsert.created, 1);
    assert!(report.errors.is_empty());

    let stored = sink.events();
    let record = &stored[0].event;
    assert!(stored[0].published);
    assert!(record.all_day);
    assert_eq!(record.start, Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap());
    assert_eq!(record.end, Utc.with_ymd_and_hms(2026, 3, 12, 22, 0, 0).unwrap());
    assert_eq!(record.end.hour(), 22);
    assert_eq!(record.city.as_deref(), Some("Austin"));
    assert_eq!(record.region.as_deref(), Some("TX"));
    assert_eq!(record.country.as_deref(), Some("US"));
    assert!(record.tags.contains(&"education".to_string()));
}

#[tokio::test]
async fn ingest_keeps_the_multi_day_note() {
    let html = "<html><body><h2>Folk Festival</h2><p>Jun 5, 2026</p></body></html>";
    let mut claimed = raw_event("Folk Festival", Some("Jun 5, 2026"), None);
    claimed.end_date = Some("Jun 7, 2026".into());
    let pipeline = pipeline(html, &[claimed]);
    let sink = MemorySink::new();

    let report = pipeline
        .ingest(&ExtractionRequest::new(URL), &sink, false)
        .await
        .unwrap();

    assert_eq!(report.upsert.created, 1);
    let record = &sink.events()[0].event;
    assert_eq!(record.evidence.as_deref(), Some("Jun 5, 2026"));
    assert_eq!(record.evidence_note.as_deref(), Some("multi-day"));
    assert_eq!(record.end, Utc.with_ymd_and_hms(2026, 6, 7, 22, 0, 0).unwrap());
}

#[tokio::test]
async fn ingest_skips_tbd_dates_with_an_error() {
    let html = "<html><body><h2>Poetry Slam</h2><p>Bring a poem to share.</p></body></html>";
    let pipeline = pipeline(html, &[raw_event("Poetry Slam", Some("Mar 5, 2026"), None)]);
    let sink = MemorySink::new();

    let report = pipeline
        .ingest(&ExtractionRequest::new(URL), &sink, false)
        .await
        .unwrap();

    assert_eq!(report.extracted, 1);
    assert_eq!(report.upsert.created, 0);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("Poetry Slam"));
    assert!(sink.is_empty());
}

#[tokio::test]
async fn fetch_failure_aborts_only_that_url() {
    let pipeline = pipeline(AUSTIN_PAGE, &[]);
    let err = pipeline
        .extract(&ExtractionRequest::new("https://unknown.example.org/"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, ExtractError::Fetch { ref url, .. } if url == "https://unknown.example.org/")
    );
}
