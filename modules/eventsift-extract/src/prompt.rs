use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use ai_client::json_payload;
use eventsift_common::RawAgentEvent;

use crate::heuristic::ListingHint;

/// What the generation step is asked to return.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExtractionResponse {
    #[serde(default)]
    pub events: Vec<RawAgentEvent>,
}

const EXTRACTION_SYSTEM_PROMPT: &str = r#"You extract upcoming events from a single event-listing web page.

Return one entry per real event shown on the page. Before including an entry, confirm ALL of the following:

## Title
- The title names a specific event, not a venue, a category label ("Music", "Family"), a navigation item or a page heading like "Upcoming Events".
- Copy the title exactly as written on the page.

## Dates
- The dates are when the event happens, NOT ticket-sale, registration, early-bird or deadline windows.
- Format dates as "Mon DD, YYYY" (e.g. "Mar 10, 2026"). Append a time only when the page prints one ("Mar 10, 2026 7:30 pm").
- For multi-day events give both start_date and end_date; otherwise end_date is null.
- Never guess a date that is not printed on the page.

## Location
- Format as "City, ST" using the two-letter USPS state code. Convert full state names ("Texas" -> "TX").
- Use null when the event is virtual-only or the page does not say where it is.

## Source
- Use the organization publishing the page, derived from the registrable domain when no name is shown.

## Duplicates
- Report an event once even if it appears several times. Events with the same title, start date and city are duplicates.

If no entry passes every check, return an empty list. Output JSON only, no commentary."#;

/// The fixed instruction plus the JSON schema of the expected output.
pub fn system_prompt() -> String {
    let schema = schemars::schema_for!(ExtractionResponse);
    let schema = serde_json::to_string_pretty(&schema).unwrap_or_default();
    format!("{EXTRACTION_SYSTEM_PROMPT}\n\nRespond with JSON matching this schema:\n{schema}")
}

/// First pass: the (compacted, truncated) page HTML.
pub fn page_message(url: &str, hint: Option<&str>, html: &str) -> String {
    let hint = hint
        .map(|h| format!("\nCaller hint: {h}\n"))
        .unwrap_or_default();
    format!("Extract all events from this page.\n\nPage URL: {url}\n{hint}\n---\n\n{html}")
}

/// Second pass: structured listing hints found by the DOM scan.
pub fn hints_message(url: &str, hint: Option<&str>, hints: &[ListingHint]) -> String {
    let hint = hint
        .map(|h| format!("\nCaller hint: {h}\n"))
        .unwrap_or_default();
    let listing = serde_json::to_string_pretty(hints).unwrap_or_default();
    format!(
        "The page HTML was hard to read. These listing cards were found on it; \
         extract the events they describe.\n\nPage URL: {url}\n{hint}\n---\n\n{listing}"
    )
}

/// Parse a response as a bare array or an `{"events": [...]}` object, with
/// code fences and surrounding prose tolerated.
pub fn parse_events(response: &str) -> Result<Vec<RawAgentEvent>, serde_json::Error> {
    let payload = json_payload(response);
    match serde_json::from_str::<Vec<RawAgentEvent>>(payload) {
        Ok(events) => Ok(events),
        Err(_) => serde_json::from_str::<ExtractionResponse>(payload).map(|r| r.events),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_embeds_schema() {
        let prompt = system_prompt();
        assert!(prompt.contains("Mon DD, YYYY"));
        assert!(prompt.contains("\"events\""));
        assert!(prompt.contains("start_date"));
    }

    #[test]
    fn parses_bare_array_in_fences() {
        let events = parse_events(
            "```json\n[{\"title\":\"Jazz Night\",\"start_date\":\"Mar 3, 2026\"}]\n```",
        )
        .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start_date.as_deref(), Some("Mar 3, 2026"));
    }

    #[test]
    fn parses_wrapped_object_with_aliases() {
        let events = parse_events(
            r#"Here you go: {"events":[{"title":"Fair","startDate":"Apr 4, 2026","url":"/fair"}]}"#,
        )
        .unwrap();
        assert_eq!(events[0].start_date.as_deref(), Some("Apr 4, 2026"));
        assert_eq!(events[0].link.as_deref(), Some("/fair"));
    }

    #[test]
    fn empty_array_is_ok_and_prose_is_err() {
        assert!(parse_events("[]").unwrap().is_empty());
        assert!(parse_events("I could not find any events.").is_err());
    }

    #[test]
    fn page_message_carries_hint() {
        let msg = page_message("https://example.org", Some("only concerts"), "<p>x</p>");
        assert!(msg.contains("Caller hint: only concerts"));
        assert!(msg.ends_with("<p>x</p>"));
    }
}
