//! Schema.org event markup embedded as `application/ld+json`.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde_json::{Map, Value};
use tracing::debug;

use eventsift_common::collapse_whitespace;

use crate::html::selector;

static LD_SEL: LazyLock<Selector> = LazyLock::new(|| selector(r#"script[type*="ld+json"]"#));

const MAX_DEPTH: usize = 8;

/// An object whose `@type` names an event.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonLdEvent {
    pub name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub location: Option<Value>,
}

fn type_names(obj: &Map<String, Value>) -> Vec<&str> {
    match obj.get("@type") {
        Some(Value::String(t)) => vec![t.as_str()],
        Some(Value::Array(ts)) => ts.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn has_type(obj: &Map<String, Value>, needle: &str) -> bool {
    type_names(obj).iter().any(|t| t.contains(needle))
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn collect(value: &Value, depth: usize, out: &mut Vec<JsonLdEvent>) {
    if depth > MAX_DEPTH {
        return;
    }
    match value {
        Value::Array(items) => {
            for item in items {
                collect(item, depth + 1, out);
            }
        }
        Value::Object(obj) => {
            if has_type(obj, "Event") {
                out.push(JsonLdEvent {
                    name: string_field(obj, "name"),
                    start_date: string_field(obj, "startDate"),
                    end_date: string_field(obj, "endDate"),
                    location: obj.get("location").cloned(),
                });
            }
            for nested in obj.values() {
                if nested.is_object() || nested.is_array() {
                    collect(nested, depth + 1, out);
                }
            }
        }
        _ => {}
    }
}

/// Every event object in the document's JSON-LD blocks, including ones
/// nested under `@graph` or `subEvent`. Malformed blocks are skipped.
pub fn events(doc: &Html) -> Vec<JsonLdEvent> {
    let mut out = Vec::new();
    for script in doc.select(&LD_SEL) {
        let body: String = script.text().collect();
        let body = body.trim().trim_end_matches(';');
        match serde_json::from_str::<Value>(body) {
            Ok(value) => collect(&value, 0, &mut out),
            Err(e) => debug!(error = %e, "Skipping malformed JSON-LD block"),
        }
    }
    out
}

fn same_title(name: &str, title: &str) -> bool {
    let name = collapse_whitespace(name).to_lowercase();
    let title = collapse_whitespace(title).to_lowercase();
    if name.is_empty() || title.is_empty() {
        return false;
    }
    name == title || name.contains(&title) || title.contains(&name)
}

fn named<'e>(events: &'e [JsonLdEvent], title: &str) -> Option<&'e JsonLdEvent> {
    events
        .iter()
        .find(|e| e.name.as_deref().is_some_and(|n| same_title(n, title)))
}

/// Whether some event on the page is named `title`.
pub fn names_title(events: &[JsonLdEvent], title: &str) -> bool {
    named(events, title).is_some()
}

/// With a title, the event named so, or the page's single unnamed event.
fn by_title<'e>(events: &'e [JsonLdEvent], title: &str) -> Option<&'e JsonLdEvent> {
    named(events, title).or_else(|| match events {
        [only] if only.name.is_none() => Some(only),
        _ => None,
    })
}

/// Pick the event whose dates describe `title`. Without a title the first
/// event with a start date is taken.
pub fn select_event<'e>(
    events: &'e [JsonLdEvent],
    title: Option<&str>,
) -> Option<&'e JsonLdEvent> {
    match title {
        Some(title) => by_title(events, title),
        None => events.iter().find(|e| e.start_date.is_some()),
    }
}

/// Pick the event whose location describes `title`. Without a title the
/// first event carrying a location is taken, dated or not.
pub fn select_location_event<'e>(
    events: &'e [JsonLdEvent],
    title: Option<&str>,
) -> Option<&'e JsonLdEvent> {
    match title {
        Some(title) => by_title(events, title),
        None => events.iter().find(|e| e.location.is_some()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(ld: &str) -> Html {
        Html::parse_document(&format!(
            r#"<html><head><script type="application/ld+json">{ld}</script></head><body></body></html>"#
        ))
    }

    #[test]
    fn finds_events_inside_graph() {
        let html = doc(
            r#"{"@context":"https://schema.org","@graph":[
                {"@type":"WebPage","name":"Calendar"},
                {"@type":["Event","MusicEvent"],"name":"Jazz Night","startDate":"2026-03-03"}
            ]}"#,
        );
        let found = events(&html);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name.as_deref(), Some("Jazz Night"));
        assert_eq!(found[0].start_date.as_deref(), Some("2026-03-03"));
    }

    #[test]
    fn malformed_blocks_are_ignored() {
        assert!(events(&doc("{not json")).is_empty());
    }

    #[test]
    fn select_by_title() {
        let found = events(&doc(
            r#"[{"@type":"Event","name":"Spring Fair","startDate":"2026-04-01"},
                {"@type":"Event","name":"Jazz Night","startDate":"2026-03-03"}]"#,
        ));
        let picked = select_event(&found, Some("jazz night")).unwrap();
        assert_eq!(picked.start_date.as_deref(), Some("2026-03-03"));
        assert!(select_event(&found, Some("Poetry Slam")).is_none());
    }

    #[test]
    fn single_unnamed_event_matches_any_title() {
        let found = events(&doc(r#"{"@type":"Event","startDate":"2026-03-10"}"#));
        assert!(select_event(&found, Some("Anything")).is_some());
    }

    #[test]
    fn undated_event_still_supplies_a_location() {
        let found = events(&doc(
            r#"[{"@type":"Event","name":"Open Studio"},
                {"@type":"Event","name":"Gallery Walk","location":"Santa Fe, NM"}]"#,
        ));
        assert!(select_event(&found, None).is_none());
        let picked = select_location_event(&found, None).unwrap();
        assert_eq!(picked.name.as_deref(), Some("Gallery Walk"));
    }

    #[test]
    fn names_title_ignores_unnamed_events() {
        let found = events(&doc(r#"{"@type":"Event","startDate":"2026-03-10"}"#));
        assert!(!names_title(&found, "Anything"));
        let found = events(&doc(r#"{"@type":"Event","name":"Jazz Night"}"#));
        assert!(names_title(&found, "JAZZ  night"));
    }
}
