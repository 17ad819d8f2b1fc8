//! Structural scan used when generation returns nothing usable: pull
//! card-like elements out of the DOM and hand them back as hints.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use url::Url;

use eventsift_common::collapse_whitespace;

use crate::dates::first_date;
use crate::html::{element_text, selector};

static CARD_SEL: LazyLock<Selector> = LazyLock::new(|| selector("article, li, div, section, tr"));
static HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| selector("h1, h2, h3, h4, h5, h6, [class*=title], strong, a"));
static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));

const CARD_MARKERS: &[&str] = &["event", "card", "listing", "item", "calendar"];
const MIN_TEXT_CHARS: usize = 10;
const MAX_TEXT_CHARS: usize = 500;
const MAX_HINTS: usize = 60;

/// One card-like element summarized for the second generation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingHint {
    pub heading: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_text: Option<String>,
    pub text: String,
}

fn looks_like_card(el: &ElementRef<'_>) -> bool {
    let value = el.value();
    if value.name() == "article" {
        return true;
    }
    let class = value.attr("class").unwrap_or_default().to_ascii_lowercase();
    let id = value.attr("id").unwrap_or_default().to_ascii_lowercase();
    CARD_MARKERS
        .iter()
        .any(|m| class.contains(m) || id.contains(m))
}

fn heading_of(card: &ElementRef<'_>, text: &str) -> String {
    card.select(&HEADING_SEL)
        .map(element_text)
        .find(|h| !h.is_empty())
        .unwrap_or_else(|| text.chars().take(80).collect())
}

fn link_of(card: &ElementRef<'_>, base: Option<&Url>) -> Option<String> {
    let href = card.select(&LINK_SEL).find_map(|a| a.value().attr("href"))?;
    let href = href.trim();
    if href.starts_with('#') || href.starts_with("javascript:") || href.starts_with("mailto:") {
        return None;
    }
    match base {
        Some(base) => base.join(href).ok().map(|u| u.to_string()),
        None => Url::parse(href).ok().map(|u| u.to_string()),
    }
}

/// Card-like elements with a heading, absolute link and first date
/// substring, deduped by heading and capped.
pub fn scan(html: &str, final_url: &str, reference_year: i32) -> Vec<ListingHint> {
    let doc = Html::parse_document(html);
    let base = Url::parse(final_url).ok();
    let mut seen = HashSet::new();
    let mut hints = Vec::new();

    for card in doc.select(&CARD_SEL) {
        if !looks_like_card(&card) {
            continue;
        }
        let text = collapse_whitespace(&element_text(card));
        let chars = text.chars().count();
        if !(MIN_TEXT_CHARS..=MAX_TEXT_CHARS).contains(&chars) {
            continue;
        }
        let heading = heading_of(&card, &text);
        if !seen.insert(heading.to_lowercase()) {
            continue;
        }
        hints.push(ListingHint {
            link: link_of(&card, base.as_ref()),
            date_text: first_date(&text, reference_year).map(|m| m.text),
            heading,
            text,
        });
        if hints.len() >= MAX_HINTS {
            break;
        }
    }
    hints
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"<html><body>
        <div class="nav-item"><a href="#top">Top</a></div>
        <ul>
          <li class="event-card"><h3>Jazz Night</h3><a href="/e/jazz">Details</a>
            <p>Mar 3, 2026</p></li>
          <li class="event-card"><h3>Jazz Night</h3><a href="/e/jazz-2">Details</a>
            <p>Mar 10, 2026</p></li>
          <li class="event-card"><h3>Spring Fair</h3><p>Apr 4 - Apr 6, 2026 at the park</p></li>
          <li>Plain item without markers</li>
        </ul>
        <article><h2>Poetry Slam</h2><a href="https://other.org/slam">Go</a></article>
    </body></html>"##;

    #[test]
    fn finds_cards_with_links_and_dates() {
        let hints = scan(PAGE, "https://example.org/calendar/", 2026);
        let headings: Vec<_> = hints.iter().map(|h| h.heading.as_str()).collect();
        assert_eq!(headings, ["Jazz Night", "Spring Fair", "Poetry Slam"]);

        assert_eq!(hints[0].link.as_deref(), Some("https://example.org/e/jazz"));
        assert_eq!(hints[0].date_text.as_deref(), Some("Mar 3, 2026"));
        assert_eq!(hints[1].date_text.as_deref(), Some("Apr 4 - Apr 6, 2026"));
        assert_eq!(hints[2].link.as_deref(), Some("https://other.org/slam"));
    }

    #[test]
    fn short_cards_are_skipped() {
        let hints = scan(PAGE, "https://example.org/", 2026);
        assert!(hints.iter().all(|h| h.heading != "Top"));
    }

    #[test]
    fn no_cards_no_hints() {
        assert!(scan("<p>Nothing here at all</p>", "https://example.org", 2026).is_empty());
    }
}
