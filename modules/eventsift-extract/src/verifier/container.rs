//! Refinement over the DOM: find the elements that hold the title, rank
//! them, then parse a small line window around the title in the best ones.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use scraper::{ElementRef, Selector};

use eventsift_common::collapse_whitespace;

use super::keywords::Keywords;
use super::scoring::{
    score_container, score_parse, year_match, ContainerFacts, ContainerScore, ParseScore,
};
use crate::dates::{day_distance, has_date_pattern, nearest_date, DateMatch};
use crate::html::{element_lines, selector};
use crate::places::{has_place_pattern, loose_place_after, nearest_place, PlaceMatch};
use crate::strict::PageSource;

static TITLE_HOST_SEL: LazyLock<Selector> = LazyLock::new(|| {
    selector(
        "a, b, strong, em, span, h1, h2, h3, h4, h5, h6, li, p, td, dt, dd, div, article, section",
    )
});
static HEADING_SEL: LazyLock<Selector> = LazyLock::new(|| selector("h1, h2, h3, h4, h5, h6"));

/// Tags that repeat once per event in listings.
const CARD_TAGS: &[&str] = &["li", "article", "tr"];

const MAX_ANCESTORS: usize = 4;
const MAX_CONTAINER_CHARS: usize = 3000;
const KEPT_CONTAINERS: usize = 3;
const LINES_BEFORE: usize = 2;
const LINES_AFTER: usize = 4;
const LOOSE_PLACE_SPAN: usize = 80;

/// Best parse found next to the title.
#[derive(Debug, Clone)]
pub struct Refinement {
    pub date: Option<DateMatch>,
    pub place: Option<PlaceMatch>,
    /// Window text the parse was read from.
    pub window: String,
    pub score: ParseScore,
}

struct Container {
    lines: Vec<String>,
    score: ContainerScore,
}

fn contains_title(lines: &[String], title_key: &str) -> bool {
    lines.join(" ").to_ascii_lowercase().contains(title_key)
}

fn holds_title(el: ElementRef<'_>, title_key: &str) -> bool {
    let text: String = el.text().collect();
    collapse_whitespace(&text)
        .to_ascii_lowercase()
        .contains(title_key)
}

/// Another event's card: a list item, article or row, or anything that
/// is or carries a heading.
fn is_card(el: ElementRef<'_>) -> bool {
    let name = el.value().name();
    CARD_TAGS.contains(&name)
        || matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
        || el.select(&HEADING_SEL).next().is_some()
}

/// When `el` lists several events, the lines of the child holding the title
/// through the siblings before the next card of the same tag. `None` when
/// `el` has no sibling cards around the title.
fn own_card_lines(el: ElementRef<'_>, title_key: &str) -> Option<Vec<String>> {
    let children: Vec<ElementRef<'_>> = el.children().filter_map(ElementRef::wrap).collect();
    let at = children.iter().position(|c| holds_title(*c, title_key))?;
    let tag = children[at].value().name();
    let sibling_card = |c: &ElementRef<'_>| c.value().name() == tag && is_card(*c);
    let listing = children
        .iter()
        .enumerate()
        .any(|(i, c)| i != at && sibling_card(c));
    if !listing {
        return None;
    }
    let mut lines = element_lines(children[at]);
    for sibling in children[at + 1..].iter().take_while(|c| !sibling_card(*c)) {
        lines.extend(element_lines(*sibling));
    }
    Some(lines)
}

fn keep(lines: Vec<String>, title_key: &str, out: &mut Vec<Vec<String>>) {
    let chars: usize = lines.iter().map(|l| l.chars().count() + 1).sum();
    if chars <= MAX_CONTAINER_CHARS && contains_title(&lines, title_key) && !out.contains(&lines)
    {
        out.push(lines);
    }
}

/// Elements whose text contains the title, plus up to four ancestors of
/// each, skipping anything too long to be a single event. Climbing stops at
/// an element listing other events; only the title's own card is read
/// from it.
fn collect_containers(page: &PageSource<'_>, title_key: &str) -> Vec<Vec<String>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for host in page.doc.select(&TITLE_HOST_SEL) {
        if !holds_title(host, title_key) {
            continue;
        }
        let chain = std::iter::once(host).chain(
            host.ancestors()
                .take(MAX_ANCESTORS)
                .filter_map(ElementRef::wrap),
        );
        for el in chain {
            let own = own_card_lines(el, title_key);
            let listing = own.is_some();
            if seen.insert(el.id()) {
                keep(own.unwrap_or_else(|| element_lines(el)), title_key, &mut out);
            }
            if listing {
                break;
            }
        }
    }
    out
}

fn rank(
    containers: Vec<Vec<String>>,
    title_key: &str,
    keywords: &Keywords,
    expected_year: Option<i32>,
) -> Vec<Container> {
    let mut ranked: Vec<Container> = containers
        .into_iter()
        .map(|lines| {
            let text = lines.join(" ");
            let facts = ContainerFacts {
                text_chars: text.chars().count(),
                title_chars: title_key.chars().count(),
                has_date: has_date_pattern(&text),
                has_location: has_place_pattern(&text),
                keyword_misses: keywords.misses(&text),
                year: year_match(&text, expected_year),
            };
            Container {
                lines,
                score: score_container(&facts),
            }
        })
        .collect();
    ranked.sort_by(|a, b| a.score.cmp_total(&b.score));
    ranked.truncate(KEPT_CONTAINERS);
    ranked
}

/// Two lines above the title line through four below it.
fn window(lines: &[String], title_key: &str) -> String {
    match lines
        .iter()
        .position(|l| l.to_ascii_lowercase().contains(title_key))
    {
        Some(i) => {
            let from = i.saturating_sub(LINES_BEFORE);
            let to = (i + LINES_AFTER + 1).min(lines.len());
            lines[from..to].join(" ")
        }
        None => lines.join(" "),
    }
}

fn parse_window(
    window: String,
    title_key: &str,
    keywords: &Keywords,
    expected: Option<NaiveDate>,
    default_year: i32,
) -> Refinement {
    let anchor = window
        .to_ascii_lowercase()
        .find(title_key)
        .map(|at| at + title_key.len())
        .unwrap_or(0);
    let date = nearest_date(&window, anchor, default_year);
    let place = nearest_place(&window, anchor).or_else(|| {
        date.as_ref()
            .and_then(|d| loose_place_after(&window, d.range.end, LOOSE_PLACE_SPAN))
    });
    let days = date
        .as_ref()
        .zip(expected)
        .map(|(d, e)| day_distance(d.start, e));
    let score = score_parse(days, keywords.misses(&window), place.is_some());
    Refinement {
        date,
        place,
        window,
        score,
    }
}

/// Best parse around the title, preferring parses that found a date.
/// `None` when no element holds the title.
pub fn refine(
    page: &PageSource<'_>,
    title_key: &str,
    keywords: &Keywords,
    expected: Option<NaiveDate>,
    default_year: i32,
) -> Option<Refinement> {
    let containers = collect_containers(page, title_key);
    let ranked = rank(containers, title_key, keywords, expected.map(|d| d.year()));
    ranked
        .into_iter()
        .map(|c| {
            let text = window(&c.lines, title_key);
            parse_window(text, title_key, keywords, expected, default_year)
        })
        .min_by(|a, b| {
            a.date
                .is_none()
                .cmp(&b.date.is_none())
                .then(a.score.cmp_total(&b.score))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    const LISTING: &str = r#"<html><body>
        <nav><a href="/">Home</a></nav>
        <ul>
          <li class="event"><h3>Spring Fair</h3><p>Apr 4, 2026</p><p>Dallas, TX</p></li>
          <li class="event"><h3>Jazz Night</h3><p>Mar 3, 2026</p>
            <p>Paramount Theatre</p><p>Austin, TX</p></li>
          <li class="event"><h3>Poetry Slam</h3><p>May 9, 2026</p></li>
        </ul>
    </body></html>"#;

    #[test]
    fn picks_date_and_place_from_the_title_card() {
        let page = PageSource::parse(LISTING);
        let refined = refine(&page, "jazz night", &Keywords::default(), None, 2026).unwrap();
        assert_eq!(refined.date.as_ref().unwrap().start, d(2026, 3, 3));
        assert_eq!(refined.place.unwrap().label(), "Austin, TX");
    }

    #[test]
    fn card_without_date_falls_back_to_wider_container() {
        let html = "<body><div><section><h2>Book Club</h2><p>Bring a friend</p></section>\
                    <p>Next meeting Jun 12, 2026</p></div></body>";
        let page = PageSource::parse(html);
        let refined = refine(&page, "book club", &Keywords::default(), None, 2026).unwrap();
        assert_eq!(refined.date.unwrap().start, d(2026, 6, 12));
    }

    #[test]
    fn missing_title_yields_none() {
        let page = PageSource::parse(LISTING);
        assert!(refine(&page, "karaoke", &Keywords::default(), None, 2026).is_none());
    }

    #[test]
    fn window_is_two_before_four_after() {
        let lines: Vec<String> = (0..10).map(|i| format!("line {i}")).collect();
        let mut lines = lines;
        lines[5] = "The Title".into();
        assert_eq!(
            window(&lines, "the title"),
            "line 3 line 4 The Title line 6 line 7 line 8 line 9"
        );
    }

    #[test]
    fn undated_card_does_not_borrow_a_neighbours_date() {
        let html = "<body><ul>\
            <li><h3>Spring Fair</h3><p>Apr 4, 2026</p><p>Dallas, TX</p></li>\
            <li><h3>Book Swap</h3><p>Every week</p></li>\
            </ul></body>";
        let page = PageSource::parse(html);
        let refined = refine(&page, "book swap", &Keywords::default(), None, 2026).unwrap();
        assert!(refined.date.is_none());
        assert!(refined.place.is_none());
        assert!(!refined.window.contains("Spring Fair"));
    }

    #[test]
    fn flat_listing_reads_up_to_the_next_heading() {
        let html = "<body><div>\
            <h3>Jazz Night</h3><p>Mar 3, 2026</p>\
            <h3>Poetry Slam</h3><p>May 9, 2026</p>\
            </div></body>";
        let page = PageSource::parse(html);
        let refined = refine(&page, "poetry slam", &Keywords::default(), None, 2026).unwrap();
        assert_eq!(refined.date.unwrap().start, d(2026, 5, 9));
        let refined = refine(&page, "jazz night", &Keywords::default(), None, 2026).unwrap();
        assert_eq!(refined.date.unwrap().start, d(2026, 3, 3));
    }
}
