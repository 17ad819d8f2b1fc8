//! Evidence-first extraction. Each field is resolved by an ordered chain of
//! independent strategies (structured data, meta tags, visible text); the
//! first confirmed result wins and carries its evidence literal.

pub mod date;
pub mod jsonld;
pub mod location;

use std::sync::LazyLock;

use chrono::{Datelike, Utc};
use scraper::{Html, Selector};
use tracing::debug;

use eventsift_common::{collapse_whitespace, EvidenceContext, StrictResult};

use crate::html::{selector, text_segments, visible_text};

pub use date::{JsonLdDates, MetaTagDates, StrictDateExtractor, VisibleTextDates};
pub use location::{JsonLdLocation, MetaTagLocation, StrictLocationExtractor, VisibleTextLocation};

static META_SEL: LazyLock<Selector> = LazyLock::new(|| selector("meta[content]"));

/// A parsed page plus the text views the strategies scan.
pub struct PageSource<'a> {
    pub raw: &'a str,
    pub doc: Html,
    pub text: String,
    pub segments: Vec<String>,
    /// Year assumed for dates written without one and no 20xx year nearby.
    pub reference_year: i32,
    /// Title to anchor on: selects the matching JSON-LD event and biases
    /// text matches toward the nearest occurrence.
    pub anchor: Option<String>,
}

impl<'a> PageSource<'a> {
    pub fn parse(raw: &'a str) -> Self {
        Self::from_doc(raw, Html::parse_document(raw))
    }

    /// Parse a snippet or plain-text description.
    pub fn fragment(raw: &'a str) -> Self {
        Self::from_doc(raw, Html::parse_fragment(raw))
    }

    fn from_doc(raw: &'a str, doc: Html) -> Self {
        let text = visible_text(&doc);
        let segments = text_segments(&doc);
        Self {
            raw,
            doc,
            text,
            segments,
            reference_year: Utc::now().year(),
            anchor: None,
        }
    }

    pub fn with_anchor(mut self, title: &str) -> Self {
        self.set_anchor(Some(title));
        self
    }

    /// Re-anchor a parsed page on another title without re-parsing.
    pub fn set_anchor(&mut self, title: Option<&str>) {
        self.anchor = title
            .map(collapse_whitespace)
            .filter(|t| !t.is_empty());
    }

    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = year;
        self
    }

    /// Byte offset just past the anchor in `text`, matched ASCII
    /// case-insensitively.
    pub fn anchor_offset(&self) -> Option<usize> {
        let anchor = self.anchor.as_deref()?.to_ascii_lowercase();
        self.text
            .to_ascii_lowercase()
            .find(&anchor)
            .map(|at| at + anchor.len())
    }
}

/// Content of the first `<meta>` whose property, name or itemprop is one of
/// `keys` (lowercase).
pub(crate) fn meta_value(page: &PageSource<'_>, keys: &[&str]) -> Option<String> {
    page.doc.select(&META_SEL).find_map(|meta| {
        let el = meta.value();
        let key = el
            .attr("property")
            .or_else(|| el.attr("name"))
            .or_else(|| el.attr("itemprop"))?
            .to_ascii_lowercase();
        if !keys.contains(&key.as_str()) {
            return None;
        }
        let content = el.attr("content")?.trim();
        (!content.is_empty()).then(|| content.to_string())
    })
}

/// Microdata value: `content`, then `datetime`, then element text.
pub(crate) fn itemprop_value(page: &PageSource<'_>, sel: &Selector) -> Option<String> {
    page.doc.select(sel).find_map(|node| {
        let el = node.value();
        let value = el
            .attr("content")
            .or_else(|| el.attr("datetime"))
            .map(str::to_string)
            .unwrap_or_else(|| node.text().collect::<String>());
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// One way of finding evidence for a field.
pub trait EvidenceStrategy<T>: Send + Sync {
    fn context(&self) -> EvidenceContext;

    fn extract(&self, page: &PageSource<'_>) -> StrictResult<T>;
}

/// Ordered strategies; the first confirmed result wins.
pub struct EvidenceChain<T> {
    strategies: Vec<Box<dyn EvidenceStrategy<T>>>,
}

impl<T> EvidenceChain<T> {
    pub fn new(strategies: Vec<Box<dyn EvidenceStrategy<T>>>) -> Self {
        Self { strategies }
    }

    pub fn extract(&self, page: &PageSource<'_>) -> StrictResult<T> {
        for strategy in &self.strategies {
            let result = strategy.extract(page);
            if result.is_confirmed() {
                debug!(context = %strategy.context(), evidence = ?result.evidence, "Strict match");
                return result;
            }
        }
        StrictResult::tbd()
    }
}
