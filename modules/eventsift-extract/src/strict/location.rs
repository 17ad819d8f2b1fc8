use std::sync::LazyLock;

use scraper::Selector;
use serde_json::Value;

use eventsift_common::{normalize_state, EvidenceContext, StrictResult};

use super::{itemprop_value, jsonld, meta_value, EvidenceChain, EvidenceStrategy, PageSource};
use crate::dates::first_date;
use crate::html::selector;
use crate::places::{first_place, loose_place_after, nearest_place, PlaceMatch};

const META_PLACE_KEYS: &[&str] = &["geo.placename", "event:location", "og:event:location"];
const META_LOCALITY_KEYS: &[&str] = &["og:locality", "event:locality", "place:locality"];
const META_REGION_KEYS: &[&str] = &["og:region", "event:region", "place:region", "geo.region"];

/// How far past a matched date a comma-less "City ST" is trusted.
const LOOSE_WINDOW: usize = 80;

static LOCALITY_SEL: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[itemprop="addressLocality"]"#));
static REGION_SEL: LazyLock<Selector> = LazyLock::new(|| selector(r#"[itemprop="addressRegion"]"#));

/// "City, ST" from separate locality and region values. The region may be a
/// code, a full name or an ISO 3166-2 code ("US-TX").
fn locality_label(locality: &str, region: &str) -> Option<String> {
    let locality = locality.trim();
    let region = region.trim();
    let region = region.strip_prefix("US-").unwrap_or(region);
    let code = normalize_state(region)?;
    (!locality.is_empty()).then(|| format!("{locality}, {code}"))
}

fn from_place(m: PlaceMatch, context: EvidenceContext) -> StrictResult<String> {
    StrictResult::confirmed(m.label(), &m.text, context)
}

// --- Structured data ---

pub struct JsonLdLocation;

fn from_json(value: &Value, depth: usize) -> Option<(String, String)> {
    if depth > 4 {
        return None;
    }
    match value {
        Value::String(s) => first_place(s).map(|m| (m.label(), m.text)),
        Value::Array(items) => items.iter().find_map(|v| from_json(v, depth + 1)),
        Value::Object(obj) => {
            if jsonld::has_type(obj, "VirtualLocation") {
                return None;
            }
            let locality = obj.get("addressLocality").and_then(Value::as_str);
            let region = obj.get("addressRegion").and_then(Value::as_str);
            if let (Some(locality), Some(region)) = (locality, region) {
                if let Some(label) = locality_label(locality, region) {
                    return Some((label, locality.to_string()));
                }
            }
            obj.get("address")
                .and_then(|a| from_json(a, depth + 1))
                .or_else(|| obj.get("name").and_then(|n| from_json(n, depth + 1)))
        }
        _ => None,
    }
}

impl EvidenceStrategy<String> for JsonLdLocation {
    fn context(&self) -> EvidenceContext {
        EvidenceContext::JsonLd
    }

    fn extract(&self, page: &PageSource<'_>) -> StrictResult<String> {
        let events = jsonld::events(&page.doc);
        let found = jsonld::select_location_event(&events, page.anchor.as_deref())
            .and_then(|e| e.location.as_ref())
            .and_then(|loc| from_json(loc, 0));
        match found {
            Some((label, evidence)) => StrictResult::confirmed(label, &evidence, self.context()),
            None => StrictResult::tbd(),
        }
    }
}

// --- Meta tags and microdata ---

pub struct MetaTagLocation;

impl EvidenceStrategy<String> for MetaTagLocation {
    fn context(&self) -> EvidenceContext {
        EvidenceContext::MetaTags
    }

    fn extract(&self, page: &PageSource<'_>) -> StrictResult<String> {
        let placename = meta_value(page, META_PLACE_KEYS);
        if let Some(m) = placename.as_deref().and_then(first_place) {
            return from_place(m, self.context());
        }

        let locality = meta_value(page, META_LOCALITY_KEYS)
            .or(placename)
            .or_else(|| itemprop_value(page, &LOCALITY_SEL));
        let region =
            meta_value(page, META_REGION_KEYS).or_else(|| itemprop_value(page, &REGION_SEL));
        if let (Some(locality), Some(region)) = (locality, region) {
            if let Some(label) = locality_label(&locality, &region) {
                return StrictResult::confirmed(label, &locality, self.context());
            }
        }
        StrictResult::tbd()
    }
}

// --- Visible text ---

pub struct VisibleTextLocation;

impl VisibleTextLocation {
    /// A leaf text node holding the whole match beats one assembled from
    /// neighbouring nodes. With an anchor, the leaf closest to it wins.
    fn leaf_match(page: &PageSource<'_>) -> Option<PlaceMatch> {
        let mut leaves = page.segments.iter().filter_map(|s| first_place(s));
        let Some(at) = page.anchor_offset() else {
            return leaves.next();
        };
        leaves.min_by_key(|m| {
            page.text
                .match_indices(m.text.as_str())
                .map(|(pos, _)| pos.abs_diff(at))
                .min()
                .unwrap_or(usize::MAX)
        })
    }

    /// "Mar 3 Denver CO": comma-less place right after a date.
    fn after_date(page: &PageSource<'_>) -> Option<PlaceMatch> {
        let date = first_date(&page.text, page.reference_year)?;
        loose_place_after(&page.text, date.range.end, LOOSE_WINDOW)
    }
}

impl EvidenceStrategy<String> for VisibleTextLocation {
    fn context(&self) -> EvidenceContext {
        EvidenceContext::VisibleText
    }

    fn extract(&self, page: &PageSource<'_>) -> StrictResult<String> {
        let found = Self::leaf_match(page).or_else(|| match page.anchor_offset() {
            Some(at) => nearest_place(&page.text, at),
            None => first_place(&page.text),
        });
        match found.or_else(|| Self::after_date(page)) {
            Some(m) => from_place(m, self.context()),
            None => StrictResult::tbd(),
        }
    }
}

/// Structured data, then meta tags, then visible text.
pub struct StrictLocationExtractor {
    chain: EvidenceChain<String>,
}

impl Default for StrictLocationExtractor {
    fn default() -> Self {
        Self {
            chain: EvidenceChain::new(vec![
                Box::new(JsonLdLocation),
                Box::new(MetaTagLocation),
                Box::new(VisibleTextLocation),
            ]),
        }
    }
}

impl StrictLocationExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extract(&self, page: &PageSource<'_>) -> StrictResult<String> {
        self.chain.extract(page)
    }

    pub fn extract_html(&self, html: &str) -> StrictResult<String> {
        self.extract(&PageSource::parse(html))
    }
}
