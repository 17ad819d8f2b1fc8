//! Text views over HTML: logical lines, visible text, leaf text segments,
//! plus regex-level cleanup for prompt budgets and snippets.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use eventsift_common::collapse_whitespace;

/// Elements that start a new logical line.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tbody", "td", "tfoot",
    "th", "thead", "tr", "ul",
];

/// Elements whose text is never visible.
const SKIP_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg", "head", "title"];

static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b.*?</style\s*>").expect("valid regex"));
static SVG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<svg\b.*?</svg\s*>").expect("valid regex"));
static NOSCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<noscript\b.*?</noscript\s*>").expect("valid regex"));
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b([^>]*)>.*?</script\s*>").expect("valid regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static LEADING_PARTIAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^<>]*>").expect("valid regex"));
static TRAILING_PARTIAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*$").expect("valid regex"));
static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n+").expect("valid regex"));
static SPACES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("valid regex"));

pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css:?}: {e:?}"))
}

static BODY_SEL: LazyLock<Selector> = LazyLock::new(|| selector("body"));

fn is_block(name: &str) -> bool {
    BLOCK_TAGS.contains(&name)
}

fn is_skipped(name: &str) -> bool {
    SKIP_TAGS.contains(&name)
}

fn flush(current: &mut String, lines: &mut Vec<String>) {
    let line = collapse_whitespace(current);
    if !line.is_empty() {
        lines.push(line);
    }
    current.clear();
}

fn collect_lines(el: ElementRef<'_>, current: &mut String, lines: &mut Vec<String>) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => current.push_str(text),
            Node::Element(element) => {
                let name = element.name();
                if is_skipped(name) {
                    continue;
                }
                if name == "br" || name == "hr" {
                    flush(current, lines);
                    continue;
                }
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = is_block(name);
                if block {
                    flush(current, lines);
                } else {
                    current.push(' ');
                }
                collect_lines(child_el, current, lines);
                if block {
                    flush(current, lines);
                } else {
                    current.push(' ');
                }
            }
            _ => {}
        }
    }
}

/// Split an element into logical lines, breaking at block-level boundaries.
pub fn element_lines(el: ElementRef<'_>) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    collect_lines(el, &mut current, &mut lines);
    flush(&mut current, &mut lines);
    lines
}

/// Whitespace-normalized visible text of an element.
pub fn element_text(el: ElementRef<'_>) -> String {
    element_lines(el).join(" ")
}

/// Whitespace-normalized visible text of the document body.
pub fn visible_text(doc: &Html) -> String {
    let root = doc
        .select(&BODY_SEL)
        .next()
        .unwrap_or_else(|| doc.root_element());
    element_text(root)
}

/// Individual visible text nodes, whitespace-normalized, in document order.
pub fn text_segments(doc: &Html) -> Vec<String> {
    doc.root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|e| is_skipped(e.name()))
            });
            if hidden {
                return None;
            }
            let collapsed = collapse_whitespace(text);
            (!collapsed.is_empty()).then_some(collapsed)
        })
        .collect()
}

/// Drop markup that carries no listing content (styles, SVG, comments and
/// non-JSON-LD scripts) so the prompt budget covers the page body.
pub fn compact_html(html: &str) -> String {
    let html = COMMENT_RE.replace_all(html, "");
    let html = STYLE_RE.replace_all(&html, "");
    let html = SVG_RE.replace_all(&html, "");
    let html = NOSCRIPT_RE.replace_all(&html, "");
    let html = SCRIPT_RE.replace_all(&html, |caps: &regex::Captures<'_>| {
        if caps[1].to_ascii_lowercase().contains("ld+json") {
            caps[0].to_string()
        } else {
            String::new()
        }
    });
    let html = SPACES_RE.replace_all(&html, " ");
    BLANK_LINES_RE.replace_all(&html, "\n").into_owned()
}

/// Decode the handful of entities that matter for matching titles and dates.
pub fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&apos;", "'")
        .replace("&rsquo;", "’")
        .replace("&lsquo;", "‘")
        .replace("&ndash;", "–")
        .replace("&mdash;", "—")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Cheap tag stripping for HTML slices that may start or end mid-tag.
pub fn strip_tags(html: &str) -> String {
    let html = LEADING_PARTIAL_RE.replace(html, " ");
    let html = TRAILING_PARTIAL_RE.replace(&html, " ");
    let html = SCRIPT_RE.replace_all(&html, " ");
    let html = STYLE_RE.replace_all(&html, " ");
    let text = TAG_RE.replace_all(&html, " ");
    collapse_whitespace(&decode_entities(&text))
}
