//! Visible-text date grammar: cross-month ranges ("Dec 28 - Jan 3, 2027"),
//! single-month ranges ("Mar 10-12, 2026") and the agent's "Mon DD, YYYY".

use std::ops::Range;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::{Captures, Regex};

use eventsift_common::EventDate;

const MONTH: &str = r"\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\b\.?";
const DAY: &str = r"(\d{1,2})(?:st|nd|rd|th)?\b";
const YEAR: &str = r"(?:,?\s*(20\d{2})\b)?";
const RANGE_SEP: &str = r"\s*(?:-|–|—|to|through|thru|until)\s*";
const WEEKDAY: &str = r"(?:(?:mon|tue|wed|thu|fri|sat|sun)[a-z]*\.?,?\s+)?";

static CROSS_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i){MONTH}\s+{DAY}{YEAR}{RANGE_SEP}{WEEKDAY}{MONTH}\s+{DAY}{YEAR}"
    ))
    .expect("valid regex")
});

static SINGLE_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i){MONTH}\s+{DAY}(?:\s*(?:-|–|—)\s*(\d{{1,2}})(?:st|nd|rd|th)?\b)?{YEAR}"
    ))
    .expect("valid regex")
});

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(20\d{2})\b").expect("valid regex"));

static AGENT_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^\s*{WEEKDAY}{MONTH}\s+{DAY},?\s+(\d{{4}})(?:\s*(?:,|at|@)?\s*(\d{{1,2}})(?::(\d{{2}}))?\s*([ap])\.?m\.?)?\s*$"
    ))
    .expect("valid regex")
});

/// A date or date range found in text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateMatch {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Matched text exactly as it appears in the input.
    pub text: String,
    /// Byte range of the match in the input.
    pub range: Range<usize>,
    pub explicit_year: bool,
}

impl DateMatch {
    pub fn is_multi_day(&self) -> bool {
        self.end > self.start
    }
}

/// Month number for a name or abbreviation ("Sept", "december", "Jan.").
pub fn parse_month(token: &str) -> Option<u32> {
    let lower = token.trim().trim_end_matches('.').to_ascii_lowercase();
    let prefix = lower.get(..3)?;
    let month = match prefix {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Every `20xx` year in the text with its byte offset.
pub fn years_in(text: &str) -> Vec<(i32, usize)> {
    YEAR_RE
        .captures_iter(text)
        .filter_map(|c| {
            let m = c.get(1)?;
            Some((m.as_str().parse().ok()?, m.start()))
        })
        .collect()
}

/// The `20xx` year closest to `pos`, if any.
pub fn nearest_year(text: &str, pos: usize) -> Option<i32> {
    years_in(text)
        .into_iter()
        .min_by_key(|(_, at)| at.abs_diff(pos))
        .map(|(year, _)| year)
}

pub fn has_date_pattern(text: &str) -> bool {
    CROSS_MONTH_RE.is_match(text) || SINGLE_MONTH_RE.is_match(text)
}

fn group_u32(caps: &Captures<'_>, i: usize) -> Option<u32> {
    caps.get(i).and_then(|m| m.as_str().parse().ok())
}

fn group_i32(caps: &Captures<'_>, i: usize) -> Option<i32> {
    caps.get(i).and_then(|m| m.as_str().parse().ok())
}

/// Cross-month ranges. A missing end year rolls over to the next year when
/// the end month precedes the start month.
pub fn find_cross_month(text: &str, default_year: i32) -> Vec<DateMatch> {
    CROSS_MONTH_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let sm = parse_month(caps.get(1)?.as_str())?;
            let sd = group_u32(&caps, 2)?;
            let sy = group_i32(&caps, 3);
            let em = parse_month(caps.get(4)?.as_str())?;
            let ed = group_u32(&caps, 5)?;
            let ey = group_i32(&caps, 6);

            let (start_year, end_year) = match (sy, ey) {
                (Some(sy), Some(ey)) => (sy, ey),
                (None, Some(ey)) => (if sm > em { ey - 1 } else { ey }, ey),
                (Some(sy), None) => (sy, if em < sm { sy + 1 } else { sy }),
                (None, None) => {
                    let sy = nearest_year(text, whole.start()).unwrap_or(default_year);
                    (sy, if em < sm { sy + 1 } else { sy })
                }
            };

            let start = NaiveDate::from_ymd_opt(start_year, sm, sd)?;
            let end = NaiveDate::from_ymd_opt(end_year, em, ed)?;
            if end < start {
                return None;
            }
            Some(DateMatch {
                start,
                end,
                text: whole.as_str().to_string(),
                range: whole.range(),
                explicit_year: sy.is_some() || ey.is_some(),
            })
        })
        .collect()
}

/// Single-month dates and day ranges ("Mar 10", "March 10-12, 2026").
pub fn find_single_month(text: &str, default_year: i32) -> Vec<DateMatch> {
    SINGLE_MONTH_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let month = parse_month(caps.get(1)?.as_str())?;
            let day = group_u32(&caps, 2)?;
            let end_day = group_u32(&caps, 3);
            let explicit = group_i32(&caps, 4);
            let year = explicit
                .or_else(|| nearest_year(text, whole.start()))
                .unwrap_or(default_year);

            let start = NaiveDate::from_ymd_opt(year, month, day)?;
            let end = match end_day {
                Some(ed) if ed >= day => NaiveDate::from_ymd_opt(year, month, ed)?,
                // "Jan 30-2" wraps into the following month.
                Some(ed) => {
                    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
                    NaiveDate::from_ymd_opt(ny, nm, ed)?
                }
                None => start,
            };
            Some(DateMatch {
                start,
                end,
                text: whole.as_str().to_string(),
                range: whole.range(),
                explicit_year: explicit.is_some(),
            })
        })
        .collect()
}

/// All dates in the text: cross-month ranges plus single-month matches that
/// do not overlap one, ordered by position.
pub fn find_dates(text: &str, default_year: i32) -> Vec<DateMatch> {
    let cross = find_cross_month(text, default_year);
    let mut all: Vec<DateMatch> = find_single_month(text, default_year)
        .into_iter()
        .filter(|s| {
            !cross
                .iter()
                .any(|c| s.range.start < c.range.end && c.range.start < s.range.end)
        })
        .collect();
    all.extend(cross);
    all.sort_by_key(|m| m.range.start);
    all
}

/// First date by priority: cross-month ranges before single-month ones.
pub fn first_date(text: &str, default_year: i32) -> Option<DateMatch> {
    find_cross_month(text, default_year)
        .into_iter()
        .next()
        .or_else(|| find_single_month(text, default_year).into_iter().next())
}

/// Date match nearest to `anchor`, cross-month ranges first. Matches after
/// the anchor are preferred: listings usually print the date below the title.
pub fn nearest_date(text: &str, anchor: usize, default_year: i32) -> Option<DateMatch> {
    let distance = |m: &DateMatch| {
        if m.range.start >= anchor {
            m.range.start - anchor
        } else {
            anchor.saturating_sub(m.range.end) * 2
        }
    };
    let cross = find_cross_month(text, default_year);
    if let Some(best) = cross.into_iter().min_by_key(distance) {
        return Some(best);
    }
    find_single_month(text, default_year)
        .into_iter()
        .min_by_key(distance)
}

/// Parse a date as written by the generation step. "Mon DD, YYYY" becomes a
/// calendar date; an appended clock time ("7 pm", "7:30pm") makes it an
/// instant. ISO-8601 literals are accepted too.
pub fn parse_agent_date(literal: &str) -> Option<EventDate> {
    if let Some(caps) = AGENT_DATE_RE.captures(literal) {
        let month = parse_month(caps.get(1)?.as_str())?;
        let day = group_u32(&caps, 2)?;
        let year = group_i32(&caps, 3)?;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let hour = match group_u32(&caps, 4) {
            Some(hour @ 1..=12) => hour,
            Some(_) => return None,
            None => return Some(EventDate::CalendarDate(date)),
        };
        let minute = group_u32(&caps, 5).unwrap_or(0);
        let pm = caps
            .get(6)
            .is_some_and(|m| m.as_str().eq_ignore_ascii_case("p"));
        let hour24 = match (hour % 12, pm) {
            (h, true) => h + 12,
            (h, false) => h,
        };
        let time = NaiveTime::from_hms_opt(hour24, minute, 0)?;
        return Some(EventDate::Instant {
            local: date.and_time(time),
            offset: None,
        });
    }
    EventDate::parse_iso(literal)
}

/// Absolute difference in days between two dates.
pub fn day_distance(a: NaiveDate, b: NaiveDate) -> i64 {
    (a - b).num_days().abs()
}
