//! Ranking heuristics for the text refinement passes. Every score is a
//! struct of named components; lower totals are better.

use std::cmp::Ordering;

use crate::dates::years_in;

// --- Year agreement ---

/// How the years written in a piece of text relate to the expected year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearMatch {
    /// No expected year to compare against.
    Unknown,
    Exact,
    /// Off by one, typical around New Year.
    Adjacent,
    Mismatch,
    Absent,
}

pub fn year_match(text: &str, expected: Option<i32>) -> YearMatch {
    let Some(expected) = expected else {
        return YearMatch::Unknown;
    };
    let years = years_in(text);
    if years.is_empty() {
        return YearMatch::Absent;
    }
    if years.iter().any(|(y, _)| *y == expected) {
        YearMatch::Exact
    } else if years.iter().any(|(y, _)| (y - expected).abs() == 1) {
        YearMatch::Adjacent
    } else {
        YearMatch::Mismatch
    }
}

fn total_cmp(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

// --- Containers ---

/// Characters of text beyond the title per point of length deviation.
pub const LENGTH_DEVIATION_UNIT: f64 = 200.0;
/// Deviation stops growing here so one long card cannot dominate.
pub const LENGTH_DEVIATION_CAP: f64 = 5.0;
/// Containers longer than this usually span several events.
pub const LONG_CONTAINER_CHARS: usize = 1500;
pub const LONG_CONTAINER_PENALTY: f64 = 3.0;
/// A container without any date cannot confirm one.
pub const NO_DATE_PENALTY: f64 = 10.0;
/// A "City, ST" inside the container marks a full event card.
pub const CONTAINER_LOCATION_BONUS: f64 = -2.0;
/// Per URL/location keyword missing from the container.
pub const KEYWORD_MISS_PENALTY: f64 = 1.0;
/// Only years other than the expected one are present.
pub const YEAR_MISMATCH_PENALTY: f64 = 4.0;
pub const ADJACENT_YEAR_PENALTY: f64 = 2.0;
pub const ABSENT_YEAR_PENALTY: f64 = 1.0;

/// Observations about one container holding the title.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerFacts {
    pub text_chars: usize,
    pub title_chars: usize,
    pub has_date: bool,
    pub has_location: bool,
    pub keyword_misses: usize,
    pub year: YearMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContainerScore {
    pub length_deviation: f64,
    pub long_container: f64,
    pub no_date: f64,
    pub location: f64,
    pub keyword_misses: f64,
    pub year: f64,
}

impl ContainerScore {
    pub fn total(&self) -> f64 {
        self.length_deviation
            + self.long_container
            + self.no_date
            + self.location
            + self.keyword_misses
            + self.year
    }

    pub fn cmp_total(&self, other: &Self) -> Ordering {
        total_cmp(self.total(), other.total())
    }
}

pub fn score_container(facts: &ContainerFacts) -> ContainerScore {
    let excess = facts.text_chars.saturating_sub(facts.title_chars) as f64;
    ContainerScore {
        length_deviation: (excess / LENGTH_DEVIATION_UNIT).min(LENGTH_DEVIATION_CAP),
        long_container: if facts.text_chars > LONG_CONTAINER_CHARS {
            LONG_CONTAINER_PENALTY
        } else {
            0.0
        },
        no_date: if facts.has_date { 0.0 } else { NO_DATE_PENALTY },
        location: if facts.has_location {
            CONTAINER_LOCATION_BONUS
        } else {
            0.0
        },
        keyword_misses: facts.keyword_misses as f64 * KEYWORD_MISS_PENALTY,
        year: match facts.year {
            YearMatch::Unknown | YearMatch::Exact => 0.0,
            YearMatch::Adjacent => ADJACENT_YEAR_PENALTY,
            YearMatch::Mismatch => YEAR_MISMATCH_PENALTY,
            YearMatch::Absent => ABSENT_YEAR_PENALTY,
        },
    }
}

// --- Window parses ---

/// Distance from the generated start stops mattering beyond a month.
pub const DATE_DISTANCE_CAP_DAYS: i64 = 30;
pub const DATE_DISTANCE_WEIGHT: f64 = 0.1;
pub const PARSE_KEYWORD_MISS_PENALTY: f64 = 1.0;
/// Finding a place next to the title is strong evidence of the right card.
pub const PARSE_LOCATION_BONUS: f64 = -5.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParseScore {
    pub date_distance: f64,
    pub keyword_misses: f64,
    pub location: f64,
}

impl ParseScore {
    pub fn total(&self) -> f64 {
        self.date_distance + self.keyword_misses + self.location
    }

    pub fn cmp_total(&self, other: &Self) -> Ordering {
        total_cmp(self.total(), other.total())
    }
}

/// `day_distance` is `None` when either side has no date.
pub fn score_parse(
    day_distance: Option<i64>,
    keyword_misses: usize,
    has_location: bool,
) -> ParseScore {
    ParseScore {
        date_distance: day_distance
            .map(|d| d.min(DATE_DISTANCE_CAP_DAYS) as f64 * DATE_DISTANCE_WEIGHT)
            .unwrap_or(0.0),
        keyword_misses: keyword_misses as f64 * PARSE_KEYWORD_MISS_PENALTY,
        location: if has_location {
            PARSE_LOCATION_BONUS
        } else {
            0.0
        },
    }
}

// --- Snippets ---

pub const SNIPPET_ADJACENT_YEAR_PENALTY: f64 = 2.0;
/// Mismatched or missing year.
pub const SNIPPET_NO_YEAR_PENALTY: f64 = 5.0;
pub const SNIPPET_NO_DATE_PENALTY: f64 = 6.0;
pub const SNIPPET_KEYWORD_MISS_PENALTY: f64 = 1.0;
/// Occurrences in `<head>` (titles, meta descriptions) rarely sit near dates.
pub const BEFORE_BODY_PENALTY: f64 = 8.0;
/// The top of the body is usually navigation and banners.
pub const EARLY_BODY_PENALTY: f64 = 2.0;
pub const EARLY_BODY_CHARS: usize = 1500;
pub const SNIPPET_LOCATION_BONUS: f64 = -1.5;
/// Title only matched through markup (split by tags, attribute values).
pub const TITLE_NOT_RECOVERABLE_PENALTY: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPosition {
    BeforeBody,
    EarlyBody,
    Body,
}

impl BodyPosition {
    /// Classify a byte offset given where `<body` starts, if anywhere.
    pub fn of(offset: usize, body_start: Option<usize>) -> Self {
        match body_start {
            Some(body) if offset < body => BodyPosition::BeforeBody,
            Some(body) if offset - body < EARLY_BODY_CHARS => BodyPosition::EarlyBody,
            _ => BodyPosition::Body,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnippetFacts {
    pub year: YearMatch,
    pub has_date: bool,
    pub keyword_misses: usize,
    pub position: BodyPosition,
    pub has_location: bool,
    pub title_recoverable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SnippetPenalty {
    pub year: f64,
    pub no_date: f64,
    pub keyword_misses: f64,
    pub position: f64,
    pub location: f64,
    pub title: f64,
}

impl SnippetPenalty {
    pub fn total(&self) -> f64 {
        self.year + self.no_date + self.keyword_misses + self.position + self.location + self.title
    }

    pub fn cmp_total(&self, other: &Self) -> Ordering {
        total_cmp(self.total(), other.total())
    }
}

pub fn score_snippet(facts: &SnippetFacts) -> SnippetPenalty {
    SnippetPenalty {
        year: match facts.year {
            YearMatch::Unknown | YearMatch::Exact => 0.0,
            YearMatch::Adjacent => SNIPPET_ADJACENT_YEAR_PENALTY,
            YearMatch::Mismatch | YearMatch::Absent => SNIPPET_NO_YEAR_PENALTY,
        },
        no_date: if facts.has_date {
            0.0
        } else {
            SNIPPET_NO_DATE_PENALTY
        },
        keyword_misses: facts.keyword_misses as f64 * SNIPPET_KEYWORD_MISS_PENALTY,
        position: match facts.position {
            BodyPosition::BeforeBody => BEFORE_BODY_PENALTY,
            BodyPosition::EarlyBody => EARLY_BODY_PENALTY,
            BodyPosition::Body => 0.0,
        },
        location: if facts.has_location {
            SNIPPET_LOCATION_BONUS
        } else {
            0.0
        },
        title: if facts.title_recoverable {
            0.0
        } else {
            TITLE_NOT_RECOVERABLE_PENALTY
        },
    }
}
