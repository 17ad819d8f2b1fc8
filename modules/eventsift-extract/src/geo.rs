//! Best-effort split of a free-text location into city / region / country.

use eventsift_common::normalize_state;

const US_NAMES: &[&str] = &[
    "us",
    "usa",
    "u.s.",
    "u.s.a.",
    "united states",
    "united states of america",
];

/// Recognised trailing countries outside the US, with their ISO codes.
const OTHER_COUNTRIES: &[(&str, &str)] = &[
    ("canada", "CA"),
    ("united kingdom", "GB"),
    ("uk", "GB"),
    ("mexico", "MX"),
    ("méxico", "MX"),
    ("australia", "AU"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLocation {
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
}

fn country_code(part: &str) -> Option<&'static str> {
    let lower = part.to_lowercase();
    if US_NAMES.contains(&lower.as_str()) {
        return Some("US");
    }
    OTHER_COUNTRIES
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, code)| *code)
}

/// "TX 78701", "tx" and "Texas" all give "TX".
fn state_code(part: &str) -> Option<&'static str> {
    let token = part
        .trim_end_matches(|c: char| c.is_ascii_digit() || c == '-' || c.is_whitespace());
    if token.len() == 2 {
        return normalize_state(&token.to_ascii_uppercase());
    }
    normalize_state(token)
}

pub fn parse_location(location: &str) -> ParsedLocation {
    let mut parts: Vec<&str> = location
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let mut parsed = ParsedLocation::default();

    if let Some(code) = parts.last().and_then(|p| country_code(p)) {
        parsed.country = Some(code.to_string());
        parts.pop();
    }

    let us_or_unknown = matches!(parsed.country.as_deref(), None | Some("US"));
    if us_or_unknown {
        if let Some(code) = parts.last().and_then(|p| state_code(p)) {
            parts.pop();
            parsed.region = Some(code.to_string());
            parsed.country = Some("US".to_string());
            parsed.city = parts.last().map(|p| p.to_string());
        }
        return parsed;
    }

    match parts.as_slice() {
        [] => {}
        [city] => parsed.city = Some(city.to_string()),
        [.., city, region] => {
            parsed.city = Some(city.to_string());
            parsed.region = Some(region.to_string());
        }
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(city: Option<&str>, region: Option<&str>, country: Option<&str>) -> ParsedLocation {
        ParsedLocation {
            city: city.map(Into::into),
            region: region.map(Into::into),
            country: country.map(Into::into),
        }
    }

    #[test]
    fn venue_city_state() {
        assert_eq!(
            parse_location("Zilker Park, Austin, TX"),
            parsed(Some("Austin"), Some("TX"), Some("US"))
        );
    }

    #[test]
    fn full_state_name_and_trailing_country() {
        assert_eq!(
            parse_location("Springfield, Illinois, USA"),
            parsed(Some("Springfield"), Some("IL"), Some("US"))
        );
        assert_eq!(
            parse_location("Portland, or 97201, United States"),
            parsed(Some("Portland"), Some("OR"), Some("US"))
        );
    }

    #[test]
    fn other_countries() {
        assert_eq!(
            parse_location("Toronto, Ontario, Canada"),
            parsed(Some("Toronto"), Some("Ontario"), Some("CA"))
        );
        assert_eq!(parse_location("London, UK"), parsed(Some("London"), None, Some("GB")));
    }

    #[test]
    fn unrecognised_text_yields_nothing() {
        assert_eq!(parse_location("The Back Room"), ParsedLocation::default());
        assert_eq!(parse_location(""), ParsedLocation::default());
        assert_eq!(parse_location("USA"), parsed(None, None, Some("US")));
    }
}
