/// USPS codes and full names for the 50 states plus DC.
pub const US_STATES: &[(&str, &str)] = &[
    ("AL", "Alabama"),
    ("AK", "Alaska"),
    ("AZ", "Arizona"),
    ("AR", "Arkansas"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DE", "Delaware"),
    ("DC", "District of Columbia"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("HI", "Hawaii"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("IA", "Iowa"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("ME", "Maine"),
    ("MD", "Maryland"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MS", "Mississippi"),
    ("MO", "Missouri"),
    ("MT", "Montana"),
    ("NE", "Nebraska"),
    ("NV", "Nevada"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NY", "New York"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VT", "Vermont"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
    ("WV", "West Virginia"),
    ("WI", "Wisconsin"),
    ("WY", "Wyoming"),
];

/// Normalize a state token to its USPS code.
///
/// Two-letter codes must be upper case ("IN", "OR" and "ME" are common words
/// otherwise). Full names match case-insensitively. A trailing period is
/// ignored.
pub fn normalize_state(token: &str) -> Option<&'static str> {
    let token = token.trim().trim_end_matches('.');
    if token.len() == 2 {
        if !token.chars().all(|c| c.is_ascii_uppercase()) {
            return None;
        }
        return US_STATES
            .iter()
            .find(|(abbr, _)| *abbr == token)
            .map(|(abbr, _)| *abbr);
    }
    let collapsed = token.split_whitespace().collect::<Vec<_>>().join(" ");
    US_STATES
        .iter()
        .find(|(_, name)| name.eq_ignore_ascii_case(&collapsed))
        .map(|(abbr, _)| *abbr)
}

/// Full name for a USPS code.
pub fn state_name(abbr: &str) -> Option<&'static str> {
    US_STATES
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(abbr))
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_maps_to_code() {
        assert_eq!(normalize_state("Illinois"), Some("IL"));
        assert_eq!(normalize_state("new   york"), Some("NY"));
        assert_eq!(normalize_state("District of Columbia"), Some("DC"));
    }

    #[test]
    fn code_must_be_upper_case() {
        assert_eq!(normalize_state("TX"), Some("TX"));
        assert_eq!(normalize_state("TX."), Some("TX"));
        assert_eq!(normalize_state("in"), None);
        assert_eq!(normalize_state("Or"), None);
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        assert_eq!(normalize_state("ZZ"), None);
        assert_eq!(normalize_state("Tickets"), None);
        assert_eq!(normalize_state(""), None);
    }

    #[test]
    fn state_name_lookup() {
        assert_eq!(state_name("wa"), Some("Washington"));
        assert_eq!(state_name("XX"), None);
    }
}
