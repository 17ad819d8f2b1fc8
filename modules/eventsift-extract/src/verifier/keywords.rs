use url::Url;

use eventsift_common::ExtractedEvent;

/// Generic site vocabulary that says nothing about a specific event.
const STOPWORDS: &[&str] = &[
    "and", "article", "aspx", "calendar", "category", "com", "detail", "details", "en", "event",
    "events", "for", "home", "htm", "html", "index", "info", "listing", "listings", "net", "org",
    "page", "php", "search", "tag", "the", "ticket", "tickets", "upcoming", "view", "what",
    "whats", "with", "www",
];

/// Lowercase tokens a container around the right event is expected to mention.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keywords(Vec<String>);

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 3)
        .filter(|t| !t.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
}

impl Keywords {
    pub fn from_parts(location: Option<&str>, url: &str) -> Self {
        let mut out: Vec<String> = Vec::new();
        let path = Url::parse(url)
            .map(|u| u.path().to_string())
            .unwrap_or_default();
        for token in location.into_iter().flat_map(tokens).chain(tokens(&path)) {
            if !out.contains(&token) {
                out.push(token);
            }
        }
        Self(out)
    }

    /// Tokens of the confirmed location (if any) and of the event URL path.
    pub fn for_event(event: &ExtractedEvent) -> Self {
        let location = event
            .is_location_confirmed()
            .then_some(event.location.as_deref())
            .flatten();
        Self::from_parts(location, &event.url)
    }

    /// Count of keywords absent from `text`.
    pub fn misses(&self, text: &str) -> usize {
        let lower = text.to_lowercase();
        self.0.iter().filter(|k| !lower.contains(k.as_str())).count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_path_tokens_minus_stopwords_and_years() {
        let k = Keywords::from_parts(
            None,
            "https://www.example.org/events/2026/jazz-night-riverside.html",
        );
        assert_eq!(k.as_slice(), ["jazz", "night", "riverside"]);
    }

    #[test]
    fn confirmed_location_contributes() {
        let mut event = ExtractedEvent::new("Jazz", "https://example.org/e/1");
        event.location = Some("Austin, TX".into());
        assert!(Keywords::for_event(&event).is_empty());

        event.location_status = eventsift_common::FieldStatus::Confirmed;
        assert_eq!(Keywords::for_event(&event).as_slice(), ["austin"]);
    }

    #[test]
    fn misses_are_case_insensitive() {
        let k = Keywords::from_parts(Some("Austin, TX"), "https://example.org/jazz");
        assert_eq!(k.misses("Jazz in AUSTIN"), 0);
        assert_eq!(k.misses("Jazz in Dallas"), 1);
    }
}
