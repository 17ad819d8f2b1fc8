use std::env;

use tracing::info;

pub const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Text generation
    pub anthropic_api_key: String,
    pub model: String,
    pub generation_timeout_ms: u64,

    // Fetching
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,
    pub max_loads: u32,
    pub wait_ms: u64,
    pub fetch_timeout_ms: u64,

    // Extraction
    pub max_html_bytes: usize,
    pub default_timezone: Option<String>,
    pub log_corrections: bool,
    /// Keyword-to-tag pairs replacing the built-in tag map.
    pub tag_keywords: Option<Vec<(String, String)>>,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            anthropic_api_key: required_env("ANTHROPIC_API_KEY"),
            model: env::var("EVENTSIFT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            generation_timeout_ms: parsed_env("EVENTSIFT_GENERATION_TIMEOUT_MS", 90_000),
            browserless_url: optional_env("BROWSERLESS_URL"),
            browserless_token: optional_env("BROWSERLESS_TOKEN"),
            max_loads: parsed_env("EVENTSIFT_MAX_LOADS", 5),
            wait_ms: parsed_env("EVENTSIFT_WAIT_MS", 1500),
            fetch_timeout_ms: parsed_env("EVENTSIFT_FETCH_TIMEOUT_MS", 30_000),
            max_html_bytes: parsed_env("EVENTSIFT_MAX_HTML_BYTES", 120_000),
            default_timezone: optional_env("EVENTSIFT_DEFAULT_TIMEZONE"),
            log_corrections: parsed_env("EVENTSIFT_LOG_CORRECTIONS", false),
            tag_keywords: optional_env("EVENTSIFT_TAG_KEYWORDS")
                .map(|raw| parse_tag_keywords(&raw))
                .filter(|pairs| !pairs.is_empty()),
        }
    }

    /// Log the effective configuration with secrets elided.
    pub fn log_redacted(&self) {
        info!(
            model = self.model.as_str(),
            generation_timeout_ms = self.generation_timeout_ms,
            anthropic_api_key = %redact(&self.anthropic_api_key),
            browserless_url = self.browserless_url.as_deref().unwrap_or("(plain fetch only)"),
            browserless_token = %self.browserless_token.as_deref().map(redact).unwrap_or_default(),
            max_loads = self.max_loads,
            wait_ms = self.wait_ms,
            fetch_timeout_ms = self.fetch_timeout_ms,
            max_html_bytes = self.max_html_bytes,
            default_timezone = self.default_timezone.as_deref().unwrap_or("UTC"),
            log_corrections = self.log_corrections,
            tag_keywords = self.tag_keywords.as_ref().map_or(0, Vec::len),
            "Config loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a valid value, got {raw:?}")),
        Err(_) => default,
    }
}

/// "music=concert, jazz=music": comma-separated `keyword=tag` pairs.
/// Entries without both halves are dropped.
pub fn parse_tag_keywords(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|entry| {
            let (keyword, tag) = entry.split_once('=')?;
            let (keyword, tag) = (keyword.trim(), tag.trim());
            if keyword.is_empty() || tag.is_empty() {
                return None;
            }
            Some((keyword.to_string(), tag.to_string()))
        })
        .collect()
}

fn redact(secret: &str) -> String {
    if secret.len() <= 8 {
        return "****".to_string();
    }
    format!("{}****", secret.chars().take(4).collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_keeps_short_prefix() {
        assert_eq!(redact("sk-ant-1234567890"), "sk-a****");
        assert_eq!(redact("short"), "****");
    }

    #[test]
    fn tag_keywords_parse_pairs_and_skip_junk() {
        let pairs = parse_tag_keywords(" yoga = wellness ,broken,=x, farmers market=food,");
        assert_eq!(
            pairs,
            vec![
                ("yoga".to_string(), "wellness".to_string()),
                ("farmers market".to_string(), "food".to_string()),
            ]
        );
        assert!(parse_tag_keywords("").is_empty());
    }

    #[test]
    fn parsed_env_falls_back_to_default() {
        assert_eq!(parsed_env("EVENTSIFT_TEST_UNSET_VAR", 42u32), 42);
    }
}
