//! Extraction orchestration: fetch, prompt, parse, and fall back to a
//! structural scan when the first generation pass yields nothing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Utc};
use tracing::{info, warn};

use ai_client::truncate_to_char_boundary;
use eventsift_common::{Config, RawAgentEvent};

use crate::error::{ExtractError, Result};
use crate::fetcher::validate_url;
use crate::heuristic;
use crate::html::compact_html;
use crate::prompt::{hints_message, page_message, parse_events, system_prompt};
use crate::traits::{FetchOptions, FetchedPage, PageFetcher, TextGenerator};

/// Input for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    pub url: String,
    pub hint: Option<String>,
    /// Pre-fetched HTML; skips the fetcher.
    pub html: Option<String>,
}

impl ExtractionRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            hint: None,
            html: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorOptions {
    pub fetch: FetchOptions,
    /// Prompt budget for page HTML after compaction.
    pub max_html_bytes: usize,
    /// Bound on each generation call.
    pub generation_timeout: Duration,
    /// Year assumed for listing dates printed without one.
    pub reference_year: Option<i32>,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            fetch: FetchOptions::default(),
            max_html_bytes: 120_000,
            generation_timeout: Duration::from_secs(120),
            reference_year: None,
        }
    }
}

impl From<&Config> for OrchestratorOptions {
    fn from(config: &Config) -> Self {
        Self {
            fetch: FetchOptions::from(config),
            max_html_bytes: config.max_html_bytes,
            ..Self::default()
        }
    }
}

/// Raw generation output together with the page it was read from.
#[derive(Debug, Clone)]
pub struct RawExtraction {
    pub events: Vec<RawAgentEvent>,
    pub html: String,
    pub final_url: String,
    /// True when events came from the structural-hint pass.
    pub used_fallback: bool,
}

pub struct Orchestrator {
    fetcher: Arc<dyn PageFetcher>,
    generator: Arc<dyn TextGenerator>,
    options: OrchestratorOptions,
}

impl Orchestrator {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        generator: Arc<dyn TextGenerator>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            fetcher,
            generator,
            options,
        }
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    pub async fn run(&self, request: &ExtractionRequest) -> Result<RawExtraction> {
        let page = self.load(request).await?;
        let system = system_prompt();
        let hint = request.hint.as_deref();

        let compacted = compact_html(&page.html);
        let budget = truncate_to_char_boundary(&compacted, self.options.max_html_bytes);
        if budget.len() < compacted.len() {
            info!(
                url = %request.url,
                bytes = compacted.len(),
                kept = budget.len(),
                "Truncated HTML for prompt"
            );
        }

        let first = self
            .generate(&request.url, &system, &page_message(&page.final_url, hint, budget))
            .await;
        if let Some(events) = first.filter(|e| !e.is_empty()) {
            info!(url = %request.url, count = events.len(), "Generation pass produced events");
            return Ok(RawExtraction {
                events,
                html: page.html,
                final_url: page.final_url,
                used_fallback: false,
            });
        }

        let year = self
            .options
            .reference_year
            .unwrap_or_else(|| Utc::now().year());
        let hints = heuristic::scan(&page.html, &page.final_url, year);
        if hints.is_empty() {
            info!(url = %request.url, "No listing hints found; zero events");
            return Ok(RawExtraction {
                events: Vec::new(),
                html: page.html,
                final_url: page.final_url,
                used_fallback: true,
            });
        }

        info!(url = %request.url, hints = hints.len(), "Retrying generation with listing hints");
        let events = self
            .generate(&request.url, &system, &hints_message(&page.final_url, hint, &hints))
            .await
            .unwrap_or_default();
        info!(url = %request.url, count = events.len(), "Hint pass produced events");
        Ok(RawExtraction {
            events,
            html: page.html,
            final_url: page.final_url,
            used_fallback: true,
        })
    }

    async fn load(&self, request: &ExtractionRequest) -> Result<FetchedPage> {
        validate_url(&request.url).map_err(|_| ExtractError::InvalidUrl(request.url.clone()))?;
        if let Some(html) = &request.html {
            return Ok(FetchedPage {
                html: html.clone(),
                final_url: request.url.clone(),
            });
        }
        self.fetcher
            .fetch(&request.url, &self.options.fetch)
            .await
            .map_err(|source| ExtractError::Fetch {
                url: request.url.clone(),
                source,
            })
    }

    /// One bounded generation call. Failures and unparseable output are
    /// logged and reported as `None`.
    async fn generate(&self, url: &str, system: &str, user: &str) -> Option<Vec<RawAgentEvent>> {
        let call = self.generator.generate(system, user);
        let text = match tokio::time::timeout(self.options.generation_timeout, call).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(url, error = %e, "Generation failed");
                return None;
            }
            Err(_) => {
                let timeout_s = self.options.generation_timeout.as_secs();
                warn!(url, timeout_s, "Generation timed out");
                return None;
            }
        };
        match parse_events(&text) {
            Ok(events) => Some(events),
            Err(e) => {
                warn!(url, error = %e, "Unparseable generation output");
                None
            }
        }
    }
}
