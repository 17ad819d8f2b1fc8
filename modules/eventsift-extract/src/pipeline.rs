//! End-to-end facade: extract → map → verify, and optionally normalize and
//! upsert.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use ai_client::Claude;
use eventsift_common::{Config, ExtractedEvent};

use crate::error::Result;
use crate::fetcher::FallbackFetcher;
use crate::mapper::map_events;
use crate::normalizer::Normalizer;
use crate::orchestrator::{ExtractionRequest, Orchestrator, OrchestratorOptions, RawExtraction};
use crate::sink::{EventSink, UpsertSummary};
use crate::tags::TagExtractor;
use crate::verifier::{Verifier, VerifyOptions};

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionOutput {
    pub events: Vec<ExtractedEvent>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub url: String,
    pub extracted: usize,
    pub upsert: UpsertSummary,
    pub errors: Vec<String>,
}

pub struct Pipeline {
    orchestrator: Orchestrator,
    verifier: Verifier,
    normalizer: Normalizer,
}

impl Pipeline {
    pub fn new(orchestrator: Orchestrator, verifier: Verifier, normalizer: Normalizer) -> Self {
        Self {
            orchestrator,
            verifier,
            normalizer,
        }
    }

    /// Production wiring: Claude for generation, rendering-then-plain
    /// fetching.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let fetcher = Arc::new(FallbackFetcher::from_config(config)?);
        let generator = Arc::new(
            Claude::new(&config.anthropic_api_key, &config.model)
                .with_timeout(Duration::from_millis(config.generation_timeout_ms)),
        );
        let orchestrator = Orchestrator::new(fetcher, generator, OrchestratorOptions::from(config));
        let verifier = Verifier::new(VerifyOptions {
            log_corrections: config.log_corrections,
            ..VerifyOptions::default()
        });
        let tags = TagExtractor::with_keywords(
            config
                .tag_keywords
                .as_ref()
                .map(|pairs| pairs.iter().map(|(keyword, tag)| (keyword, tag))),
        );
        let normalizer = Normalizer::new(config.default_timezone.as_deref(), tags);
        Ok(Self::new(orchestrator, verifier, normalizer))
    }

    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionOutput> {
        let (events, _) = self.extract_with_page(request).await?;
        Ok(ExtractionOutput { events })
    }

    /// Extract, normalize and hand the records to `sink`.
    pub async fn ingest(
        &self,
        request: &ExtractionRequest,
        sink: &dyn EventSink,
        publish: bool,
    ) -> anyhow::Result<IngestReport> {
        let (events, raw) = self.extract_with_page(request).await?;
        // Page-wide keywords only describe the event on a single-event page.
        let html = (events.len() == 1).then_some(raw.html.as_str());
        let batch = self.normalizer.normalize_all(&events, html);
        let upsert = sink.upsert(&batch.events, publish).await?;
        info!(
            url = %request.url,
            extracted = events.len(),
            normalized = batch.events.len(),
            rejected = batch.errors.len(),
            "Ingest complete"
        );
        Ok(IngestReport {
            url: request.url.clone(),
            extracted: events.len(),
            upsert,
            errors: batch.errors,
        })
    }

    async fn extract_with_page(
        &self,
        request: &ExtractionRequest,
    ) -> Result<(Vec<ExtractedEvent>, RawExtraction)> {
        let raw = self.orchestrator.run(request).await?;
        let events = verify_candidates(&self.verifier, &raw);
        let confirmed = events.iter().filter(|e| e.is_date_confirmed()).count();
        info!(
            url = %request.url,
            candidates = events.len(),
            confirmed,
            fallback = raw.used_fallback,
            "Extraction complete"
        );
        Ok((events, raw))
    }
}

/// Map and verify in one synchronous step; the parsed document never
/// crosses an await.
fn verify_candidates(verifier: &Verifier, raw: &RawExtraction) -> Vec<ExtractedEvent> {
    let candidates = map_events(&raw.events, &raw.final_url);
    if candidates.is_empty() {
        return candidates;
    }
    verifier.verify_all(candidates, &raw.html)
}
