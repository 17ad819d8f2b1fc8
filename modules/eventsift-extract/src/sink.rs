//! Persistence contract for normalized events.
//!
//! EventSink owns durable identity; MemorySink is the in-process
//! implementation behind the CLI `ingest` command and the tests.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use eventsift_common::NormalizedEvent;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
}

#[async_trait]
pub trait EventSink: Send + Sync {
    /// Create or update each record, deduplicating by
    /// (title, start, location).
    async fn upsert(&self, events: &[NormalizedEvent], publish: bool) -> Result<UpsertSummary>;
}

type SinkKey = (String, DateTime<Utc>, String);

fn sink_key(event: &NormalizedEvent) -> SinkKey {
    (
        event.title.trim().to_lowercase(),
        event.start,
        event
            .location
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_lowercase(),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    pub event: NormalizedEvent,
    pub published: bool,
}

#[derive(Debug, Default)]
pub struct MemorySink {
    inner: Mutex<HashMap<SinkKey, StoredEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn stored(&self) -> std::sync::MutexGuard<'_, HashMap<SinkKey, StoredEvent>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.stored().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stored().is_empty()
    }

    /// Snapshot of every stored record, ordered by start time.
    pub fn events(&self) -> Vec<StoredEvent> {
        let mut events: Vec<StoredEvent> = self.stored().values().cloned().collect();
        events.sort_by(|a, b| {
            a.event
                .start
                .cmp(&b.event.start)
                .then_with(|| a.event.title.cmp(&b.event.title))
        });
        events
    }
}

#[async_trait]
impl EventSink for MemorySink {
    async fn upsert(&self, events: &[NormalizedEvent], publish: bool) -> Result<UpsertSummary> {
        let mut stored = self
            .inner
            .lock()
            .map_err(|_| anyhow!("MemorySink: lock poisoned"))?;
        let mut summary = UpsertSummary::default();

        for event in events {
            if event.title.trim().is_empty() {
                debug!(url = event.url.as_str(), "Rejecting untitled record");
                summary.errors += 1;
                continue;
            }
            let incoming = StoredEvent {
                event: event.clone(),
                published: publish,
            };
            match stored.entry(sink_key(event)) {
                Entry::Occupied(existing) if *existing.get() == incoming => summary.skipped += 1,
                Entry::Occupied(mut existing) => {
                    existing.insert(incoming);
                    summary.updated += 1;
                }
                Entry::Vacant(slot) => {
                    slot.insert(incoming);
                    summary.created += 1;
                }
            }
        }

        info!(
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            errors = summary.errors,
            publish,
            "Upsert complete"
        );
        Ok(summary)
    }
}
