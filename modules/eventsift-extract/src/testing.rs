//! Test mocks for the extraction pipeline.
//!
//! Two mocks matching the two async trait boundaries that reach the network:
//! - MockFetcher (PageFetcher): HashMap-based URL→page
//! - MockGenerator (TextGenerator): queued responses, recorded prompts
//!
//! MemorySink already covers EventSink without a mock.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use eventsift_common::RawAgentEvent;

use crate::traits::{FetchOptions, FetchedPage, PageFetcher, TextGenerator};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Returns `Err` for unregistered URLs.
/// Builder pattern: `.on_page()`, `.on_redirect()`.
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, FetchedPage>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_page(self, url: &str, html: &str) -> Self {
        self.on_redirect(url, url, html)
    }

    /// Serve `html` for `url`, reporting `final_url` as where it landed.
    pub fn on_redirect(mut self, url: &str, final_url: &str, html: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            FetchedPage {
                html: html.to_string(),
                final_url: final_url.to_string(),
            },
        );
        self
    }

    /// URLs fetched so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str, _options: &FetchOptions) -> Result<FetchedPage> {
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("MockFetcher: no page registered for {url}"))
    }
}

// ---------------------------------------------------------------------------
// MockGenerator
// ---------------------------------------------------------------------------

enum Reply {
    Text(String),
    Fail(String),
}

/// Answers generation calls from a FIFO queue. An empty queue is an error,
/// which the orchestrator treats like any other generation failure.
#[derive(Default)]
pub struct MockGenerator {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, text: &str) -> Self {
        self.push(Reply::Text(text.to_string()))
    }

    /// Queue a `{"events": [...]}` response built from `events`.
    pub fn respond_events(self, events: &[RawAgentEvent]) -> Self {
        let body = serde_json::json!({ "events": events }).to_string();
        self.push(Reply::Text(body))
    }

    pub fn fail(self, message: &str) -> Self {
        self.push(Reply::Fail(message.to_string()))
    }

    fn push(self, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push_back(reply);
        self
    }

    /// `(system, user)` prompt pairs received so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((system.to_string(), user.to_string()));
        let reply = self
            .replies
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front();
        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(message)) => Err(anyhow!("MockGenerator: {message}")),
            None => Err(anyhow!("MockGenerator: no response queued")),
        }
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Raw event as the generation step would report it.
pub fn raw_event(title: &str, start: Option<&str>, location: Option<&str>) -> RawAgentEvent {
    RawAgentEvent {
        title: Some(title.to_string()),
        start_date: start.map(str::to_string),
        location: location.map(str::to_string),
        ..RawAgentEvent::default()
    }
}
