//! Trait seams for the pipeline's outside collaborators.
//!
//! PageFetcher: rendered or plain page HTML for a URL.
//! TextGenerator: the untrusted text-generation oracle.
//! EventSink: persistence upsert contract (see sink.rs).
//!
//! Mocks for the first two live in testing.rs.

use anyhow::Result;
use async_trait::async_trait;

/// Bounds for one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Cap on "load more" clicks.
    pub max_loads: u32,
    /// Pause after each click.
    pub wait_ms: u64,
    pub timeout_ms: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_loads: 5,
            wait_ms: 1500,
            timeout_ms: 30_000,
        }
    }
}

impl From<&eventsift_common::Config> for FetchOptions {
    fn from(config: &eventsift_common::Config) -> Self {
        Self {
            max_loads: config.max_loads,
            wait_ms: config.wait_ms,
            timeout_ms: config.fetch_timeout_ms,
        }
    }
}

/// HTML as served (or rendered) plus the URL after redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub html: String,
    pub final_url: String,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchedPage>;
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Single-turn generation with a system instruction.
    async fn generate(&self, system: &str, user: &str) -> Result<String>;
}

#[async_trait]
impl TextGenerator for ai_client::Claude {
    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        Ok(self.chat_completion(system, user).await?)
    }
}
