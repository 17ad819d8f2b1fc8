//! Page fetchers: rendering through Browserless, plain GET, and a fallback
//! that tries them in that order.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use browserless_client::{BrowserlessClient, RenderOptions};

use crate::traits::{FetchOptions, FetchedPage, PageFetcher};

/// Desktop browser UA; many listing sites serve bots a stripped page.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Reject anything but absolute http(s) URLs.
pub fn validate_url(url: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(url).context("Invalid URL")?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        bail!("Only http/https URLs allowed, got: {}", parsed.scheme());
    }
    Ok(parsed)
}

// --- Rendering ---

/// Headless rendering with a bounded "load more" loop. Holds a shared
/// client created once at startup.
pub struct RenderingFetcher {
    client: Arc<BrowserlessClient>,
}

impl RenderingFetcher {
    pub fn new(client: Arc<BrowserlessClient>) -> Self {
        Self { client }
    }
}

impl RenderingFetcher {
    /// Plain render when no "load more" clicks are allowed, else the
    /// scripted load loop. Returns the HTML, final URL and clicks made.
    async fn render(&self, url: &str, options: &FetchOptions) -> Result<(String, String, u32)> {
        if options.max_loads == 0 {
            let html = self
                .client
                .content(url, options.timeout_ms)
                .await
                .context("Browserless content failed")?;
            return Ok((html, url.to_string(), 0));
        }
        let render = RenderOptions {
            max_loads: options.max_loads,
            wait_ms: options.wait_ms,
            timeout_ms: options.timeout_ms,
        };
        let page = self
            .client
            .render_with_loads(url, render)
            .await
            .context("Browserless render failed")?;
        let final_url = if page.url.is_empty() {
            url.to_string()
        } else {
            page.url
        };
        Ok((page.html, final_url, page.loads))
    }
}

#[async_trait]
impl PageFetcher for RenderingFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchedPage> {
        validate_url(url)?;
        info!(url, fetcher = "browserless", max_loads = options.max_loads, "Fetching page");

        let (html, final_url, loads) = self.render(url, options).await?;
        if html.trim().is_empty() {
            bail!("Browserless returned empty HTML for {url}");
        }
        info!(
            url,
            fetcher = "browserless",
            bytes = html.len(),
            loads,
            "Fetched successfully"
        );
        Ok(FetchedPage { html, final_url })
    }
}

// --- Plain HTTP ---

pub struct PlainFetcher {
    client: reqwest::Client,
}

impl PlainFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(DESKTOP_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for PlainFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchedPage> {
        validate_url(url)?;
        info!(url, fetcher = "http", "Fetching page");

        let resp = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml")
            .timeout(Duration::from_millis(options.timeout_ms))
            .send()
            .await
            .context("HTTP request failed")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("HTTP {status} for {url}");
        }
        let final_url = resp.url().to_string();
        let html = resp.text().await.context("Failed to read response body")?;

        info!(url, fetcher = "http", bytes = html.len(), "Fetched successfully");
        Ok(FetchedPage { html, final_url })
    }
}

// --- Fallback ---

/// Rendering first when configured, plain GET when rendering fails or
/// comes back empty.
pub struct FallbackFetcher {
    rendering: Option<RenderingFetcher>,
    plain: PlainFetcher,
}

impl FallbackFetcher {
    pub fn new(rendering: Option<RenderingFetcher>, plain: PlainFetcher) -> Self {
        Self { rendering, plain }
    }

    /// Build from config: rendering only when `BROWSERLESS_URL` is set.
    pub fn from_config(config: &eventsift_common::Config) -> Result<Self> {
        let rendering = match config.browserless_url.as_deref() {
            Some(base_url) => {
                let client = BrowserlessClient::new(base_url, config.browserless_token.as_deref())
                    .context("Failed to build Browserless client")?;
                Some(RenderingFetcher::new(Arc::new(client)))
            }
            None => None,
        };
        Ok(Self::new(rendering, PlainFetcher::new()?))
    }
}

#[async_trait]
impl PageFetcher for FallbackFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchedPage> {
        if let Some(rendering) = &self.rendering {
            match rendering.fetch(url, options).await {
                Ok(page) => return Ok(page),
                Err(e) => {
                    warn!(url, error = %e, "Rendering fetch failed, falling back to plain GET")
                }
            }
        }
        self.plain.fetch(url, options).await
    }
}
