pub mod error;

pub use error::{BrowserlessError, Result};

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Puppeteer function run by `/function`: navigate, click "load more" style
/// controls up to `maxLoads` times, then return the final DOM.
const LOAD_MORE_SCRIPT: &str = r#"export default async function ({ page, context }) {
  const { url, maxLoads, waitMs, timeoutMs } = context;
  const labels = ['load more', 'show more', 'more events', 'view more', 'see more', 'next page'];
  let loads = 0;
  try {
    await page.goto(url, { waitUntil: 'networkidle2', timeout: timeoutMs });
    while (loads < maxLoads) {
      const clicked = await page.evaluate((labels) => {
        const nodes = Array.from(document.querySelectorAll('button, a, [role="button"]'));
        const target = nodes.find((n) => {
          const text = (n.innerText || '').trim().toLowerCase();
          return text.length > 0 && text.length < 40 && n.offsetParent !== null
            && labels.some((l) => text.includes(l));
        });
        if (!target) return false;
        target.click();
        return true;
      }, labels);
      if (!clicked) break;
      loads += 1;
      await new Promise((r) => setTimeout(r, waitMs));
      try { await page.waitForNetworkIdle({ idleTime: 500, timeout: timeoutMs }); } catch (_) {}
    }
    const html = await page.content();
    return { data: { html, url: page.url(), loads }, type: 'application/json' };
  } finally {
    await page.close().catch(() => {});
  }
}"#;

/// Bounds for one rendering call.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOptions {
    pub max_loads: u32,
    pub wait_ms: u64,
    pub timeout_ms: u64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_loads: 5,
            wait_ms: 1500,
            timeout_ms: 30_000,
        }
    }
}

/// DOM snapshot returned by the load-more function.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderedPage {
    pub html: String,
    pub url: String,
    #[serde(default)]
    pub loads: u32,
}

/// Handle to a Browserless instance. Create once at startup and share it;
/// every call opens and closes its own remote page.
pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        let mut endpoint = format!("{}/{path}", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }

    /// Fetch fully-rendered HTML content for a URL via the /content endpoint,
    /// waiting for the network to go idle.
    pub async fn content(&self, url: &str, timeout_ms: u64) -> Result<String> {
        let body = serde_json::json!({
            "url": url,
            "gotoOptions": { "waitUntil": "networkidle2", "timeout": timeout_ms },
        });

        let resp = self
            .client
            .post(self.endpoint("content"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }

    /// Render a page and expand it by clicking "load more" controls, bounded
    /// by `options.max_loads`.
    pub async fn render_with_loads(&self, url: &str, options: RenderOptions) -> Result<RenderedPage> {
        let mut context = serde_json::to_value(options)
            .map_err(|e| BrowserlessError::Decode(e.to_string()))?;
        context["url"] = serde_json::Value::String(url.to_string());

        let body = serde_json::json!({
            "code": LOAD_MORE_SCRIPT,
            "context": context,
        });

        let resp = self
            .client
            .post(self.endpoint("function"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let page: RenderedPage = resp
            .json()
            .await
            .map_err(|e| BrowserlessError::Decode(e.to_string()))?;
        debug!(url, final_url = %page.url, loads = page.loads, "Rendered page");
        Ok(page)
    }
}
