use crate::actions::BrowserActions;
use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use crate::rate_limit::RateLimiter;
use crate::session::{EngineOptions, PageSession};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::stream::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Time the results feed gets to render after each scroll.
const SCROLL_SETTLE: Duration = Duration::from_millis(1200);

/// Poll interval while waiting for a selector.
const SELECTOR_POLL: Duration = Duration::from_millis(250);

/// Headless Chromium instance with a single working tab.
pub struct BrowserEngine {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Page,
    fingerprint: FingerprintConfig,
    rate_limiter: Arc<RateLimiter>,
    navigation_timeout: Duration,
    closed: bool,
}

impl BrowserEngine {
    /// Launch a browser with default options and its own rate limiter.
    pub async fn new() -> Result<Self> {
        let options = EngineOptions::default();
        let limiter = Arc::new(RateLimiter::new(options.min_request_spacing_ms));
        Self::launch(&options, limiter).await
    }

    /// Launch a browser with a randomized fingerprint.
    pub async fn launch(options: &EngineOptions, rate_limiter: Arc<RateLimiter>) -> Result<Self> {
        let fingerprint = FingerprintConfig::randomized()
            .with_viewport(options.window_width, options.window_height);

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(fingerprint.viewport_width, fingerprint.viewport_height)
            .request_timeout(options.navigation_timeout)
            .arg(format!("--user-agent={}", fingerprint.user_agent))
            .arg("--lang=en-ZA")
            .arg("--disable-blink-features=AutomationControlled");
        if !options.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        // Spawn browser handler
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler.abort();
                return Err(BrowserError::ChromiumError(e.to_string()));
            }
        };

        tracing::debug!(
            "Launched browser ({}x{}, {})",
            fingerprint.viewport_width,
            fingerprint.viewport_height,
            fingerprint.user_agent
        );

        Ok(Self {
            browser,
            handler,
            page,
            fingerprint,
            rate_limiter,
            navigation_timeout: options.navigation_timeout,
            closed: false,
        })
    }

    /// The fingerprint this browser presents.
    pub fn fingerprint(&self) -> &FingerprintConfig {
        &self.fingerprint
    }

    /// Close the tab and the browser process, and wait for it to exit.
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Err(e) = self.page.clone().close().await {
            tracing::debug!("Closing page failed: {}", e);
        }
        let result = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            tracing::warn!("Waiting for browser exit failed: {}", e);
        }
        self.handler.abort();

        result
            .map(|_| ())
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(BrowserError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Drop for BrowserEngine {
    fn drop(&mut self) {
        if !self.closed {
            // chromiumoxide kills the child process when `Browser` drops
            tracing::warn!("Browser dropped without shutdown; killing process");
            self.handler.abort();
        }
    }
}

#[async_trait::async_trait]
impl BrowserActions for BrowserEngine {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.ensure_open()?;
        self.rate_limiter.wait_for_url(url).await?;

        tokio::time::timeout(self.navigation_timeout, self.page.goto(url))
            .await
            .map_err(|_| BrowserError::Timeout(format!("navigation to {url}")))?
            .map_err(|e| BrowserError::NavigationError(e.to_string()))?;

        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()> {
        self.ensure_open()?;
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::SelectorNotFound(selector.to_string()));
            }
            tokio::time::sleep(SELECTOR_POLL).await;
        }
    }

    async fn content(&self) -> Result<String> {
        self.ensure_open()?;
        self.page
            .content()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))
    }

    async fn scroll_to_end(&self, selector: &str, max_scrolls: u32) -> Result<u32> {
        self.ensure_open()?;
        let selector_js = serde_json::to_string(selector)
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        let script = format!(
            "(() => {{ const el = document.querySelector({selector_js}); \
             if (!el) {{ return -1; }} \
             el.scrollTop = el.scrollHeight; return el.scrollHeight; }})()"
        );

        let mut last_height = -1_i64;
        for scrolls in 0..max_scrolls {
            let height: i64 = self
                .page
                .evaluate(script.as_str())
                .await
                .map_err(|e| BrowserError::ChromiumError(e.to_string()))?
                .into_value()
                .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

            if height < 0 {
                return Err(BrowserError::SelectorNotFound(selector.to_string()));
            }
            if height == last_height {
                return Ok(scrolls);
            }
            last_height = height;
            tokio::time::sleep(SCROLL_SETTLE).await;
        }

        Ok(max_scrolls)
    }
}

#[async_trait::async_trait]
impl PageSession for BrowserEngine {
    async fn fetch_html(&mut self, url: &str) -> Result<String> {
        self.navigate(url).await?;
        self.content().await
    }

    async fn fetch_scrolled_html(
        &mut self,
        url: &str,
        scroll_selector: &str,
        max_scrolls: u32,
    ) -> Result<String> {
        self.navigate(url).await?;

        // A single match redirects straight to the place page, which has no feed
        match self.wait_for_selector(scroll_selector, 5000).await {
            Ok(()) => {
                let scrolls = self.scroll_to_end(scroll_selector, max_scrolls).await?;
                tracing::debug!("Scrolled results feed {} times", scrolls);
            }
            Err(BrowserError::SelectorNotFound(_)) => {
                tracing::debug!("No results feed at {}", url);
            }
            Err(e) => return Err(e),
        }

        self.content().await
    }

    async fn close(&mut self) -> Result<()> {
        self.shutdown().await
    }
}
