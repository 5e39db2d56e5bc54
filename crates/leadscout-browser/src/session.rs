//! Page sessions and the launchers that create them.
//!
//! A session owns one page engine (a Chromium process or an HTTP client).
//! Every launched session must be closed by its caller; the Chromium engine
//! additionally kills its process on drop as a last resort.

use crate::engine::BrowserEngine;
use crate::error::Result;
use crate::http::HttpEngine;
use crate::rate_limit::RateLimiter;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Engine settings shared by both backends.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub navigation_timeout: Duration,
    pub min_request_spacing_ms: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            navigation_timeout: Duration::from_secs(30),
            min_request_spacing_ms: 1000,
        }
    }
}

/// A live page engine that fetches rendered HTML.
#[async_trait]
pub trait PageSession: Send {
    /// Load `url` and return the page HTML.
    async fn fetch_html(&mut self, url: &str) -> Result<String>;

    /// Load `url`, scroll the container matched by `scroll_selector` to load
    /// lazy content, and return the page HTML.
    async fn fetch_scrolled_html(
        &mut self,
        url: &str,
        _scroll_selector: &str,
        _max_scrolls: u32,
    ) -> Result<String> {
        self.fetch_html(url).await
    }

    /// Release the engine. Closing twice is a no-op.
    async fn close(&mut self) -> Result<()>;
}

/// Factory for page sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn PageSession>>;
}

/// Launches one headless Chromium process per session.
pub struct ChromiumLauncher {
    options: EngineOptions,
    rate_limiter: Arc<RateLimiter>,
}

impl ChromiumLauncher {
    pub fn new(options: EngineOptions) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(options.min_request_spacing_ms));
        Self {
            options,
            rate_limiter,
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn PageSession>> {
        let engine = BrowserEngine::launch(&self.options, self.rate_limiter.clone()).await?;
        Ok(Box::new(engine))
    }
}

/// Creates plain HTTP sessions for sites that need no JavaScript.
pub struct HttpLauncher {
    options: EngineOptions,
    rate_limiter: Arc<RateLimiter>,
}

impl HttpLauncher {
    pub fn new(options: EngineOptions) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(options.min_request_spacing_ms));
        Self {
            options,
            rate_limiter,
        }
    }
}

#[async_trait]
impl BrowserLauncher for HttpLauncher {
    async fn launch(&self) -> Result<Box<dyn PageSession>> {
        let engine = HttpEngine::new(&self.options, self.rate_limiter.clone())?;
        Ok(Box::new(engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_http_launcher_session_closes_idempotently() {
        let launcher = HttpLauncher::new(EngineOptions::default());
        let mut session = launcher.launch().await.expect("launch http session");

        session.close().await.expect("first close");
        session.close().await.expect("second close is a no-op");
        assert!(session.fetch_html("https://example.com").await.is_err());
    }
}
