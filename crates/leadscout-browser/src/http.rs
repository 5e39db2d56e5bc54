use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use crate::rate_limit::{extract_domain, RateLimiter};
use crate::session::{EngineOptions, PageSession};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::StatusCode;
use std::sync::Arc;

/// Plain HTTP page engine for sites that render server-side.
pub struct HttpEngine {
    client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    closed: bool,
}

impl HttpEngine {
    pub fn new(options: &EngineOptions, rate_limiter: Arc<RateLimiter>) -> Result<Self> {
        let fingerprint = FingerprintConfig::randomized();

        let mut headers = HeaderMap::new();
        let language = HeaderValue::from_str(&fingerprint.accept_language)
            .map_err(|e| BrowserError::NavigationError(format!("invalid header: {e}")))?;
        headers.insert(ACCEPT_LANGUAGE, language);

        let client = reqwest::Client::builder()
            .user_agent(fingerprint.user_agent)
            .default_headers(headers)
            .timeout(options.navigation_timeout)
            .build()
            .map_err(|e| BrowserError::NavigationError(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            rate_limiter,
            closed: false,
        })
    }
}

#[async_trait::async_trait]
impl PageSession for HttpEngine {
    async fn fetch_html(&mut self, url: &str) -> Result<String> {
        if self.closed {
            return Err(BrowserError::Closed);
        }
        self.rate_limiter.wait_for_url(url).await?;

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                BrowserError::Timeout(format!("request to {url}"))
            } else {
                BrowserError::NavigationError(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(BrowserError::RateLimitExceeded(extract_domain(url)?));
        }
        if !status.is_success() {
            return Err(BrowserError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| BrowserError::NavigationError(e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
