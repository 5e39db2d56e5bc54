use crate::error::{BrowserError, Result};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Per-domain request spacing.
///
/// Callers wait their turn instead of failing; the slot is reserved before
/// sleeping so concurrent callers queue up behind each other.
#[derive(Debug)]
pub struct RateLimiter {
    next_slot: Mutex<HashMap<String, Instant>>,
    min_delay: Duration,
}

impl RateLimiter {
    pub fn new(min_delay_ms: u64) -> Self {
        Self {
            next_slot: Mutex::new(HashMap::new()),
            min_delay: Duration::from_millis(min_delay_ms),
        }
    }

    /// Wait until `domain` may be contacted again, and claim that slot.
    pub async fn wait_turn(&self, domain: &str) {
        let wait = {
            let mut slots = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = slots.get(domain).copied().filter(|s| *s > now).unwrap_or(now);
            slots.insert(domain.to_string(), slot + self.min_delay);
            slot - now
        };

        if !wait.is_zero() {
            tracing::debug!("Spacing request to {} by {:?}", domain, wait);
            tokio::time::sleep(wait).await;
        }
    }

    /// Wait for the domain of a full URL.
    pub async fn wait_for_url(&self, url: &str) -> Result<()> {
        let domain = extract_domain(url)?;
        self.wait_turn(&domain).await;
        Ok(())
    }
}

/// Helper to extract domain from URL
pub fn extract_domain(url: &str) -> Result<String> {
    let url = url::Url::parse(url)
        .map_err(|e| BrowserError::NavigationError(format!("Invalid URL: {}", e)))?;

    url.host_str()
        .ok_or_else(|| BrowserError::NavigationError("No host in URL".to_string()))
        .map(|s| s.to_string())
}
