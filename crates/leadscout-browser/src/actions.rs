use crate::error::Result;

/// Browser actions for automation
#[async_trait::async_trait]
pub trait BrowserActions {
    /// Navigate to a URL
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Wait for a selector to appear
    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()>;

    /// Serialized DOM of the current page
    async fn content(&self) -> Result<String>;

    /// Scroll a container to its end until it stops growing.
    ///
    /// Returns the number of scrolls that loaded new content.
    async fn scroll_to_end(&self, selector: &str, max_scrolls: u32) -> Result<u32>;
}
