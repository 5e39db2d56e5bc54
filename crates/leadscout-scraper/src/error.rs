use leadscout_browser::BrowserError;
use leadscout_db::DatabaseError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("CAPTCHA required at {url}")]
    CaptchaRequired { url: String },

    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Selectors outdated: {reason}")]
    SelectorsOutdated { reason: String },

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Session {0} is already running")]
    SessionActive(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),
}

impl ScrapeError {
    /// Whether the remote site challenged us with a CAPTCHA.
    pub fn is_captcha(&self) -> bool {
        matches!(self, Self::CaptchaRequired { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
