//! Page engines for JavaScript-heavy and plain sites.
//!
//! Provides headless browser control with fingerprint randomization and
//! per-domain request spacing, plus a plain HTTP engine with the same
//! interface. Callers obtain a [`PageSession`] from a [`BrowserLauncher`]
//! and must [`close`](PageSession::close) it when done.

pub mod actions;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod http;
pub mod rate_limit;
pub mod session;

pub use actions::BrowserActions;
pub use engine::BrowserEngine;
pub use error::{BrowserError, Result};
pub use fingerprint::FingerprintConfig;
pub use http::HttpEngine;
pub use session::{BrowserLauncher, ChromiumLauncher, EngineOptions, HttpLauncher, PageSession};
