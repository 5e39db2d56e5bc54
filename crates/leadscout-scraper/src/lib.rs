//! LeadScout Scraper - Google Maps crawling and phone provider lookups.
//!
//! This crate runs scraping sessions: it searches Google Maps for every
//! industry in every requested town, stores the businesses it finds, and
//! determines the mobile network of their phone numbers through a public
//! lookup site, with CAPTCHA detection, adaptive batching and a persisted
//! retry queue.
//!
//! # Example
//!
//! ```rust,ignore
//! use leadscout_scraper::{ScrapeOrchestrator, SessionRequest};
//! use std::sync::Arc;
//!
//! let orchestrator = ScrapeOrchestrator::new(
//!     database,
//!     Arc::new(maps_launcher),
//!     Arc::new(lookup_launcher),
//!     &config,
//! )?;
//!
//! let session_id = orchestrator
//!     .start_session(SessionRequest {
//!         name: None,
//!         towns: vec!["Pretoria".into()],
//!         industries: vec!["Plumbers".into()],
//!     })
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod captcha;
#[allow(missing_docs)]
pub mod error;
#[allow(missing_docs)]
pub mod events;
#[allow(missing_docs)]
pub mod maps;
#[allow(missing_docs)]
pub mod orchestrator;
#[allow(missing_docs)]
pub mod provider;
pub mod retry;
#[allow(missing_docs)]
pub mod summary;

// Re-export commonly used types
pub use captcha::detect_captcha;
pub use error::{Result, ScrapeError};
pub use events::ScrapeEvent;
pub use maps::{build_search_url, BusinessListing, ListingDeduper, MapsParser, MapsSelectors};
pub use orchestrator::{ScrapeOrchestrator, SessionRequest};
pub use provider::{BatchSettings, BatchStats, LookupBatcher, LookupReport, ProviderLookup};
pub use retry::{backoff_delay, RetryQueue, RetryReport};
pub use summary::SessionSummary;
