//! LeadScout Core - Foundation crate for the LeadScout scraper.
//!
//! This crate provides shared types, error handling and configuration
//! management that all other LeadScout crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared newtypes and enums (`SessionId`, `PhoneNumber`, `Provider`, `SearchTarget`)
//!
//! # Example
//!
//! ```rust
//! use leadscout_core::{AppConfig, PhoneNumber, Provider};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! assert_eq!(config.provider_lookup.batch_size, 5);
//!
//! let phone = PhoneNumber::parse("+27 82 123 4567")?;
//! assert_eq!(phone.as_str(), "0821234567");
//! assert_eq!(Provider::from_label("Vodacom (Pty) Ltd"), Some(Provider::Vodacom));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, DatabaseConfig, LookupBackend, ProviderLookupConfig, ScraperConfig,
    ServerConfig,
};
pub use error::{ConfigError, ConfigResult, LeadScoutError, Result};
pub use types::{PhoneNumber, Provider, SearchTarget, SessionId, SessionStatus};
