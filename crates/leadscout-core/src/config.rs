//! Configuration management for LeadScout.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration.
///
/// This is loaded from `~/.config/leadscout/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Database location
    pub database: DatabaseConfig,
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// Maps crawling behaviour
    pub scraper: ScraperConfig,
    /// Phone provider lookup behaviour
    pub provider_lookup: ProviderLookupConfig,
    /// HTTP API settings
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load configuration from the default path, falling back to defaults if not found.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file, falling back to defaults if not found.
    pub fn load_from(config_path: &Path) -> ConfigResult<Self> {
        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(config_path)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `LEADSCOUT_DATABASE_PATH`: Override the database file
    /// - `LEADSCOUT_HEADLESS`: Override browser headless mode (true/false)
    /// - `LEADSCOUT_BIND`: Override the HTTP bind address
    /// - `LEADSCOUT_CONCURRENT_TOWNS`: Override the town worker pool size
    pub fn load_with_env(config_path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match config_path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (normally the process environment).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("LEADSCOUT_DATABASE_PATH") {
            tracing::debug!("Override database.path from env: {}", val);
            self.database.path = Some(PathBuf::from(val));
        }

        if let Some(val) = lookup("LEADSCOUT_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Some(val) = lookup("LEADSCOUT_BIND") {
            tracing::debug!("Override server.bind from env: {}", val);
            self.server.bind = val;
        }

        if let Some(val) = lookup("LEADSCOUT_CONCURRENT_TOWNS") {
            if let Ok(workers) = val.parse() {
                self.scraper.concurrent_towns = workers;
                tracing::debug!("Override scraper.concurrent_towns from env: {}", workers);
            }
        }
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        let lookup = &self.provider_lookup;
        if lookup.batch_size == 0 {
            return Err(invalid("provider_lookup.batch_size", "must be at least 1"));
        }
        if lookup.min_batch_size == 0 || lookup.min_batch_size > lookup.batch_size {
            return Err(invalid(
                "provider_lookup.min_batch_size",
                "must be between 1 and batch_size",
            ));
        }
        if !(0.0..=1.0).contains(&lookup.success_threshold) {
            return Err(invalid(
                "provider_lookup.success_threshold",
                "must be between 0.0 and 1.0",
            ));
        }
        if lookup.inter_batch_delay_min_ms > lookup.inter_batch_delay_max_ms {
            return Err(invalid(
                "provider_lookup.inter_batch_delay_min_ms",
                "must not exceed inter_batch_delay_max_ms",
            ));
        }
        if lookup.max_attempts == 0 {
            return Err(invalid("provider_lookup.max_attempts", "must be at least 1"));
        }
        if !lookup.url_template.contains("{number}") {
            return Err(invalid(
                "provider_lookup.url_template",
                "must contain the {number} placeholder",
            ));
        }
        if self.scraper.concurrent_towns == 0 {
            return Err(invalid("scraper.concurrent_towns", "must be at least 1"));
        }
        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self, config_path: &Path) -> ConfigResult<()> {
        let config_dir = config_path
            .parent()
            .ok_or_else(|| invalid("config_path", "no parent directory"))?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Resolve the database file, defaulting to the data directory.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("leadscout.db")),
        }
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/leadscout/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/leadscout`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        Ok(project_dirs()?.data_dir().to_path_buf())
    }
}

fn project_dirs() -> ConfigResult<ProjectDirs> {
    ProjectDirs::from("com", "leadscout", "leadscout").ok_or(ConfigError::NoConfigDir)
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Database location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file; `None` means `<data dir>/leadscout.db`
    pub path: Option<PathBuf>,
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// Minimum spacing between two requests to the same domain
    pub min_request_spacing_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            navigation_timeout_secs: 30,
            min_request_spacing_ms: 1000,
        }
    }
}

/// Maps crawling behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Number of towns crawled in parallel (clamped to 1..=4)
    pub concurrent_towns: usize,
    /// Upper bound on listings kept per town/industry search
    pub max_listings_per_search: usize,
    /// How many times the results feed is scrolled to load more listings
    pub max_scrolls: u32,
    /// Open place pages for listings missing a phone or address
    pub fetch_place_details: bool,
    /// Pause between two searches in the same town
    pub delay_between_searches_ms: u64,
    /// Base delay before re-fetching a failed search page; grows with each attempt
    pub search_retry_delay_ms: u64,
    /// Keep retrying failed lookups after the last town until the queue is empty
    pub drain_retry_queue: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            concurrent_towns: 2,
            max_listings_per_search: 50,
            max_scrolls: 10,
            fetch_place_details: true,
            delay_between_searches_ms: 2000,
            search_retry_delay_ms: 2000,
            drain_retry_queue: true,
        }
    }
}

/// Which page engine performs provider lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupBackend {
    /// Headless Chromium, one process per batch
    Browser,
    /// Plain HTTP requests
    Http,
}

/// Phone provider lookup behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderLookupConfig {
    /// Page engine used for lookups
    pub backend: LookupBackend,
    /// Lookup URL; `{number}` is replaced by the normalized phone number
    pub url_template: String,
    /// CSS selector holding the provider name in the lookup response
    pub result_selector: String,
    /// Only look up mobile numbers; landlines keep no provider
    pub mobile_only: bool,
    /// Numbers per browser session
    pub batch_size: usize,
    /// Floor for adaptive batch shrinking
    pub min_batch_size: usize,
    /// Batch success rate below which the batch size shrinks
    pub success_threshold: f64,
    /// Pause between two numbers within a batch
    pub delay_between_lookups_ms: u64,
    /// Lower bound of the randomized pause between batches
    pub inter_batch_delay_min_ms: u64,
    /// Upper bound of the randomized pause between batches
    pub inter_batch_delay_max_ms: u64,
    /// Extra pause after a CAPTCHA challenge
    pub captcha_cooldown_secs: u64,
    /// Attempts before a number is given up on
    pub max_attempts: u32,
    /// First retry delay; doubles with each attempt
    pub retry_base_delay_secs: u64,
}

impl Default for ProviderLookupConfig {
    fn default() -> Self {
        Self {
            backend: LookupBackend::Browser,
            url_template: "https://www.porting.co.za/PublicWebsite/crs?number={number}"
                .to_string(),
            result_selector: ".provider, #provider, .network-name".to_string(),
            mobile_only: true,
            batch_size: 5,
            min_batch_size: 1,
            success_threshold: 0.5,
            delay_between_lookups_ms: 500,
            inter_batch_delay_min_ms: 2000,
            inter_batch_delay_max_ms: 5000,
            captcha_cooldown_secs: 60,
            max_attempts: 3,
            retry_base_delay_secs: 30,
        }
    }
}

/// HTTP API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the API listens on
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.browser.headless);
        assert_eq!(config.scraper.concurrent_towns, 2);
        assert_eq!(config.provider_lookup.batch_size, 5);
        assert_eq!(config.provider_lookup.max_attempts, 3);
        assert_eq!(config.provider_lookup.backend, LookupBackend::Browser);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[browser]"));
        assert!(toml_str.contains("[scraper]"));
        assert!(toml_str.contains("[provider_lookup]"));

        let parsed: AppConfig = toml::from_str(&toml_str).expect("parse serialized config");
        assert_eq!(parsed.server.bind, config.server.bind);
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.scraper.concurrent_towns = 3;
        config.provider_lookup.backend = LookupBackend::Http;

        config.save(&config_path).expect("save config");
        let loaded = AppConfig::load_from(&config_path).expect("load config");

        assert_eq!(loaded.scraper.concurrent_towns, 3);
        assert_eq!(loaded.provider_lookup.backend, LookupBackend::Http);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = TempDir::new().expect("create temp dir");
        let loaded =
            AppConfig::load_from(&tmp.path().join("absent.toml")).expect("load defaults");
        assert_eq!(loaded.provider_lookup.batch_size, 5);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("LEADSCOUT_DATABASE_PATH", "/tmp/scrape.db"),
            ("LEADSCOUT_HEADLESS", "false"),
            ("LEADSCOUT_BIND", "0.0.0.0:9000"),
            ("LEADSCOUT_CONCURRENT_TOWNS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env_overrides(|key| vars.get(key).map(|v| (*v).to_string()));

        assert_eq!(
            config.database_path().expect("database path"),
            PathBuf::from("/tmp/scrape.db")
        );
        assert!(!config.browser.headless);
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        // Unparseable values leave the default in place
        assert_eq!(config.scraper.concurrent_towns, 2);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[provider_lookup]
backend = "http"
batch_size = 3

[scraper]
fetch_place_details = false
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.provider_lookup.backend, LookupBackend::Http);
        assert_eq!(config.provider_lookup.batch_size, 3);
        assert!(!config.scraper.fetch_place_details);
        // These should be defaults
        assert_eq!(config.provider_lookup.min_batch_size, 1);
        assert!(config.browser.headless);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.provider_lookup.min_batch_size = 6;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "provider_lookup.min_batch_size"
        ));

        let mut config = AppConfig::default();
        config.provider_lookup.url_template = "https://lookup.example/".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.provider_lookup.inter_batch_delay_min_ms = 10_000;
        assert!(config.validate().is_err());
    }
}
