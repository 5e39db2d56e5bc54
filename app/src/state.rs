//! Application state management.

use anyhow::Context;
use leadscout_browser::{BrowserLauncher, ChromiumLauncher, EngineOptions, HttpLauncher};
use leadscout_core::{AppConfig, BrowserConfig, LookupBackend};
use leadscout_db::{sessions, Database};
use leadscout_scraper::ScrapeOrchestrator;
use std::sync::Arc;
use std::time::Duration;

/// State shared by the CLI commands and every API handler.
pub struct AppState {
    pub orchestrator: ScrapeOrchestrator,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(orchestrator: ScrapeOrchestrator, config: AppConfig) -> Self {
        Self {
            orchestrator,
            config,
        }
    }

    /// Open the database, recover sessions a previous process left running
    /// and build the orchestrator with launchers chosen by the config.
    pub async fn initialize(config: AppConfig) -> anyhow::Result<Self> {
        let db_path = config.database_path()?;
        tracing::info!("Database: {}", db_path.display());

        let db = Database::open_and_migrate(&db_path)
            .await
            .with_context(|| format!("failed to open database at {}", db_path.display()))?;

        let recovered = sessions::mark_interrupted(db.pool()).await?;
        if recovered > 0 {
            tracing::warn!("Marked {} interrupted sessions as stopped", recovered);
        }

        let options = engine_options(&config.browser);
        let maps_launcher: Arc<dyn BrowserLauncher> =
            Arc::new(ChromiumLauncher::new(options.clone()));
        let lookup_launcher: Arc<dyn BrowserLauncher> = match config.provider_lookup.backend {
            LookupBackend::Browser => Arc::new(ChromiumLauncher::new(options)),
            LookupBackend::Http => Arc::new(HttpLauncher::new(options)),
        };

        let orchestrator = ScrapeOrchestrator::new(db, maps_launcher, lookup_launcher, &config)?;
        Ok(Self::new(orchestrator, config))
    }

    pub fn database(&self) -> &Database {
        self.orchestrator.database()
    }
}

/// Engine settings from the `[browser]` config section.
pub fn engine_options(config: &BrowserConfig) -> EngineOptions {
    EngineOptions {
        headless: config.headless,
        window_width: config.window_width,
        window_height: config.window_height,
        navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
        min_request_spacing_ms: config.min_request_spacing_ms,
    }
}
