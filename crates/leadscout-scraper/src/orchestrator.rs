//! Scraping session orchestrator.
//!
//! This module provides the `ScrapeOrchestrator` which runs scraping
//! sessions: towns are crawled by a small worker pool, each town's new phone
//! numbers go through the provider lookup batcher, and failed lookups are
//! retried from the persisted queue once every town is done.

use crate::captcha::detect_captcha;
use crate::error::{Result, ScrapeError};
use crate::events::{ScrapeEvent, EVENT_CHANNEL_CAPACITY};
use crate::maps::{build_search_url, ListingDeduper, MapsParser, MapsSelectors};
use crate::provider::{BatchSettings, LookupBatcher, ProviderLookup};
use crate::retry::{RetryQueue, RetryReport};
use crate::summary::SessionSummary;
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use leadscout_browser::{BrowserLauncher, PageSession};
use leadscout_core::{
    AppConfig, PhoneNumber, ProviderLookupConfig, ScraperConfig, SearchTarget, SessionStatus,
};
use leadscout_db::businesses::{self, NewBusiness};
use leadscout_db::{sessions, Database, DatabaseError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Maximum number of fetch attempts for a search page.
const MAX_SEARCH_ATTEMPTS: u32 = 3;

/// Rate limit backoff multiplier (longer wait for rate limits).
const RATE_LIMIT_BACKOFF_MULTIPLIER: u64 = 3;

/// Suggested wait after a search stays rate limited.
const RATE_LIMIT_RETRY_AFTER: Duration = Duration::from_secs(300);

/// Upper bound on parallel town workers.
const MAX_TOWN_WORKERS: usize = 4;

/// What to crawl.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub towns: Vec<String>,
    #[serde(default)]
    pub industries: Vec<String>,
}

impl SessionRequest {
    /// Trim entries, drop blanks and case-insensitive duplicates, and check
    /// that something is left to crawl.
    pub fn normalized(&self) -> Result<Self> {
        let towns = clean_list(&self.towns);
        let industries = clean_list(&self.industries);

        if towns.is_empty() {
            return Err(ScrapeError::Validation(
                "at least one town is required".to_string(),
            ));
        }
        if industries.is_empty() {
            return Err(ScrapeError::Validation(
                "at least one industry is required".to_string(),
            ));
        }

        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map_or_else(
                || format!("{} in {}", industries.join(", "), towns.join(", ")),
                str::to_string,
            );

        Ok(Self {
            name: Some(name),
            towns,
            industries,
        })
    }
}

fn clean_list(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty() && seen.insert(value.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// State shared by the town workers of one run.
struct RunContext<'a> {
    session_id: &'a str,
    industries: &'a [String],
    /// Child of the session's stop token; also fired on a fatal worker error
    cancel: CancellationToken,
    summary: Mutex<SessionSummary>,
    deduper: Mutex<ListingDeduper>,
    batcher: Arc<LookupBatcher>,
    retries: RetryQueue,
}

impl RunContext<'_> {
    fn update_summary(&self, update: impl FnOnce(&mut SessionSummary)) {
        let mut summary = self
            .summary
            .lock()
            .expect("Mutex poisoned: another thread panicked while holding the lock");
        update(&mut summary);
    }

    fn summary_snapshot(&self) -> SessionSummary {
        self.summary
            .lock()
            .expect("Mutex poisoned: another thread panicked while holding the lock")
            .clone()
    }
}

/// Orchestrates scraping sessions.
#[derive(Clone)]
pub struct ScrapeOrchestrator {
    db: Database,
    maps_launcher: Arc<dyn BrowserLauncher>,
    lookup_launcher: Arc<dyn BrowserLauncher>,
    parser: Arc<MapsParser>,
    feed_selector: String,
    lookup: Arc<ProviderLookup>,
    scraper_config: ScraperConfig,
    lookup_config: ProviderLookupConfig,
    /// Stop tokens of sessions running in this process
    active: Arc<RwLock<HashMap<String, CancellationToken>>>,
    events: broadcast::Sender<ScrapeEvent>,
}

impl ScrapeOrchestrator {
    /// Create a new orchestrator.
    ///
    /// `maps_launcher` opens the sessions used for Maps searches,
    /// `lookup_launcher` the ones used for provider lookups.
    pub fn new(
        db: Database,
        maps_launcher: Arc<dyn BrowserLauncher>,
        lookup_launcher: Arc<dyn BrowserLauncher>,
        config: &AppConfig,
    ) -> Result<Self> {
        let selectors = MapsSelectors::default();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            db,
            maps_launcher,
            lookup_launcher,
            parser: Arc::new(MapsParser::new(&selectors)?),
            feed_selector: selectors.feed,
            lookup: Arc::new(ProviderLookup::new(&config.provider_lookup)?),
            scraper_config: config.scraper.clone(),
            lookup_config: config.provider_lookup.clone(),
            active: Arc::new(RwLock::new(HashMap::new())),
            events,
        })
    }

    /// Use custom Maps selectors.
    pub fn with_selectors(mut self, selectors: &MapsSelectors) -> Result<Self> {
        self.parser = Arc::new(MapsParser::new(selectors)?);
        self.feed_selector.clone_from(&selectors.feed);
        Ok(self)
    }

    /// Receive progress events of every session run by this orchestrator.
    pub fn subscribe(&self) -> broadcast::Receiver<ScrapeEvent> {
        self.events.subscribe()
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Whether the session is running in this process.
    pub fn is_active(&self, session_id: &str) -> bool {
        self.active
            .read()
            .expect("RwLock poisoned: another thread panicked while holding the lock")
            .contains_key(session_id)
    }

    /// Create the session row and register its stop token.
    ///
    /// Pair with [`run_session`](Self::run_session) to run a session in the
    /// caller's task.
    pub async fn register_session(
        &self,
        request: &SessionRequest,
    ) -> Result<(String, CancellationToken)> {
        let request = request.normalized()?;
        let name = request.name.as_deref().unwrap_or_default();

        let session =
            sessions::create_session(self.db.pool(), name, &request.towns, &request.industries)
                .await?;

        let token = CancellationToken::new();
        self.active
            .write()
            .expect("RwLock poisoned: another thread panicked while holding the lock")
            .insert(session.id.clone(), token.clone());

        tracing::info!(
            "Created scraping session {} ({} towns, {} industries)",
            session.id,
            request.towns.len(),
            request.industries.len()
        );
        Ok((session.id, token))
    }

    /// Start a new session in the background.
    ///
    /// Returns the session ID immediately for status tracking.
    pub async fn start_session(&self, request: SessionRequest) -> Result<String> {
        let (session_id, token) = self.register_session(&request).await?;

        let orchestrator = self.clone();
        let session_id_for_task = session_id.clone();
        tokio::spawn(async move {
            if let Err(e) = orchestrator
                .run_session(&session_id_for_task, &request, token)
                .await
            {
                tracing::error!("Scraping session {} failed: {}", session_id_for_task, e);
            }
        });

        Ok(session_id)
    }

    /// Ask a running session to stop. Returns `false` if the session is not
    /// running in this process.
    pub fn stop_session(&self, session_id: &str) -> bool {
        let active = self
            .active
            .read()
            .expect("RwLock poisoned: another thread panicked while holding the lock");

        match active.get(session_id) {
            Some(token) => {
                tracing::info!("Stop requested for session {}", session_id);
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Delete a finished session with its businesses and retry entries.
    pub async fn delete_session(&self, session_id: &str) -> Result<bool> {
        if self.is_active(session_id) {
            return Err(ScrapeError::SessionActive(session_id.to_string()));
        }
        Ok(sessions::delete_session(self.db.pool(), session_id).await?)
    }

    /// Run a registered session to completion in the caller's task.
    ///
    /// The session ends `stopped` if its token fired, `failed` on a fatal
    /// error and `completed` otherwise; the summary is stored either way.
    pub async fn run_session(
        &self,
        session_id: &str,
        request: &SessionRequest,
        token: CancellationToken,
    ) -> Result<SessionSummary> {
        let request = match request.normalized() {
            Ok(request) => request,
            Err(e) => {
                self.unregister(session_id);
                sessions::finish_session(
                    self.db.pool(),
                    session_id,
                    SessionStatus::Failed,
                    None,
                    Some(&e.to_string()),
                )
                .await?;
                return Err(e);
            }
        };

        let batcher = Arc::new(LookupBatcher::new(
            self.lookup_launcher.clone(),
            self.lookup.clone(),
            BatchSettings::from(&self.lookup_config),
        ));
        let ctx = RunContext {
            session_id,
            industries: &request.industries,
            cancel: token.child_token(),
            summary: Mutex::new(SessionSummary::new(request.towns.len(), Utc::now())),
            deduper: Mutex::new(ListingDeduper::new()),
            retries: RetryQueue::new(self.db.clone(), batcher.clone(), &self.lookup_config),
            batcher,
        };

        self.emit(ScrapeEvent::SessionStarted {
            session_id: session_id.to_string(),
            towns: request.towns.clone(),
            industries: request.industries.clone(),
        });
        tracing::info!("Scraping session {} started", session_id);

        let result = self.execute(&ctx, &request.towns).await;

        let (status, error_message) = match &result {
            Err(e) => (SessionStatus::Failed, Some(e.to_string())),
            Ok(()) if token.is_cancelled() => (SessionStatus::Stopped, None),
            Ok(()) => (SessionStatus::Completed, None),
        };

        let mut summary = ctx.summary_snapshot();
        summary.finished_at = Some(Utc::now());
        match businesses::provider_counts(self.db.pool(), session_id).await {
            Ok(counts) => summary.provider_counts = counts,
            Err(e) => tracing::warn!("Failed to count providers for {}: {}", session_id, e),
        }

        let stored = sessions::finish_session(
            self.db.pool(),
            session_id,
            status,
            Some(&summary.to_json()),
            error_message.as_deref(),
        )
        .await;
        self.unregister(session_id);

        match status {
            SessionStatus::Failed => tracing::error!(
                "Scraping session {} failed: {}",
                session_id,
                error_message.as_deref().unwrap_or_default()
            ),
            _ => tracing::info!(
                "Scraping session {} {}: {} businesses, {} lookups resolved",
                session_id,
                status,
                summary.businesses_found,
                summary.lookups_succeeded
            ),
        }

        self.emit(ScrapeEvent::SessionFinished {
            session_id: session_id.to_string(),
            status,
            summary: summary.clone(),
        });

        result?;
        stored?;
        Ok(summary)
    }

    /// Retry the session's due provider lookups now.
    ///
    /// The pass holds the session's slot in the active set, so it cannot
    /// overlap a run or another pass, and it can be stopped like a run.
    pub async fn process_retry_queue(&self, session_id: &str) -> Result<RetryReport> {
        let token = self.claim(session_id)?;
        let result = self.retry_pass(session_id, &token).await;
        self.unregister(session_id);
        result
    }

    async fn retry_pass(
        &self,
        session_id: &str,
        cancel: &CancellationToken,
    ) -> Result<RetryReport> {
        let session = sessions::get_by_id(self.db.pool(), session_id)
            .await?
            .ok_or_else(|| {
                DatabaseError::NotFoundWithMessage(format!("Session '{session_id}' not found"))
            })?;

        let batcher = Arc::new(LookupBatcher::new(
            self.lookup_launcher.clone(),
            self.lookup.clone(),
            BatchSettings::from(&self.lookup_config),
        ));
        let retries = RetryQueue::new(self.db.clone(), batcher, &self.lookup_config);
        let report = retries.process_due(session_id, cancel).await?;

        if report.processed > 0 {
            if let Some(mut summary) = session.summary.as_ref().and_then(SessionSummary::from_json)
            {
                summary.record_retries(&report);
                summary.provider_counts =
                    businesses::provider_counts(self.db.pool(), session_id).await?;
                sessions::update_summary(self.db.pool(), session_id, &summary.to_json()).await?;
            }
        }

        self.emit_retries(session_id, &report);
        Ok(report)
    }

    async fn execute(&self, ctx: &RunContext<'_>, towns: &[String]) -> Result<()> {
        self.crawl_towns(ctx, towns).await?;

        if self.scraper_config.drain_retry_queue && !ctx.cancel.is_cancelled() {
            let report = ctx.retries.drain(ctx.session_id, &ctx.cancel).await?;
            ctx.update_summary(|summary| summary.record_retries(&report));
            self.emit_retries(ctx.session_id, &report);
        }

        Ok(())
    }

    /// Crawl towns in FIFO order with at most `concurrent_towns` in flight.
    ///
    /// A fatal error in one worker stops the others and is returned once
    /// they have wound down.
    async fn crawl_towns(&self, ctx: &RunContext<'_>, towns: &[String]) -> Result<()> {
        let workers = self.scraper_config.concurrent_towns.clamp(1, MAX_TOWN_WORKERS);
        let mut futures = FuturesUnordered::new();
        let mut first_error = None;

        for town in towns {
            if ctx.cancel.is_cancelled() {
                break;
            }

            futures.push(self.process_town(ctx, town));

            // Respect concurrency limit
            while futures.len() >= workers {
                if let Some(result) = futures.next().await {
                    record_worker_result(ctx, result, &mut first_error);
                }
            }
        }

        // Collect remaining results
        while let Some(result) = futures.next().await {
            record_worker_result(ctx, result, &mut first_error);
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Search every industry of a town in one page session, then look up the
    /// providers of the numbers found.
    async fn process_town(&self, ctx: &RunContext<'_>, town: &str) -> Result<()> {
        self.emit(ScrapeEvent::TownStarted {
            session_id: ctx.session_id.to_string(),
            town: town.to_string(),
        });
        tracing::info!("Crawling {} for session {}", town, ctx.session_id);

        let mut new_phones = Vec::new();
        let mut businesses_found = 0;

        let searched_all = match self.maps_launcher.launch().await {
            Ok(mut session) => {
                let result = self
                    .search_town(
                        session.as_mut(),
                        ctx,
                        town,
                        &mut new_phones,
                        &mut businesses_found,
                    )
                    .await;
                if let Err(e) = session.close().await {
                    tracing::warn!("Failed to close browser session for {}: {}", town, e);
                }
                result?
            }
            Err(e) => {
                tracing::warn!("Failed to launch browser for {}: {}", town, e);
                ctx.update_summary(|summary| summary.searches_failed += ctx.industries.len());
                false
            }
        };

        self.lookup_providers(ctx, new_phones).await?;

        if searched_all {
            ctx.update_summary(|summary| summary.towns_completed += 1);
        }
        sessions::update_summary(
            self.db.pool(),
            ctx.session_id,
            &ctx.summary_snapshot().to_json(),
        )
        .await?;

        self.emit(ScrapeEvent::TownCompleted {
            session_id: ctx.session_id.to_string(),
            town: town.to_string(),
            businesses_found,
        });
        Ok(())
    }

    /// Returns `false` if a stop cut the town short.
    async fn search_town(
        &self,
        session: &mut dyn PageSession,
        ctx: &RunContext<'_>,
        town: &str,
        new_phones: &mut Vec<PhoneNumber>,
        businesses_found: &mut usize,
    ) -> Result<bool> {
        for (index, industry) in ctx.industries.iter().enumerate() {
            if index > 0 {
                pause(
                    Duration::from_millis(self.scraper_config.delay_between_searches_ms),
                    &ctx.cancel,
                )
                .await;
            }
            if ctx.cancel.is_cancelled() {
                return Ok(false);
            }

            let target = SearchTarget::new(town, industry)
                .map_err(|e| ScrapeError::Validation(e.to_string()))?;

            let (listings, stored, error) =
                match self.search(session, ctx, &target, new_phones).await {
                    Ok((listings, stored)) => {
                        *businesses_found += stored;
                        ctx.update_summary(|summary| {
                            summary.searches_completed += 1;
                            summary.businesses_found += stored;
                        });
                        (listings, stored, None)
                    }
                    Err(ScrapeError::Database(e)) => return Err(ScrapeError::Database(e)),
                    Err(e) => {
                        tracing::warn!("Search '{}' failed: {}", target, e);
                        ctx.update_summary(|summary| summary.searches_failed += 1);
                        (0, 0, Some(e.to_string()))
                    }
                };

            self.emit(ScrapeEvent::SearchCompleted {
                session_id: ctx.session_id.to_string(),
                town: target.town.clone(),
                industry: target.industry.clone(),
                listings,
                new_businesses: stored,
                error,
            });
        }

        Ok(true)
    }

    /// Run one Maps search and store its new businesses.
    ///
    /// Returns the number of listings seen and the number stored.
    async fn search(
        &self,
        session: &mut dyn PageSession,
        ctx: &RunContext<'_>,
        target: &SearchTarget,
        new_phones: &mut Vec<PhoneNumber>,
    ) -> Result<(usize, usize)> {
        let url = build_search_url(target);
        let html = self.fetch_with_retry(session, &url).await?;

        let mut listings = self.parser.parse_results(&html, &url)?;
        listings.truncate(self.scraper_config.max_listings_per_search);
        tracing::debug!("Search '{}' returned {} listings", target, listings.len());

        let total = listings.len();
        let mut stored = 0;
        let mut details_blocked = false;

        for mut listing in listings {
            if self.scraper_config.fetch_place_details && !details_blocked && listing.needs_details()
            {
                if let Some(place_url) = listing.maps_url.clone().filter(|place| *place != url) {
                    match session.fetch_html(&place_url).await {
                        Ok(html) if detect_captcha(&html) => {
                            tracing::warn!("CAPTCHA on place page, skipping details for '{}'", target);
                            details_blocked = true;
                        }
                        Ok(html) => listing = self.parser.parse_place(&html, listing),
                        Err(e) => tracing::debug!("Could not load place page {}: {}", place_url, e),
                    }
                }
            }

            let is_new = ctx
                .deduper
                .lock()
                .expect("Mutex poisoned: another thread panicked while holding the lock")
                .insert(&listing);
            if !is_new {
                continue;
            }

            let business = NewBusiness {
                name: listing.name,
                phone: listing.phone,
                address: listing.address,
                town: target.town.clone(),
                industry: target.industry.clone(),
                website: listing.website,
                maps_url: listing.maps_url,
            };

            if businesses::insert_business(self.db.pool(), ctx.session_id, &business)
                .await?
                .is_some()
            {
                stored += 1;
                if let Some(phone) = business.phone {
                    if !self.lookup_config.mobile_only || phone.is_mobile() {
                        new_phones.push(phone);
                    }
                }
            }
        }

        Ok((total, stored))
    }

    /// Fetch a search page with retry logic and growing backoff.
    ///
    /// Rate limit errors use longer backoff. CAPTCHA pages are not retried.
    async fn fetch_with_retry(&self, session: &mut dyn PageSession, url: &str) -> Result<String> {
        let mut last_error = None;
        let mut backoff_multiplier = 1;

        for attempt in 0..MAX_SEARCH_ATTEMPTS {
            match session
                .fetch_scrolled_html(url, &self.feed_selector, self.scraper_config.max_scrolls)
                .await
            {
                Ok(html) => {
                    if detect_captcha(&html) {
                        return Err(ScrapeError::CaptchaRequired {
                            url: url.to_string(),
                        });
                    }
                    return Ok(html);
                }
                Err(e) => {
                    if e.is_rate_limited() {
                        backoff_multiplier = RATE_LIMIT_BACKOFF_MULTIPLIER;
                        tracing::warn!("Rate limited on {}, using longer backoff", url);
                    }

                    last_error = Some(e);

                    if attempt < MAX_SEARCH_ATTEMPTS - 1 {
                        let delay = Duration::from_millis(
                            self.scraper_config
                                .search_retry_delay_ms
                                .saturating_mul(backoff_multiplier * (u64::from(attempt) + 1)),
                        );

                        tracing::warn!(
                            "Fetch failed for {} (attempt {}/{}), retrying in {:?}...",
                            url,
                            attempt + 1,
                            MAX_SEARCH_ATTEMPTS,
                            delay
                        );

                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        match last_error {
            Some(e) if e.is_rate_limited() => Err(ScrapeError::RateLimited {
                retry_after: RATE_LIMIT_RETRY_AFTER,
            }),
            Some(e) => Err(e.into()),
            None => Err(ScrapeError::Validation(format!("no fetch attempted for {url}"))),
        }
    }

    /// Look up providers for a town's new numbers. Failed and unqueried
    /// numbers go to the retry queue.
    async fn lookup_providers(&self, ctx: &RunContext<'_>, phones: Vec<PhoneNumber>) -> Result<()> {
        if phones.is_empty() {
            return Ok(());
        }

        let report = ctx.batcher.run(phones, &ctx.cancel).await;

        for (phone, provider) in &report.resolved {
            businesses::set_provider(self.db.pool(), ctx.session_id, phone, *provider).await?;
        }
        let queued = ctx
            .retries
            .enqueue_failures(ctx.session_id, &report.failed)
            .await?
            + ctx
                .retries
                .enqueue_unattempted(ctx.session_id, &report)
                .await?;

        ctx.update_summary(|summary| {
            summary.record_lookups(&report);
            summary.retries_queued += queued;
        });

        for stats in &report.batches {
            self.emit(ScrapeEvent::LookupBatchCompleted {
                session_id: ctx.session_id.to_string(),
                stats: *stats,
            });
        }
        Ok(())
    }

    /// Register a stop token unless the session already holds one.
    fn claim(&self, session_id: &str) -> Result<CancellationToken> {
        let mut active = self
            .active
            .write()
            .expect("RwLock poisoned: another thread panicked while holding the lock");

        if active.contains_key(session_id) {
            return Err(ScrapeError::SessionActive(session_id.to_string()));
        }
        let token = CancellationToken::new();
        active.insert(session_id.to_string(), token.clone());
        Ok(token)
    }

    fn unregister(&self, session_id: &str) {
        self.active
            .write()
            .expect("RwLock poisoned: another thread panicked while holding the lock")
            .remove(session_id);
    }

    fn emit_retries(&self, session_id: &str, report: &RetryReport) {
        self.emit(ScrapeEvent::RetriesProcessed {
            session_id: session_id.to_string(),
            resolved: report.resolved.len(),
            rescheduled: report.rescheduled,
            exhausted: report.exhausted.len(),
        });
    }

    fn emit(&self, event: ScrapeEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

fn record_worker_result(
    ctx: &RunContext<'_>,
    result: Result<()>,
    first_error: &mut Option<ScrapeError>,
) {
    if let Err(e) = result {
        tracing::error!("Town worker for session {} failed: {}", ctx.session_id, e);
        if first_error.is_none() {
            ctx.cancel.cancel();
            *first_error = Some(e);
        }
    }
}

/// Sleep unless stopped first.
async fn pause(duration: Duration, cancel: &CancellationToken) {
    if duration.is_zero() {
        return;
    }
    tokio::select! {
        () = cancel.cancelled() => {}
        () = tokio::time::sleep(duration) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_search_constants() {
        const _: () = assert!(MAX_SEARCH_ATTEMPTS > 0);
        const _: () = assert!(MAX_SEARCH_ATTEMPTS <= 5);
        const _: () = assert!(RATE_LIMIT_BACKOFF_MULTIPLIER > 1);
        const _: () = assert!(MAX_TOWN_WORKERS >= 2);
    }

    #[test]
    fn test_request_normalization() {
        let request = SessionRequest {
            name: Some("  ".to_string()),
            towns: strings(&[" Pretoria ", "", "pretoria", "Centurion"]),
            industries: strings(&["Plumbers"]),
        };

        let normalized = request.normalized().expect("valid request");
        assert_eq!(normalized.towns, vec!["Pretoria", "Centurion"]);
        assert_eq!(
            normalized.name.as_deref(),
            Some("Plumbers in Pretoria, Centurion")
        );
    }

    #[test]
    fn test_request_requires_towns_and_industries() {
        let request = SessionRequest {
            name: None,
            towns: strings(&["  "]),
            industries: strings(&["Plumbers"]),
        };
        assert!(matches!(
            request.normalized(),
            Err(ScrapeError::Validation(_))
        ));

        let request = SessionRequest {
            name: None,
            towns: strings(&["Pretoria"]),
            industries: vec![],
        };
        assert!(matches!(
            request.normalized(),
            Err(ScrapeError::Validation(_))
        ));
    }
}
