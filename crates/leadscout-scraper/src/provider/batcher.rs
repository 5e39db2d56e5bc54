//! Batched provider lookups.
//!
//! Numbers are looked up in small batches, each in a fresh page session that
//! is closed before the next batch starts. The batch size adapts to the
//! success rate: a poor batch shrinks it, a clean batch grows it back.

use super::lookup::ProviderLookup;
use leadscout_browser::BrowserLauncher;
use leadscout_core::{PhoneNumber, Provider, ProviderLookupConfig};
use rand::Rng;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Timing and sizing of lookup batches.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub batch_size: usize,
    pub min_batch_size: usize,
    pub success_threshold: f64,
    pub delay_between_lookups: Duration,
    pub inter_batch_delay_min: Duration,
    pub inter_batch_delay_max: Duration,
    pub captcha_cooldown: Duration,
}

impl From<&ProviderLookupConfig> for BatchSettings {
    fn from(config: &ProviderLookupConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            min_batch_size: config.min_batch_size.clamp(1, config.batch_size.max(1)),
            success_threshold: config.success_threshold,
            delay_between_lookups: Duration::from_millis(config.delay_between_lookups_ms),
            inter_batch_delay_min: Duration::from_millis(config.inter_batch_delay_min_ms),
            inter_batch_delay_max: Duration::from_millis(config.inter_batch_delay_max_ms),
            captcha_cooldown: Duration::from_secs(config.captcha_cooldown_secs),
        }
    }
}

/// Outcome of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    /// Numbers in the batch
    pub size: usize,
    pub resolved: usize,
    pub failed: usize,
    /// Numbers not queried because the site answered with a CAPTCHA
    pub deferred: usize,
    /// The lookup site answered with a CAPTCHA
    pub captcha: bool,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default)]
pub struct LookupReport {
    pub resolved: Vec<(PhoneNumber, Provider)>,
    /// Numbers whose lookup failed, with the error
    pub failed: Vec<(PhoneNumber, String)>,
    /// Numbers left unqueried after a CAPTCHA cut their batch short
    pub deferred: Vec<PhoneNumber>,
    /// Numbers never attempted because of a stop request
    pub skipped: Vec<PhoneNumber>,
    pub batches: Vec<BatchStats>,
}

struct BatchOutcome {
    resolved: Vec<(PhoneNumber, Provider)>,
    failed: Vec<(PhoneNumber, String)>,
    deferred: Vec<PhoneNumber>,
    captcha: bool,
}

/// Runs provider lookups in adaptive batches.
///
/// Runs are serialized so only one lookup session hits the site at a time.
pub struct LookupBatcher {
    launcher: Arc<dyn BrowserLauncher>,
    lookup: Arc<ProviderLookup>,
    settings: BatchSettings,
    current_batch_size: AtomicUsize,
    run_lock: Mutex<()>,
}

impl LookupBatcher {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        lookup: Arc<ProviderLookup>,
        settings: BatchSettings,
    ) -> Self {
        Self {
            current_batch_size: AtomicUsize::new(settings.batch_size),
            launcher,
            lookup,
            settings,
            run_lock: Mutex::new(()),
        }
    }

    pub fn current_batch_size(&self) -> usize {
        self.current_batch_size.load(Ordering::Relaxed)
    }

    /// Look up every number, honouring the stop signal between batches.
    pub async fn run(&self, phones: Vec<PhoneNumber>, cancel: &CancellationToken) -> LookupReport {
        let _guard = self.run_lock.lock().await;

        let mut report = LookupReport::default();
        let mut pending: VecDeque<PhoneNumber> = phones.into();
        let mut cooldown = Duration::ZERO;
        let mut first_batch = true;

        while !pending.is_empty() {
            if !first_batch {
                let pause = self.inter_batch_delay() + cooldown;
                if !pause.is_zero() {
                    tracing::debug!("Waiting {:?} before next lookup batch", pause);
                    tokio::select! {
                        () = cancel.cancelled() => {}
                        () = tokio::time::sleep(pause) => {}
                    }
                }
            }
            first_batch = false;

            if cancel.is_cancelled() {
                tracing::info!(
                    "Lookup stopped, skipping {} remaining numbers",
                    pending.len()
                );
                report.skipped.extend(pending.drain(..));
                break;
            }

            let size = self.current_batch_size().min(pending.len());
            let batch: Vec<PhoneNumber> = pending.drain(..size).collect();
            let outcome = self.run_batch(&batch).await;

            let stats = BatchStats {
                size: batch.len(),
                resolved: outcome.resolved.len(),
                failed: outcome.failed.len(),
                deferred: outcome.deferred.len(),
                captcha: outcome.captcha,
            };
            self.adapt_batch_size(&stats);

            cooldown = if outcome.captcha {
                self.settings.captcha_cooldown
            } else {
                Duration::ZERO
            };

            report.resolved.extend(outcome.resolved);
            report.failed.extend(outcome.failed);
            report.deferred.extend(outcome.deferred);
            report.batches.push(stats);
        }

        report
    }

    /// Look up one batch in its own session. The session is closed whatever
    /// happens to the lookups.
    async fn run_batch(&self, batch: &[PhoneNumber]) -> BatchOutcome {
        let mut session = match self.launcher.launch().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Failed to launch lookup session: {}", e);
                let error = format!("lookup session launch failed: {e}");
                return BatchOutcome {
                    resolved: vec![],
                    failed: batch.iter().map(|p| (p.clone(), error.clone())).collect(),
                    deferred: vec![],
                    captcha: false,
                };
            }
        };

        let mut resolved = Vec::new();
        let mut failed = Vec::new();
        let mut deferred = Vec::new();
        let mut captcha = false;

        for (index, phone) in batch.iter().enumerate() {
            if captcha {
                deferred.push(phone.clone());
                continue;
            }

            if index > 0 && !self.settings.delay_between_lookups.is_zero() {
                tokio::time::sleep(self.settings.delay_between_lookups).await;
            }

            match self.lookup.lookup(session.as_mut(), phone).await {
                Ok(provider) => resolved.push((phone.clone(), provider)),
                Err(e) => {
                    if e.is_captcha() {
                        tracing::warn!("CAPTCHA during provider lookup, abandoning batch");
                        captcha = true;
                    } else {
                        tracing::warn!("Provider lookup failed for {}: {}", phone, e);
                    }
                    failed.push((phone.clone(), e.to_string()));
                }
            }
        }

        if let Err(e) = session.close().await {
            tracing::warn!("Failed to close lookup session: {}", e);
        }

        BatchOutcome {
            resolved,
            failed,
            deferred,
            captcha,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn adapt_batch_size(&self, stats: &BatchStats) {
        if stats.size == 0 {
            return;
        }

        let current = self.current_batch_size();
        let success_rate = stats.resolved as f64 / stats.size as f64;

        let next = if success_rate < self.settings.success_threshold {
            current.saturating_sub(1).max(self.settings.min_batch_size)
        } else if stats.failed == 0 && stats.deferred == 0 {
            (current + 1).min(self.settings.batch_size)
        } else {
            current
        };

        if next != current {
            tracing::info!(
                "Lookup batch size {} -> {} (success rate {:.2})",
                current,
                next,
                success_rate
            );
            self.current_batch_size.store(next, Ordering::Relaxed);
        }
    }

    fn inter_batch_delay(&self) -> Duration {
        let min = self.settings.inter_batch_delay_min;
        let max = self.settings.inter_batch_delay_max;
        if max <= min {
            return min;
        }
        rand::thread_rng().gen_range(min..=max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use leadscout_browser::{BrowserError, PageSession};
    use std::collections::HashMap;

    /// Serves canned lookup pages keyed by phone number.
    struct FakeLauncher {
        pages: HashMap<String, String>,
        launches: AtomicUsize,
        open: Arc<AtomicUsize>,
        fail_launch: bool,
    }

    struct FakeSession {
        pages: HashMap<String, String>,
        open: Arc<AtomicUsize>,
        closed: bool,
    }

    #[async_trait]
    impl PageSession for FakeSession {
        async fn fetch_html(&mut self, url: &str) -> leadscout_browser::Result<String> {
            let number = url.rsplit('=').next().unwrap_or_default();
            self.pages
                .get(number)
                .cloned()
                .ok_or_else(|| BrowserError::Timeout(url.to_string()))
        }

        async fn close(&mut self) -> leadscout_browser::Result<()> {
            if !self.closed {
                self.closed = true;
                self.open.fetch_sub(1, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl BrowserLauncher for FakeLauncher {
        async fn launch(&self) -> leadscout_browser::Result<Box<dyn PageSession>> {
            if self.fail_launch {
                return Err(BrowserError::ChromiumError("no chrome".to_string()));
            }
            self.launches.fetch_add(1, Ordering::SeqCst);
            self.open.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSession {
                pages: self.pages.clone(),
                open: self.open.clone(),
                closed: false,
            }))
        }
    }

    fn phone(n: u32) -> PhoneNumber {
        PhoneNumber::parse(&format!("08200000{n:02}")).unwrap()
    }

    fn provider_page(name: &str) -> String {
        format!(r#"<div class="provider">{name}</div>"#)
    }

    fn settings() -> BatchSettings {
        BatchSettings {
            batch_size: 5,
            min_batch_size: 1,
            success_threshold: 0.5,
            delay_between_lookups: Duration::ZERO,
            inter_batch_delay_min: Duration::ZERO,
            inter_batch_delay_max: Duration::ZERO,
            captcha_cooldown: Duration::ZERO,
        }
    }

    fn batcher(pages: HashMap<String, String>, fail_launch: bool) -> (LookupBatcher, Arc<FakeLauncher>) {
        let launcher = Arc::new(FakeLauncher {
            pages,
            launches: AtomicUsize::new(0),
            open: Arc::new(AtomicUsize::new(0)),
            fail_launch,
        });
        let lookup = Arc::new(
            ProviderLookup::new(&ProviderLookupConfig::default()).expect("valid lookup"),
        );
        (
            LookupBatcher::new(launcher.clone(), lookup, settings()),
            launcher,
        )
    }

    #[tokio::test]
    async fn test_batches_of_five_each_closed() {
        let pages = (0..12)
            .map(|n| (phone(n).to_string(), provider_page("Vodacom")))
            .collect();
        let (batcher, launcher) = batcher(pages, false);

        let report = batcher
            .run((0..12).map(phone).collect(), &CancellationToken::new())
            .await;

        assert_eq!(report.resolved.len(), 12);
        assert!(report.failed.is_empty());
        let sizes: Vec<usize> = report.batches.iter().map(|b| b.size).collect();
        assert_eq!(sizes, vec![5, 5, 2]);
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 3);
        assert_eq!(launcher.open.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_poor_batch_shrinks_size() {
        // Only the first number of the first batch resolves
        let mut pages = HashMap::new();
        pages.insert(phone(0).to_string(), provider_page("MTN"));
        for n in 5..9 {
            pages.insert(phone(n).to_string(), provider_page("Cell C"));
        }
        let (batcher, launcher) = batcher(pages, false);

        let report = batcher
            .run((0..9).map(phone).collect(), &CancellationToken::new())
            .await;

        let sizes: Vec<usize> = report.batches.iter().map(|b| b.size).collect();
        assert_eq!(sizes, vec![5, 4]);
        assert_eq!(report.resolved.len(), 5);
        assert_eq!(report.failed.len(), 4);
        // The clean second batch grows the size back
        assert_eq!(batcher.current_batch_size(), 5);
        assert_eq!(launcher.open.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_captcha_defers_rest_of_batch() {
        let mut pages = HashMap::new();
        pages.insert(phone(0).to_string(), provider_page("Rain"));
        pages.insert(
            phone(1).to_string(),
            r#"<div class="g-recaptcha"></div>"#.to_string(),
        );
        pages.insert(phone(2).to_string(), provider_page("Telkom"));
        let (batcher, launcher) = batcher(pages, false);

        let report = batcher
            .run((0..3).map(phone).collect(), &CancellationToken::new())
            .await;

        assert_eq!(report.resolved, vec![(phone(0), Provider::Rain)]);
        // Only the number that hit the CAPTCHA was actually looked up
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, phone(1));
        assert_eq!(report.deferred, vec![phone(2)]);
        assert_eq!(report.batches[0].deferred, 1);
        assert!(report.batches[0].captcha);
        assert_eq!(launcher.open.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stop_skips_remaining_numbers() {
        let (batcher, launcher) = batcher(HashMap::new(), false);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = batcher.run((0..7).map(phone).collect(), &cancel).await;

        assert_eq!(report.skipped.len(), 7);
        assert!(report.batches.is_empty());
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_launch_failure_fails_batch() {
        let (batcher, _launcher) = batcher(HashMap::new(), true);

        let report = batcher
            .run((0..2).map(phone).collect(), &CancellationToken::new())
            .await;

        assert_eq!(report.failed.len(), 2);
        assert!(report.failed[0].1.contains("launch failed"));
        assert_eq!(batcher.current_batch_size(), 4);
    }
}
