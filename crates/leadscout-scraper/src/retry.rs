//! Persisted retry queue for failed provider lookups.
//!
//! A failed number waits `base × 2^(attempts-1)` before its next lookup.
//! After `max_attempts` lookups in total the number is given up on and its
//! businesses get the `Unknown` provider. Only lookups that reached the site
//! count: numbers deferred by a CAPTCHA or skipped by a stop keep their
//! attempt count.

use crate::error::Result;
use crate::provider::{LookupBatcher, LookupReport};
use chrono::{DateTime, Utc};
use leadscout_core::{PhoneNumber, Provider, ProviderLookupConfig};
use leadscout_db::{businesses, retry_queue, Database};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Largest exponent applied to the base delay.
const MAX_BACKOFF_EXPONENT: u32 = 16;

const DEFERRED_AFTER_CAPTCHA: &str = "not queried: CAPTCHA earlier in the batch";
const SKIPPED_BY_STOP: &str = "not queried: lookup stopped";

/// Delay before the lookup following attempt number `attempts`.
pub fn backoff_delay(base: Duration, attempts: u32) -> Duration {
    let exponent = attempts.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    base.saturating_mul(1 << exponent)
}

/// Outcome of processing the queue.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetryReport {
    /// Entries looked up
    pub processed: usize,
    /// Numbers whose provider is now known
    pub resolved: Vec<(PhoneNumber, Provider)>,
    /// Entries that failed again and wait for another attempt
    pub rescheduled: usize,
    /// Numbers given up on
    pub exhausted: Vec<PhoneNumber>,
    /// Entries pushed back unqueried after a CAPTCHA
    pub deferred: usize,
    /// Entries left untouched because of a stop request
    pub skipped: usize,
}

impl RetryReport {
    fn merge(&mut self, other: RetryReport) {
        self.processed += other.processed;
        self.resolved.extend(other.resolved);
        self.rescheduled += other.rescheduled;
        self.exhausted.extend(other.exhausted);
        self.deferred += other.deferred;
        self.skipped += other.skipped;
    }
}

/// Processes a session's retry queue through the lookup batcher.
pub struct RetryQueue {
    db: Database,
    batcher: Arc<LookupBatcher>,
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryQueue {
    /// Create a queue processor for the given lookup settings.
    pub fn new(db: Database, batcher: Arc<LookupBatcher>, config: &ProviderLookupConfig) -> Self {
        Self {
            db,
            batcher,
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_secs(config.retry_base_delay_secs),
        }
    }

    /// Queue numbers after their first failed lookup.
    ///
    /// Returns how many were newly queued. With a single allowed attempt the
    /// numbers are given up on immediately.
    pub async fn enqueue_failures(
        &self,
        session_id: &str,
        failures: &[(PhoneNumber, String)],
    ) -> Result<usize> {
        let mut queued = 0;

        for (phone, error) in failures {
            if self.max_attempts <= 1 {
                businesses::set_provider(self.db.pool(), session_id, phone, Provider::Unknown)
                    .await?;
                continue;
            }

            let next_attempt_at = due_after(backoff_delay(self.base_delay, 1));
            if retry_queue::enqueue(
                self.db.pool(),
                session_id,
                phone.as_str(),
                1,
                next_attempt_at,
                error,
            )
            .await?
            {
                queued += 1;
            }
        }

        if queued > 0 {
            tracing::info!("Queued {} provider lookups for retry", queued);
        }
        Ok(queued)
    }

    /// Queue the numbers a lookup run never queried, without spending an
    /// attempt. CAPTCHA-deferred numbers wait the base delay; numbers skipped
    /// by a stop are due at once.
    pub async fn enqueue_unattempted(
        &self,
        session_id: &str,
        report: &LookupReport,
    ) -> Result<usize> {
        let mut queued = 0;

        let deferred = report
            .deferred
            .iter()
            .map(|phone| (phone, self.base_delay, DEFERRED_AFTER_CAPTCHA));
        let skipped = report
            .skipped
            .iter()
            .map(|phone| (phone, Duration::ZERO, SKIPPED_BY_STOP));

        for (phone, delay, reason) in deferred.chain(skipped) {
            if retry_queue::enqueue(
                self.db.pool(),
                session_id,
                phone.as_str(),
                0,
                due_after(delay),
                reason,
            )
            .await?
            {
                queued += 1;
            }
        }

        if queued > 0 {
            tracing::info!("Queued {} unqueried provider lookups", queued);
        }
        Ok(queued)
    }

    /// Retry every entry of the session that is due now.
    pub async fn process_due(
        &self,
        session_id: &str,
        cancel: &CancellationToken,
    ) -> Result<RetryReport> {
        let due = retry_queue::due_entries(self.db.pool(), session_id, Utc::now()).await?;
        let mut report = RetryReport::default();
        if due.is_empty() {
            return Ok(report);
        }

        tracing::info!("Retrying {} provider lookups for session {}", due.len(), session_id);

        let mut entries = HashMap::new();
        let mut phones = Vec::with_capacity(due.len());
        for entry in due {
            match PhoneNumber::parse(&entry.phone) {
                Ok(phone) => {
                    phones.push(phone.clone());
                    entries.insert(phone, entry);
                }
                Err(e) => {
                    tracing::warn!("Dropping unparseable retry entry {}: {}", entry.id, e);
                    retry_queue::mark_exhausted(
                        self.db.pool(),
                        &entry.id,
                        entry.attempts,
                        &e.to_string(),
                    )
                    .await?;
                }
            }
        }

        let lookups = self.batcher.run(phones, cancel).await;
        report.skipped = lookups.skipped.len();

        for (phone, provider) in lookups.resolved {
            if let Some(entry) = entries.get(&phone) {
                businesses::set_provider(self.db.pool(), session_id, &phone, provider).await?;
                retry_queue::remove(self.db.pool(), &entry.id).await?;
                report.processed += 1;
                report.resolved.push((phone, provider));
            }
        }

        for phone in lookups.deferred {
            let Some(entry) = entries.get(&phone) else {
                continue;
            };
            retry_queue::record_failure(
                self.db.pool(),
                &entry.id,
                entry.attempts,
                due_after(self.base_delay),
                DEFERRED_AFTER_CAPTCHA,
            )
            .await?;
            report.deferred += 1;
        }

        for (phone, error) in lookups.failed {
            let Some(entry) = entries.get(&phone) else {
                continue;
            };
            report.processed += 1;

            let attempts = entry.attempts + 1;
            if attempts >= self.max_attempts {
                tracing::warn!(
                    "Giving up on provider lookup for {} after {} attempts: {}",
                    phone,
                    attempts,
                    error
                );
                retry_queue::mark_exhausted(self.db.pool(), &entry.id, attempts, &error).await?;
                businesses::set_provider(self.db.pool(), session_id, &phone, Provider::Unknown)
                    .await?;
                report.exhausted.push(phone);
            } else {
                let delay = backoff_delay(self.base_delay, attempts);
                tracing::warn!(
                    "Provider lookup for {} failed (attempt {}/{}), retrying in {:?}",
                    phone,
                    attempts,
                    self.max_attempts,
                    delay
                );
                retry_queue::record_failure(
                    self.db.pool(),
                    &entry.id,
                    attempts,
                    due_after(delay),
                    &error,
                )
                .await?;
                report.rescheduled += 1;
            }
        }

        Ok(report)
    }

    /// Keep processing the queue until no pending entry is left, sleeping
    /// until the next entry is due. Returns early on a stop request.
    pub async fn drain(&self, session_id: &str, cancel: &CancellationToken) -> Result<RetryReport> {
        let mut report = RetryReport::default();

        loop {
            if cancel.is_cancelled() {
                break;
            }
            if retry_queue::pending_count(self.db.pool(), session_id).await? == 0 {
                break;
            }

            report.merge(self.process_due(session_id, cancel).await?);

            let Some(next_due) = retry_queue::next_due_at(self.db.pool(), session_id).await?
            else {
                break;
            };
            let wait = (next_due - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            if !wait.is_zero() {
                tracing::debug!("Next provider retry for session {} in {:?}", session_id, wait);
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(wait) => {}
                }
            }
        }

        Ok(report)
    }
}

fn due_after(delay: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|delay| Utc::now().checked_add_signed(delay))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
