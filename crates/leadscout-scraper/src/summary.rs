//! Progress and final summary of a session, stored as JSON on the session row.

use crate::provider::LookupReport;
use crate::retry::RetryReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSummary {
    pub towns_total: usize,
    pub towns_completed: usize,
    pub searches_completed: usize,
    pub searches_failed: usize,
    pub businesses_found: usize,
    pub lookups_succeeded: usize,
    /// Numbers still without a provider after their first pass
    pub lookups_failed: usize,
    /// Of the failed ones, numbers a stop kept from being looked up at all
    pub lookups_skipped: usize,
    pub retries_queued: usize,
    /// Businesses per provider name
    pub provider_counts: BTreeMap<String, i64>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SessionSummary {
    pub fn new(towns_total: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            towns_total,
            started_at: Some(started_at),
            ..Self::default()
        }
    }

    pub fn record_lookups(&mut self, report: &LookupReport) {
        self.lookups_succeeded += report.resolved.len();
        self.lookups_failed += report.failed.len() + report.deferred.len() + report.skipped.len();
        self.lookups_skipped += report.skipped.len();
    }

    /// Count a retry pass. Exhausted numbers were already counted as failed
    /// lookups when they were first queued.
    pub fn record_retries(&mut self, report: &RetryReport) {
        self.lookups_succeeded += report.resolved.len();
        self.lookups_failed = self.lookups_failed.saturating_sub(report.resolved.len());
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    /// Read a stored summary; unknown or missing fields fall back to zero.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}
