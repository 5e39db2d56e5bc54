//! Progress events published while a session runs.

use crate::provider::BatchStats;
use crate::summary::SessionSummary;
use leadscout_core::SessionStatus;
use serde::Serialize;

/// Capacity of the progress channel; slow subscribers miss older events.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScrapeEvent {
    SessionStarted {
        session_id: String,
        towns: Vec<String>,
        industries: Vec<String>,
    },
    TownStarted {
        session_id: String,
        town: String,
    },
    SearchCompleted {
        session_id: String,
        town: String,
        industry: String,
        listings: usize,
        new_businesses: usize,
        error: Option<String>,
    },
    LookupBatchCompleted {
        session_id: String,
        stats: BatchStats,
    },
    TownCompleted {
        session_id: String,
        town: String,
        businesses_found: usize,
    },
    RetriesProcessed {
        session_id: String,
        resolved: usize,
        rescheduled: usize,
        exhausted: usize,
    },
    SessionFinished {
        session_id: String,
        status: SessionStatus,
        summary: SessionSummary,
    },
}

impl ScrapeEvent {
    pub fn session_id(&self) -> &str {
        match self {
            Self::SessionStarted { session_id, .. }
            | Self::TownStarted { session_id, .. }
            | Self::SearchCompleted { session_id, .. }
            | Self::LookupBatchCompleted { session_id, .. }
            | Self::TownCompleted { session_id, .. }
            | Self::RetriesProcessed { session_id, .. }
            | Self::SessionFinished { session_id, .. } => session_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = ScrapeEvent::TownStarted {
            session_id: "abc".to_string(),
            town: "Durban".to_string(),
        };
        let json = serde_json::to_value(&event).expect("serialize event");
        assert_eq!(json["type"], "town_started");
        assert_eq!(json["town"], "Durban");
        assert_eq!(event.session_id(), "abc");
    }
}
