//! LeadScout Database Layer
//!
//! Provides `SQLite` persistence for scraper sessions, the businesses they
//! find and the provider-lookup retry queue.
//!
//! # Example
//!
//! ```ignore
//! use leadscout_db::Database;
//!
//! let db = Database::new("leadscout.db").await?;
//! db.run_migrations().await?;
//! ```
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings
//! (`2025-01-01T00:00:00.000Z`) so that string comparison in SQL orders
//! them chronologically.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod businesses;
pub mod connection;
pub mod error;
pub mod migrations;
pub mod retry_queue;
pub mod sessions;

// Re-export commonly used types
pub use connection::ConnectionPool;
pub use error::{DatabaseError, Result};

use chrono::{DateTime, SecondsFormat, Utc};
use std::path::Path;

/// High-level database interface.
///
/// Wraps a `ConnectionPool` and exposes migrations plus the raw pool for the
/// per-table modules.
#[derive(Debug, Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Open a database at the specified path (or `:memory:`).
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let pool = ConnectionPool::new(path).await?;
        Ok(Self { pool })
    }

    /// Open a database and bring its schema up to date.
    pub async fn open_and_migrate(path: impl AsRef<Path>) -> Result<Self> {
        let db = Self::new(path).await?;
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run all pending database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(self.pool.pool()).await
    }

    /// Get the current schema version.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(self.pool.pool()).await
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Sqlite> {
        self.pool.pool()
    }

    /// Close the database connection gracefully.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

/// Format a timestamp the way every table stores it.
#[must_use]
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time in storage format.
#[must_use]
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Parse a stored timestamp.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Decode(format!("invalid timestamp '{value}': {e}")))
}

fn parse_optional_timestamp(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_timestamp).transpose()
}
