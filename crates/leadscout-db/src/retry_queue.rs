//! Provider lookup retry queue.
//!
//! Each queued lookup owns one row per `(session_id, phone)`. Rows stay
//! `pending` while attempts remain and become `exhausted` once the caller
//! gives up; resolved rows are deleted.

use crate::error::{DatabaseError, Result};
use crate::{format_timestamp, now_timestamp, parse_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;

/// State of a retry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryStatus {
    /// Waiting for its next attempt
    Pending,
    /// Out of attempts
    Exhausted,
}

impl RetryStatus {
    /// Database representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Exhausted => "exhausted",
        }
    }
}

impl FromStr for RetryStatus {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "exhausted" => Ok(Self::Exhausted),
            other => Err(DatabaseError::Decode(format!(
                "unknown retry status '{other}'"
            ))),
        }
    }
}

/// A queued provider lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryEntry {
    /// Unique identifier
    pub id: String,
    /// Owning session
    pub session_id: String,
    /// Normalized phone number
    pub phone: String,
    /// Lookups attempted so far
    pub attempts: u32,
    /// Earliest time of the next attempt
    pub next_attempt_at: DateTime<Utc>,
    /// Error of the most recent attempt
    pub last_error: Option<String>,
    /// Queue state
    pub status: RetryStatus,
    /// When the entry was first queued
    pub created_at: DateTime<Utc>,
}

const RETRY_COLUMNS: &str =
    "id, session_id, phone, attempts, next_attempt_at, last_error, status, created_at";

/// Queue a phone number with `attempts` lookups already spent on it: 1 after
/// a failed first lookup, 0 when the number was never queried.
///
/// Returns `false` if the session already has an entry for this phone; the
/// existing entry is left untouched.
pub async fn enqueue(
    pool: &Pool<Sqlite>,
    session_id: &str,
    phone: &str,
    attempts: u32,
    next_attempt_at: DateTime<Utc>,
    error: &str,
) -> Result<bool> {
    let result = sqlx::query(
        "INSERT INTO provider_retry_queue (id, session_id, phone, attempts, next_attempt_at, last_error, status, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (session_id, phone) DO NOTHING",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(session_id)
    .bind(phone)
    .bind(i64::from(attempts))
    .bind(format_timestamp(next_attempt_at))
    .bind(error)
    .bind(RetryStatus::Pending.as_str())
    .bind(now_timestamp())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Pending entries of a session whose next attempt is at or before `now`,
/// earliest first.
pub async fn due_entries(
    pool: &Pool<Sqlite>,
    session_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<RetryEntry>> {
    let rows = sqlx::query(&format!(
        "SELECT {RETRY_COLUMNS} FROM provider_retry_queue
         WHERE session_id = ? AND status = ? AND next_attempt_at <= ?
         ORDER BY next_attempt_at, created_at"
    ))
    .bind(session_id)
    .bind(RetryStatus::Pending.as_str())
    .bind(format_timestamp(now))
    .fetch_all(pool)
    .await?;

    rows.iter().map(entry_from_row).collect()
}

/// Every entry of a session, pending and exhausted.
pub async fn list_by_session(pool: &Pool<Sqlite>, session_id: &str) -> Result<Vec<RetryEntry>> {
    let rows = sqlx::query(&format!(
        "SELECT {RETRY_COLUMNS} FROM provider_retry_queue WHERE session_id = ? ORDER BY created_at"
    ))
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(entry_from_row).collect()
}

/// Record another failed attempt and reschedule the entry.
pub async fn record_failure(
    pool: &Pool<Sqlite>,
    id: &str,
    attempts: u32,
    next_attempt_at: DateTime<Utc>,
    error: &str,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE provider_retry_queue SET attempts = ?, next_attempt_at = ?, last_error = ? WHERE id = ?",
    )
    .bind(i64::from(attempts))
    .bind(format_timestamp(next_attempt_at))
    .bind(error)
    .bind(id)
    .execute(pool)
    .await?;

    ensure_updated(result.rows_affected(), id)
}

/// Give up on an entry.
pub async fn mark_exhausted(
    pool: &Pool<Sqlite>,
    id: &str,
    attempts: u32,
    error: &str,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE provider_retry_queue SET status = ?, attempts = ?, last_error = ? WHERE id = ?",
    )
    .bind(RetryStatus::Exhausted.as_str())
    .bind(i64::from(attempts))
    .bind(error)
    .bind(id)
    .execute(pool)
    .await?;

    ensure_updated(result.rows_affected(), id)
}

/// Delete an entry once its lookup succeeded.
pub async fn remove(pool: &Pool<Sqlite>, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM provider_retry_queue WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Number of pending entries for a session.
pub async fn pending_count(pool: &Pool<Sqlite>, session_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM provider_retry_queue WHERE session_id = ? AND status = ?",
    )
    .bind(session_id)
    .bind(RetryStatus::Pending.as_str())
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Earliest scheduled attempt among the session's pending entries.
pub async fn next_due_at(pool: &Pool<Sqlite>, session_id: &str) -> Result<Option<DateTime<Utc>>> {
    let next = sqlx::query_scalar::<_, Option<String>>(
        "SELECT MIN(next_attempt_at) FROM provider_retry_queue WHERE session_id = ? AND status = ?",
    )
    .bind(session_id)
    .bind(RetryStatus::Pending.as_str())
    .fetch_one(pool)
    .await?;

    next.as_deref().map(parse_timestamp).transpose()
}

fn ensure_updated(rows_affected: u64, id: &str) -> Result<()> {
    if rows_affected == 0 {
        return Err(DatabaseError::NotFoundWithMessage(format!(
            "Retry entry '{id}' not found"
        )));
    }
    Ok(())
}

fn entry_from_row(row: &SqliteRow) -> Result<RetryEntry> {
    let attempts: i64 = row.try_get("attempts")?;
    let next_attempt_at: String = row.try_get("next_attempt_at")?;
    let status: String = row.try_get("status")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(RetryEntry {
        id: row.try_get("id")?,
        session_id: row.try_get("session_id")?,
        phone: row.try_get("phone")?,
        attempts: u32::try_from(attempts)
            .map_err(|_| DatabaseError::Decode(format!("invalid attempt count {attempts}")))?,
        next_attempt_at: parse_timestamp(&next_attempt_at)?,
        last_error: row.try_get("last_error")?,
        status: status.parse()?,
        created_at: parse_timestamp(&created_at)?,
    })
}
