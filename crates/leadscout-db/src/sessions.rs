//! Scraping session operations.
//!
//! One row per scraper run. The `summary` column holds the run's JSON
//! summary and is rewritten as the run progresses.

use crate::error::{DatabaseError, Result};
use crate::{now_timestamp, parse_optional_timestamp, parse_timestamp};
use chrono::{DateTime, Utc};
use leadscout_core::{SessionId, SessionStatus};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

/// A scraper run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingSession {
    /// Unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Lifecycle state
    pub status: SessionStatus,
    /// Towns to crawl, in processing order
    pub towns: Vec<String>,
    /// Industries searched in every town, in processing order
    pub industries: Vec<String>,
    /// Progress / final summary
    pub summary: Option<serde_json::Value>,
    /// Fatal error for failed runs
    pub error_message: Option<String>,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// Last status or summary change
    pub updated_at: DateTime<Utc>,
    /// When the run ended
    pub completed_at: Option<DateTime<Utc>>,
}

const SESSION_COLUMNS: &str = "id, name, status, towns, industries, summary, error_message, created_at, updated_at, completed_at";

/// Create a new session in the `running` state.
pub async fn create_session(
    pool: &Pool<Sqlite>,
    name: &str,
    towns: &[String],
    industries: &[String],
) -> Result<ScrapingSession> {
    let id = SessionId::generate();
    let now = now_timestamp();

    sqlx::query(
        "INSERT INTO scraping_sessions (id, name, status, towns, industries, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.as_str())
    .bind(name)
    .bind(SessionStatus::Running.as_str())
    .bind(serde_json::to_string(towns)?)
    .bind(serde_json::to_string(industries)?)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    get_by_id(pool, id.as_str())
        .await?
        .ok_or_else(|| DatabaseError::NotFoundWithMessage(format!("Session '{id}' not found")))
}

/// Get a session by ID.
pub async fn get_by_id(pool: &Pool<Sqlite>, id: &str) -> Result<Option<ScrapingSession>> {
    let row = sqlx::query(&format!(
        "SELECT {SESSION_COLUMNS} FROM scraping_sessions WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| session_from_row(&r)).transpose()
}

/// List all sessions, newest first.
pub async fn list_sessions(pool: &Pool<Sqlite>) -> Result<Vec<ScrapingSession>> {
    let rows = sqlx::query(&format!(
        "SELECT {SESSION_COLUMNS} FROM scraping_sessions ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(session_from_row).collect()
}

/// Store an in-progress summary.
pub async fn update_summary(
    pool: &Pool<Sqlite>,
    id: &str,
    summary: &serde_json::Value,
) -> Result<()> {
    let result =
        sqlx::query("UPDATE scraping_sessions SET summary = ?, updated_at = ? WHERE id = ?")
            .bind(serde_json::to_string(summary)?)
            .bind(now_timestamp())
            .bind(id)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFoundWithMessage(format!(
            "Session '{id}' not found"
        )));
    }
    Ok(())
}

/// Record the end of a run.
pub async fn finish_session(
    pool: &Pool<Sqlite>,
    id: &str,
    status: SessionStatus,
    summary: Option<&serde_json::Value>,
    error_message: Option<&str>,
) -> Result<()> {
    let now = now_timestamp();
    let summary = summary.map(serde_json::to_string).transpose()?;

    let result = sqlx::query(
        "UPDATE scraping_sessions
         SET status = ?, summary = COALESCE(?, summary), error_message = ?, updated_at = ?, completed_at = ?
         WHERE id = ?",
    )
    .bind(status.as_str())
    .bind(summary)
    .bind(error_message)
    .bind(&now)
    .bind(&now)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFoundWithMessage(format!(
            "Session '{id}' not found"
        )));
    }
    Ok(())
}

/// Mark sessions left `running` by a previous process as `stopped`.
///
/// Returns the number of sessions recovered.
pub async fn mark_interrupted(pool: &Pool<Sqlite>) -> Result<u64> {
    let now = now_timestamp();
    let result = sqlx::query(
        "UPDATE scraping_sessions
         SET status = ?, error_message = 'interrupted: process exited while running', updated_at = ?, completed_at = ?
         WHERE status = ?",
    )
    .bind(SessionStatus::Stopped.as_str())
    .bind(&now)
    .bind(&now)
    .bind(SessionStatus::Running.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Delete a session together with its businesses and retry entries.
///
/// Returns `false` if no such session exists.
pub async fn delete_session(pool: &Pool<Sqlite>, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM scraping_sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn session_from_row(row: &SqliteRow) -> Result<ScrapingSession> {
    let status_str: String = row.try_get("status")?;
    let status = status_str
        .parse::<SessionStatus>()
        .map_err(|e| DatabaseError::Decode(e.to_string()))?;

    let towns: String = row.try_get("towns")?;
    let industries: String = row.try_get("industries")?;
    let summary: Option<String> = row.try_get("summary")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(ScrapingSession {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        status,
        towns: serde_json::from_str(&towns)?,
        industries: serde_json::from_str(&industries)?,
        summary: summary.as_deref().map(|s| serde_json::from_str(s)).transpose()?,
        error_message: row.try_get("error_message")?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
        completed_at: parse_optional_timestamp(row.try_get("completed_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_test_db;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn test_create_session() {
        let db = setup_test_db().await;

        let session = create_session(
            db.pool(),
            "Gauteng plumbers",
            &strings(&["Pretoria", "Centurion"]),
            &strings(&["Plumbers"]),
        )
        .await
        .expect("create session");

        assert_eq!(session.name, "Gauteng plumbers");
        assert_eq!(session.status, SessionStatus::Running);
        assert_eq!(session.towns, vec!["Pretoria", "Centurion"]);
        assert!(session.summary.is_none());
        assert!(session.completed_at.is_none());
        assert!(SessionId::new(session.id.as_str()).is_ok());
    }

    #[tokio::test]
    async fn test_finish_session_with_summary() {
        let db = setup_test_db().await;
        let session = create_session(db.pool(), "run", &strings(&["Durban"]), &strings(&["Bakeries"]))
            .await
            .expect("create session");

        let summary = serde_json::json!({ "businesses_found": 12 });
        finish_session(
            db.pool(),
            &session.id,
            SessionStatus::Completed,
            Some(&summary),
            None,
        )
        .await
        .expect("finish session");

        let loaded = get_by_id(db.pool(), &session.id)
            .await
            .expect("get session")
            .expect("session exists");
        assert_eq!(loaded.status, SessionStatus::Completed);
        assert_eq!(loaded.summary, Some(summary));
        assert!(loaded.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_finish_keeps_progress_summary() {
        let db = setup_test_db().await;
        let session = create_session(db.pool(), "run", &strings(&["Durban"]), &strings(&["Bakeries"]))
            .await
            .expect("create session");

        let progress = serde_json::json!({ "towns_completed": 1 });
        update_summary(db.pool(), &session.id, &progress)
            .await
            .expect("update summary");
        finish_session(
            db.pool(),
            &session.id,
            SessionStatus::Failed,
            None,
            Some("disk full"),
        )
        .await
        .expect("finish session");

        let loaded = get_by_id(db.pool(), &session.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, SessionStatus::Failed);
        assert_eq!(loaded.summary, Some(progress));
        assert_eq!(loaded.error_message.as_deref(), Some("disk full"));
    }

    #[tokio::test]
    async fn test_update_missing_session() {
        let db = setup_test_db().await;
        let result = update_summary(db.pool(), "missing", &serde_json::json!({})).await;
        assert!(matches!(result, Err(DatabaseError::NotFoundWithMessage(_))));
    }

    #[tokio::test]
    async fn test_mark_interrupted() {
        let db = setup_test_db().await;
        let running = create_session(db.pool(), "a", &strings(&["Paarl"]), &strings(&["Wineries"]))
            .await
            .unwrap();
        let done = create_session(db.pool(), "b", &strings(&["Paarl"]), &strings(&["Wineries"]))
            .await
            .unwrap();
        finish_session(db.pool(), &done.id, SessionStatus::Completed, None, None)
            .await
            .unwrap();

        let recovered = mark_interrupted(db.pool()).await.expect("mark interrupted");
        assert_eq!(recovered, 1);

        let running = get_by_id(db.pool(), &running.id).await.unwrap().unwrap();
        assert_eq!(running.status, SessionStatus::Stopped);
        let done = get_by_id(db.pool(), &done.id).await.unwrap().unwrap();
        assert_eq!(done.status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let db = setup_test_db().await;
        let first = create_session(db.pool(), "first", &strings(&["George"]), &strings(&["Dentists"]))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = create_session(db.pool(), "second", &strings(&["Knysna"]), &strings(&["Dentists"]))
            .await
            .unwrap();

        let sessions = list_sessions(db.pool()).await.expect("list sessions");
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, second.id);

        assert!(delete_session(db.pool(), &first.id).await.unwrap());
        assert!(!delete_session(db.pool(), &first.id).await.unwrap());
        assert_eq!(list_sessions(db.pool()).await.unwrap().len(), 1);
    }
}
