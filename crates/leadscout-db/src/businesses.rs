//! Scraped business operations.
//!
//! A phone number appears at most once per session; inserting a duplicate
//! is a no-op that reports `None`.

use crate::error::Result;
use crate::{now_timestamp, parse_timestamp};
use chrono::{DateTime, Utc};
use leadscout_core::{PhoneNumber, Provider};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use std::collections::BTreeMap;

/// A business listing ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBusiness {
    /// Business name
    pub name: String,
    /// Normalized phone number, if the listing had one
    pub phone: Option<PhoneNumber>,
    /// Street address
    pub address: Option<String>,
    /// Town searched
    pub town: String,
    /// Industry searched
    pub industry: String,
    /// Business website
    pub website: Option<String>,
    /// Maps place URL
    pub maps_url: Option<String>,
}

/// A stored business row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedBusiness {
    /// Unique identifier
    pub id: String,
    /// Owning session
    pub session_id: String,
    /// Business name
    pub name: String,
    /// Normalized phone number
    pub phone: Option<String>,
    /// Street address
    pub address: Option<String>,
    /// Town searched
    pub town: String,
    /// Industry searched
    pub industry: String,
    /// Network provider of the phone number, once looked up
    pub provider: Option<String>,
    /// Business website
    pub website: Option<String>,
    /// Maps place URL
    pub maps_url: Option<String>,
    /// When the row was stored
    pub created_at: DateTime<Utc>,
}

const BUSINESS_COLUMNS: &str =
    "id, session_id, name, phone, address, town, industry, provider, website, maps_url, created_at";

/// Insert a business.
///
/// Returns `None` when the session already holds a business with the same
/// phone number.
pub async fn insert_business(
    pool: &Pool<Sqlite>,
    session_id: &str,
    business: &NewBusiness,
) -> Result<Option<ScrapedBusiness>> {
    let id = uuid::Uuid::new_v4().to_string();
    let created_at = now_timestamp();

    let result = sqlx::query(
        "INSERT INTO scraped_businesses (id, session_id, name, phone, address, town, industry, website, maps_url, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (session_id, phone) DO NOTHING",
    )
    .bind(&id)
    .bind(session_id)
    .bind(&business.name)
    .bind(business.phone.as_ref().map(PhoneNumber::as_str))
    .bind(&business.address)
    .bind(&business.town)
    .bind(&business.industry)
    .bind(&business.website)
    .bind(&business.maps_url)
    .bind(&created_at)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    Ok(Some(ScrapedBusiness {
        id,
        session_id: session_id.to_string(),
        name: business.name.clone(),
        phone: business.phone.as_ref().map(ToString::to_string),
        address: business.address.clone(),
        town: business.town.clone(),
        industry: business.industry.clone(),
        provider: None,
        website: business.website.clone(),
        maps_url: business.maps_url.clone(),
        created_at: parse_timestamp(&created_at)?,
    }))
}

/// Record the provider of a phone number for every business in the session
/// that carries it. Returns the number of rows updated.
pub async fn set_provider(
    pool: &Pool<Sqlite>,
    session_id: &str,
    phone: &PhoneNumber,
    provider: Provider,
) -> Result<u64> {
    let result =
        sqlx::query("UPDATE scraped_businesses SET provider = ? WHERE session_id = ? AND phone = ?")
            .bind(provider.display_name())
            .bind(session_id)
            .bind(phone.as_str())
            .execute(pool)
            .await?;

    Ok(result.rows_affected())
}

/// All businesses of a session, in insertion order.
pub async fn get_by_session(pool: &Pool<Sqlite>, session_id: &str) -> Result<Vec<ScrapedBusiness>> {
    let rows = sqlx::query(&format!(
        "SELECT {BUSINESS_COLUMNS} FROM scraped_businesses WHERE session_id = ? ORDER BY created_at, rowid"
    ))
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(business_from_row).collect()
}

/// Number of businesses stored for a session.
pub async fn count_by_session(pool: &Pool<Sqlite>, session_id: &str) -> Result<i64> {
    let count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM scraped_businesses WHERE session_id = ?")
            .bind(session_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

/// Businesses per provider for a session; rows without a provider are not counted.
pub async fn provider_counts(
    pool: &Pool<Sqlite>,
    session_id: &str,
) -> Result<BTreeMap<String, i64>> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT provider, COUNT(*) FROM scraped_businesses
         WHERE session_id = ? AND provider IS NOT NULL
         GROUP BY provider",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}

fn business_from_row(row: &SqliteRow) -> Result<ScrapedBusiness> {
    let created_at: String = row.try_get("created_at")?;

    Ok(ScrapedBusiness {
        id: row.try_get("id")?,
        session_id: row.try_get("session_id")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        town: row.try_get("town")?,
        industry: row.try_get("industry")?,
        provider: row.try_get("provider")?,
        website: row.try_get("website")?,
        maps_url: row.try_get("maps_url")?,
        created_at: parse_timestamp(&created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::create_session;
    use crate::test_support::setup_test_db;
    use crate::Database;

    async fn setup_session(db: &Database) -> String {
        create_session(
            db.pool(),
            "test",
            &["Pretoria".to_string()],
            &["Plumbers".to_string()],
        )
        .await
        .expect("create session")
        .id
    }

    fn business(name: &str, phone: Option<&str>) -> NewBusiness {
        NewBusiness {
            name: name.to_string(),
            phone: phone.map(|p| PhoneNumber::parse(p).expect("valid phone")),
            address: Some("1 Church St, Pretoria".to_string()),
            town: "Pretoria".to_string(),
            industry: "Plumbers".to_string(),
            website: None,
            maps_url: Some("https://www.google.com/maps/place/x".to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_business() {
        let db = setup_test_db().await;
        let session_id = setup_session(&db).await;

        let stored = insert_business(db.pool(), &session_id, &business("Pipe Pros", Some("082 123 4567")))
            .await
            .expect("insert business")
            .expect("not a duplicate");

        assert_eq!(stored.phone.as_deref(), Some("0821234567"));
        assert!(stored.provider.is_none());
        assert_eq!(count_by_session(db.pool(), &session_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_phone_is_ignored() {
        let db = setup_test_db().await;
        let session_id = setup_session(&db).await;

        insert_business(db.pool(), &session_id, &business("Pipe Pros", Some("0821234567")))
            .await
            .unwrap();
        let duplicate = insert_business(db.pool(), &session_id, &business("Pipe Pros CBD", Some("+27 82 123 4567")))
            .await
            .expect("insert duplicate");
        assert!(duplicate.is_none());

        // Businesses without a phone never collide
        insert_business(db.pool(), &session_id, &business("No Phone A", None))
            .await
            .unwrap()
            .expect("stored");
        insert_business(db.pool(), &session_id, &business("No Phone B", None))
            .await
            .unwrap()
            .expect("stored");

        assert_eq!(count_by_session(db.pool(), &session_id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_set_provider_and_counts() {
        let db = setup_test_db().await;
        let session_id = setup_session(&db).await;

        insert_business(db.pool(), &session_id, &business("A", Some("0821234567")))
            .await
            .unwrap();
        insert_business(db.pool(), &session_id, &business("B", Some("0831234567")))
            .await
            .unwrap();
        insert_business(db.pool(), &session_id, &business("C", Some("0841234567")))
            .await
            .unwrap();

        let phone = PhoneNumber::parse("0821234567").unwrap();
        let updated = set_provider(db.pool(), &session_id, &phone, Provider::Vodacom)
            .await
            .expect("set provider");
        assert_eq!(updated, 1);
        let phone = PhoneNumber::parse("0831234567").unwrap();
        set_provider(db.pool(), &session_id, &phone, Provider::Mtn)
            .await
            .unwrap();

        let counts = provider_counts(db.pool(), &session_id).await.expect("counts");
        assert_eq!(counts.get("Vodacom"), Some(&1));
        assert_eq!(counts.get("MTN"), Some(&1));
        assert_eq!(counts.len(), 2);

        let rows = get_by_session(db.pool(), &session_id).await.expect("list");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].name, "A");
        assert_eq!(rows[0].provider.as_deref(), Some("Vodacom"));
        assert!(rows[2].provider.is_none());
    }

    #[tokio::test]
    async fn test_businesses_deleted_with_session() {
        let db = setup_test_db().await;
        let session_id = setup_session(&db).await;
        insert_business(db.pool(), &session_id, &business("A", Some("0821234567")))
            .await
            .unwrap();

        crate::sessions::delete_session(db.pool(), &session_id)
            .await
            .unwrap();
        assert_eq!(count_by_session(db.pool(), &session_id).await.unwrap(), 0);
    }
}
