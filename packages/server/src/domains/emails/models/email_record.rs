use anyhow::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Outcome of probing one candidate found while crawling `domain`.
///
/// `domain` is the input domain whose archives produced the address, not
/// necessarily the address's own domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerificationResult {
    pub domain: String,
    pub email: String,
    pub valid: bool,
}

impl VerificationResult {
    pub fn new(domain: impl Into<String>, email: impl Into<String>, valid: bool) -> Self {
        Self {
            domain: domain.into(),
            email: email.into(),
            valid,
        }
    }
}

/// Persisted verification result
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmailRecord {
    pub id: i64,
    pub domain: String,
    pub email: String,
    pub valid: bool,
    pub created_at: NaiveDateTime,
}

impl EmailRecord {
    /// Insert one result. Each insert is its own statement, so a failure
    /// never leaves a partial row.
    pub async fn insert(result: &VerificationResult, pool: &SqlitePool) -> Result<Self> {
        let record = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO emails (domain, email, valid)
            VALUES ($1, $2, $3)
            RETURNING id, domain, email, valid, created_at
            "#,
        )
        .bind(&result.domain)
        .bind(&result.email)
        .bind(result.valid)
        .fetch_one(pool)
        .await?;
        Ok(record)
    }

    /// All records, oldest first
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>> {
        let records = sqlx::query_as::<_, Self>(
            "SELECT id, domain, email, valid, created_at FROM emails ORDER BY id ASC",
        )
        .fetch_all(pool)
        .await?;
        Ok(records)
    }

    /// Records produced by one input domain
    pub async fn find_by_domain(domain: &str, pool: &SqlitePool) -> Result<Vec<Self>> {
        let records = sqlx::query_as::<_, Self>(
            r#"
            SELECT id, domain, email, valid, created_at
            FROM emails
            WHERE domain = $1
            ORDER BY id ASC
            "#,
        )
        .bind(domain)
        .fetch_all(pool)
        .await?;
        Ok(records)
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM emails")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    pub fn to_result(&self) -> VerificationResult {
        VerificationResult::new(&self.domain, &self.email, self.valid)
    }
}
