//! Delivery log storage.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::{DeliveryRecord, DeliveryStatus};
use crate::Result;

/// Append-only `email_log` table.
#[derive(Debug, Clone)]
pub struct DeliveryLog {
    pool: SqlitePool,
}

impl DeliveryLog {
    /// Opens the database at the given path.
    ///
    /// Creates the database and table if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        Self::with_pool(pool).await
    }

    /// Create an in-memory log for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Self::with_pool(pool).await
    }

    /// Uses an existing pool, creating the table if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self> {
        let log = Self { pool };
        log.initialize().await?;
        Ok(log)
    }

    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS email_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER,
                email_type TEXT,
                status TEXT,
                error_message TEXT,
                timestamp TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_email_log_user ON email_log(user_id)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Appends a record and returns its row id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn record(&self, record: &DeliveryRecord) -> Result<i64> {
        let result = sqlx::query(
            r"
            INSERT INTO email_log (user_id, email_type, status, error_message, timestamp)
            VALUES (?, ?, ?, ?, ?)
            ",
        )
        .bind(record.user_id)
        .bind(&record.email_type)
        .bind(record.status.as_str())
        .bind(&record.error_message)
        .bind(record.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Returns the records for a user, oldest first.
    ///
    /// Rows with an unreadable status or timestamp are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn for_user(&self, user_id: i64) -> Result<Vec<DeliveryRecord>> {
        let rows = sqlx::query(
            r"
            SELECT user_id, email_type, status, error_message, timestamp
            FROM email_log
            WHERE user_id = ?
            ORDER BY id ASC
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .iter()
            .filter_map(|row| {
                let status: String = row.get("status");
                let timestamp: String = row.get("timestamp");

                Some(DeliveryRecord {
                    user_id: row.get("user_id"),
                    email_type: row.get("email_type"),
                    status: status.parse::<DeliveryStatus>().ok()?,
                    error_message: row.get("error_message"),
                    timestamp: DateTime::parse_from_rfc3339(&timestamp)
                        .ok()?
                        .with_timezone(&Utc),
                })
            })
            .collect();

        Ok(records)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_and_list() {
        let log = DeliveryLog::in_memory().await.unwrap();

        let first = log.record(&DeliveryRecord::sent(1, "welcome")).await.unwrap();
        let second = log
            .record(&DeliveryRecord::failed(1, "payment_failed", "Connection failed"))
            .await
            .unwrap();
        log.record(&DeliveryRecord::sent(2, "welcome")).await.unwrap();
        assert!(second > first);

        let records = log.for_user(1).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].email_type, "welcome");
        assert_eq!(records[0].status, DeliveryStatus::Sent);
        assert_eq!(records[1].status, DeliveryStatus::Failed);
        assert_eq!(records[1].error_message.as_deref(), Some("Connection failed"));
    }

    #[tokio::test]
    async fn test_timestamp_survives_storage() {
        let log = DeliveryLog::in_memory().await.unwrap();
        let record = DeliveryRecord::sent(3, "subscription_frozen");
        log.record(&record).await.unwrap();

        let stored = log.for_user(3).await.unwrap();
        assert_eq!(stored, vec![record]);
    }

    #[tokio::test]
    async fn test_unknown_user_has_no_records() {
        let log = DeliveryLog::in_memory().await.unwrap();
        assert!(log.for_user(42).await.unwrap().is_empty());
    }
}
