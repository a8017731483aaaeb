//! User storage repository.

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::User;
use crate::Result;

/// Read access to the `users` table, plus upserts for seeding.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
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

    /// Create an in-memory repository for testing.
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
        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL,
                name TEXT NOT NULL,
                subscription_status TEXT,
                last_payment_date TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Looks up a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query(
            r"
            SELECT id, email, name, subscription_status, last_payment_date
            FROM users
            WHERE id = ?
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| User {
            id: row.get("id"),
            email: row.get("email"),
            name: row.get("name"),
            subscription_status: row.get("subscription_status"),
            last_payment_date: row.get("last_payment_date"),
        }))
    }

    /// Inserts a user or replaces the stored one with the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn upsert(&self, user: &User) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO users (id, email, name, subscription_status, last_payment_date)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                name = excluded.name,
                subscription_status = excluded.subscription_status,
                last_payment_date = excluded.last_payment_date
            ",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.subscription_status)
        .bind(&user.last_payment_date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user_one() -> User {
        User::new(1, "user1@test.local", "User One")
            .with_subscription_status("active")
            .with_last_payment_date("2025-12-01")
    }

    #[tokio::test]
    async fn test_get_user() {
        let repo = UserRepository::in_memory().await.unwrap();
        repo.upsert(&user_one()).await.unwrap();

        let user = repo.get_user(1).await.unwrap().unwrap();
        assert_eq!(user, user_one());
    }

    #[tokio::test]
    async fn test_missing_user_is_none() {
        let repo = UserRepository::in_memory().await.unwrap();
        repo.upsert(&user_one()).await.unwrap();

        assert!(repo.get_user(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let repo = UserRepository::in_memory().await.unwrap();
        repo.upsert(&user_one()).await.unwrap();

        let frozen = User::new(1, "user1@test.local", "User One").with_subscription_status("frozen");
        repo.upsert(&frozen).await.unwrap();

        let user = repo.get_user(1).await.unwrap().unwrap();
        assert_eq!(user.subscription_status.as_deref(), Some("frozen"));
        assert!(user.last_payment_date.is_none());
    }

    #[tokio::test]
    async fn test_null_columns() {
        let repo = UserRepository::in_memory().await.unwrap();
        sqlx::query("INSERT INTO users (id, email, name) VALUES (7, 'u7@test.local', 'Seven')")
            .execute(repo.pool())
            .await
            .unwrap();

        let user = repo.get_user(7).await.unwrap().unwrap();
        assert_eq!(user, User::new(7, "u7@test.local", "Seven"));
    }
}
