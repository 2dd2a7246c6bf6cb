//! Named, keyed properties stored on a user record.
//!
//! A property `name` groups any number of `key -> value` entries per user.
//! Writes are plain upserts: concurrent writers for the same user and key
//! resolve as last-write-wins.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct PropertyStore {
    pool: SqlitePool,
}

/// A property entry together with its owner, used by maintenance sweeps.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OwnedProperty {
    pub user_id: i64,
    pub key: String,
    pub value: String,
}

impl PropertyStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a single property value.
    pub async fn get(
        &self,
        user_id: i64,
        name: &str,
        key: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT value FROM user_properties WHERE user_id = ? AND name = ? AND key = ?",
        )
        .bind(user_id)
        .bind(name)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }

    /// Insert or replace a property value.
    pub async fn set(
        &self,
        user_id: i64,
        name: &str,
        key: &str,
        value: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_properties (user_id, name, key, value) VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id, name, key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
        )
        .bind(user_id)
        .bind(name)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Remove a property. Returns whether an entry existed.
    pub async fn remove(&self, user_id: i64, name: &str, key: &str) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM user_properties WHERE user_id = ? AND name = ? AND key = ?")
                .bind(user_id)
                .bind(name)
                .bind(key)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List all `(key, value)` entries of a property for one user.
    pub async fn list(&self, user_id: i64, name: &str) -> Result<Vec<(String, String)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT key, value FROM user_properties WHERE user_id = ? AND name = ? ORDER BY updated_at, key",
        )
        .bind(user_id)
        .bind(name)
        .fetch_all(&self.pool)
        .await
    }

    /// List every entry of a property across all users.
    pub async fn list_all(&self, name: &str) -> Result<Vec<OwnedProperty>, sqlx::Error> {
        sqlx::query_as("SELECT user_id, key, value FROM user_properties WHERE name = ?")
            .bind(name)
            .fetch_all(&self.pool)
            .await
    }
}
