//! Session repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{DatabaseError, DatabaseResult};
use sqlx::SqlitePool;

use super::SessionStore;
use crate::{models::Session, timestamp};

/// Session repository
#[derive(Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    /// Create a new session repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn insert(&self, session: &Session) -> DatabaseResult<()> {
        sqlx::query("INSERT INTO sessions (id, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(&session.id)
            .bind(&session.user_id)
            .bind(&session.expires_at)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;
        Ok(())
    }

    async fn find(&self, id: &str) -> DatabaseResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT id, user_id, expires_at FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)
    }

    async fn update_expiry(&self, id: &str, expires_at: DateTime<Utc>) -> DatabaseResult<bool> {
        let result = sqlx::query("UPDATE sessions SET expires_at = ? WHERE id = ?")
            .bind(timestamp::format(expires_at))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &str) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> DatabaseResult<u64> {
        // julianday() yields NULL for values SQLite cannot read as a date.
        let result = sqlx::query(
            r#"
            DELETE FROM sessions
            WHERE julianday(expires_at) IS NULL
               OR julianday(expires_at) < julianday(?)
            "#,
        )
        .bind(timestamp::format(now))
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;
        Ok(result.rows_affected())
    }
}
