//! Account repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{DatabaseError, DatabaseResult};
use sqlx::SqlitePool;
use tracing::info;

use super::AccountStore;
use crate::{
    models::{Account, NewAccount},
    timestamp,
};

/// Account repository
#[derive(Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    /// Create a new account repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for AccountRepository {
    async fn create(&self, account: &NewAccount, now: DateTime<Utc>) -> DatabaseResult<Account> {
        info!("Creating new account: {}", account.email);

        let now = timestamp::format(now);
        sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO users (id, email, name, password, role, active, program_id, verified,
                               verification_token, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 1, ?, 0, ?, ?, ?)
            RETURNING id, email, name, password, role, active, program_id, verified,
                      verification_token, verified_at, verified_until, created_at, updated_at
            "#,
        )
        .bind(&account.id)
        .bind(&account.email)
        .bind(&account.name)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(account.program_id)
        .bind(&account.verification_token)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_query)
    }

    async fn find_by_id(&self, id: &str) -> DatabaseResult<Option<Account>> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, name, password, role, active, program_id, verified,
                   verification_token, verified_at, verified_until, created_at, updated_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<Account>> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, name, password, role, active, program_id, verified,
                   verification_token, verified_at, verified_until, created_at, updated_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    async fn find_by_verification_token(&self, token: &str) -> DatabaseResult<Option<Account>> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, name, password, role, active, program_id, verified,
                   verification_token, verified_at, verified_until, created_at, updated_at
            FROM users
            WHERE verification_token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    async fn set_verification_token(
        &self,
        id: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> DatabaseResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET verification_token = ?, updated_at = ?
            WHERE id = ? AND verified = 0
            "#,
        )
        .bind(token)
        .bind(timestamp::format(now))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_verified(
        &self,
        id: &str,
        token: &str,
        verified_at: DateTime<Utc>,
        verified_until: Option<DateTime<Utc>>,
    ) -> DatabaseResult<bool> {
        let verified_at = timestamp::format(verified_at);
        let result = sqlx::query(
            r#"
            UPDATE users
            SET verified = 1,
                verification_token = NULL,
                verified_at = ?,
                verified_until = ?,
                updated_at = ?
            WHERE id = ? AND verification_token = ?
            "#,
        )
        .bind(&verified_at)
        .bind(verified_until.map(timestamp::format))
        .bind(&verified_at)
        .bind(id)
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, limit: i64, offset: i64) -> DatabaseResult<Vec<Account>> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, name, password, role, active, program_id, verified,
                   verification_token, verified_at, verified_until, created_at, updated_at
            FROM users
            ORDER BY created_at, id
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{database, models::Role};
    use chrono::{Duration, TimeZone};

    fn new_account(id: &str, email: &str, token: &str) -> NewAccount {
        NewAccount {
            id: id.to_string(),
            email: email.to_string(),
            name: "Test".to_string(),
            password_hash: "hash".to_string(),
            role: Role::User,
            program_id: 1,
            verification_token: token.to_string(),
        }
    }

    async fn repository() -> AccountRepository {
        AccountRepository::new(database::in_memory().await.expect("store"))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_create_starts_unverified_with_token() {
        let repo = repository().await;
        let account = repo
            .create(&new_account("a1", "a@studmail.w-hs.de", "tok"), now())
            .await
            .unwrap();

        assert!(!account.verified);
        assert!(account.active);
        assert_eq!(account.verification_token.as_deref(), Some("tok"));
        assert_eq!(account.created_at, "2025-04-01T12:00:00Z");
        assert!(account.verified_at.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_a_unique_violation() {
        let repo = repository().await;
        repo.create(&new_account("a1", "a@x.de", "t1"), now())
            .await
            .unwrap();

        let err = repo
            .create(&new_account("a2", "a@x.de", "t2"), now())
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn test_mark_verified_consumes_token_once() {
        let repo = repository().await;
        repo.create(&new_account("a1", "a@x.de", "tok"), now())
            .await
            .unwrap();

        assert!(repo.mark_verified("a1", "tok", now(), None).await.unwrap());
        assert!(!repo.mark_verified("a1", "tok", now(), None).await.unwrap());

        let account = repo.find_by_id("a1").await.unwrap().unwrap();
        assert!(account.verified);
        assert!(account.verification_token.is_none());
        assert_eq!(account.verified_at.as_deref(), Some("2025-04-01T12:00:00Z"));
        assert!(account.verified_until.is_none());
        assert!(repo.find_by_verification_token("tok").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_verification_token_skips_verified_accounts() {
        let repo = repository().await;
        repo.create(&new_account("a1", "a@x.de", "old"), now())
            .await
            .unwrap();

        assert!(
            repo.set_verification_token("a1", "new", now() + Duration::minutes(5))
                .await
                .unwrap()
        );
        assert!(repo.find_by_verification_token("old").await.unwrap().is_none());
        assert!(repo.mark_verified("a1", "new", now(), None).await.unwrap());

        assert!(!repo.set_verification_token("a1", "again", now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_pages_in_creation_order() {
        let repo = repository().await;
        for (i, email) in ["a@x.de", "b@x.de", "c@x.de"].iter().enumerate() {
            repo.create(
                &new_account(&format!("id{i}"), email, &format!("t{i}")),
                now() + Duration::minutes(i as i64),
            )
            .await
            .unwrap();
        }

        let page = repo.list(2, 1).await.unwrap();
        let emails: Vec<&str> = page.iter().map(|a| a.email.as_str()).collect();
        assert_eq!(emails, vec!["b@x.de", "c@x.de"]);
    }
}
