//! Store interfaces and their SQLite repositories
//!
//! Components depend on the traits; the binary wires in the repositories.
//! Every method is a single statement, so each call is atomic on its own and
//! nothing spans rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseResult;

use crate::models::{Account, NewAccount, Program, Session};

pub mod account;
pub mod program;
pub mod session;

pub use account::AccountRepository;
pub use program::ProgramRepository;
pub use session::SessionRepository;

/// Account persistence
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new unverified account. Fails with `UniqueViolation` when the
    /// email is taken.
    async fn create(&self, account: &NewAccount, now: DateTime<Utc>) -> DatabaseResult<Account>;

    async fn find_by_id(&self, id: &str) -> DatabaseResult<Option<Account>>;

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<Account>>;

    async fn find_by_verification_token(&self, token: &str) -> DatabaseResult<Option<Account>>;

    /// Replace the outstanding token of an unverified account. Returns false
    /// when no unverified account with that id exists.
    async fn set_verification_token(
        &self,
        id: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> DatabaseResult<bool>;

    /// Consume `token` and mark the account verified. Returns false when the
    /// token no longer belongs to the account.
    async fn mark_verified(
        &self,
        id: &str,
        token: &str,
        verified_at: DateTime<Utc>,
        verified_until: Option<DateTime<Utc>>,
    ) -> DatabaseResult<bool>;

    async fn list(&self, limit: i64, offset: i64) -> DatabaseResult<Vec<Account>>;
}

/// Session persistence
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: &Session) -> DatabaseResult<()>;

    async fn find(&self, id: &str) -> DatabaseResult<Option<Session>>;

    /// Overwrite the expiry of an existing row. Returns false when the row is
    /// gone; deleted sessions are never recreated.
    async fn update_expiry(&self, id: &str, expires_at: DateTime<Utc>) -> DatabaseResult<bool>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: &str) -> DatabaseResult<bool>;

    /// Bulk-delete every session that expired before `now`, including rows
    /// whose expiry cannot be parsed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> DatabaseResult<u64>;
}

/// Read-only program catalogue
#[async_trait]
pub trait ProgramStore: Send + Sync {
    async fn list(&self) -> DatabaseResult<Vec<Program>>;

    async fn find(&self, id: i64) -> DatabaseResult<Option<Program>>;
}
