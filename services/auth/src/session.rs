//! Cookie sessions with sliding expiry
//!
//! A session id maps to one account and an absolute expiry. Every successful
//! [`SessionManager::authenticate`] pushes the expiry to `now + lifetime` and
//! re-emits the cookie, so only an idle session ever expires. There is no
//! absolute maximum age.
//!
//! `authenticate` and `revoke` on the same id are not serialised. A slide that
//! loses the race against a logout updates zero rows and the session stays
//! revoked; a slide that wins keeps the session alive until the logout's
//! delete lands.

use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Duration, Utc};
use common::error::DatabaseError;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    clock::Clock,
    cookies::{CookieSettings, ResponseCookie},
    models::{Account, Session},
    repositories::{AccountStore, SessionStore},
    tokens::generate_token,
};

/// Name of the session cookie.
pub const SESSION_COOKIE_NAME: &str = "__Host-session";

/// Session lifetime in seconds (24 hours), measured from the last use.
pub const SESSION_LIFETIME_SECS: i64 = 24 * 60 * 60;

/// Session manager errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session cookie not found")]
    NoSession,

    #[error("invalid session")]
    InvalidSession,

    #[error("session expired")]
    SessionExpired,

    #[error("user not found for session")]
    AccountMissing,

    #[error(transparent)]
    Storage(#[from] DatabaseError),
}

/// Outcome of a successful authentication.
#[derive(Debug, Clone)]
pub struct Authenticated {
    /// The session after sliding.
    pub session: Session,
    pub account: Account,
    /// Refreshed session cookie to attach to the response.
    pub cookie: ResponseCookie,
}

/// Creates, validates, slides and revokes sessions.
pub struct SessionManager {
    sessions: Arc<dyn SessionStore>,
    accounts: Arc<dyn AccountStore>,
    clock: Arc<dyn Clock>,
    cookies: CookieSettings,
    lifetime: Duration,
}

impl SessionManager {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        accounts: Arc<dyn AccountStore>,
        clock: Arc<dyn Clock>,
        cookies: CookieSettings,
    ) -> Self {
        Self {
            sessions,
            accounts,
            clock,
            cookies,
            lifetime: Duration::seconds(SESSION_LIFETIME_SECS),
        }
    }

    /// Start a session for an account.
    pub async fn create(&self, account_id: &str) -> Result<Session, SessionError> {
        let session = Session::new(
            generate_token(),
            account_id.to_string(),
            self.clock.now() + self.lifetime,
        );
        self.sessions.insert(&session).await?;

        info!("Created session for account {}", account_id);
        Ok(session)
    }

    /// Cookie carrying `session`.
    pub fn cookie(&self, session: &Session) -> ResponseCookie {
        ResponseCookie::new(
            self.cookies,
            SESSION_COOKIE_NAME,
            session.id.clone(),
            self.lifetime.num_seconds(),
            true,
        )
    }

    /// Cookie that removes the session cookie from the browser.
    pub fn clear_cookie(&self) -> ResponseCookie {
        ResponseCookie::cleared(self.cookies, SESSION_COOKIE_NAME, true)
    }

    /// Resolve the request's session cookie into an identity and slide the
    /// session.
    ///
    /// The slide is best effort: when persisting the new expiry fails the
    /// request is still authenticated and the refreshed cookie is still
    /// returned.
    pub async fn authenticate(&self, jar: &CookieJar) -> Result<Authenticated, SessionError> {
        let session_id = jar
            .get(SESSION_COOKIE_NAME)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(SessionError::NoSession)?;

        let mut session = self
            .sessions
            .find(&session_id)
            .await
            .inspect_err(|e| error!("Auth: failed to load session: {}", e))?
            .ok_or(SessionError::InvalidSession)?;

        let now = self.clock.now();
        if !session.is_live(now) {
            return Err(SessionError::SessionExpired);
        }

        let account = self
            .accounts
            .find_by_id(&session.user_id)
            .await
            .inspect_err(|e| error!("Auth: failed to load account for session: {}", e))?
            .ok_or_else(|| {
                error!(
                    "Auth: session references missing account {}",
                    session.user_id
                );
                SessionError::AccountMissing
            })?;

        let new_expiry = self.slide_target(now, session.expiry());
        match self.sessions.update_expiry(&session.id, new_expiry).await {
            Ok(true) => {}
            Ok(false) => warn!("Auth: session disappeared while sliding"),
            Err(e) => error!("Auth: failed to slide session: {}", e),
        }
        session = Session::new(session.id, session.user_id, new_expiry);

        let cookie = self.cookie(&session);
        Ok(Authenticated {
            session,
            account,
            cookie,
        })
    }

    /// Expiry never moves backwards, even if the clock does.
    fn slide_target(&self, now: DateTime<Utc>, current: Option<DateTime<Utc>>) -> DateTime<Utc> {
        let slid = now + self.lifetime;
        current.map_or(slid, |current| slid.max(current))
    }

    /// Delete a session. Deleting an absent id is not an error.
    pub async fn revoke(&self, session_id: &str) -> Result<(), SessionError> {
        if self.sessions.delete(session_id).await? {
            info!("Revoked session");
        }
        Ok(())
    }
}
