//! Application state shared across handlers

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::{
    clock::Clock,
    config::Settings,
    cookies::CookieSettings,
    credentials::{CredentialError, CredentialStore},
    csrf::CsrfGuard,
    mailer::Outbox,
    repositories::{
        AccountRepository, AccountStore, ProgramRepository, ProgramStore, SessionRepository,
        SessionStore,
    },
    session::SessionManager,
    verification::{VerificationPolicy, VerificationService},
};

/// Public origins used to build links and redirects.
#[derive(Debug, Clone)]
pub struct Links {
    /// Frontend origin
    pub public_url: String,
    /// Origin of this service
    pub domain: String,
}

impl Links {
    /// Where the browser lands after a successful verification.
    pub fn verified_redirect(&self) -> String {
        format!("{}/login?verified=true", self.public_url.trim_end_matches('/'))
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub accounts: Arc<dyn AccountStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub programs: Arc<dyn ProgramStore>,
    pub credentials: CredentialStore,
    pub verification: Arc<VerificationService>,
    pub session_manager: Arc<SessionManager>,
    pub csrf: CsrfGuard,
    pub outbox: Outbox,
    pub links: Links,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wire every component onto the SQLite repositories.
    pub fn new(
        pool: SqlitePool,
        settings: &Settings,
        clock: Arc<dyn Clock>,
        outbox: Outbox,
    ) -> Result<Self, CredentialError> {
        let accounts: Arc<dyn AccountStore> = Arc::new(AccountRepository::new(pool.clone()));
        let sessions: Arc<dyn SessionStore> = Arc::new(SessionRepository::new(pool.clone()));
        let programs: Arc<dyn ProgramStore> = Arc::new(ProgramRepository::new(pool.clone()));

        let cookies = CookieSettings {
            secure: settings.secure_cookies,
        };
        let credentials =
            CredentialStore::new(settings.argon2_memory_kib, settings.argon2_iterations)?;
        let verification = VerificationService::new(
            accounts.clone(),
            clock.clone(),
            VerificationPolicy::new(&settings.student_mail_suffix, &settings.org_mail_suffix),
        );
        let session_manager =
            SessionManager::new(sessions.clone(), accounts.clone(), clock.clone(), cookies);

        Ok(Self {
            db_pool: pool,
            accounts,
            sessions,
            programs,
            credentials,
            verification: Arc::new(verification),
            session_manager: Arc::new(session_manager),
            csrf: CsrfGuard::new(cookies),
            outbox,
            links: Links {
                public_url: settings.public_url.clone(),
                domain: settings.domain.clone(),
            },
            clock,
        })
    }
}
