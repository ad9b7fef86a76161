//! Email verification token lifecycle
//!
//! An account starts `Unverified` holding a single-use token. Redeeming the
//! token clears it, stamps `verified_at` and sets `verified_until` from the
//! email domain as it is at redemption time:
//!
//! - student mail: the next of the two yearly re-enrollment cut-overs
//!   (1 March and 1 October, 00:00 UTC);
//! - organisation mail: no expiry;
//! - anything else: no expiry.
//!
//! A lapsed `verified_until` is not acted upon here.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use common::error::DatabaseError;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    clock::Clock,
    models::Account,
    repositories::AccountStore,
    tokens::generate_token,
};

/// Verification lifecycle errors
#[derive(Debug, Error)]
pub enum VerificationError {
    /// No account holds the token (unknown or already redeemed)
    #[error("invalid or expired verification token")]
    InvalidToken,

    /// The account does not exist or is already verified
    #[error("account {0} is not awaiting verification")]
    NotPending(String),

    #[error(transparent)]
    Storage(#[from] DatabaseError),
}

/// Cut-over (month, day) pairs, in calendar order.
const CUTOVERS: [(u32, u32); 2] = [(3, 1), (10, 1)];

/// The first cut-over strictly after `now`.
pub fn next_cutover(now: DateTime<Utc>) -> DateTime<Utc> {
    let at = |year: i32, (month, day): (u32, u32)| {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive))
    };

    CUTOVERS
        .iter()
        .filter_map(|&cutover| at(now.year(), cutover))
        .find(|&cutover| now < cutover)
        .or_else(|| at(now.year() + 1, CUTOVERS[0]))
        .unwrap_or(now)
}

/// Which verification rule an address falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailDomain {
    Student,
    Organisation,
    Other,
}

/// Domain-dependent verification horizon.
#[derive(Debug, Clone)]
pub struct VerificationPolicy {
    student_suffix: String,
    org_suffix: String,
}

impl VerificationPolicy {
    pub fn new(student_suffix: &str, org_suffix: &str) -> Self {
        Self {
            student_suffix: student_suffix.to_lowercase(),
            org_suffix: org_suffix.to_lowercase(),
        }
    }

    pub fn classify(&self, email: &str) -> MailDomain {
        let email = email.to_lowercase();
        if email.ends_with(&self.student_suffix) {
            MailDomain::Student
        } else if email.ends_with(&self.org_suffix) {
            MailDomain::Organisation
        } else {
            MailDomain::Other
        }
    }

    /// `None` means verified without expiry.
    pub fn verified_until(&self, email: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.classify(email) {
            MailDomain::Student => Some(next_cutover(now)),
            // Unlisted domains verify once, like the organisation domain.
            MailDomain::Organisation | MailDomain::Other => None,
        }
    }
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self::new("@studmail.w-hs.de", "@fachschaftinformatik.de")
    }
}

/// Issues and redeems verification tokens.
pub struct VerificationService {
    accounts: Arc<dyn AccountStore>,
    clock: Arc<dyn Clock>,
    policy: VerificationPolicy,
}

impl VerificationService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        clock: Arc<dyn Clock>,
        policy: VerificationPolicy,
    ) -> Self {
        Self {
            accounts,
            clock,
            policy,
        }
    }

    /// Token for a brand-new account, stored with the account row itself.
    pub fn new_token(&self) -> String {
        generate_token()
    }

    /// Replace the account's outstanding token with a fresh one.
    pub async fn issue(&self, account_id: &str) -> Result<String, VerificationError> {
        let token = generate_token();
        let replaced = self
            .accounts
            .set_verification_token(account_id, &token, self.clock.now())
            .await?;

        if !replaced {
            return Err(VerificationError::NotPending(account_id.to_string()));
        }

        info!("Issued verification token for account {}", account_id);
        Ok(token)
    }

    /// Consume a token and verify its account.
    pub async fn redeem(&self, token: &str) -> Result<Account, VerificationError> {
        if token.is_empty() {
            return Err(VerificationError::InvalidToken);
        }

        let account = self
            .accounts
            .find_by_verification_token(token)
            .await?
            .ok_or(VerificationError::InvalidToken)?;

        let now = self.clock.now();
        let verified_until = self.policy.verified_until(&account.email, now);

        if !self
            .accounts
            .mark_verified(&account.id, token, now, verified_until)
            .await?
        {
            warn!("Verification token for {} was consumed concurrently", account.id);
            return Err(VerificationError::InvalidToken);
        }

        info!(
            "Verified account {} until {}",
            account.id,
            verified_until.map_or_else(|| "forever".to_string(), |until| until.to_rfc3339())
        );

        self.accounts
            .find_by_id(&account.id)
            .await?
            .ok_or(VerificationError::InvalidToken)
    }
}
