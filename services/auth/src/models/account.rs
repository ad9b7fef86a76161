//! Account model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Row, sqlite::SqliteRow};
use std::{fmt, str::FromStr};

use crate::timestamp;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored role is neither `user` nor `admin`.
#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Whether the account has proven control of its email address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationState {
    Unverified,
    Verified,
}

/// Account entity
///
/// Timestamps are the raw stored RFC-3339 strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
    pub program_id: i64,
    pub verified: bool,
    pub verification_token: Option<String>,
    pub verified_at: Option<String>,
    pub verified_until: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Account {
    pub fn verification_state(&self) -> VerificationState {
        if self.verified {
            VerificationState::Verified
        } else {
            VerificationState::Unverified
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// True when a re-verification horizon exists and has passed.
    ///
    /// Informational only: login gates on [`Account::verification_state`]
    /// and does not demote lapsed accounts.
    pub fn verification_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.verified_until
            .as_deref()
            .and_then(timestamp::parse)
            .is_some_and(|until| until <= now)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Account {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        let role = role.parse().map_err(|e| sqlx::Error::ColumnDecode {
            index: "role".to_string(),
            source: Box::new(e),
        })?;

        Ok(Account {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            password_hash: row.try_get("password")?,
            role,
            active: row.try_get("active")?,
            program_id: row.try_get("program_id")?,
            verified: row.try_get("verified")?,
            verification_token: row.try_get("verification_token")?,
            verified_at: row.try_get("verified_at")?,
            verified_until: row.try_get("verified_until")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// New account creation payload
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub id: String,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
    pub program_id: i64,
    pub verification_token: String,
}

/// Public view of an account. Never carries the password hash or the
/// verification token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub active: bool,
    pub programid: i64,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored timestamp on an account row could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("could not parse {field} of account {account_id}: {value:?}")]
pub struct InvalidTimestamp {
    pub account_id: String,
    pub field: &'static str,
    pub value: String,
}

impl TryFrom<&Account> for AccountResponse {
    type Error = InvalidTimestamp;

    fn try_from(account: &Account) -> Result<Self, Self::Error> {
        let required = |field: &'static str, value: &str| {
            timestamp::parse(value).ok_or_else(|| InvalidTimestamp {
                account_id: account.id.clone(),
                field,
                value: value.to_string(),
            })
        };
        let optional = |field: &'static str, value: &Option<String>| {
            value.as_deref().map(|raw| required(field, raw)).transpose()
        };

        Ok(AccountResponse {
            id: account.id.clone(),
            email: account.email.clone(),
            name: account.name.clone(),
            role: account.role,
            active: account.active,
            programid: account.program_id,
            verified: account.verified,
            verified_at: optional("verified_at", &account.verified_at)?,
            verified_until: optional("verified_until", &account.verified_until)?,
            created_at: required("created_at", &account.created_at)?,
            updated_at: required("updated_at", &account.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn account() -> Account {
        Account {
            id: "a1".to_string(),
            email: "ada@studmail.w-hs.de".to_string(),
            name: "Ada".to_string(),
            password_hash: "$argon2id$...".to_string(),
            role: Role::User,
            active: true,
            program_id: 3,
            verified: true,
            verification_token: None,
            verified_at: Some("2025-02-01T10:00:00Z".to_string()),
            verified_until: Some("2025-03-01T00:00:00Z".to_string()),
            created_at: "2025-01-31T09:00:00Z".to_string(),
            updated_at: "2025-02-01T10:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_role_round_trips_through_str() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::User.to_string(), "user");
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_response_omits_secrets_and_parses_timestamps() {
        let response = AccountResponse::try_from(&account()).unwrap();
        assert_eq!(
            response.verified_until,
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap())
        );

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("verification_token").is_none());
        assert_eq!(json["role"], "user");
        assert_eq!(json["programid"], 3);
    }

    #[test]
    fn test_response_rejects_unparsable_timestamps() {
        let mut broken = account();
        broken.created_at = "yesterday".to_string();
        let err = AccountResponse::try_from(&broken).unwrap_err();
        assert_eq!(err.field, "created_at");
    }

    #[test]
    fn test_lapse_is_reported_but_state_stays_verified() {
        let account = account();
        let after = Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap();
        assert!(account.verification_lapsed(after));
        assert_eq!(account.verification_state(), VerificationState::Verified);
    }
}
