//! Session model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::timestamp;

/// Session entity
///
/// `expires_at` is kept as stored; a value that does not parse counts as
/// already expired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub expires_at: String,
}

impl Session {
    pub fn new(id: String, user_id: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            expires_at: timestamp::format(expires_at),
        }
    }

    /// Parsed expiry, `None` when the stored value is unparsable.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        timestamp::parse(&self.expires_at)
    }

    /// Live sessions have a parsable expiry strictly after `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expiry().is_some_and(|expiry| expiry > now)
    }
}
