//! Password hashing and verification

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use thiserror::Error;
use tracing::warn;

/// Credential store errors
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The work factor is outside what Argon2 accepts
    #[error("invalid hashing parameters: {0}")]
    InvalidParameters(String),

    /// Hashing itself failed (allocation or parameter failure)
    #[error("failed to hash password: {0}")]
    HashingFailure(String),
}

/// Argon2id password hasher with a fixed work factor.
#[derive(Clone)]
pub struct CredentialStore {
    params: Params,
    /// Hash checked when the account does not exist, so unknown emails cost
    /// as much as wrong passwords.
    dummy_hash: Arc<str>,
    verifications: Arc<AtomicU64>,
}

impl CredentialStore {
    /// Build a hasher with the given memory cost (KiB) and iteration count.
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self, CredentialError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| CredentialError::InvalidParameters(e.to_string()))?;

        let mut store = Self {
            params,
            dummy_hash: Arc::from(""),
            verifications: Arc::default(),
        };
        store.dummy_hash = Arc::from(store.hash("unknown-account")?);
        Ok(store)
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh salt. Any string is accepted, including
    /// the empty string.
    pub fn hash(&self, password: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        self.hasher()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CredentialError::HashingFailure(e.to_string()))
    }

    /// Check a password against a stored PHC hash string.
    ///
    /// A malformed stored hash is logged and treated as a mismatch.
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        self.verifications.fetch_add(1, Ordering::Relaxed);

        let parsed_hash = match PasswordHash::new(stored_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Stored password hash is malformed: {}", e);
                return false;
            }
        };

        // Parameters come from the stored hash, so older work factors still verify.
        self.hasher()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Spend a full verification on a login for an unknown account. Always a
    /// mismatch.
    pub fn verify_unknown(&self, password: &str) -> bool {
        let _ = self.verify(password, &self.dummy_hash);
        false
    }

    /// Number of password verifications run so far, real or dummy.
    pub fn verifications(&self) -> u64 {
        self.verifications.load(Ordering::Relaxed)
    }

    /// [`CredentialStore::hash`] on the blocking pool.
    pub async fn hash_blocking(&self, password: String) -> Result<String, CredentialError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.hash(&password))
            .await
            .map_err(|e| CredentialError::HashingFailure(e.to_string()))?
    }

    /// [`CredentialStore::verify`] on the blocking pool. A panicked worker
    /// counts as a mismatch.
    pub async fn verify_blocking(&self, password: String, stored_hash: String) -> bool {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.verify(&password, &stored_hash))
            .await
            .unwrap_or(false)
    }

    /// [`CredentialStore::verify_unknown`] on the blocking pool.
    pub async fn verify_unknown_blocking(&self, password: String) {
        let store = self.clone();
        let _ = tokio::task::spawn_blocking(move || store.verify_unknown(&password)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CredentialStore {
        CredentialStore::new(1024, 1).expect("test parameters")
    }

    #[test]
    fn test_hash_then_verify() {
        let store = store();
        let hash = store.hash("correct horse battery staple").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(store.verify("correct horse battery staple", &hash));
        assert!(!store.verify("Correct horse battery staple", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let store = store();
        assert_ne!(store.hash("pw").unwrap(), store.hash("pw").unwrap());
    }

    #[test]
    fn test_empty_and_long_inputs_are_hashed() {
        let store = store();
        let empty = store.hash("").unwrap();
        assert!(store.verify("", &empty));

        let long = "x".repeat(10_000);
        let hash = store.hash(&long).unwrap();
        assert!(store.verify(&long, &hash));
    }

    #[test]
    fn test_malformed_hash_is_a_mismatch() {
        let store = store();
        assert!(!store.verify("pw", ""));
        assert!(!store.verify("pw", "$2a$10$notargon"));
    }

    #[test]
    fn test_invalid_parameters_are_rejected() {
        assert!(matches!(
            CredentialStore::new(1, 0),
            Err(CredentialError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_unknown_account_runs_a_real_verification() {
        let store = store();
        assert!(store.dummy_hash.starts_with("$argon2id$v=19$m=1024,t=1,p=1$"));

        let before = store.verifications();
        assert!(!store.verify_unknown("unknown-account"));
        assert!(!store.verify_unknown("anything"));
        assert_eq!(store.verifications(), before + 2);
    }

    #[test]
    fn test_clones_share_the_verification_count() {
        let store = store();
        let clone = store.clone();
        clone.verify("pw", "");
        assert_eq!(store.verifications(), 1);
    }

    #[tokio::test]
    async fn test_blocking_helpers_agree_with_sync_versions() {
        let store = store();
        let hash = store.hash_blocking("pw".to_string()).await.unwrap();
        assert!(store.verify_blocking("pw".to_string(), hash.clone()).await);
        assert!(!store.verify_blocking("nope".to_string(), hash).await);

        let before = store.verifications();
        store.verify_unknown_blocking("pw".to_string()).await;
        assert_eq!(store.verifications(), before + 1);
    }
}
