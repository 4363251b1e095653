//! Argon2id password hashing.
//!
//! Implements the `CredentialHasher` trait from `parlor-core`. Hashes are PHC
//! strings (`$argon2id$v=19$...`) that carry their own salt and parameters, so
//! verification never needs anything besides the stored string.
//!
//! SECURITY: Error values never contain the password.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use parlor_core::session::hasher::CredentialHasher;
use parlor_types::error::SessionError;

/// Argon2id implementation of `CredentialHasher`.
///
/// Uses OWASP recommended parameters:
/// - 19 MiB memory (19456 KiB)
/// - 2 iterations
/// - 1 parallelism degree
pub struct Argon2CredentialHasher {
    argon2: Argon2<'static>,
}

impl Argon2CredentialHasher {
    /// Create a hasher with the default parameters.
    pub fn new() -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default()),
        }
    }
}

impl Default for Argon2CredentialHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialHasher for Argon2CredentialHasher {
    fn hash_password(&self, password: &str) -> Result<String, SessionError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| SessionError::Hashing(e.to_string()))
    }

    fn verify_password(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            tracing::warn!("Stored password hash is malformed");
            return false;
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_phc_argon2id() {
        let hasher = Argon2CredentialHasher::new();
        let hash = hasher.hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2id$v=19$"));
        assert!(!hash.contains("hunter2"));
    }

    #[test]
    fn test_verify_accepts_only_matching_password() {
        let hasher = Argon2CredentialHasher::new();
        let hash = hasher.hash_password("hunter2").unwrap();
        assert!(hasher.verify_password("hunter2", &hash));
        assert!(!hasher.verify_password("hunter3", &hash));
        assert!(!hasher.verify_password("", &hash));
    }

    #[test]
    fn test_same_password_gets_fresh_salt() {
        let hasher = Argon2CredentialHasher::new();
        let a = hasher.hash_password("same").unwrap();
        let b = hasher.hash_password("same").unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify_password("same", &a));
        assert!(hasher.verify_password("same", &b));
    }

    #[test]
    fn test_malformed_hash_never_matches() {
        let hasher = Argon2CredentialHasher::new();
        assert!(!hasher.verify_password("anything", "not-a-phc-string"));
        assert!(!hasher.verify_password("", ""));
    }
}
