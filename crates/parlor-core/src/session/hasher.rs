//! CredentialHasher trait for password storage.
//!
//! Defined in parlor-core so `SessionService` can hash and verify passwords
//! without coupling to a specific algorithm. The `Argon2CredentialHasher`
//! adapter lives in parlor-infra.

use parlor_types::error::SessionError;

/// Abstraction over password hashing.
pub trait CredentialHasher: Send + Sync {
    /// Produce a self-describing hash string (salt and parameters included).
    fn hash_password(&self, password: &str) -> Result<String, SessionError>;

    /// Whether `password` matches `hash`. Malformed hashes never match.
    fn verify_password(&self, password: &str, hash: &str) -> bool;
}
