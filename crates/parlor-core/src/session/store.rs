//! SessionStore trait for persisting the current session between runs.
//!
//! Defined in parlor-core so `SessionService` can persist the signed-in
//! identity without depending on any storage medium. The file-backed
//! `FileSessionStore` adapter lives in parlor-infra.

/// A single slot holding the serialized session payload.
pub trait SessionStore: Send + Sync {
    /// Read the stored payload. `Ok(None)` when nothing is stored.
    fn load(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<String>, std::io::Error>> + Send;

    /// Replace the stored payload.
    fn save(
        &self,
        payload: &str,
    ) -> impl std::future::Future<Output = Result<(), std::io::Error>> + Send;

    /// Remove the stored payload. Clearing an empty slot is not an error.
    fn clear(&self) -> impl std::future::Future<Output = Result<(), std::io::Error>> + Send;
}
