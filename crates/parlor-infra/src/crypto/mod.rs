//! Cryptographic operations for Parlor.
//!
//! - `password`: Argon2id password hashing for stored credentials

pub mod password;
