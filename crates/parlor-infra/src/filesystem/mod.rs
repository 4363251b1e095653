//! Filesystem adapters for Parlor.
//!
//! Resolves the data directory and implements the `SessionStore` trait from
//! `parlor-core` on top of a single JSON file.

pub mod session;

use std::path::{Path, PathBuf};

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `PARLOR_DATA_DIR` environment variable
/// 2. `~/.parlor`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PARLOR_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".parlor");
    }

    // Last resort: current directory
    PathBuf::from(".parlor")
}

/// Path of the session slot inside a data directory.
pub fn session_path(data_dir: &Path) -> PathBuf {
    data_dir.join("session.json")
}

/// Path of the configuration file inside a data directory.
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_layout() {
        let data_dir = PathBuf::from("/home/user/.parlor");
        assert_eq!(
            session_path(&data_dir),
            PathBuf::from("/home/user/.parlor/session.json")
        );
        assert_eq!(
            config_path(&data_dir),
            PathBuf::from("/home/user/.parlor/config.toml")
        );
    }

    #[test]
    fn test_resolve_data_dir_from_env() {
        // SAFETY: This test is single-threaded and restores the env var immediately.
        unsafe {
            std::env::set_var("PARLOR_DATA_DIR", "/tmp/test-parlor");
        }
        let dir = resolve_data_dir();
        assert_eq!(dir, PathBuf::from("/tmp/test-parlor"));
        unsafe {
            std::env::remove_var("PARLOR_DATA_DIR");
        }
    }
}
