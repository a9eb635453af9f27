//! Persistence: key/value contract, backends, configuration.

mod config;
pub mod kv;
pub mod sqlite;

pub use config::{Config, LimitsConfig, NotificationsConfig, PuzzlesConfig, TrackingConfig};
pub use kv::{KvStore, MemoryStore};
pub use sqlite::SqliteStore;

use std::path::PathBuf;

use crate::error::StorageError;

/// Returns `~/.config/braindetox[-dev]/` based on BRAINDETOX_ENV.
///
/// Set BRAINDETOX_ENV=dev to use the development data directory, or
/// BRAINDETOX_DATA_DIR to point somewhere else entirely (tests use this
/// with a temp dir).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    if let Ok(dir) = std::env::var("BRAINDETOX_DATA_DIR") {
        let dir = PathBuf::from(dir);
        std::fs::create_dir_all(&dir)?;
        return Ok(dir);
    }

    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("BRAINDETOX_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("braindetox-dev")
    } else {
        base_dir.join("braindetox")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
