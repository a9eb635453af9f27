//! Command implementations, one module per top-level command.

pub mod config;
pub mod export;
pub mod limits;
pub mod puzzle;
pub mod reset;
pub mod stats;
pub mod timer;
pub mod track;
pub mod usage;

use std::error::Error;
use std::sync::Arc;

use braindetox_core::{Config, DetoxService, LogNotifier, SqliteStore};

/// Open the SQLite store and assemble a service around it. One-shot
/// commands use a silent notifier; `track` wires its own.
pub fn open_service() -> Result<DetoxService, Box<dyn Error>> {
    let config = Config::load_or_default();
    let store = Arc::new(SqliteStore::open()?);
    Ok(DetoxService::new(
        config,
        store,
        Arc::new(LogNotifier::new(false)),
    ))
}
