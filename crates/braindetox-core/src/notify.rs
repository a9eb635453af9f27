//! Notification boundary.
//!
//! The core decides *when* a warning or breach should surface; delivery
//! (console, OS notification center, ...) is an implementation of
//! [`LimitNotifier`] supplied by the embedding front-end.

use tracing::warn;

use crate::timer::format_human;

/// Receives limit events emitted by the tracker.
pub trait LimitNotifier: Send + Sync {
    /// Usage crossed the pre-breach warning threshold.
    fn warn(&self, app_id: &str, remaining_ms: u64);
    /// Usage reached or exceeded the daily limit.
    fn breach(&self, app_id: &str);
}

/// Log-backed notifier, the default delivery when nothing richer is
/// wired up. Honours the `[notifications] enabled` switch.
pub struct LogNotifier {
    enabled: bool,
}

impl LogNotifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl LimitNotifier for LogNotifier {
    fn warn(&self, app_id: &str, remaining_ms: u64) {
        if self.enabled {
            warn!(
                app_id = %app_id,
                remaining = %format_human(remaining_ms),
                "approaching daily limit"
            );
        }
    }

    fn breach(&self, app_id: &str) {
        if self.enabled {
            warn!(app_id = %app_id, "daily limit reached");
        }
    }
}
