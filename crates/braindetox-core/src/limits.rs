//! Per-app daily usage limits.
//!
//! Limits live in memory as the source of truth and are persisted under
//! one key as a durability backstop. Evaluation always compares against
//! today's ledger record; the comparison is boundary inclusive, so
//! reaching the limit exactly counts as exceeded.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, StorageError, ValidationError};
use crate::storage::KvStore;
use crate::usage::UsageLedger;

/// Storage key for the limit map.
pub const LIMITS_KEY: &str = "limits";

/// A configured daily limit for one app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitConfig {
    pub time_limit_ms: u64,
}

/// Daily limit policy over the ledger.
pub struct LimitPolicy {
    store: Arc<dyn KvStore>,
    ledger: Arc<UsageLedger>,
    limits: RwLock<HashMap<String, LimitConfig>>,
}

impl LimitPolicy {
    /// Create a policy over `store`, pulling the persisted map in
    /// immediately. [`LimitPolicy::load`] re-syncs on demand.
    pub fn new(store: Arc<dyn KvStore>, ledger: Arc<UsageLedger>) -> Self {
        let policy = Self {
            store,
            ledger,
            limits: RwLock::new(HashMap::new()),
        };
        policy.load();
        policy
    }

    /// Load persisted limits into memory and return them.
    ///
    /// A missing, unreadable or corrupt map degrades to empty and is
    /// logged; loading never fails.
    pub fn load(&self) -> HashMap<String, LimitConfig> {
        let loaded: HashMap<String, LimitConfig> = match self.store.get(LIMITS_KEY) {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(map) => map,
                Err(e) => {
                    warn!(error = %e, "corrupt limit map, starting empty");
                    HashMap::new()
                }
            },
            Ok(None) => HashMap::new(),
            Err(e) => {
                warn!(error = %e, "limit load failed, starting empty");
                HashMap::new()
            }
        };
        debug!(count = loaded.len(), "limits loaded");
        *self.write() = loaded.clone();
        loaded
    }

    /// Configure (or replace) the daily limit for `app_id`.
    ///
    /// Memory is updated first; a failed backstop write still returns the
    /// error so front-ends can report "not durable".
    ///
    /// # Errors
    /// Rejects an empty `app_id` or a zero `time_limit_ms`.
    pub fn set_limit(&self, app_id: &str, time_limit_ms: u64) -> Result<(), CoreError> {
        if app_id.is_empty() {
            return Err(ValidationError::invalid("app_id", "app id must not be empty").into());
        }
        if time_limit_ms == 0 {
            return Err(ValidationError::invalid("time_limit_ms", "limit must be positive").into());
        }
        let snapshot = {
            let mut limits = self.write();
            limits.insert(app_id.to_string(), LimitConfig { time_limit_ms });
            limits.clone()
        };
        debug!(app_id = %app_id, time_limit_ms, "limit set");
        self.persist(&snapshot)?;
        Ok(())
    }

    /// Remove the limit for `app_id`. Absent ids are a no-op.
    pub fn remove_limit(&self, app_id: &str) -> Result<(), CoreError> {
        let snapshot = {
            let mut limits = self.write();
            if limits.remove(app_id).is_none() {
                return Ok(());
            }
            limits.clone()
        };
        debug!(app_id = %app_id, "limit removed");
        self.persist(&snapshot)?;
        Ok(())
    }

    /// Whether today's usage has reached the configured limit.
    ///
    /// `false` when no limit is configured; equality counts as exceeded.
    pub fn is_exceeded(&self, app_id: &str) -> bool {
        let Some(limit) = self.limit_for(app_id) else {
            return false;
        };
        self.ledger.today_usage(app_id).time_spent_ms >= limit.time_limit_ms
    }

    /// Milliseconds left under the limit today.
    ///
    /// `None` means unlimited (no limit configured) and is distinct from
    /// `Some(0)`, an exhausted limit.
    pub fn remaining_ms(&self, app_id: &str) -> Option<u64> {
        let limit = self.limit_for(app_id)?;
        let used = self.ledger.today_usage(app_id).time_spent_ms;
        Some(limit.time_limit_ms.saturating_sub(used))
    }

    pub fn limit_for(&self, app_id: &str) -> Option<LimitConfig> {
        self.read().get(app_id).copied()
    }

    /// Snapshot of the in-memory limit map.
    pub fn all_limits(&self) -> HashMap<String, LimitConfig> {
        self.read().clone()
    }

    /// Drop every limit and persist the empty map.
    pub fn clear_all(&self) -> Result<(), CoreError> {
        self.write().clear();
        self.persist(&HashMap::new())?;
        Ok(())
    }

    fn persist(&self, limits: &HashMap<String, LimitConfig>) -> Result<(), StorageError> {
        self.store.set(LIMITS_KEY, &serde_json::to_value(limits)?)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, LimitConfig>> {
        self.limits.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, LimitConfig>> {
        self.limits.write().unwrap_or_else(|e| e.into_inner())
    }
}
