//! Usage ledger: accumulates foreground time per app per local calendar day.
//!
//! Day records are stored under `usage:<ISO date>` keys and created lazily
//! on first write. All durations are integer milliseconds. Reads degrade to
//! "no data" on storage failure; only writes surface errors to the caller.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Days, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StorageError;
use crate::storage::KvStore;

/// Storage key prefix for day records.
pub const USAGE_KEY_PREFIX: &str = "usage:";

/// Storage key for a day record, e.g. `usage:2026-08-26`.
pub fn usage_key(date: NaiveDate) -> String {
    format!("{USAGE_KEY_PREFIX}{}", date.format("%Y-%m-%d"))
}

/// Accumulated usage of one app on one day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub time_spent_ms: u64,
    pub sessions: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

/// One day's per-app usage map.
pub type DayUsage = HashMap<String, UsageRecord>;

/// Totals for one calendar day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub total_time_ms: u64,
    pub total_sessions: u32,
    pub apps: DayUsage,
}

/// Mean daily usage over the last seven days. Days without data count
/// as zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyAverage {
    pub average_time_ms: f64,
    pub average_sessions: f64,
    pub total_time_ms: u64,
    pub total_sessions: u32,
}

/// Per-app totals over a window, for ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppTotal {
    pub app_id: String,
    pub time_spent_ms: u64,
    pub sessions: u32,
}

/// Append-only usage accounting over a key/value store.
pub struct UsageLedger {
    store: Arc<dyn KvStore>,
}

impl UsageLedger {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Add a closed session to today's record for `app_id`.
    ///
    /// Accumulates `time_spent_ms`, bumps the session count and stamps
    /// `last_used`. A zero-length session still counts one session.
    /// Returns the updated record.
    ///
    /// # Errors
    /// Returns an error if the write fails; nothing was recorded in that
    /// case.
    pub fn record_session(
        &self,
        app_id: &str,
        time_spent_ms: u64,
    ) -> Result<UsageRecord, StorageError> {
        self.record_session_on(today(), app_id, time_spent_ms)
    }

    /// Date-explicit variant of [`UsageLedger::record_session`] (backfill,
    /// tests).
    pub fn record_session_on(
        &self,
        date: NaiveDate,
        app_id: &str,
        time_spent_ms: u64,
    ) -> Result<UsageRecord, StorageError> {
        let key = usage_key(date);
        let mut day = self.read_day(&key);
        let record = day.entry(app_id.to_string()).or_default();
        record.time_spent_ms += time_spent_ms;
        record.sessions += 1;
        record.last_used = Some(Utc::now());
        let updated = record.clone();
        self.store.set(&key, &serde_json::to_value(&day)?)?;
        Ok(updated)
    }

    /// Today's record for `app_id`, zero-valued when absent.
    pub fn today_usage(&self, app_id: &str) -> UsageRecord {
        self.app_usage_for_date(today(), app_id)
    }

    /// The full per-app map for a date; empty when absent.
    pub fn usage_for_date(&self, date: NaiveDate) -> DayUsage {
        self.read_day(&usage_key(date))
    }

    /// One app's record for a date, zero-valued when absent.
    pub fn app_usage_for_date(&self, date: NaiveDate, app_id: &str) -> UsageRecord {
        self.usage_for_date(date).remove(app_id).unwrap_or_default()
    }

    /// Day summaries for the last `days` days ending today, oldest first.
    /// Days without data appear as zero summaries.
    pub fn stats_for_last_n_days(&self, days: u32) -> Vec<DaySummary> {
        let today = today();
        let mut out = Vec::with_capacity(days as usize);
        for offset in (0..days).rev() {
            let date = today - Days::new(u64::from(offset));
            let apps = self.usage_for_date(date);
            let total_time_ms = apps.values().map(|r| r.time_spent_ms).sum();
            let total_sessions = apps.values().map(|r| r.sessions).sum();
            out.push(DaySummary {
                date,
                total_time_ms,
                total_sessions,
                apps,
            });
        }
        out
    }

    /// Mean daily time and sessions over the last seven days.
    pub fn weekly_average(&self) -> WeeklyAverage {
        let stats = self.stats_for_last_n_days(7);
        let total_time_ms: u64 = stats.iter().map(|d| d.total_time_ms).sum();
        let total_sessions: u32 = stats.iter().map(|d| d.total_sessions).sum();
        WeeklyAverage {
            average_time_ms: total_time_ms as f64 / 7.0,
            average_sessions: f64::from(total_sessions) / 7.0,
            total_time_ms,
            total_sessions,
        }
    }

    /// Apps ranked by total time over the last `days` days, descending,
    /// ties broken by app id, truncated to `limit`.
    pub fn most_used_apps(&self, days: u32, limit: usize) -> Vec<AppTotal> {
        let mut totals: HashMap<String, AppTotal> = HashMap::new();
        for summary in self.stats_for_last_n_days(days) {
            for (app_id, record) in summary.apps {
                let entry = totals.entry(app_id.clone()).or_insert_with(|| AppTotal {
                    app_id,
                    time_spent_ms: 0,
                    sessions: 0,
                });
                entry.time_spent_ms += record.time_spent_ms;
                entry.sessions += record.sessions;
            }
        }
        let mut ranked: Vec<AppTotal> = totals.into_values().collect();
        ranked.sort_by(|a, b| {
            b.time_spent_ms
                .cmp(&a.time_spent_ms)
                .then_with(|| a.app_id.cmp(&b.app_id))
        });
        ranked.truncate(limit);
        ranked
    }

    /// Remove every day record. Limits and other keys are untouched.
    pub fn clear_all(&self) -> Result<(), StorageError> {
        for key in self.store.list_keys(USAGE_KEY_PREFIX)? {
            self.store.remove(&key)?;
        }
        Ok(())
    }

    fn read_day(&self, key: &str) -> DayUsage {
        match self.store.get(key) {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(day) => day,
                Err(e) => {
                    warn!(key, error = %e, "corrupt day record, reading as empty");
                    DayUsage::new()
                }
            },
            Ok(None) => DayUsage::new(),
            Err(e) => {
                warn!(key, error = %e, "usage read failed, reading as empty");
                DayUsage::new()
            }
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
