//! High-level facade wiring the detox subsystems together.
//!
//! Front-ends construct one [`DetoxService`] around a store and a
//! notifier and drive everything through it instead of assembling the
//! ledger, policy, tracker and timers by hand.
//!
//! ```text
//!                 ┌──────────────┐
//!   foreground ──▶│ UsageTracker │──▶ UsageLedger ──▶ KvStore
//!     events      └──────┬───────┘         ▲
//!                        │ warn/breach     │
//!                        ▼                 │
//!                  LimitNotifier      LimitPolicy
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Days, Local, NaiveDate, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::limits::{LimitConfig, LimitPolicy};
use crate::notify::LimitNotifier;
use crate::puzzle::PuzzleHistory;
use crate::storage::{Config, KvStore};
use crate::timer::{TimerHooks, TimerRegistry};
use crate::tracker::{ForegroundState, TrackerConfig, UsageTracker};
use crate::usage::{AppTotal, DaySummary, DayUsage, UsageLedger, WeeklyAverage};

const BREAK_REMINDER_ID: &str = "break-reminder";
const FOCUS_ID_PREFIX: &str = "focus-";

/// Limit standing for a single app.
#[derive(Debug, Clone, Serialize)]
pub struct LimitCheck {
    pub app_id: String,
    pub used_ms: u64,
    pub limit_ms: Option<u64>,
    /// `None` means unlimited.
    pub remaining_ms: Option<u64>,
    pub exceeded: bool,
}

/// Seven-day usage overview for dashboards.
#[derive(Debug, Clone, Serialize)]
pub struct UsageOverview {
    /// Oldest first, one entry per day.
    pub days: Vec<DaySummary>,
    pub weekly: WeeklyAverage,
    pub top_apps: Vec<AppTotal>,
    pub limits: HashMap<String, LimitConfig>,
}

/// Today at a glance.
#[derive(Debug, Clone, Serialize)]
pub struct TodaySummary {
    pub date: NaiveDate,
    pub total_time_ms: u64,
    pub total_sessions: u32,
    pub apps: DayUsage,
    pub active_timers: Vec<String>,
}

pub struct DetoxService {
    config: Config,
    ledger: Arc<UsageLedger>,
    policy: Arc<LimitPolicy>,
    tracker: Arc<UsageTracker>,
    timers: TimerRegistry,
    puzzles: PuzzleHistory,
}

impl DetoxService {
    pub fn new(config: Config, store: Arc<dyn KvStore>, notifier: Arc<dyn LimitNotifier>) -> Self {
        let ledger = Arc::new(UsageLedger::new(Arc::clone(&store)));
        let policy = Arc::new(LimitPolicy::new(Arc::clone(&store), Arc::clone(&ledger)));
        let tracker = Arc::new(UsageTracker::new(
            Arc::clone(&ledger),
            Arc::clone(&policy),
            notifier,
            TrackerConfig::from_config(&config),
        ));
        let puzzles = PuzzleHistory::new(store);
        Self {
            config,
            ledger,
            policy,
            tracker,
            timers: TimerRegistry::new(),
            puzzles,
        }
    }

    /// Warm the limit cache and begin usage tracking.
    pub fn start(&self) {
        self.policy.load();
        self.tracker.start_tracking();
        info!(app_id = %self.config.tracking.app_id, "detox service started");
    }

    /// Flush any open session and cancel all timers.
    pub fn shutdown(&self) {
        self.tracker.stop_tracking();
        self.timers.stop_all();
        info!("detox service stopped");
    }

    /// Feed foreground transitions from the host platform.
    pub fn attach_foreground(&self, rx: watch::Receiver<ForegroundState>) {
        self.tracker.attach_foreground(rx);
    }

    // ── Limits ───────────────────────────────────────────────────────────

    /// # Errors
    /// Rejects an empty app id or a zero limit, and propagates storage
    /// failures from persisting the updated limit set.
    pub fn set_app_limit(&self, app_id: &str, time_limit_ms: u64) -> Result<()> {
        self.policy.set_limit(app_id, time_limit_ms)
    }

    /// # Errors
    /// Propagates storage failures from persisting the updated limit set.
    pub fn remove_app_limit(&self, app_id: &str) -> Result<()> {
        self.policy.remove_limit(app_id)
    }

    pub fn check_limit(&self, app_id: &str) -> LimitCheck {
        LimitCheck {
            app_id: app_id.to_string(),
            used_ms: self.ledger.today_usage(app_id).time_spent_ms,
            limit_ms: self.policy.limit_for(app_id).map(|l| l.time_limit_ms),
            remaining_ms: self.policy.remaining_ms(app_id),
            exceeded: self.policy.is_exceeded(app_id),
        }
    }

    // ── Reports ──────────────────────────────────────────────────────────

    pub fn usage_overview(&self) -> UsageOverview {
        UsageOverview {
            days: self.ledger.stats_for_last_n_days(7),
            weekly: self.ledger.weekly_average(),
            top_apps: self.ledger.most_used_apps(7, 5),
            limits: self.policy.all_limits(),
        }
    }

    pub fn today_summary(&self) -> TodaySummary {
        let date = Local::now().date_naive();
        let apps = self.ledger.usage_for_date(date);
        TodaySummary {
            date,
            total_time_ms: apps.values().map(|r| r.time_spent_ms).sum(),
            total_sessions: apps.values().map(|r| r.sessions).sum(),
            apps,
            active_timers: self.timers.active_ids(),
        }
    }

    // ── Timers ───────────────────────────────────────────────────────────

    /// Start a focus countdown and return its generated id.
    ///
    /// # Errors
    /// Rejects a zero duration.
    pub fn start_focus_session(&self, duration_ms: u64, hooks: TimerHooks) -> Result<String> {
        let id = format!("{FOCUS_ID_PREFIX}{}", Uuid::new_v4());
        self.timers.start(&id, duration_ms, hooks)?;
        Ok(id)
    }

    /// Schedule (or reschedule) the single break reminder. A pending
    /// reminder is replaced without firing.
    ///
    /// # Errors
    /// Rejects a zero delay.
    pub fn schedule_break_reminder(
        &self,
        delay_ms: u64,
        on_fire: impl Fn() + Send + Sync + 'static,
    ) -> Result<()> {
        self.timers.start(
            BREAK_REMINDER_ID,
            delay_ms,
            TimerHooks::new().on_complete(on_fire),
        )?;
        Ok(())
    }

    // ── Data management ──────────────────────────────────────────────────

    /// Export limits and the last 30 days of usage as a JSON document.
    ///
    /// # Errors
    /// Returns an error when a day's usage cannot be serialized.
    pub fn export_data(&self) -> Result<serde_json::Value> {
        let today = Local::now().date_naive();
        let mut usage = serde_json::Map::new();
        for offset in (0..30u64).rev() {
            let date = today - Days::new(offset);
            let day = self.ledger.usage_for_date(date);
            if !day.is_empty() {
                usage.insert(
                    date.format("%Y-%m-%d").to_string(),
                    serde_json::to_value(&day).map_err(StorageError::from)?,
                );
            }
        }
        let exported_at: DateTime<Utc> = Utc::now();
        Ok(json!({
            "exported_at": exported_at,
            "limits": self.policy.all_limits(),
            "usage": usage,
        }))
    }

    /// Remove all usage history, limits and puzzle history, and stop any
    /// live timers.
    ///
    /// # Errors
    /// Propagates the first storage failure encountered.
    pub fn clear_all_data(&self) -> Result<()> {
        self.ledger.clear_all()?;
        self.policy.clear_all()?;
        self.puzzles.clear()?;
        self.timers.stop_all();
        info!("all detox data cleared");
        Ok(())
    }

    // ── Parts ────────────────────────────────────────────────────────────

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ledger(&self) -> &UsageLedger {
        &self.ledger
    }

    pub fn policy(&self) -> &LimitPolicy {
        &self.policy
    }

    pub fn tracker(&self) -> &Arc<UsageTracker> {
        &self.tracker
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    pub fn puzzles(&self) -> &PuzzleHistory {
        &self.puzzles
    }
}
