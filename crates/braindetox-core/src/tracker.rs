//! Foreground usage tracking.
//!
//! The tracker attributes the host app's foregrounded time to the usage
//! ledger. While tracking, an open session covers the span since it was
//! opened or last flushed; a periodic task flushes that span every flush
//! interval and resets the session start, so at most one interval of
//! usage is lost on a crash and nothing is ever counted twice. A session
//! that spans midnight attributes its whole unflushed span to the day it
//! flushes on.
//!
//! After every flush that recorded time, the tracked app's limit is
//! evaluated and warn/breach notifications are emitted edge-triggered,
//! latched once per local day each. A failed ledger write is logged and
//! the covered interval dropped; replaying it would double-count.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Local, NaiveDate};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::limits::LimitPolicy;
use crate::notify::LimitNotifier;
use crate::storage::Config;
use crate::usage::UsageLedger;

/// Foreground state of the host app, as reported by the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ForegroundState {
    Foreground,
    #[default]
    Background,
}

/// Tracker tuning, usually derived from the application [`Config`].
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Identifier the tracked time is recorded under.
    pub app_id: String,
    /// Cadence of the periodic flush.
    pub flush_interval: Duration,
    /// Percentage of the limit at which the pre-breach warning fires.
    pub warn_threshold_pct: u8,
}

impl TrackerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            app_id: config.tracking.app_id.clone(),
            flush_interval: Duration::from_secs(config.tracking.flush_interval_secs),
            warn_threshold_pct: config.limits.warn_threshold_pct,
        }
    }
}

/// Once-per-day emission latch for warn and breach.
#[derive(Debug, Default)]
struct DayLatch {
    day: Option<NaiveDate>,
    warned: bool,
    breached: bool,
}

impl DayLatch {
    fn roll(&mut self, today: NaiveDate) {
        if self.day != Some(today) {
            self.day = Some(today);
            self.warned = false;
            self.breached = false;
        }
    }
}

#[derive(Default)]
struct TrackerState {
    tracking: bool,
    foreground: ForegroundState,
    /// Start of the unflushed span of the open session.
    session_started_at: Option<Instant>,
    flush_task: Option<JoinHandle<()>>,
    watch_task: Option<JoinHandle<()>>,
    latch: DayLatch,
}

enum Emission {
    Warn(u64),
    Breach,
}

/// Attributes foreground time to the ledger and emits limit events.
pub struct UsageTracker {
    ledger: Arc<UsageLedger>,
    policy: Arc<LimitPolicy>,
    notifier: Arc<dyn LimitNotifier>,
    config: TrackerConfig,
    state: Mutex<TrackerState>,
}

impl UsageTracker {
    pub fn new(
        ledger: Arc<UsageLedger>,
        policy: Arc<LimitPolicy>,
        notifier: Arc<dyn LimitNotifier>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            ledger,
            policy,
            notifier,
            config,
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Begin tracking: arms the periodic flush and, when the last known
    /// foreground state is foregrounded, opens a session. No-op while
    /// already tracking.
    pub fn start_tracking(self: &Arc<Self>) {
        let mut state = self.lock();
        if state.tracking {
            return;
        }
        state.tracking = true;
        state.session_started_at = if state.foreground == ForegroundState::Foreground {
            Some(Instant::now())
        } else {
            None
        };
        state.flush_task = Some(self.spawn_flush_task());
        info!(
            app_id = %self.config.app_id,
            interval_secs = self.config.flush_interval.as_secs(),
            "tracking started"
        );
    }

    /// Stop tracking: flushes any open session exactly once and disarms
    /// the background tasks. Idempotent.
    pub fn stop_tracking(&self) {
        let pending = {
            let mut state = self.lock();
            if !state.tracking {
                return;
            }
            let pending = self.flush_locked(&mut state, "stop", true);
            state.tracking = false;
            if let Some(task) = state.flush_task.take() {
                task.abort();
            }
            if let Some(task) = state.watch_task.take() {
                task.abort();
            }
            pending
        };
        self.emit(pending);
        info!(app_id = %self.config.app_id, "tracking stopped");
    }

    /// Feed a foreground transition.
    ///
    /// Foregrounded opens a session when tracking and none is open;
    /// backgrounded flushes and closes the open one. Repeats of the
    /// current state are ignored.
    pub fn on_foreground_change(&self, next: ForegroundState) {
        let pending = {
            let mut state = self.lock();
            let prev = state.foreground;
            state.foreground = next;
            if !state.tracking || prev == next {
                return;
            }
            match next {
                ForegroundState::Foreground => {
                    if state.session_started_at.is_none() {
                        state.session_started_at = Some(Instant::now());
                        debug!(app_id = %self.config.app_id, "session opened");
                    }
                    None
                }
                ForegroundState::Background => {
                    self.flush_locked(&mut state, "backgrounded", true)
                }
            }
        };
        self.emit(pending);
    }

    /// Best-effort flush for platform suspension boundaries. Records the
    /// unflushed span but keeps the session open.
    pub fn background_flush(&self) {
        let pending = {
            let mut state = self.lock();
            if !state.tracking {
                return;
            }
            self.flush_locked(&mut state, "background", false)
        };
        self.emit(pending);
    }

    /// Subscribe to a foreground feed. The feed's current value is
    /// applied immediately; later changes are forwarded until the feed
    /// closes or tracking stops.
    pub fn attach_foreground(self: &Arc<Self>, mut rx: watch::Receiver<ForegroundState>) {
        let current = *rx.borrow_and_update();
        self.on_foreground_change(current);

        let weak = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let next = *rx.borrow_and_update();
                let Some(tracker) = weak.upgrade() else { break };
                tracker.on_foreground_change(next);
            }
        });
        let mut state = self.lock();
        if let Some(prev) = state.watch_task.replace(task) {
            prev.abort();
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.lock().tracking
    }

    pub fn session_open(&self) -> bool {
        self.lock().session_started_at.is_some()
    }

    // ── Internals ────────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn spawn_flush_task(self: &Arc<Self>) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let period = self.config.flush_interval;
        tokio::spawn(async move {
            let mut ticks = time::interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticks.tick().await;
                let Some(tracker) = weak.upgrade() else { break };
                tracker.periodic_flush();
            }
        })
    }

    fn periodic_flush(&self) {
        let pending = {
            let mut state = self.lock();
            if !state.tracking {
                return;
            }
            self.flush_locked(&mut state, "interval", false)
        };
        self.emit(pending);
    }

    /// Record the open session's unflushed span. The session start moves
    /// to now (or closes) *before* the write is attempted, so a failing
    /// write can only lose the span, never replay it.
    fn flush_locked(
        &self,
        state: &mut TrackerState,
        reason: &'static str,
        close: bool,
    ) -> Option<Emission> {
        let started_at = state.session_started_at?;
        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        state.session_started_at = if close { None } else { Some(Instant::now()) };

        match self.ledger.record_session(&self.config.app_id, elapsed_ms) {
            Ok(record) => {
                debug!(
                    app_id = %self.config.app_id,
                    elapsed_ms,
                    total_ms = record.time_spent_ms,
                    reason,
                    "session flushed"
                );
                self.evaluate_limit(state)
            }
            Err(e) => {
                warn!(
                    app_id = %self.config.app_id,
                    elapsed_ms,
                    reason,
                    error = %e,
                    "flush failed; interval dropped"
                );
                None
            }
        }
    }

    /// Decide whether this flush crossed the warn or breach threshold.
    /// At most one emission per flush; breach wins when both are crossed
    /// at once.
    fn evaluate_limit(&self, state: &mut TrackerState) -> Option<Emission> {
        let app_id = &self.config.app_id;
        let limit = self.policy.limit_for(app_id)?;
        state.latch.roll(Local::now().date_naive());

        let used = self.ledger.today_usage(app_id).time_spent_ms;
        if used >= limit.time_limit_ms {
            if state.latch.breached {
                return None;
            }
            state.latch.breached = true;
            info!(
                app_id = %app_id,
                used_ms = used,
                limit_ms = limit.time_limit_ms,
                "daily limit breached"
            );
            return Some(Emission::Breach);
        }

        let warn_at = limit
            .time_limit_ms
            .saturating_mul(u64::from(self.config.warn_threshold_pct))
            / 100;
        if warn_at > 0 && used >= warn_at && !state.latch.warned {
            state.latch.warned = true;
            let remaining = limit.time_limit_ms - used;
            info!(app_id = %app_id, remaining_ms = remaining, "limit warning");
            return Some(Emission::Warn(remaining));
        }
        None
    }

    /// Deliver outside the state lock; notifiers may take their time.
    fn emit(&self, pending: Option<Emission>) {
        match pending {
            Some(Emission::Warn(remaining_ms)) => {
                self.notifier.warn(&self.config.app_id, remaining_ms);
            }
            Some(Emission::Breach) => self.notifier.breach(&self.config.app_id),
            None => {}
        }
    }
}

impl Drop for UsageTracker {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = &state.flush_task {
            task.abort();
        }
        if let Some(task) = &state.watch_task {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KvStore, MemoryStore};
    use crate::usage::UsageRecord;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::task::yield_now;
    use tokio::time::sleep;

    const APP: &str = "brain-detox";

    #[derive(Default)]
    struct RecordingNotifier {
        warns: Mutex<Vec<u64>>,
        breaches: AtomicUsize,
    }

    impl LimitNotifier for RecordingNotifier {
        fn warn(&self, _app_id: &str, remaining_ms: u64) {
            self.warns.lock().unwrap().push(remaining_ms);
        }

        fn breach(&self, _app_id: &str) {
            self.breaches.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FailingStore {
        inner: MemoryStore,
        fail_writes: AtomicBool,
    }

    impl FailingStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                fail_writes: AtomicBool::new(false),
            }
        }

        fn injected() -> crate::error::StorageError {
            crate::error::StorageError::Open {
                path: "test".into(),
                message: "injected failure".into(),
            }
        }
    }

    impl KvStore for FailingStore {
        fn get(&self, key: &str) -> Result<Option<Value>, crate::error::StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &Value) -> Result<(), crate::error::StorageError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(Self::injected());
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), crate::error::StorageError> {
            self.inner.remove(key)
        }

        fn list_keys(&self, prefix: &str) -> Result<Vec<String>, crate::error::StorageError> {
            self.inner.list_keys(prefix)
        }
    }

    struct Harness {
        tracker: Arc<UsageTracker>,
        ledger: Arc<UsageLedger>,
        policy: Arc<LimitPolicy>,
        notifier: Arc<RecordingNotifier>,
        store: Arc<FailingStore>,
    }

    fn harness(flush_secs: u64) -> Harness {
        let store = Arc::new(FailingStore::new());
        let kv: Arc<dyn KvStore> = Arc::clone(&store) as Arc<dyn KvStore>;
        let ledger = Arc::new(UsageLedger::new(Arc::clone(&kv)));
        let policy = Arc::new(LimitPolicy::new(Arc::clone(&kv), Arc::clone(&ledger)));
        let notifier = Arc::new(RecordingNotifier::default());
        let tracker = Arc::new(UsageTracker::new(
            Arc::clone(&ledger),
            Arc::clone(&policy),
            Arc::clone(&notifier) as Arc<dyn LimitNotifier>,
            TrackerConfig {
                app_id: APP.into(),
                flush_interval: Duration::from_secs(flush_secs),
                warn_threshold_pct: 80,
            },
        ));
        Harness {
            tracker,
            ledger,
            policy,
            notifier,
            store,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn session_open_close_records_elapsed() {
        let h = harness(600);
        h.tracker.start_tracking();
        assert!(h.tracker.is_tracking());
        assert!(!h.tracker.session_open());

        h.tracker.on_foreground_change(ForegroundState::Foreground);
        assert!(h.tracker.session_open());
        sleep(Duration::from_millis(25_000)).await;
        h.tracker.on_foreground_change(ForegroundState::Background);

        let record = h.ledger.today_usage(APP);
        assert_eq!(record.time_spent_ms, 25_000);
        assert_eq!(record.sessions, 1);
        assert!(!h.tracker.session_open());
    }

    #[tokio::test(start_paused = true)]
    async fn background_without_session_records_nothing() {
        let h = harness(600);
        h.tracker.start_tracking();
        h.tracker.on_foreground_change(ForegroundState::Background);
        assert_eq!(h.ledger.today_usage(APP), UsageRecord::default());
    }

    #[tokio::test(start_paused = true)]
    async fn transitions_while_idle_do_not_record() {
        let h = harness(600);
        h.tracker.on_foreground_change(ForegroundState::Foreground);
        sleep(Duration::from_millis(10_000)).await;
        h.tracker.on_foreground_change(ForegroundState::Background);
        assert_eq!(h.ledger.today_usage(APP), UsageRecord::default());
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_flush_never_double_counts() {
        let h = harness(30);
        h.tracker.start_tracking();
        h.tracker.on_foreground_change(ForegroundState::Foreground);

        // Periodic flush fires at t=30s; background at t=31s adds the
        // remainder only.
        sleep(Duration::from_millis(31_000)).await;
        h.tracker.on_foreground_change(ForegroundState::Background);

        let record = h.ledger.today_usage(APP);
        assert_eq!(record.time_spent_ms, 31_000);
        assert_eq!(record.sessions, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_foreground_does_not_reset_session() {
        let h = harness(600);
        h.tracker.start_tracking();
        h.tracker.on_foreground_change(ForegroundState::Foreground);
        sleep(Duration::from_millis(8_000)).await;
        h.tracker.on_foreground_change(ForegroundState::Foreground);
        sleep(Duration::from_millis(2_000)).await;
        h.tracker.on_foreground_change(ForegroundState::Background);

        assert_eq!(h.ledger.today_usage(APP).time_spent_ms, 10_000);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_tracking_flushes_exactly_once() {
        let h = harness(600);
        h.tracker.start_tracking();
        h.tracker.on_foreground_change(ForegroundState::Foreground);
        sleep(Duration::from_millis(12_000)).await;

        h.tracker.stop_tracking();
        let record = h.ledger.today_usage(APP);
        assert_eq!(record.time_spent_ms, 12_000);
        assert_eq!(record.sessions, 1);
        assert!(!h.tracker.is_tracking());

        // Idempotent; nothing accrues after stop.
        h.tracker.stop_tracking();
        sleep(Duration::from_millis(60_000)).await;
        let record = h.ledger.today_usage(APP);
        assert_eq!(record.time_spent_ms, 12_000);
        assert_eq!(record.sessions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn background_flush_keeps_session_open() {
        let h = harness(600);
        h.tracker.start_tracking();
        h.tracker.on_foreground_change(ForegroundState::Foreground);
        sleep(Duration::from_millis(9_000)).await;

        h.tracker.background_flush();
        assert!(h.tracker.session_open());
        assert_eq!(h.ledger.today_usage(APP).time_spent_ms, 9_000);

        sleep(Duration::from_millis(4_000)).await;
        h.tracker.on_foreground_change(ForegroundState::Background);
        let record = h.ledger.today_usage(APP);
        assert_eq!(record.time_spent_ms, 13_000);
        assert_eq!(record.sessions, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn warn_then_breach_each_fire_once() {
        let h = harness(600);
        h.policy.set_limit(APP, 60_000).unwrap();
        h.tracker.start_tracking();

        // 20s: under the 80% threshold, quiet.
        h.tracker.on_foreground_change(ForegroundState::Foreground);
        sleep(Duration::from_millis(20_000)).await;
        h.tracker.on_foreground_change(ForegroundState::Background);
        assert!(h.notifier.warns.lock().unwrap().is_empty());
        assert_eq!(h.notifier.breaches.load(Ordering::SeqCst), 0);

        // +35s = 55s: warning, once.
        h.tracker.on_foreground_change(ForegroundState::Foreground);
        sleep(Duration::from_millis(35_000)).await;
        h.tracker.on_foreground_change(ForegroundState::Background);
        assert_eq!(h.notifier.warns.lock().unwrap().as_slice(), &[5_000]);
        assert_eq!(h.notifier.breaches.load(Ordering::SeqCst), 0);

        // +10s = 65s: breach, once.
        h.tracker.on_foreground_change(ForegroundState::Foreground);
        sleep(Duration::from_millis(10_000)).await;
        h.tracker.on_foreground_change(ForegroundState::Background);
        assert_eq!(h.notifier.breaches.load(Ordering::SeqCst), 1);

        // Further usage stays quiet.
        h.tracker.on_foreground_change(ForegroundState::Foreground);
        sleep(Duration::from_millis(5_000)).await;
        h.tracker.on_foreground_change(ForegroundState::Background);
        assert_eq!(h.notifier.warns.lock().unwrap().len(), 1);
        assert_eq!(h.notifier.breaches.load(Ordering::SeqCst), 1);
        assert_eq!(h.ledger.today_usage(APP).time_spent_ms, 70_000);
    }

    #[tokio::test(start_paused = true)]
    async fn breach_wins_when_one_flush_crosses_both() {
        let h = harness(600);
        h.policy.set_limit(APP, 10_000).unwrap();
        h.tracker.start_tracking();

        h.tracker.on_foreground_change(ForegroundState::Foreground);
        sleep(Duration::from_millis(15_000)).await;
        h.tracker.on_foreground_change(ForegroundState::Background);

        assert!(h.notifier.warns.lock().unwrap().is_empty());
        assert_eq!(h.notifier.breaches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_flush_drops_interval_without_replay() {
        let h = harness(600);
        h.tracker.start_tracking();

        h.store.fail_writes.store(true, Ordering::SeqCst);
        h.tracker.on_foreground_change(ForegroundState::Foreground);
        sleep(Duration::from_millis(10_000)).await;
        h.tracker.on_foreground_change(ForegroundState::Background);
        assert_eq!(h.ledger.today_usage(APP), UsageRecord::default());
        assert!(h.tracker.is_tracking());

        // Recovered storage sees only new time.
        h.store.fail_writes.store(false, Ordering::SeqCst);
        h.tracker.on_foreground_change(ForegroundState::Foreground);
        sleep(Duration::from_millis(5_000)).await;
        h.tracker.on_foreground_change(ForegroundState::Background);
        let record = h.ledger.today_usage(APP);
        assert_eq!(record.time_spent_ms, 5_000);
        assert_eq!(record.sessions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn watch_feed_drives_transitions() {
        let h = harness(600);
        let (tx, rx) = watch::channel(ForegroundState::Background);
        h.tracker.attach_foreground(rx);
        h.tracker.start_tracking();

        tx.send(ForegroundState::Foreground).unwrap();
        for _ in 0..3 {
            yield_now().await;
        }
        assert!(h.tracker.session_open());

        sleep(Duration::from_millis(6_000)).await;
        tx.send(ForegroundState::Background).unwrap();
        for _ in 0..3 {
            yield_now().await;
        }
        assert_eq!(h.ledger.today_usage(APP).time_spent_ms, 6_000);
    }

    #[tokio::test(start_paused = true)]
    async fn start_opens_session_when_already_foregrounded() {
        let h = harness(600);
        let (_tx, rx) = watch::channel(ForegroundState::Foreground);
        h.tracker.attach_foreground(rx);
        assert!(!h.tracker.session_open());

        h.tracker.start_tracking();
        assert!(h.tracker.session_open());
        sleep(Duration::from_millis(5_000)).await;
        h.tracker.stop_tracking();
        assert_eq!(h.ledger.today_usage(APP).time_spent_ms, 5_000);
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent() {
        let h = harness(30);
        h.tracker.start_tracking();
        h.tracker.on_foreground_change(ForegroundState::Foreground);
        sleep(Duration::from_millis(5_000)).await;
        h.tracker.start_tracking();
        sleep(Duration::from_millis(5_000)).await;
        h.tracker.stop_tracking();
        assert_eq!(h.ledger.today_usage(APP).time_spent_ms, 10_000);
    }
}
