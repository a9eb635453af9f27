//! Named countdown timer registry.
//!
//! Each running timer is a spawned tokio task ticking at one-second
//! cadence. Remaining time is always derived from the start instant and
//! the monotonic clock, never from counting ticks, so delayed ticks skip
//! rather than catch up.
//!
//! ## State transitions
//!
//! ```text
//! (absent) -> Running -> Paused -> Running -> ... -> (absent)
//! ```
//!
//! `start` on an existing id stops and replaces it; completion and `stop`
//! remove the entry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tracing::debug;

use crate::error::ValidationError;

/// Tick cadence for running timers, in milliseconds.
pub const TICK_MS: u64 = 1000;

/// Callbacks observed over a timer's lifetime.
///
/// Both hooks are optional and run on the timer task, outside the
/// registry lock. `on_complete` fires at most once per `start`.
#[derive(Clone, Default)]
pub struct TimerHooks {
    pub on_tick: Option<Arc<dyn Fn(u64) + Send + Sync>>,
    pub on_complete: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl TimerHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_tick(mut self, f: impl Fn(u64) + Send + Sync + 'static) -> Self {
        self.on_tick = Some(Arc::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(f));
        self
    }
}

struct TimerEntry {
    /// Duration of the current run segment (reset on resume).
    duration_ms: u64,
    /// Start instant of the current run segment.
    started_at: Instant,
    /// Remaining snapshot while paused; `None` while running.
    paused_remaining_ms: Option<u64>,
    hooks: TimerHooks,
    /// Stamp of the `start` that created this entry; stale tick tasks
    /// compare against it and exit without invoking hooks.
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl TimerEntry {
    fn remaining_now(&self) -> u64 {
        match self.paused_remaining_ms {
            Some(ms) => ms,
            None => self
                .duration_ms
                .saturating_sub(self.started_at.elapsed().as_millis() as u64),
        }
    }
}

#[derive(Default)]
struct RegistryInner {
    timers: HashMap<String, TimerEntry>,
    next_generation: u64,
}

/// Registry of named countdown timers.
///
/// Cheap to clone; clones share the same timer map.
#[derive(Clone, Default)]
pub struct TimerRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

enum TickOutcome {
    Running(TimerHooks, u64),
    Completed(TimerHooks),
    Stale,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start (or restart) the timer named `id`.
    ///
    /// An existing timer under the same id, running or paused, is stopped
    /// and replaced without firing its completion hook.
    ///
    /// # Errors
    /// Rejects an empty `id` or a zero `duration_ms`.
    pub fn start(
        &self,
        id: &str,
        duration_ms: u64,
        hooks: TimerHooks,
    ) -> Result<(), ValidationError> {
        if id.is_empty() {
            return Err(ValidationError::invalid("id", "timer id must not be empty"));
        }
        if duration_ms == 0 {
            return Err(ValidationError::invalid(
                "duration_ms",
                "duration must be positive",
            ));
        }
        let mut inner = self.lock();
        self.start_locked(&mut inner, id, duration_ms, hooks);
        debug!(timer = %id, duration_ms, "timer started");
        Ok(())
    }

    /// Pause a running timer, capturing its remaining time.
    ///
    /// No-op for absent or already-paused timers.
    pub fn pause(&self, id: &str) {
        let mut inner = self.lock();
        if let Some(entry) = inner.timers.get_mut(id) {
            if entry.paused_remaining_ms.is_none() {
                let remaining = entry.remaining_now();
                entry.paused_remaining_ms = Some(remaining);
                if let Some(task) = entry.task.take() {
                    task.abort();
                }
                debug!(timer = %id, remaining_ms = remaining, "timer paused");
            }
        }
    }

    /// Resume a paused timer from its captured remaining time.
    ///
    /// No-op for absent or running timers.
    pub fn resume(&self, id: &str) {
        let mut inner = self.lock();
        let (remaining, hooks) = match inner.timers.get(id) {
            Some(entry) => match entry.paused_remaining_ms {
                Some(ms) => (ms, entry.hooks.clone()),
                None => return,
            },
            None => return,
        };
        self.start_locked(&mut inner, id, remaining, hooks);
        debug!(timer = %id, remaining_ms = remaining, "timer resumed");
    }

    /// Cancel and remove a timer; its completion hook never fires.
    ///
    /// No-op when absent. A stopped id behaves as if it was never started.
    pub fn stop(&self, id: &str) {
        let mut inner = self.lock();
        if let Some(entry) = inner.timers.remove(id) {
            if let Some(task) = entry.task {
                task.abort();
            }
            debug!(timer = %id, "timer stopped");
        }
    }

    /// Cancel every timer; no completion hooks fire.
    pub fn stop_all(&self) {
        let mut inner = self.lock();
        for (_, entry) in inner.timers.drain() {
            if let Some(task) = entry.task {
                task.abort();
            }
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Remaining milliseconds: derived for running timers, the captured
    /// snapshot for paused ones, 0 for absent ids.
    pub fn remaining_ms(&self, id: &str) -> u64 {
        self.lock()
            .timers
            .get(id)
            .map(TimerEntry::remaining_now)
            .unwrap_or(0)
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.lock()
            .timers
            .get(id)
            .is_some_and(|e| e.paused_remaining_ms.is_none())
    }

    pub fn is_paused(&self, id: &str) -> bool {
        self.lock()
            .timers
            .get(id)
            .is_some_and(|e| e.paused_remaining_ms.is_some())
    }

    /// Ids of all live timers (running or paused), sorted.
    pub fn active_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().timers.keys().cloned().collect();
        ids.sort();
        ids
    }

    // ── Internals ────────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a fresh running entry under `id`, replacing any previous one.
    /// Also the resume path: a resumed timer is a new segment whose
    /// duration is the captured remaining time.
    fn start_locked(&self, inner: &mut RegistryInner, id: &str, duration_ms: u64, hooks: TimerHooks) {
        if let Some(prev) = inner.timers.remove(id) {
            if let Some(task) = prev.task {
                task.abort();
            }
        }
        inner.next_generation += 1;
        let generation = inner.next_generation;
        let started_at = Instant::now();
        let task = self.spawn_tick_task(id.to_string(), generation, started_at);
        inner.timers.insert(
            id.to_string(),
            TimerEntry {
                duration_ms,
                started_at,
                paused_remaining_ms: None,
                hooks,
                generation,
                task: Some(task),
            },
        );
    }

    fn spawn_tick_task(&self, id: String, generation: u64, started_at: Instant) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let period = Duration::from_millis(TICK_MS);
            let mut ticks = time::interval_at(started_at + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticks.tick().await;
                let outcome = {
                    let mut guard = inner.lock().unwrap_or_else(|e| e.into_inner());
                    let current = guard
                        .timers
                        .get(&id)
                        .filter(|e| e.generation == generation && e.paused_remaining_ms.is_none())
                        .map(|e| (e.remaining_now(), e.hooks.clone()));
                    match current {
                        None => TickOutcome::Stale,
                        Some((0, hooks)) => {
                            // Entry leaves the map before hooks run, so the
                            // slot is free for a new start.
                            guard.timers.remove(&id);
                            TickOutcome::Completed(hooks)
                        }
                        Some((remaining, hooks)) => TickOutcome::Running(hooks, remaining),
                    }
                };
                match outcome {
                    TickOutcome::Running(hooks, remaining) => {
                        if let Some(on_tick) = &hooks.on_tick {
                            on_tick(remaining);
                        }
                    }
                    TickOutcome::Completed(hooks) => {
                        if let Some(on_tick) = &hooks.on_tick {
                            on_tick(0);
                        }
                        if let Some(on_complete) = &hooks.on_complete {
                            on_complete();
                        }
                        debug!(timer = %id, "timer completed");
                        break;
                    }
                    TickOutcome::Stale => break,
                }
            }
        })
    }
}
