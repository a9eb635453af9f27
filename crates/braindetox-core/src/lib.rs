//! # Brain Detox Core Library
//!
//! Core business logic for the Brain Detox digital wellness tool. The
//! library is CLI-first: every operation is available through the
//! standalone CLI binary, and richer front-ends are thin layers over
//! the same crate.
//!
//! ## Architecture
//!
//! - **Usage tracking**: a foreground-event driven tracker that
//!   accumulates per-app screen time into a daily ledger, flushing
//!   roughly twice a minute so crashes lose at most one interval
//! - **Limits**: per-app daily time budgets with an 80% warning and a
//!   breach signal, each fired at most once per day
//! - **Timers**: named wall-clock countdowns for focus sessions and
//!   break reminders
//! - **Puzzles**: seedable cognitive micro-challenges with scoring and
//!   persisted history
//! - **Storage**: a small key/value contract backed by SQLite, plus
//!   TOML configuration
//!
//! ## Key Components
//!
//! - [`DetoxService`]: facade wiring the parts together
//! - [`UsageTracker`]: foreground session accounting
//! - [`UsageLedger`]: per-day per-app usage history
//! - [`LimitPolicy`]: limit storage and evaluation
//! - [`TimerRegistry`]: named countdown timers
//! - [`KvStore`]: persistence contract

pub mod error;
pub mod limits;
pub mod notify;
pub mod puzzle;
pub mod service;
pub mod storage;
pub mod timer;
pub mod tracker;
pub mod usage;

pub use error::{ConfigError, CoreError, Result, StorageError, ValidationError};
pub use limits::{LimitConfig, LimitPolicy, LIMITS_KEY};
pub use notify::{LimitNotifier, LogNotifier};
pub use puzzle::{
    Difficulty, Puzzle, PuzzleCategory, PuzzleGenerator, PuzzleHistory, PuzzleSession,
};
pub use service::{DetoxService, LimitCheck, TodaySummary, UsageOverview};
pub use storage::{Config, KvStore, MemoryStore, SqliteStore};
pub use timer::{format_clock, format_human, TimerHooks, TimerRegistry};
pub use tracker::{ForegroundState, UsageTracker};
pub use usage::{usage_key, DaySummary, UsageLedger, UsageRecord, WeeklyAverage};
