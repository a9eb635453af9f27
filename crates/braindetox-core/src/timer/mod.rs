//! Countdown timers: the named registry and display formatting.

mod format;
mod registry;

pub use format::{format_clock, format_human};
pub use registry::{TimerHooks, TimerRegistry, TICK_MS};
