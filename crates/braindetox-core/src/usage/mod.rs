//! Per-day app usage accounting.

mod ledger;

pub use ledger::{
    usage_key, AppTotal, DaySummary, DayUsage, UsageLedger, UsageRecord, WeeklyAverage,
    USAGE_KEY_PREFIX,
};
