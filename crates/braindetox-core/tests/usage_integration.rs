//! Integration tests for usage accounting over real SQLite storage.
//!
//! Exercises the full path from session recording through daily
//! summaries, weekly averages, rankings and limit evaluation,
//! including persistence across a store reopen.

use std::sync::Arc;

use braindetox_core::{
    Config, DetoxService, LimitPolicy, LogNotifier, SqliteStore, UsageLedger,
};
use chrono::{Days, Local};

fn open_store(dir: &tempfile::TempDir) -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open_at(dir.path().join("detox.db")).unwrap())
}

#[test]
fn test_week_of_usage_summaries() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let ledger = UsageLedger::new(store);

    // Seed a week: the day `offset` days ago gets (offset + 1) * 10 minutes.
    let today = Local::now().date_naive();
    for offset in 0..7u64 {
        let date = today - Days::new(offset);
        ledger
            .record_session_on(date, "social", (offset + 1) * 600_000)
            .unwrap();
    }
    ledger.record_session("games", 300_000).unwrap();

    let stats = ledger.stats_for_last_n_days(7);
    assert_eq!(stats.len(), 7);
    // Oldest first.
    assert_eq!(stats[0].date, today - Days::new(6));
    assert_eq!(stats[0].total_time_ms, 7 * 600_000);
    let latest = stats.last().unwrap();
    assert_eq!(latest.date, today);
    assert_eq!(latest.total_time_ms, 600_000 + 300_000);
    assert_eq!(latest.apps.len(), 2);

    let weekly = ledger.weekly_average();
    let seeded: u64 = (1..=7u64).map(|i| i * 600_000).sum::<u64>() + 300_000;
    assert_eq!(weekly.total_time_ms, seeded);
    assert!((weekly.average_time_ms - seeded as f64 / 7.0).abs() < 1e-9);

    let top = ledger.most_used_apps(7, 5);
    assert_eq!(top[0].app_id, "social");
    assert_eq!(top[1].app_id, "games");
    assert_eq!(top[1].time_spent_ms, 300_000);
}

#[test]
fn test_limits_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = open_store(&dir);
        let ledger = Arc::new(UsageLedger::new(store.clone()));
        let policy = LimitPolicy::new(store, ledger);
        policy.set_limit("social", 1_800_000).unwrap();
        policy.set_limit("games", 3_600_000).unwrap();
        policy.remove_limit("games").unwrap();
    }

    let store = open_store(&dir);
    let ledger = Arc::new(UsageLedger::new(store.clone()));
    let policy = LimitPolicy::new(store, ledger);
    let limits = policy.load();
    assert_eq!(limits.len(), 1);
    assert_eq!(limits["social"].time_limit_ms, 1_800_000);
}

#[test]
fn test_usage_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let ledger = UsageLedger::new(open_store(&dir));
        ledger.record_session("reader", 90_000).unwrap();
        ledger.record_session("reader", 30_000).unwrap();
    }

    let ledger = UsageLedger::new(open_store(&dir));
    let record = ledger.today_usage("reader");
    assert_eq!(record.time_spent_ms, 120_000);
    assert_eq!(record.sessions, 2);
    assert!(record.last_used.is_some());
}

#[test]
fn test_service_checks_and_exports_over_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let svc = DetoxService::new(
        Config::default(),
        open_store(&dir),
        Arc::new(LogNotifier::new(false)),
    );
    svc.set_app_limit("social", 60 * 60_000).unwrap();
    svc.ledger().record_session("social", 25 * 60_000).unwrap();
    svc.ledger().record_session("news", 5 * 60_000).unwrap();

    let check = svc.check_limit("social");
    assert_eq!(check.used_ms, 25 * 60_000);
    assert_eq!(check.limit_ms, Some(60 * 60_000));
    assert_eq!(check.remaining_ms, Some(35 * 60_000));
    assert!(!check.exceeded);

    // Reaching the limit exactly counts as exceeded.
    svc.ledger().record_session("social", 35 * 60_000).unwrap();
    let check = svc.check_limit("social");
    assert!(check.exceeded);
    assert_eq!(check.remaining_ms, Some(0));

    let exported = svc.export_data().unwrap();
    let usage = exported["usage"].as_object().unwrap();
    assert_eq!(usage.len(), 1);
    let day = usage.values().next().unwrap();
    assert_eq!(day["social"]["time_spent_ms"].as_u64(), Some(60 * 60_000));
    assert_eq!(day["news"]["sessions"].as_u64(), Some(1));
    assert_eq!(
        exported["limits"]["social"]["time_limit_ms"].as_u64(),
        Some(60 * 60_000)
    );
}
