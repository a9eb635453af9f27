//! Integration tests for the foreground tracking loop.
//!
//! Drives a [`DetoxService`] with a simulated foreground feed on
//! Tokio's paused clock and checks what lands in the ledger and what
//! the notifier sees, from first session through limit breach and
//! puzzle redemption.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use braindetox_core::puzzle::{PuzzleSession, Verdict};
use braindetox_core::{
    Config, DetoxService, ForegroundState, LimitNotifier, MemoryStore, PuzzleGenerator,
};
use tokio::sync::watch;
use tokio::time::sleep;

#[derive(Default)]
struct CountingNotifier {
    warns: Mutex<Vec<u64>>,
    breaches: AtomicUsize,
}

impl LimitNotifier for CountingNotifier {
    fn warn(&self, _app_id: &str, remaining_ms: u64) {
        self.warns.lock().unwrap().push(remaining_ms);
    }

    fn breach(&self, _app_id: &str) {
        self.breaches.fetch_add(1, Ordering::SeqCst);
    }
}

fn service(notifier: Arc<CountingNotifier>) -> DetoxService {
    DetoxService::new(Config::default(), Arc::new(MemoryStore::new()), notifier)
}

/// Let spawned forwarding tasks observe a watch send without advancing
/// the paused clock.
async fn settle() {
    for _ in 0..3 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_foreground_feed_accumulates_usage() {
    let notifier = Arc::new(CountingNotifier::default());
    let svc = service(notifier.clone());
    let (tx, rx) = watch::channel(ForegroundState::Background);
    svc.attach_foreground(rx);
    svc.start();
    let app = svc.config().tracking.app_id.clone();

    // First session: 12s in the foreground.
    tx.send(ForegroundState::Foreground).unwrap();
    settle().await;
    sleep(Duration::from_secs(12)).await;
    tx.send(ForegroundState::Background).unwrap();
    settle().await;
    assert_eq!(svc.ledger().today_usage(&app).time_spent_ms, 12_000);

    // Second session crosses the 30s periodic flush boundary: the
    // flush records the open interval without double counting it.
    tx.send(ForegroundState::Foreground).unwrap();
    settle().await;
    sleep(Duration::from_secs(35)).await;
    tx.send(ForegroundState::Background).unwrap();
    settle().await;

    let record = svc.ledger().today_usage(&app);
    assert_eq!(record.time_spent_ms, 47_000);
    assert_eq!(record.sessions, 3);
    assert!(notifier.warns.lock().unwrap().is_empty());
    assert_eq!(notifier.breaches.load(Ordering::SeqCst), 0);

    svc.shutdown();
    assert_eq!(svc.ledger().today_usage(&app).time_spent_ms, 47_000);
}

#[tokio::test(start_paused = true)]
async fn test_limit_warning_then_breach_each_fire_once() {
    let notifier = Arc::new(CountingNotifier::default());
    let svc = service(notifier.clone());
    let app = svc.config().tracking.app_id.clone();
    svc.set_app_limit(&app, 60_000).unwrap();

    // Already foregrounded when tracking starts.
    let (tx, rx) = watch::channel(ForegroundState::Foreground);
    svc.attach_foreground(rx);
    svc.start();

    // 50s of use crosses the 80% mark (48s) but not the limit.
    sleep(Duration::from_secs(50)).await;
    tx.send(ForegroundState::Background).unwrap();
    settle().await;
    assert_eq!(*notifier.warns.lock().unwrap(), vec![10_000]);
    assert_eq!(notifier.breaches.load(Ordering::SeqCst), 0);

    // Another 15s crosses the limit at the 60s periodic flush.
    tx.send(ForegroundState::Foreground).unwrap();
    settle().await;
    sleep(Duration::from_secs(15)).await;
    tx.send(ForegroundState::Background).unwrap();
    settle().await;

    assert_eq!(notifier.breaches.load(Ordering::SeqCst), 1);
    assert_eq!(notifier.warns.lock().unwrap().len(), 1);
    assert_eq!(svc.ledger().today_usage(&app).time_spent_ms, 65_000);

    svc.shutdown();
    assert_eq!(notifier.breaches.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_breach_then_puzzle_redemption() {
    let notifier = Arc::new(CountingNotifier::default());
    let svc = service(notifier.clone());
    let app = svc.config().tracking.app_id.clone();
    svc.set_app_limit(&app, 10_000).unwrap();

    let (tx, rx) = watch::channel(ForegroundState::Foreground);
    svc.attach_foreground(rx);
    svc.start();

    // Blow straight through the limit in one interval: only the breach
    // fires, not the warning.
    sleep(Duration::from_secs(15)).await;
    tx.send(ForegroundState::Background).unwrap();
    settle().await;
    assert!(notifier.warns.lock().unwrap().is_empty());
    assert_eq!(notifier.breaches.load(Ordering::SeqCst), 1);
    assert!(svc.check_limit(&app).exceeded);

    // Solve the configured puzzle and record the outcome.
    let mut gen = PuzzleGenerator::seeded(1);
    let puzzle = gen.generate(
        svc.config().puzzles.default_category,
        svc.config().puzzles.default_difficulty,
    );
    let mut session = PuzzleSession::new(puzzle.clone());
    let verdict = session.submit(&puzzle.solution);
    let Verdict::Correct { score } = verdict else {
        panic!("submitting the solution must be correct, got {verdict:?}");
    };
    assert_eq!(score, 1000);
    svc.puzzles().append(&session.outcome(true, score)).unwrap();

    let stats = svc.puzzles().stats();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.solved, 1);
    assert_eq!(stats.best_score, 1000);
}
