use std::error::Error;
use std::sync::Arc;

use braindetox_core::{
    format_human, Config, DetoxService, ForegroundState, LimitNotifier, SqliteStore,
};
use clap::Subcommand;
use tokio::sync::watch;

#[derive(Subcommand)]
pub enum TrackAction {
    /// Track foreground time until Ctrl-C
    Start,
    /// Today's standing for the tracked app
    Status,
}

/// Prints limit notifications to the terminal.
struct ConsoleNotifier;

impl LimitNotifier for ConsoleNotifier {
    fn warn(&self, app_id: &str, remaining_ms: u64) {
        println!(
            "\nwarning: {app_id} has {} left of today's limit",
            format_human(remaining_ms)
        );
    }

    fn breach(&self, app_id: &str) {
        println!("\nlimit reached: {app_id} is done for today. Time for a break.");
    }
}

pub async fn run(action: TrackAction) -> Result<(), Box<dyn Error>> {
    match action {
        TrackAction::Start => start().await,
        TrackAction::Status => status(),
    }
}

async fn start() -> Result<(), Box<dyn Error>> {
    let config = Config::load_or_default();
    let app_id = config.tracking.app_id.clone();
    let store = Arc::new(SqliteStore::open()?);
    let svc = DetoxService::new(config, store, Arc::new(ConsoleNotifier));

    // While this process runs, the tracked app counts as foregrounded.
    let (_tx, rx) = watch::channel(ForegroundState::Foreground);
    svc.attach_foreground(rx);
    svc.start();
    println!("tracking '{app_id}' (Ctrl-C to stop)");

    tokio::signal::ctrl_c().await?;
    svc.shutdown();

    let record = svc.ledger().today_usage(&app_id);
    println!(
        "\nstopped. today: {} across {} sessions",
        format_human(record.time_spent_ms),
        record.sessions
    );
    Ok(())
}

fn status() -> Result<(), Box<dyn Error>> {
    let svc = super::open_service()?;
    let app_id = svc.config().tracking.app_id.clone();
    let check = svc.check_limit(&app_id);
    println!("app:       {app_id}");
    println!("used:      {}", format_human(check.used_ms));
    match check.limit_ms {
        Some(limit) => {
            println!("limit:     {}", format_human(limit));
            println!(
                "remaining: {}",
                format_human(check.remaining_ms.unwrap_or(0))
            );
            if check.exceeded {
                println!("status:    limit reached");
            }
        }
        None => println!("limit:     none"),
    }
    Ok(())
}
