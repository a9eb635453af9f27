use std::error::Error;

use braindetox_core::format_human;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum UsageAction {
    /// Today's per-app usage
    Today,
    /// Daily summaries for the last N days, as JSON
    History {
        /// Days to include, ending today
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Most used apps over a window
    Top {
        #[arg(long, default_value_t = 7)]
        days: u32,
        #[arg(long, default_value_t = 5)]
        count: usize,
    },
    /// Record a manual usage session
    Record {
        app: String,
        /// Session length in minutes
        #[arg(long)]
        minutes: u64,
    },
    /// Delete all usage history
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

pub fn run(action: UsageAction) -> Result<(), Box<dyn Error>> {
    let svc = super::open_service()?;
    match action {
        UsageAction::Today => {
            let summary = svc.today_summary();
            if summary.apps.is_empty() {
                println!("no usage recorded today");
                return Ok(());
            }
            let mut apps: Vec<_> = summary.apps.iter().collect();
            apps.sort_by(|a, b| b.1.time_spent_ms.cmp(&a.1.time_spent_ms));
            for (app, record) in apps {
                println!(
                    "{app}: {} across {} sessions",
                    format_human(record.time_spent_ms),
                    record.sessions
                );
            }
            println!(
                "total: {} across {} sessions",
                format_human(summary.total_time_ms),
                summary.total_sessions
            );
        }
        UsageAction::History { days } => {
            let stats = svc.ledger().stats_for_last_n_days(days);
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        UsageAction::Top { days, count } => {
            let top = svc.ledger().most_used_apps(days, count);
            if top.is_empty() {
                println!("no usage recorded");
                return Ok(());
            }
            for (rank, entry) in top.iter().enumerate() {
                println!(
                    "{}. {}: {} across {} sessions",
                    rank + 1,
                    entry.app_id,
                    format_human(entry.time_spent_ms),
                    entry.sessions
                );
            }
        }
        UsageAction::Record { app, minutes } => {
            let record = svc.ledger().record_session(&app, minutes * 60_000)?;
            println!(
                "{app}: {} today across {} sessions",
                format_human(record.time_spent_ms),
                record.sessions
            );
        }
        UsageAction::Clear { yes } => {
            if !yes {
                println!("this deletes all usage history; pass --yes to confirm");
                return Ok(());
            }
            svc.ledger().clear_all()?;
            println!("usage history cleared");
        }
    }
    Ok(())
}
