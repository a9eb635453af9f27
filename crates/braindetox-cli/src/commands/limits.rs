use std::error::Error;

use braindetox_core::format_human;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum LimitsAction {
    /// Set an app's daily limit
    Set {
        app: String,
        /// Limit in minutes per day
        #[arg(long)]
        minutes: u64,
    },
    /// Remove an app's limit
    Remove { app: String },
    /// All configured limits with today's standing
    List,
    /// Check one app against its limit, as JSON
    Check { app: String },
}

pub fn run(action: LimitsAction) -> Result<(), Box<dyn Error>> {
    let svc = super::open_service()?;
    match action {
        LimitsAction::Set { app, minutes } => {
            svc.set_app_limit(&app, minutes * 60_000)?;
            println!("{app}: {} per day", format_human(minutes * 60_000));
        }
        LimitsAction::Remove { app } => {
            svc.remove_app_limit(&app)?;
            println!("{app}: limit removed");
        }
        LimitsAction::List => {
            let limits = svc.policy().all_limits();
            if limits.is_empty() {
                println!("no limits configured");
                return Ok(());
            }
            let mut apps: Vec<&String> = limits.keys().collect();
            apps.sort();
            for app in apps {
                let check = svc.check_limit(app);
                let standing = if check.exceeded {
                    "limit reached".to_string()
                } else {
                    format!("{} left", format_human(check.remaining_ms.unwrap_or(0)))
                };
                println!(
                    "{app}: {} per day, used {}, {standing}",
                    format_human(limits[app].time_limit_ms),
                    format_human(check.used_ms)
                );
            }
        }
        LimitsAction::Check { app } => {
            let check = svc.check_limit(&app);
            println!("{}", serde_json::to_string_pretty(&check)?);
        }
    }
    Ok(())
}
