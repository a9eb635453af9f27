use std::error::Error;

use braindetox_core::format_human;

/// Print the seven-day overview: daily totals, weekly average, top
/// apps and configured limits.
pub fn run() -> Result<(), Box<dyn Error>> {
    let svc = super::open_service()?;
    let overview = svc.usage_overview();

    for day in &overview.days {
        println!(
            "{}: {} across {} sessions",
            day.date,
            format_human(day.total_time_ms),
            day.total_sessions
        );
    }
    println!(
        "weekly average: {} per day ({} total)",
        format_human(overview.weekly.average_time_ms as u64),
        format_human(overview.weekly.total_time_ms)
    );
    if !overview.top_apps.is_empty() {
        println!("most used:");
        for entry in &overview.top_apps {
            println!("  {}: {}", entry.app_id, format_human(entry.time_spent_ms));
        }
    }
    if !overview.limits.is_empty() {
        println!("limits:");
        let mut apps: Vec<&String> = overview.limits.keys().collect();
        apps.sort();
        for app in apps {
            println!(
                "  {app}: {} per day",
                format_human(overview.limits[app].time_limit_ms)
            );
        }
    }
    Ok(())
}
