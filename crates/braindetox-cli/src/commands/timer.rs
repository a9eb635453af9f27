use std::collections::BTreeMap;
use std::error::Error;
use std::io::Write;
use std::sync::Arc;

use braindetox_core::{format_clock, KvStore, SqliteStore, TimerHooks, TimerRegistry};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

const TIMERS_KEY: &str = "timers";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a named countdown
    Start {
        id: String,
        /// Duration in minutes
        #[arg(long, default_value_t = 25)]
        minutes: u64,
        /// Extra seconds on top of the minutes
        #[arg(long, default_value_t = 0)]
        seconds: u64,
    },
    /// Pause a running countdown
    Pause { id: String },
    /// Resume a paused countdown
    Resume { id: String },
    /// Stop and remove a countdown
    Stop { id: String },
    /// Remaining time for one countdown
    Status { id: String },
    /// All countdowns
    List,
    /// Run an attached focus countdown to completion
    Focus {
        /// Duration in minutes
        #[arg(long, default_value_t = 25)]
        minutes: u64,
        /// Extra seconds on top of the minutes
        #[arg(long, default_value_t = 0)]
        seconds: u64,
    },
}

/// Wall-clock snapshot of a countdown. Remaining time is derived on
/// load, so timers keep counting between CLI invocations.
#[derive(Debug, Serialize, Deserialize)]
struct StoredTimer {
    duration_ms: u64,
    started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    paused_remaining_ms: Option<u64>,
}

impl StoredTimer {
    fn remaining_ms(&self) -> u64 {
        if let Some(ms) = self.paused_remaining_ms {
            return ms;
        }
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds()
            .max(0) as u64;
        self.duration_ms.saturating_sub(elapsed)
    }

    fn state(&self) -> &'static str {
        if self.paused_remaining_ms.is_some() {
            "paused"
        } else if self.remaining_ms() == 0 {
            "done"
        } else {
            "running"
        }
    }
}

type Timers = BTreeMap<String, StoredTimer>;

fn open() -> Result<(SqliteStore, Timers), Box<dyn Error>> {
    let store = SqliteStore::open()?;
    let timers = match store.get(TIMERS_KEY)? {
        Some(value) => serde_json::from_value(value).unwrap_or_default(),
        None => Timers::new(),
    };
    Ok((store, timers))
}

fn save(store: &SqliteStore, timers: &Timers) -> Result<(), Box<dyn Error>> {
    store.set(TIMERS_KEY, &serde_json::to_value(timers)?)?;
    Ok(())
}

fn duration_ms(minutes: u64, seconds: u64) -> u64 {
    minutes * 60_000 + seconds * 1_000
}

pub async fn run(action: TimerAction) -> Result<(), Box<dyn Error>> {
    match action {
        TimerAction::Start {
            id,
            minutes,
            seconds,
        } => start(&id, duration_ms(minutes, seconds)),
        TimerAction::Pause { id } => pause(&id),
        TimerAction::Resume { id } => resume(&id),
        TimerAction::Stop { id } => stop(&id),
        TimerAction::Status { id } => status(&id),
        TimerAction::List => list(),
        TimerAction::Focus { minutes, seconds } => focus(duration_ms(minutes, seconds)).await,
    }
}

fn start(id: &str, duration_ms: u64) -> Result<(), Box<dyn Error>> {
    if duration_ms == 0 {
        return Err("duration must be positive".into());
    }
    let (store, mut timers) = open()?;
    timers.insert(
        id.to_string(),
        StoredTimer {
            duration_ms,
            started_at: Utc::now(),
            paused_remaining_ms: None,
        },
    );
    save(&store, &timers)?;
    println!("{id}: {} remaining", format_clock(duration_ms));
    Ok(())
}

fn pause(id: &str) -> Result<(), Box<dyn Error>> {
    let (store, mut timers) = open()?;
    let timer = timers
        .get_mut(id)
        .ok_or_else(|| format!("no timer named '{id}'"))?;
    if timer.paused_remaining_ms.is_none() {
        timer.paused_remaining_ms = Some(timer.remaining_ms());
    }
    let remaining = timer.remaining_ms();
    save(&store, &timers)?;
    println!("{id}: paused at {}", format_clock(remaining));
    Ok(())
}

fn resume(id: &str) -> Result<(), Box<dyn Error>> {
    let (store, mut timers) = open()?;
    let timer = timers
        .get_mut(id)
        .ok_or_else(|| format!("no timer named '{id}'"))?;
    if let Some(ms) = timer.paused_remaining_ms.take() {
        timer.duration_ms = ms;
        timer.started_at = Utc::now();
    }
    let remaining = timer.remaining_ms();
    save(&store, &timers)?;
    println!("{id}: {} remaining", format_clock(remaining));
    Ok(())
}

fn stop(id: &str) -> Result<(), Box<dyn Error>> {
    let (store, mut timers) = open()?;
    if timers.remove(id).is_none() {
        return Err(format!("no timer named '{id}'").into());
    }
    save(&store, &timers)?;
    println!("{id}: stopped");
    Ok(())
}

fn status(id: &str) -> Result<(), Box<dyn Error>> {
    let (_, timers) = open()?;
    let timer = timers
        .get(id)
        .ok_or_else(|| format!("no timer named '{id}'"))?;
    println!(
        "{id}: {} ({})",
        format_clock(timer.remaining_ms()),
        timer.state()
    );
    Ok(())
}

fn list() -> Result<(), Box<dyn Error>> {
    let (_, timers) = open()?;
    if timers.is_empty() {
        println!("no timers");
        return Ok(());
    }
    for (id, timer) in &timers {
        println!(
            "{id}: {} ({})",
            format_clock(timer.remaining_ms()),
            timer.state()
        );
    }
    Ok(())
}

/// Attached countdown: renders once per second, completes in place.
async fn focus(duration_ms: u64) -> Result<(), Box<dyn Error>> {
    let registry = TimerRegistry::new();
    let done = Arc::new(Notify::new());
    let hooks = TimerHooks::new()
        .on_tick(|remaining_ms| {
            print!("\r{}  ", format_clock(remaining_ms));
            let _ = std::io::stdout().flush();
        })
        .on_complete({
            let done = Arc::clone(&done);
            move || done.notify_one()
        });
    registry.start("focus", duration_ms, hooks)?;
    println!("focus session: {}", format_clock(duration_ms));

    tokio::select! {
        _ = done.notified() => {
            println!("\nfocus session complete");
        }
        _ = tokio::signal::ctrl_c() => {
            let remaining = registry.remaining_ms("focus");
            registry.stop("focus");
            println!("\ncancelled with {} remaining", format_clock(remaining));
        }
    }
    Ok(())
}
