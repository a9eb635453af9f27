use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "braindetox", version, about = "Brain Detox CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Foreground usage tracking
    Track {
        #[command(subcommand)]
        action: commands::track::TrackAction,
    },
    /// Countdown timers and focus sessions
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Daily app limits
    Limits {
        #[command(subcommand)]
        action: commands::limits::LimitsAction,
    },
    /// Usage history
    Usage {
        #[command(subcommand)]
        action: commands::usage::UsageAction,
    },
    /// Seven-day usage overview
    Stats,
    /// Detox puzzles
    Puzzle {
        #[command(subcommand)]
        action: commands::puzzle::PuzzleAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Export limits and usage history as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<std::path::PathBuf>,
    },
    /// Delete all usage, limit and puzzle data
    Reset {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Track { action } => commands::track::run(action).await,
        Commands::Timer { action } => commands::timer::run(action).await,
        Commands::Limits { action } => commands::limits::run(action),
        Commands::Usage { action } => commands::usage::run(action),
        Commands::Stats => commands::stats::run(),
        Commands::Puzzle { action } => commands::puzzle::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Export { out } => commands::export::run(out),
        Commands::Reset { yes } => commands::reset::run(yes),
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "braindetox",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
