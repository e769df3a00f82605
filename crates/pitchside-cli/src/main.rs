// pitchside entry point.
//
// Each invocation is one request: load config, run the normalize pipeline,
// derive the requested view and print it as JSON on stdout. Logs go to a
// file so stdout stays machine-readable.

mod report;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use pitchside_core::config;
use pitchside_core::pipeline::Pipeline;
use tracing::info;

#[derive(Parser)]
#[command(name = "pitchside")]
#[command(about = "Squad performance data pipeline", long_about = None)]
struct Cli {
    /// Project directory holding config/, defaults/ and the data files
    #[arg(short, long, default_value = ".")]
    base_dir: PathBuf,

    /// Pretty-print JSON output
    #[arg(short, long)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Per-source row counts, warnings and synthesized columns
    Status,
    /// Readiness overview (buckets, leaderboard, critical days)
    Readiness {
        #[command(flatten)]
        scope: Scope,
    },
    /// Recovery vs load trend per player
    Trends {
        #[command(flatten)]
        scope: Scope,
    },
    /// Session distances for one player
    Load {
        /// Player id or name
        player: String,
        /// Defaults to the player's latest season
        #[arg(long)]
        season: Option<String>,
    },
    /// Accelerations/decelerations above a threshold per player
    Sprint {
        /// Threshold column; defaults to the first one present
        #[arg(long)]
        column: Option<String>,
        #[arg(long, value_enum, default_value_t = Mode::Total)]
        mode: Mode,
        /// Defaults to the latest season
        #[arg(long)]
        season: Option<String>,
    },
    /// Weekly recovery trend, daily means, low-recovery cards and the
    /// recovery vs load trend
    Recovery {
        #[command(flatten)]
        scope: Scope,
    },
    /// Injury counts per type
    Injuries,
    /// Physical capability benchmarks
    Capability {
        #[command(flatten)]
        scope: Scope,
    },
    /// Match events summary
    Events {
        /// Opponent of the match
        #[arg(long = "match")]
        match_id: Option<String>,
        #[arg(long)]
        player: Option<String>,
        #[arg(long = "type")]
        event_types: Vec<String>,
    },
    /// Development plan history for one player, or latest objectives for all
    DevPlan { player: Option<String> },
    /// External factor notes, newest first
    Notes,
    /// Individual priority areas as loaded
    Priority,
    /// FBref season statistics with per-90 rates
    Fbref {
        /// Only this player's row
        player: Option<String>,
    },
    /// UCL matches found on disk
    Ucl,
    /// Append an entry to a source file
    Add {
        #[command(subcommand)]
        entry: report::AddCommand,
    },
}

#[derive(Args)]
struct Scope {
    /// Season label such as 2024/2025; defaults to the latest
    #[arg(long)]
    season: Option<String>,
    /// Player id or name
    #[arg(long)]
    player: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Total,
    AveragePerSession,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let config = config::load_config(&cli.base_dir)
        .with_context(|| format!("failed to load configuration from {}", cli.base_dir.display()))?;
    info!(base_dir = %cli.base_dir.display(), "config loaded");

    let mut pipeline = Pipeline::new(config);
    let output = report::run(&mut pipeline, cli.command)?;

    let json = if cli.pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }
    .context("failed to serialize response")?;
    println!("{json}");
    Ok(())
}

/// Log to a file; stdout carries the JSON response.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = match directories::ProjectDirs::from("", "", "pitchside") {
        Some(dirs) => dirs.data_local_dir().join("logs"),
        None => std::env::current_dir()?.join("logs"),
    };
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("pitchside.log"))
        .context("failed to open log file")?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pitchside_core=info,pitchside=info,warn")),
        )
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
