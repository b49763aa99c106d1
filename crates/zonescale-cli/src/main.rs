use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "zonescale",
    about = "ZoneScale: zone-aware autoscaling decisions",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter zonescale.toml
    Init {
        /// Output path
        #[arg(short, long, default_value = "zonescale.toml")]
        path: PathBuf,
        /// Workload id for the scaffolded entry
        #[arg(short, long, default_value = "default/api")]
        workload: String,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Load and validate a config file
    Validate {
        #[arg(short, long, default_value = "zonescale.toml")]
        config: PathBuf,
    },
    /// Run one enforcement cycle for a workload against a snapshot file.
    ///
    /// The snapshot is a JSON object keyed by workload id, each entry
    /// holding `statistics`, `membership`, and optionally `last_enforced`.
    Evaluate {
        #[arg(short, long, default_value = "zonescale.toml")]
        config: PathBuf,
        /// Workload id to evaluate
        #[arg(short, long)]
        workload: String,
        /// Snapshot JSON file
        #[arg(short, long)]
        snapshot: PathBuf,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Run the scaling loop against a snapshot file that is re-read every tick
    Run {
        #[arg(short, long, default_value = "zonescale.toml")]
        config: PathBuf,
        /// Snapshot JSON file
        #[arg(short, long)]
        snapshot: PathBuf,
        /// Tick interval (e.g. "30s", "1m")
        #[arg(short, long, default_value = "30s", value_parser = parse_interval)]
        interval: Duration,
        /// Stop after this many ticks instead of waiting for Ctrl-C
        #[arg(long)]
        ticks: Option<u64>,
    },
}

fn parse_interval(s: &str) -> Result<Duration, String> {
    zonescale_core::duration::parse(s).map_err(|e| e.to_string())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,zonescale=debug"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Commands::Init { path, workload, force } => commands::init::init(&path, &workload, force),
        Commands::Validate { config } => commands::validate::validate(&config),
        Commands::Evaluate {
            config,
            workload,
            snapshot,
            format,
        } => commands::evaluate::evaluate(&config, &workload, &snapshot, &format),
        Commands::Run {
            config,
            snapshot,
            interval,
            ticks,
        } => commands::run::run(&config, &snapshot, interval, ticks).await,
    }
}
