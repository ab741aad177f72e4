//! Gonio CLI: range-of-motion measurement from video.
//!
//! Usage:
//!   gonio analyze <MOVEMENT> <SIDE> <VIDEO>   Measure one movement in one video
//!   gonio batch <MANIFEST>                    Run several measurements concurrently
//!   gonio probe <VIDEO>                       Show decoded stream information
//!   gonio validate <LANDMARKS>                Summarize a landmark JSONL file
//!   gonio check                               Check system capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use gonio_common::config::{AppConfig, LoggingConfig};

mod commands;

#[derive(Parser)]
#[command(
    name = "gonio",
    about = "Clinical range-of-motion measurement from video",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to $GONIO_CONFIG or ~/.config/gonio/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure one movement in one video
    Analyze(commands::analyze::AnalyzeArgs),

    /// Run the measurements listed in a JSON manifest
    Batch {
        /// Path to the manifest file
        manifest: PathBuf,

        /// Maximum number of concurrent runs
        #[arg(short, long, default_value = "2")]
        jobs: usize,

        /// Append one measurement record per successful run to this JSONL file
        #[arg(long)]
        log: Option<PathBuf>,
    },

    /// Show decoded stream information for a video
    Probe {
        /// Path to the video
        path: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarize landmark coverage of a JSONL file
    Validate {
        /// Path to the landmark file
        path: PathBuf,

        /// Also check which frames carry the points this movement needs
        #[arg(long, requires = "side")]
        movement: Option<String>,

        /// Side for --movement
        #[arg(long)]
        side: Option<String>,
    },

    /// Check system capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let app = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };

    // Initialize logging
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        app.logging.level.clone()
    };
    gonio_common::logging::init_logging(&LoggingConfig {
        level,
        json: cli.json_logs || app.logging.json,
        file: app.logging.file.clone(),
    });

    match cli.command {
        Commands::Analyze(args) => commands::analyze::run(app, args).await,
        Commands::Batch {
            manifest,
            jobs,
            log,
        } => commands::batch::run(app, manifest, jobs, log).await,
        Commands::Probe { path, json } => commands::probe::run(&app, path, json),
        Commands::Validate {
            path,
            movement,
            side,
        } => commands::validate::run(&app, path, movement, side),
        Commands::Check => commands::check::run(&app, cli.config.as_deref()),
    }
}
