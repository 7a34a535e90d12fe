//! shotdedup CLI: command-line interface for event deduplication.
//!
//! Usage:
//!   shotdedup dedup <INPUT>      Deduplicate a JSONL event file
//!   shotdedup inspect <INPUT>    Print deduplication statistics
//!   shotdedup config             Show the effective configuration

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use shotdedup_common::config::{AppConfig, LoggingConfig};

mod commands;

#[derive(Parser)]
#[command(
    name = "shotdedup",
    about = "Collapse duplicate gunshot-detection reports into single events",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/shotdedup/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the deduplication parameters.
#[derive(Args, Debug, Clone, Default)]
pub struct BufferArgs {
    /// Buffer radius around each event (meters)
    #[arg(long)]
    pub spatial_buffer: Option<f64>,

    /// Time window within which events may be duplicates (minutes)
    #[arg(long)]
    pub temporal_buffer: Option<f64>,

    /// Drop rows with missing or malformed fields instead of failing
    #[arg(long)]
    pub skip_invalid: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Deduplicate a JSONL event file
    Dedup {
        /// Input JSONL file ("-" for stdin)
        input: PathBuf,

        /// Output JSONL file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        buffers: BufferArgs,

        /// Log deduplication statistics
        #[arg(long)]
        diagnostics: bool,
    },

    /// Print deduplication statistics without writing records
    Inspect {
        /// Input JSONL file ("-" for stdin)
        input: PathBuf,

        #[command(flatten)]
        buffers: BufferArgs,
    },

    /// Show the effective configuration as JSON
    Config {
        /// Also write it to the config file (creating parent directories)
        #[arg(long)]
        write: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let app_config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::load(),
    };

    // Initialize logging
    let logging = LoggingConfig {
        level: if cli.verbose {
            "debug".to_string()
        } else {
            app_config.logging.level.clone()
        },
        json: cli.json_logs || app_config.logging.json,
    };
    shotdedup_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Dedup {
            input,
            output,
            buffers,
            diagnostics,
        } => commands::dedup::run(&app_config, input, output, buffers, diagnostics),
        Commands::Inspect { input, buffers } => commands::inspect::run(&app_config, input, buffers),
        Commands::Config { write } => {
            commands::config::run(&app_config, cli.config.as_deref(), write)
        }
    }
}
