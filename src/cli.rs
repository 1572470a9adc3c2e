use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Bulk file procedures: move, delete, clean.
#[derive(Parser)]
#[command(name = "fileflow", version, about, long_about = None)]
pub struct Cli {
    /// Log decisions to stderr at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print JSON Schema for configuration files.
    Schema,
    /// Run every procedure of a configuration file, in order.
    Run(RunArgs),
    /// Remove empty directories below a directory.
    Clean(CleanArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Path to configuration JSON file.
    #[arg(long, required = true)]
    pub config: PathBuf,

    /// Only validate procedures, do not touch any file.
    #[arg(long)]
    pub validate_only: bool,

    /// Output one JSON object per event to stdout.
    #[arg(long)]
    pub json: bool,

    /// Show a progress bar.
    #[cfg(feature = "cli")]
    #[arg(long)]
    pub progress: bool,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Directory to clean. Defaults to the current directory.
    #[arg(long)]
    pub target: Option<PathBuf>,

    /// Output one JSON object per event to stdout.
    #[arg(long)]
    pub json: bool,
}
