//! Command-line argument definitions
//!
//! This module defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Extract photos and videos from an iTunes/Finder device backup
#[derive(Parser, Debug)]
#[command(name = "backup-extractor")]
#[command(version)]
#[command(
    about = "Extract photos and videos from a device backup, enriched with Photos library metadata",
    long_about = None
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace (overrides config)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(flatten)]
    pub paths: PathArgs,

    /// Run options used when no subcommand is given
    #[command(flatten)]
    pub extract: ExtractArgs,
}

/// Location overrides shared by every command
#[derive(clap::Args, Debug, Clone, Default)]
pub struct PathArgs {
    /// Backup directory containing Manifest.db (overrides config and BACKUP_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    pub backup_dir: Option<PathBuf>,

    /// Directory to copy media into (overrides config and EXPORT_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    pub export_dir: Option<PathBuf>,

    /// CSV file listing exported files (overrides config and CSV_OUTPUT)
    #[arg(long, global = true, value_name = "FILE")]
    pub csv_output: Option<PathBuf>,
}

/// Options of an extraction run
#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractArgs {
    /// Show what would be exported without copying files or writing the CSV
    #[arg(long)]
    pub dry_run: bool,

    /// Process at most N files
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Print every file as it is processed
    #[arg(short, long)]
    pub verbose: bool,

    /// Skip Photos.sqlite metadata enrichment
    #[arg(long)]
    pub no_metadata: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract media files from the backup (default)
    Extract(ExtractArgs),

    /// Show statistics about the backup's media files and Photos library
    Stats {
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect Photos.sqlite and report which schema variant it matches
    Probe,

    /// Show current configuration
    ShowConfig,

    /// Generate a configuration file at a specific location
    GenerateConfig {
        /// Output path for the config file (defaults to standard location)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a synthetic backup for testing (no real device backup required)
    GenerateFixture {
        /// Directory to write the backup into
        #[arg(short, long)]
        output: PathBuf,

        /// Scenario to generate (see list-scenarios)
        #[arg(short, long, default_value = "modern")]
        scenario: String,
    },

    /// List the available fixture scenarios
    ListScenarios {
        /// Filter by tag
        #[arg(short, long)]
        tag: Option<String>,
    },
}

impl Args {
    /// Run options: the `extract` subcommand's, or the top-level ones
    pub fn extract_args(&self) -> &ExtractArgs {
        match &self.command {
            Some(Commands::Extract(args)) => args,
            _ => &self.extract,
        }
    }
}
