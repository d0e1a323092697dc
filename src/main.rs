//! Backup Media Extractor - CLI Entry Point
//!
//! Copies the photos and videos of an iTunes/Finder device backup into a plain
//! folder tree and lists them in a CSV, enriched with capture time, location and
//! favorite flags from the backup's Photos library.
//!
//! This binary is a thin wrapper around the library, handling argument parsing,
//! logging setup, and command dispatch.

use anyhow::{Context, Result};
use backup_media_extractor::cli::{self, Args, DualWriter};
use backup_media_extractor::core::config::Config;
use backup_media_extractor::{NAME, VERSION};
use clap::Parser;
use env_logger::Builder;
use log::{info, warn, LevelFilter};
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let (mut config, config_warning) = match args.config {
        Some(ref config_path) => match Config::load(config_path) {
            Ok(cfg) => (cfg, None),
            Err(e) => (Config::default(), Some(e)),
        },
        None => match Config::load_default() {
            Ok(cfg) => (cfg, None),
            Err(e) => (Config::default(), Some(e)),
        },
    };

    // Environment first, then the command line
    config.apply_env_overrides();
    if let Some(ref dir) = args.paths.backup_dir {
        config.backup.directory = dir.clone();
    }
    if let Some(ref dir) = args.paths.export_dir {
        config.output.directory = dir.clone();
    }
    if let Some(ref csv) = args.paths.csv_output {
        config.output.csv_file = csv.clone();
    }
    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }

    // Set up graceful shutdown handler
    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_flag_clone = shutdown_flag.clone();

    ctrlc::set_handler(move || {
        if shutdown_flag_clone.load(Ordering::SeqCst) {
            // Second Ctrl+C - force exit
            eprintln!("\nForce shutdown requested. Exiting immediately...");
            std::process::exit(1);
        } else {
            shutdown_flag_clone.store(true, Ordering::SeqCst);
            eprintln!(
                "\nGraceful shutdown requested. Finishing current file... (Press Ctrl+C again to force quit)"
            );
        }
    })
    .context("Failed to set Ctrl+C handler")?;

    // Initialize logger
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    if config.logging.log_to_file {
        // Set up logging to both console and file
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.logging.log_file)
            .with_context(|| {
                format!(
                    "Failed to open log file {}",
                    config.logging.log_file.display()
                )
            })?;

        Builder::new()
            .filter_level(log_level)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{} {} {}] {}",
                    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                    record.level(),
                    record.target(),
                    record.args()
                )
            })
            .target(env_logger::Target::Pipe(Box::new(DualWriter::new(log_file))))
            .init();

        info!("Logging to file: {}", config.logging.log_file.display());
    } else {
        Builder::new().filter_level(log_level).init();
    }

    info!("{} v{}", NAME, VERSION);

    if let Some(e) = config_warning {
        warn!("Failed to load config file, using defaults: {}", e);
    }

    // Run the command
    cli::run_command(&args, &config, shutdown_flag)?;

    Ok(())
}
