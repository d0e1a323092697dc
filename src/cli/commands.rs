//! Command handler implementations
//!
//! This module contains the implementation of all CLI commands.

use crate::cli::progress::{
    format_bytes, format_duration, print_counts, print_divider, print_error, print_header,
    print_info, print_step, print_success, print_warning,
};
use crate::cli::{Args, Commands, ExtractArgs};
use crate::core::config::{write_default_config, Config};
use crate::core::extractor::{BackupExtractor, BackupStatistics, ExtractionSummary, RunOptions};
use crate::metadata::gate::open_store;
use crate::metadata::{probe_store, StoreStatistics};
use crate::testdb::ScenarioLibrary;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

/// Run the appropriate command based on CLI arguments
pub fn run_command(args: &Args, config: &Config, shutdown_flag: Arc<AtomicBool>) -> Result<()> {
    match &args.command {
        None | Some(Commands::Extract(_)) => {
            extract_media(config, args.extract_args(), shutdown_flag)?;
        }
        Some(Commands::Stats { json }) => {
            show_statistics(config, *json)?;
        }
        Some(Commands::Probe) => {
            probe_photo_store(config)?;
        }
        Some(Commands::ShowConfig) => {
            show_config(config);
        }
        Some(Commands::GenerateConfig { output }) => {
            generate_config_file(output.clone())?;
        }
        Some(Commands::GenerateFixture { output, scenario }) => {
            generate_fixture(output, scenario)?;
        }
        Some(Commands::ListScenarios { tag }) => {
            list_scenarios(tag.as_deref());
        }
    }

    Ok(())
}

/// Extract every media file of the backup and write the CSV listing
pub fn extract_media(
    config: &Config,
    extract: &ExtractArgs,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<()> {
    let mut config = config.clone();
    if extract.no_metadata {
        config.metadata.enabled = false;
    }
    config.validate()?;

    let options = RunOptions {
        dry_run: extract.dry_run,
        limit: extract.limit,
        verbose: extract.verbose,
        show_progress: true,
    };
    debug!("Run options: {:?}", options);

    let started = Instant::now();
    let summary = BackupExtractor::new(config, shutdown_flag).run(&options)?;
    print_extraction_summary(&summary);
    print_info(&format!("Elapsed: {}", format_duration(started.elapsed())));

    if summary.export.interrupted {
        warn!("Extraction was interrupted before all files were processed");
    }

    Ok(())
}

fn print_backup_statistics(stats: &BackupStatistics) {
    print_info(&format!("Media files in manifest: {}", stats.total_count));
    print_info(&format!("Total size: {}", format_bytes(stats.total_size)));
    if stats.missing_files > 0 {
        print_warning(&format!(
            "{} file(s) listed in the manifest have no blob on disk",
            stats.missing_files
        ));
    }
    print_counts(
        stats
            .by_extension
            .iter()
            .map(|(ext, count)| (ext.as_str(), *count)),
    );
}

fn print_extraction_summary(summary: &ExtractionSummary) {
    print_header(if summary.dry_run {
        "DRY RUN SUMMARY"
    } else {
        "EXTRACTION SUMMARY"
    });

    print_backup_statistics(&summary.statistics);
    print_divider();

    let export = &summary.export;
    print_success(&format!(
        "{} {} ({})",
        if summary.dry_run {
            "Would export"
        } else {
            "Exported"
        },
        export.exported,
        format_bytes(export.total_bytes)
    ));
    if export.renamed > 0 {
        print_info(&format!("Renamed to avoid collisions: {}", export.renamed));
    }
    if export.missing > 0 {
        print_warning(&format!("Skipped without blob: {}", export.missing));
    }
    if export.errors > 0 {
        print_error(&format!("Failed to copy: {}", export.errors));
    }

    let metadata = &summary.metadata;
    if metadata.available {
        print_success(&format!(
            "Photos metadata: {} schema",
            metadata.schema.as_deref().unwrap_or("unknown")
        ));
        if let Some(matches) = &metadata.matches {
            print_info(&format!(
                "Matched: {}, Unmatched: {}, Outside media root: {}",
                matches.matched, matches.unmatched, matches.outside_root
            ));
        }
        if let Some(index) = &metadata.index {
            print_info(&format!(
                "Indexed {} of {} asset rows ({} cloud-only excluded)",
                index.indexed, index.rows_scanned, index.cloud_only_excluded
            ));
            if metadata.anomalies() > 0 {
                print_warning(&format!(
                    "Record anomalies: {} (unknown cloud state: {}, bad timestamps: {}, duplicate paths: {})",
                    metadata.anomalies(),
                    index.unknown_cloud_state,
                    index.malformed_timestamps,
                    index.duplicate_paths
                ));
            }
        }
    } else {
        print_warning(&format!(
            "Photos metadata unavailable: {}",
            metadata.unavailable_reason.as_deref().unwrap_or("unknown")
        ));
    }

    if let Some(csv) = &summary.csv_path {
        print_success(&format!("File list written to {}", csv.display()));
    }
}

/// Statistics printed by `stats --json`
#[derive(Debug, Serialize)]
struct StatisticsReport {
    backup: BackupStatistics,
    photos: Option<StoreStatistics>,
    metadata_unavailable: Option<String>,
}

/// Show statistics about the backup's media and its Photos library
pub fn show_statistics(config: &Config, json: bool) -> Result<()> {
    let extractor = BackupExtractor::new(config.clone(), Arc::new(AtomicBool::new(false)));

    if !json {
        print_header("BACKUP STATISTICS");
        print_step(1, 2, "Reading Manifest.db");
    }
    let manifest = extractor.open_manifest()?;
    let entries = extractor.media_entries(&manifest)?;
    let statistics = extractor.get_statistics(&entries);

    if !json {
        print_step(2, 2, "Reading Photos.sqlite");
    }
    let gate = extractor.initialize_metadata(&manifest);

    let report = StatisticsReport {
        backup: statistics,
        photos: gate.store_statistics().cloned(),
        metadata_unavailable: gate.unavailable_reason().map(|e| e.to_string()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_divider();
    print_backup_statistics(&report.backup);
    print_divider();

    match (&report.photos, &report.metadata_unavailable) {
        (Some(photos), _) => {
            print_success(&format!("Photos.sqlite schema: {}", photos.schema));
            let count = |n: i64| usize::try_from(n).unwrap_or(0);
            print_counts([
                ("Assets", count(photos.total_assets)),
                ("With GPS", count(photos.assets_with_gps)),
                ("Favorites", count(photos.favorite_assets)),
                ("In trash", count(photos.trashed_assets)),
            ]);
            if let Some(index) = gate.index() {
                print_info(&format!("Indexed records: {}", index.len()));
            }
        }
        (None, Some(reason)) => print_warning(&format!("Photos metadata unavailable: {}", reason)),
        (None, None) => print_warning("Photos metadata unavailable"),
    }

    Ok(())
}

/// Report which schema variant the backup's Photos.sqlite matches
pub fn probe_photo_store(config: &Config) -> Result<()> {
    let extractor = BackupExtractor::new(config.clone(), Arc::new(AtomicBool::new(false)));
    let manifest = extractor.open_manifest()?;
    let settings = &config.metadata;

    print_header("PHOTOS.SQLITE PROBE");

    let path = match manifest.locate_file(&settings.store_domain, &settings.store_path)? {
        Some(path) => path,
        None => {
            print_error(&format!(
                "{}/{} is not listed in the manifest",
                settings.store_domain, settings.store_path
            ));
            return Ok(());
        }
    };
    print_info(&format!("Store blob: {}", path.display()));

    let conn = match open_store(&path) {
        Ok(conn) => conn,
        Err(e) => {
            print_error(&e.to_string());
            return Ok(());
        }
    };

    // A file that is not SQLite only fails here, on the first query
    match probe_store(&conn) {
        Ok(schema) => {
            let variant = &schema.variant;
            print_success(&format!(
                "Schema variant: {} ({}, table {})",
                variant.name, variant.os_versions, variant.asset_table
            ));
            let missing = schema.missing_optional_columns();
            if missing.is_empty() {
                print_info("All optional columns present");
            } else {
                print_warning("Optional columns missing (read as empty):");
                for column in &missing {
                    println!("      {}", column);
                }
            }
        }
        Err(e) => print_error(&e.to_string()),
    }

    Ok(())
}

/// Generate a config file at the specified location or the standard location
pub fn generate_config_file(output: Option<PathBuf>) -> Result<()> {
    let output_path = write_default_config(output.as_deref())?;

    info!("Configuration file: {}", output_path.display());
    info!("Edit this file to customize the extraction settings.");

    Ok(())
}

/// Show the current configuration settings
pub fn show_config(config: &Config) {
    let config_path = Config::get_active_config_path();
    info!("Configuration file: {}", config_path.display());
    if !config_path.exists() {
        info!("(Using default settings - no config file found)");
    }
    info!("");
    info!("Current Configuration:");
    info!("----------------------");
    info!("[backup]");
    info!("  directory = \"{}\"", config.backup.directory.display());
    info!("");
    info!("[output]");
    info!("  directory = \"{}\"", config.output.directory.display());
    info!("  csv_file = \"{}\"", config.output.csv_file.display());
    info!(
        "  preserve_structure = {}",
        config.output.preserve_structure
    );
    info!("");
    info!("[extraction]");
    info!("  path_pattern = \"{}\"", config.extraction.path_pattern);
    info!(
        "  media_extensions = {:?}",
        config.extraction.media_extensions
    );
    info!("");
    info!("[metadata]");
    info!("  enabled = {}", config.metadata.enabled);
    info!("  store_domain = \"{}\"", config.metadata.store_domain);
    info!("  store_path = \"{}\"", config.metadata.store_path);
    info!("  media_root = \"{}\"", config.metadata.media_root);
    info!(
        "  exclude_cloud_only = {}",
        config.metadata.exclude_cloud_only
    );
    info!(
        "  local_cloud_states = {:?}",
        config.metadata.local_cloud_states
    );
    info!(
        "  cloud_only_states = {:?}",
        config.metadata.cloud_only_states
    );
    info!("");
    info!("[logging]");
    info!("  level = \"{}\"", config.logging.level);
    info!("  log_to_file = {}", config.logging.log_to_file);
    info!("  log_file = \"{}\"", config.logging.log_file.display());

    if let Err(e) = config.validate() {
        info!("");
        info!("Note: {}", e);
    }
}

/// Write one of the predefined backup scenarios to disk
pub fn generate_fixture(output: &Path, scenario_name: &str) -> Result<()> {
    let scenario = ScenarioLibrary::by_name(scenario_name).with_context(|| {
        format!(
            "Unknown scenario '{}'. Run 'backup-extractor list-scenarios' to see the options.",
            scenario_name
        )
    })?;

    let fixture = scenario.build(output)?;

    print_header("FIXTURE GENERATED");
    print_success(&format!("Scenario: {}", scenario.name));
    print_info(&scenario.description);
    print_info(&format!("Backup directory: {}", fixture.root.display()));
    print_info(&format!(
        "Media entries: {} ({} with blobs)",
        fixture.media_files, fixture.media_blobs
    ));
    match &fixture.photo_store_path {
        Some(path) => print_info(&format!("Photos.sqlite blob: {}", path.display())),
        None => print_info("No Photos.sqlite blob"),
    }
    println!();
    println!(
        "  Try: backup-extractor --backup-dir {} --export-dir ./export --csv-output ./files.csv --dry-run",
        fixture.root.display()
    );

    Ok(())
}

/// List the predefined backup scenarios
pub fn list_scenarios(tag_filter: Option<&str>) {
    let scenarios = match tag_filter {
        Some(tag) => ScenarioLibrary::scenarios_by_tag(tag),
        None => ScenarioLibrary::all_scenarios(),
    };

    if scenarios.is_empty() {
        match tag_filter {
            Some(tag) => println!("No scenarios found with tag '{}'", tag),
            None => println!("No scenarios available"),
        }
        return;
    }

    print_header("AVAILABLE SCENARIOS");
    for scenario in &scenarios {
        let tags_str = if scenario.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", scenario.tags.join(", "))
        };
        println!("  • {} - {}{}", scenario.name, scenario.description, tags_str);
    }
    println!();
}
