//! Backup extraction module
//!
//! Drives a full run against one backup directory:
//! - Reading media entries from Manifest.db
//! - Statistics over the referenced blobs
//! - Bringing the Photos metadata gate up (or leaving it down)
//! - Copying blobs into the export directory with progress feedback
//! - Writing the CSV file list

use crate::core::config::Config;
use crate::core::error::{ExtractionError, MetadataError, Result};
use crate::core::export::{copy_blob, destination_dir, unique_path, write_csv, ExportedFile};
use crate::core::manifest::{ManifestDb, ManifestEntry};
use crate::metadata::index::IndexStats;
use crate::metadata::matcher::MatchStats;
use crate::metadata::{MediaRoot, MetadataColumns, MetadataGate};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Options for one extraction run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Report what would be exported without copying anything
    pub dry_run: bool,
    /// Process at most this many entries (`None` or `Some(0)` = all)
    pub limit: Option<usize>,
    /// Log every file
    pub verbose: bool,
    /// Draw a progress bar
    pub show_progress: bool,
}

impl RunOptions {
    fn effective_limit(&self) -> Option<usize> {
        self.limit.filter(|&n| n > 0)
    }
}

/// Statistics over the media entries of a backup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackupStatistics {
    pub total_count: usize,
    pub by_extension: BTreeMap<String, usize>,
    pub total_size: u64,
    pub missing_files: usize,
}

impl BackupStatistics {
    pub fn from_entries(entries: &[ManifestEntry]) -> Self {
        entries.iter().fold(
            BackupStatistics {
                total_count: entries.len(),
                ..Default::default()
            },
            |mut stats, entry| {
                *stats.by_extension.entry(entry.extension()).or_insert(0) += 1;
                match entry.file_size {
                    Some(size) => stats.total_size += size,
                    None => stats.missing_files += 1,
                }
                stats
            },
        )
    }
}

/// Counters of the export pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportStats {
    pub processed: usize,
    pub exported: usize,
    pub renamed: usize,
    pub missing: usize,
    pub errors: usize,
    pub total_bytes: u64,
    pub interrupted: bool,
}

/// Metadata side of a run summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetadataSummary {
    pub available: bool,
    pub schema: Option<String>,
    pub unavailable_reason: Option<String>,
    pub index: Option<IndexStats>,
    pub matches: Option<MatchStats>,
}

impl MetadataSummary {
    /// Row-level anomalies seen while indexing
    pub fn anomalies(&self) -> usize {
        self.index.as_ref().map_or(0, IndexStats::anomalies)
    }
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct ExtractionSummary {
    pub dry_run: bool,
    pub statistics: BackupStatistics,
    pub export: ExportStats,
    pub metadata: MetadataSummary,
    pub files: Vec<ExportedFile>,
    /// Where the file list was written (`None` in a dry run)
    pub csv_path: Option<PathBuf>,
}

impl std::fmt::Display for ExportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let size_mb = self.total_bytes as f64 / 1_048_576.0;
        write!(
            f,
            "Processed: {}, Exported: {}, Renamed: {}, Missing: {}, Errors: {}, Total size: {:.2} MB",
            self.processed, self.exported, self.renamed, self.missing, self.errors, size_mb
        )
    }
}

fn export_progress_bar(total: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        progress.set_style(style.progress_chars("#>-"));
    }
    progress
}

/// Extracts media from one backup directory
pub struct BackupExtractor {
    config: Config,
    shutdown_flag: Arc<AtomicBool>,
}

impl BackupExtractor {
    pub fn new(config: Config, shutdown_flag: Arc<AtomicBool>) -> Self {
        Self {
            config,
            shutdown_flag,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open the backup's manifest
    pub fn open_manifest(&self) -> Result<ManifestDb> {
        ManifestDb::open(&self.config.backup.directory)
    }

    /// Media entries of the backup, ordered by path
    pub fn media_entries(&self, manifest: &ManifestDb) -> Result<Vec<ManifestEntry>> {
        manifest.media_entries(&self.config.extraction)
    }

    /// Statistics over a set of media entries
    pub fn get_statistics(&self, entries: &[ManifestEntry]) -> BackupStatistics {
        BackupStatistics::from_entries(entries)
    }

    /// Bring the metadata gate up from the backup's Photos.sqlite.
    ///
    /// Never fails: every problem leaves the gate `Unavailable`.
    pub fn initialize_metadata(&self, manifest: &ManifestDb) -> MetadataGate {
        let settings = &self.config.metadata;
        let mut gate = MetadataGate::new(MediaRoot::new(&settings.media_root));

        if !settings.enabled {
            gate.disable();
            return gate;
        }

        let located = match manifest.locate_file(&settings.store_domain, &settings.store_path) {
            Ok(Some(path)) => Ok(path),
            Ok(None) => Err(MetadataError::StoreNotFound(format!(
                "{}/{} is not listed in the manifest",
                settings.store_domain, settings.store_path
            ))),
            Err(e) => Err(MetadataError::StoreUnreadable(format!(
                "manifest lookup failed: {}",
                e
            ))),
        };

        gate.initialize(located, &settings.to_index_options());
        gate
    }

    /// Copy entries into the export directory (or simulate it in a dry run)
    pub fn export_files(
        &self,
        manifest: &ManifestDb,
        entries: &[ManifestEntry],
        gate: &MetadataGate,
        options: &RunOptions,
    ) -> Result<(Vec<ExportedFile>, ExportStats, Option<MatchStats>)> {
        let export_dir = &self.config.output.directory;
        if !options.dry_run {
            fs::create_dir_all(export_dir).map_err(|e| {
                ExtractionError::IoError(format!(
                    "Failed to create export directory '{}': {}",
                    export_dir.display(),
                    e
                ))
            })?;
        }

        let selected = match options.effective_limit() {
            Some(limit) => &entries[..limit.min(entries.len())],
            None => entries,
        };
        if selected.len() < entries.len() {
            info!(
                "Processing first {} of {} files (limit applied)",
                selected.len(),
                entries.len()
            );
        }

        let mut engine = gate.engine();
        let mut files = Vec::with_capacity(selected.len());
        let mut stats = ExportStats::default();
        let progress = export_progress_bar(selected.len() as u64, options.show_progress);
        let total = selected.len();

        for (index, entry) in selected.iter().enumerate() {
            if self.shutdown_flag.load(Ordering::SeqCst) {
                warn!("Shutdown requested, stopping export...");
                progress.abandon_with_message("Export interrupted!");
                stats.interrupted = true;
                break;
            }

            progress.set_position(index as u64);
            let file_name = entry.file_name();
            progress.set_message(file_name.chars().take(30).collect::<String>());
            stats.processed += 1;

            let (Some(source), Some(file_size)) =
                (manifest.blob_path(&entry.file_id), entry.file_size)
            else {
                stats.missing += 1;
                if options.verbose {
                    progress.suspend(|| {
                        info!(
                            "[{}/{}] SKIP: {} (file not found)",
                            index + 1,
                            total,
                            file_name
                        )
                    });
                }
                continue;
            };

            let preserve = self.config.output.preserve_structure;
            let dest_dir = destination_dir(export_dir, entry, preserve);
            let dest = if options.dry_run {
                dest_dir.join(file_name)
            } else {
                unique_path(&dest_dir, file_name)
            };

            let copied = if options.dry_run {
                Ok(file_size)
            } else {
                copy_blob(&source, &dest, entry.modified_time)
            };

            match copied {
                Ok(bytes) => {
                    if dest.file_name().and_then(|n| n.to_str()) != Some(file_name) {
                        stats.renamed += 1;
                        debug!("Renamed on collision: {} -> {}", file_name, dest.display());
                    }

                    let metadata = match engine.as_mut() {
                        Some(engine) => engine.lookup(entry).columns(),
                        None => MetadataColumns::default(),
                    };

                    stats.exported += 1;
                    stats.total_bytes += bytes;
                    if options.verbose {
                        let mode = if options.dry_run { "[DRY RUN]" } else { "[OK]" };
                        progress.suspend(|| {
                            info!(
                                "[{}/{}] {}: {} ({} bytes)",
                                index + 1,
                                total,
                                mode,
                                file_name,
                                bytes
                            )
                        });
                    }

                    files.push(ExportedFile {
                        original_path: entry.relative_path.clone(),
                        file_name: file_name.to_string(),
                        file_size: bytes,
                        modified_time: entry.modified_time,
                        export_path: dest,
                        metadata,
                    });
                }
                Err(e) => {
                    stats.errors += 1;
                    progress.suspend(|| {
                        warn!(
                            "[{}/{}] ERROR: {} - {}",
                            index + 1,
                            total,
                            file_name,
                            e
                        )
                    });
                }
            }
        }

        if !stats.interrupted {
            progress.finish_with_message("Export complete!");
        }

        let match_stats = engine.map(|engine| engine.stats().clone());
        Ok((files, stats, match_stats))
    }

    /// Run the full pipeline: manifest, statistics, metadata, export, CSV
    pub fn run(&self, options: &RunOptions) -> Result<ExtractionSummary> {
        info!("Backup directory: {}", self.config.backup.directory.display());
        info!("Export directory: {}", self.config.output.directory.display());
        if options.dry_run {
            info!("DRY RUN MODE - no files will be copied");
        }

        let manifest = self.open_manifest()?;
        let entries = self.media_entries(&manifest)?;
        let statistics = self.get_statistics(&entries);
        if statistics.missing_files > 0 {
            warn!(
                "{} media files are listed in the manifest but missing from the backup",
                statistics.missing_files
            );
        }

        let gate = self.initialize_metadata(&manifest);
        let (files, export, matches) = self.export_files(&manifest, &entries, &gate, options)?;

        let metadata = MetadataSummary {
            available: gate.is_available(),
            schema: gate.index().map(|index| index.schema_name().to_string()),
            unavailable_reason: gate.unavailable_reason().map(|reason| reason.to_string()),
            index: gate.index().map(|index| index.stats().clone()),
            matches,
        };

        let csv_path = if options.dry_run {
            info!("DRY RUN: would save file list to {}", self.config.output.csv_file.display());
            None
        } else {
            write_csv(&self.config.output.csv_file, &files)?;
            info!("File list saved to {}", self.config.output.csv_file.display());
            Some(self.config.output.csv_file.clone())
        };

        info!("{}", export);
        if metadata.anomalies() > 0 {
            warn!("{} Photos.sqlite record anomalies", metadata.anomalies());
        }

        Ok(ExtractionSummary {
            dry_run: options.dry_run,
            statistics,
            export,
            metadata,
            files,
            csv_path,
        })
    }
}
