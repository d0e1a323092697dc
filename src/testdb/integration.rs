//! End-to-end extraction runs over generated backups

use super::generator::{BackupBuilder, FixtureAsset, StoreLayout};
use super::scenarios::{BackupScenario, ScenarioLibrary};
use crate::core::config::Config;
use crate::core::extractor::{BackupExtractor, ExtractionSummary, RunOptions};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::TempDir;

struct Workspace {
    _dir: TempDir,
    backup: PathBuf,
    export: PathBuf,
    csv: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let backup = dir.path().join("backup");
        let export = dir.path().join("export");
        let csv = dir.path().join("files.csv");
        Self {
            _dir: dir,
            backup,
            export,
            csv,
        }
    }

    fn config(&self) -> Config {
        let mut config = Config::default();
        config.backup.directory = self.backup.clone();
        config.output.directory = self.export.clone();
        config.output.csv_file = self.csv.clone();
        config
    }
}

fn run_with(config: Config, options: RunOptions) -> ExtractionSummary {
    BackupExtractor::new(config, Arc::new(AtomicBool::new(false)))
        .run(&options)
        .unwrap()
}

fn run_scenario(scenario: &BackupScenario, options: RunOptions) -> (Workspace, ExtractionSummary) {
    let ws = Workspace::new();
    scenario.build(&ws.backup).unwrap();
    let summary = run_with(ws.config(), options);
    (ws, summary)
}

fn csv_records(path: &Path) -> Vec<csv::StringRecord> {
    csv::Reader::from_path(path)
        .unwrap()
        .records()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

#[test]
fn test_every_scenario_meets_expectations() {
    for scenario in ScenarioLibrary::all_scenarios() {
        let (_ws, summary) = run_scenario(&scenario, RunOptions::default());
        let expected = &scenario.expected;
        let name = scenario.name.as_str();

        assert_eq!(summary.statistics.total_count, expected.media_files, "{}", name);
        assert_eq!(summary.export.exported, expected.exported, "{}", name);
        assert_eq!(summary.metadata.available, expected.metadata_available, "{}", name);
        assert_eq!(summary.metadata.schema.as_deref(), expected.schema, "{}", name);
        assert_eq!(summary.metadata.anomalies(), expected.anomalies, "{}", name);

        let matched = summary.files.iter().filter(|f| !f.metadata.capture_time.is_empty()).count();
        assert_eq!(matched, expected.matched, "{}", name);
    }
}

#[test]
fn test_modern_export_and_csv() {
    let (ws, summary) = run_scenario(&ScenarioLibrary::modern_library(), RunOptions::default());

    let exported = ws.export.join("100APPLE").join("IMG_0001.HEIC");
    assert!(exported.is_file());
    assert!(ws.export.join("101APPLE").join("IMG_0102.HEIC").is_file());
    assert_eq!(summary.csv_path.as_deref(), Some(ws.csv.as_path()));

    let records = csv_records(&ws.csv);
    assert_eq!(records.len(), 6);

    let first = records
        .iter()
        .find(|r| &r[0] == "Media/DCIM/100APPLE/IMG_0001.HEIC")
        .unwrap();
    assert_eq!(&first[1], "IMG_0001.HEIC");
    assert_eq!(&first[4], exported.display().to_string().as_str());
    assert_eq!(&first[5], "2022-03-21T11:19:30.781480");
    assert_eq!(&first[6], "35.6812");
    assert_eq!(&first[7], "139.7671");
    assert_eq!(&first[8], "GMT+0900");
    assert_eq!(&first[9], "false");

    let favorite = records
        .iter()
        .find(|r| &r[0] == "Media/DCIM/100APPLE/IMG_0003.MOV")
        .unwrap();
    assert_eq!(&favorite[9], "true");
    assert_eq!(&favorite[6], "");

    let exif = records
        .iter()
        .find(|r| &r[0] == "Media/DCIM/101APPLE/IMG_0100.HEIC")
        .unwrap();
    assert_eq!(&exif[5], "2023-07-04T18:30:00");

    let unsynced = records
        .iter()
        .find(|r| &r[0] == "Media/DCIM/101APPLE/IMG_0102.HEIC")
        .unwrap();
    assert_eq!(&unsynced[5], "2022-03-21T02:19:30.781480Z");
    assert_eq!(&unsynced[8], "");
    assert_eq!(&unsynced[9], "false");

    let trashed = records
        .iter()
        .find(|r| &r[0] == "Media/DCIM/101APPLE/IMG_0101.PNG")
        .unwrap();
    assert_eq!(&trashed[5], "");

    let matches = summary.metadata.matches.unwrap();
    assert_eq!(matches.matched, 5);
    assert_eq!(matches.unmatched, 1);
}

#[test]
fn test_dry_run_creates_nothing() {
    let (ws, summary) = run_scenario(
        &ScenarioLibrary::modern_library(),
        RunOptions {
            dry_run: true,
            ..Default::default()
        },
    );

    assert!(summary.dry_run);
    assert_eq!(summary.export.exported, 6);
    assert!(summary.csv_path.is_none());
    assert!(!ws.export.exists());
    assert!(!ws.csv.exists());
    assert_eq!(
        summary.files[0].export_path.parent(),
        Some(ws.export.join("100APPLE").as_path())
    );
}

#[test]
fn test_limit_processes_first_entries() {
    let (_ws, summary) = run_scenario(
        &ScenarioLibrary::modern_library(),
        RunOptions {
            limit: Some(2),
            ..Default::default()
        },
    );

    assert_eq!(summary.export.processed, 2);
    let names: Vec<&str> = summary.files.iter().map(|f| f.file_name.as_str()).collect();
    assert_eq!(names, vec!["IMG_0001.HEIC", "IMG_0002.JPG"]);
}

#[test]
fn test_collisions_are_renamed() {
    let ws = Workspace::new();
    BackupBuilder::new()
        .photo(FixtureAsset::new("DCIM/100APPLE", "IMG_0001.HEIC"), 64)
        .with_photo_store(StoreLayout::Modern)
        .build(&ws.backup)
        .unwrap();

    fs::create_dir_all(ws.export.join("100APPLE")).unwrap();
    fs::write(ws.export.join("100APPLE").join("IMG_0001.HEIC"), b"already here").unwrap();

    let summary = run_with(ws.config(), RunOptions::default());
    assert_eq!(summary.export.renamed, 1);
    assert_eq!(
        summary.files[0].export_path,
        ws.export.join("100APPLE").join("IMG_0001_1.HEIC")
    );
    assert_eq!(
        fs::read(ws.export.join("100APPLE").join("IMG_0001.HEIC")).unwrap(),
        b"already here"
    );
}

#[test]
fn test_flat_export_without_structure() {
    let ws = Workspace::new();
    ScenarioLibrary::legacy_library().build(&ws.backup).unwrap();

    let mut config = ws.config();
    config.output.preserve_structure = false;
    let summary = run_with(config, RunOptions::default());

    assert_eq!(summary.export.exported, 3);
    assert!(ws.export.join("IMG_0001.HEIC").is_file());
    assert!(!ws.export.join("100APPLE").exists());
}

#[test]
fn test_unsupported_store_still_exports_everything() {
    let (ws, summary) = run_scenario(&ScenarioLibrary::unsupported_schema(), RunOptions::default());

    assert!(!summary.metadata.available);
    assert!(summary
        .metadata
        .unavailable_reason
        .as_deref()
        .unwrap()
        .contains("Unsupported Photos.sqlite schema"));
    assert!(summary.metadata.matches.is_none());

    let records = csv_records(&ws.csv);
    assert_eq!(records.len(), 3);
    for record in &records {
        assert_eq!(&record[5], "");
        assert_eq!(&record[6], "");
        assert_eq!(&record[9], "false");
    }
}

#[test]
fn test_metadata_disabled() {
    let ws = Workspace::new();
    ScenarioLibrary::modern_library().build(&ws.backup).unwrap();

    let mut config = ws.config();
    config.metadata.enabled = false;
    let summary = run_with(config, RunOptions::default());

    assert!(!summary.metadata.available);
    assert_eq!(
        summary.metadata.unavailable_reason.as_deref(),
        Some("Metadata enrichment disabled")
    );
    assert_eq!(summary.export.exported, 6);
}

#[test]
fn test_missing_blobs_are_skipped() {
    let (_ws, summary) = run_scenario(&ScenarioLibrary::missing_blobs(), RunOptions::default());
    assert_eq!(summary.statistics.missing_files, 2);
    assert_eq!(summary.export.missing, 2);
    assert_eq!(summary.export.errors, 0);
}

#[test]
fn test_shutdown_flag_stops_export() {
    let ws = Workspace::new();
    ScenarioLibrary::modern_library().build(&ws.backup).unwrap();

    let summary = BackupExtractor::new(ws.config(), Arc::new(AtomicBool::new(true)))
        .run(&RunOptions::default())
        .unwrap();

    assert!(summary.export.interrupted);
    assert_eq!(summary.export.exported, 0);
}

#[test]
fn test_missing_backup_dir_is_an_error() {
    let ws = Workspace::new();
    let result = BackupExtractor::new(ws.config(), Arc::new(AtomicBool::new(false)))
        .run(&RunOptions::default());
    assert!(result.is_err());
}
