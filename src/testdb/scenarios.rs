//! Predefined backup scenarios
//!
//! Each scenario pairs a [`BackupBuilder`] with the results an extraction run over
//! it should produce. They back the end-to-end tests and the `generate-fixture`
//! command.

use super::generator::{BackupBuilder, BackupFixture, FixtureAsset, StoreLayout, TEST_BLOB_SIZE};
use crate::core::error::Result;
use std::path::Path;

/// A complete backup scenario
#[derive(Debug, Clone)]
pub struct BackupScenario {
    /// Scenario name for identification
    pub name: String,
    /// Description of what this scenario covers
    pub description: String,
    /// Backup contents
    pub builder: BackupBuilder,
    /// Expected results of a full extraction run
    pub expected: ExpectedResults,
    /// Tags for filtering scenarios
    pub tags: Vec<String>,
}

/// Expected results of an extraction run over a scenario
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectedResults {
    /// Media entries listed in the manifest
    pub media_files: usize,
    /// Entries whose blob is copied
    pub exported: usize,
    /// Exported files carrying Photos metadata
    pub matched: usize,
    /// Whether the metadata gate comes up
    pub metadata_available: bool,
    /// Schema variant that should be selected
    pub schema: Option<&'static str>,
    /// Row-level anomalies counted while indexing
    pub anomalies: usize,
}

impl BackupScenario {
    pub fn new(
        name: &str,
        description: &str,
        builder: BackupBuilder,
        expected: ExpectedResults,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            builder,
            expected,
            tags: Vec::new(),
        }
    }

    /// Add tags to the scenario
    pub fn with_tags(mut self, tags: Vec<&str>) -> Self {
        self.tags = tags.into_iter().map(String::from).collect();
        self
    }

    /// Write the scenario's backup into `root`
    pub fn build(&self, root: &Path) -> Result<BackupFixture> {
        self.builder.build(root)
    }
}

/// Three ordinary local photos in one DCIM folder
fn basic_photos(builder: BackupBuilder) -> BackupBuilder {
    builder
        .photo(
            FixtureAsset::new("DCIM/100APPLE", "IMG_0001.HEIC")
                .with_gps(35.6812, 139.7671)
                .with_timezone("GMT+0900", Some(32400)),
            TEST_BLOB_SIZE,
        )
        .photo(FixtureAsset::new("DCIM/100APPLE", "IMG_0002.JPG"), TEST_BLOB_SIZE)
        .photo(FixtureAsset::new("DCIM/100APPLE", "IMG_0003.MOV").favorite(), TEST_BLOB_SIZE * 2)
}

/// Collection of all predefined scenarios
pub struct ScenarioLibrary;

impl ScenarioLibrary {
    // =========================================================================
    // SCHEMA VARIANTS
    // =========================================================================

    /// iOS 14+ library with every kind of asset row
    pub fn modern_library() -> BackupScenario {
        let builder = basic_photos(BackupBuilder::new())
            .photo(
                FixtureAsset::new("DCIM/101APPLE", "IMG_0100.HEIC")
                    .without_date()
                    .with_exif("2023:07:04 18:30:00"),
                TEST_BLOB_SIZE,
            )
            .photo(FixtureAsset::new("DCIM/101APPLE", "IMG_0101.PNG").trashed(), TEST_BLOB_SIZE)
            .photo(
                FixtureAsset::new("DCIM/101APPLE", "IMG_0102.HEIC").cloud_state(Some(0)),
                TEST_BLOB_SIZE,
            )
            .other_file("HomeDomain", "Library/SMS/sms.db", b"not media")
            .with_photo_store(StoreLayout::Modern);

        BackupScenario::new(
            "modern",
            "iOS 14+ Photos.sqlite (ZASSET) with GPS, favorites, EXIF fallback, trashed and unsynced rows",
            builder,
            ExpectedResults {
                media_files: 6,
                exported: 6,
                matched: 5,
                metadata_available: true,
                schema: Some("modern"),
                anomalies: 0,
            },
        )
        .with_tags(vec!["schema", "metadata", "basic"])
    }

    /// iOS 11-13 library
    pub fn legacy_library() -> BackupScenario {
        BackupScenario::new(
            "legacy",
            "iOS 11-13 Photos.sqlite (ZGENERICASSET)",
            basic_photos(BackupBuilder::new()).with_photo_store(StoreLayout::Legacy),
            ExpectedResults {
                media_files: 3,
                exported: 3,
                matched: 3,
                metadata_available: true,
                schema: Some("legacy"),
                anomalies: 0,
            },
        )
        .with_tags(vec!["schema", "metadata"])
    }

    /// Asset table with only the identity columns and a creation date
    pub fn minimal_schema() -> BackupScenario {
        BackupScenario::new(
            "minimal-schema",
            "ZASSET without location, favorite, trash or attribute columns",
            basic_photos(BackupBuilder::new()).with_photo_store(StoreLayout::Minimal),
            ExpectedResults {
                media_files: 3,
                exported: 3,
                matched: 3,
                metadata_available: true,
                schema: Some("modern"),
                anomalies: 0,
            },
        )
        .with_tags(vec!["schema", "metadata"])
    }

    /// Store from an unknown OS release
    pub fn unsupported_schema() -> BackupScenario {
        BackupScenario::new(
            "unsupported",
            "Photos.sqlite without any recognized asset table",
            basic_photos(BackupBuilder::new()).with_photo_store(StoreLayout::Unrecognized),
            ExpectedResults {
                media_files: 3,
                exported: 3,
                metadata_available: false,
                ..Default::default()
            },
        )
        .with_tags(vec!["schema", "degraded"])
    }

    // =========================================================================
    // DEGRADED STORES
    // =========================================================================

    /// No Photos.sqlite in the manifest
    pub fn missing_store() -> BackupScenario {
        BackupScenario::new(
            "missing-store",
            "Manifest does not list Photos.sqlite",
            basic_photos(BackupBuilder::new()),
            ExpectedResults {
                media_files: 3,
                exported: 3,
                metadata_available: false,
                ..Default::default()
            },
        )
        .with_tags(vec!["degraded"])
    }

    /// Photos.sqlite listed but its blob is gone
    pub fn store_blob_missing() -> BackupScenario {
        BackupScenario::new(
            "store-blob-missing",
            "Photos.sqlite listed in the manifest without a blob",
            basic_photos(BackupBuilder::new()).photo_store_without_blob(),
            ExpectedResults {
                media_files: 3,
                exported: 3,
                metadata_available: false,
                ..Default::default()
            },
        )
        .with_tags(vec!["degraded"])
    }

    /// Photos.sqlite blob that is not a database
    pub fn corrupt_store() -> BackupScenario {
        BackupScenario::new(
            "corrupt-store",
            "Photos.sqlite blob is not a SQLite database",
            basic_photos(BackupBuilder::new()).corrupt_photo_store(),
            ExpectedResults {
                media_files: 3,
                exported: 3,
                metadata_available: false,
                ..Default::default()
            },
        )
        .with_tags(vec!["degraded"])
    }

    // =========================================================================
    // RECORD ANOMALIES
    // =========================================================================

    /// Two asset rows claiming the same file
    pub fn duplicate_paths() -> BackupScenario {
        let builder = BackupBuilder::new()
            .photo(
                FixtureAsset::new("DCIM/100APPLE", "IMG_0001.HEIC")
                    .with_pk(7)
                    .favorite(),
                TEST_BLOB_SIZE,
            )
            .asset(FixtureAsset::new("DCIM/100APPLE", "IMG_0001.HEIC").with_pk(3))
            .photo(
                FixtureAsset::new("DCIM/100APPLE", "IMG_0002.HEIC")
                    .with_pk(4)
                    .cloud_state(Some(5)),
                TEST_BLOB_SIZE,
            )
            .with_photo_store(StoreLayout::Modern);

        BackupScenario::new(
            "duplicates",
            "Duplicate canonical paths and an unrecognized cloud state",
            builder,
            ExpectedResults {
                media_files: 2,
                exported: 2,
                matched: 1,
                metadata_available: true,
                schema: Some("modern"),
                anomalies: 2,
            },
        )
        .with_tags(vec!["metadata", "anomaly"])
    }

    /// Manifest entries whose blobs are gone, plus files outside DCIM
    pub fn missing_blobs() -> BackupScenario {
        let builder = basic_photos(BackupBuilder::new())
            .missing_blob("DCIM/100APPLE/IMG_0004.HEIC")
            .missing_blob("DCIM/102APPLE/IMG_0200.MOV")
            .media("PhotoData/Thumbnails/IMG_0001.JPG", b"thumbnail")
            .directory("CameraRollDomain", "Media/DCIM/102APPLE")
            .with_photo_store(StoreLayout::Modern);

        BackupScenario::new(
            "missing-blobs",
            "Manifest entries without blobs are skipped and counted",
            builder,
            ExpectedResults {
                media_files: 5,
                exported: 3,
                matched: 3,
                metadata_available: true,
                schema: Some("modern"),
                anomalies: 0,
            },
        )
        .with_tags(vec!["manifest", "degraded"])
    }

    /// Backup without any media
    pub fn empty_backup() -> BackupScenario {
        BackupScenario::new(
            "empty",
            "Backup whose manifest lists no media",
            BackupBuilder::new()
                .other_file(
                    "HomeDomain",
                    "Library/Preferences/com.apple.Preferences.plist",
                    b"plist",
                )
                .with_photo_store(StoreLayout::Modern),
            ExpectedResults {
                metadata_available: true,
                schema: Some("modern"),
                ..Default::default()
            },
        )
        .with_tags(vec!["manifest", "basic"])
    }

    /// Get all available scenarios
    pub fn all_scenarios() -> Vec<BackupScenario> {
        vec![
            Self::modern_library(),
            Self::legacy_library(),
            Self::minimal_schema(),
            Self::unsupported_schema(),
            Self::missing_store(),
            Self::store_blob_missing(),
            Self::corrupt_store(),
            Self::duplicate_paths(),
            Self::missing_blobs(),
            Self::empty_backup(),
        ]
    }

    /// Find a scenario by name
    pub fn by_name(name: &str) -> Option<BackupScenario> {
        Self::all_scenarios().into_iter().find(|s| s.name == name)
    }

    /// Get scenarios by tag
    pub fn scenarios_by_tag(tag: &str) -> Vec<BackupScenario> {
        Self::all_scenarios()
            .into_iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }
}
