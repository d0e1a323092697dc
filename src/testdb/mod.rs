//! Test Database Module
//!
//! Generates synthetic device backups so that every part of the extractor can be
//! exercised without a real iPhone backup on disk.
//!
//! # Features
//!
//! - **Backup Generator**: `Manifest.db`, sharded blobs and a Photos.sqlite in any
//!   of the known (or an unknown) schema layouts
//! - **Scenarios**: Ready-made backups covering schema variants, degraded stores
//!   and record anomalies
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use backup_media_extractor::testdb::ScenarioLibrary;
//! use std::path::Path;
//!
//! let scenario = ScenarioLibrary::by_name("modern").unwrap();
//! let fixture = scenario.build(Path::new("./fixture-backup")).unwrap();
//! println!("{} media files", fixture.media_files);
//! ```
//!
//! # Available Scenarios
//!
//! - `modern` - iOS 14+ store with GPS, favorites, EXIF fallback, trashed and unsynced rows
//! - `legacy` - iOS 11-13 store
//! - `minimal-schema` - Asset table without optional columns
//! - `unsupported` - No recognized asset table
//! - `missing-store` - Photos.sqlite not in the manifest
//! - `store-blob-missing` - Photos.sqlite listed, blob absent
//! - `corrupt-store` - Photos.sqlite blob is not a database
//! - `duplicates` - Duplicate canonical paths and an unknown cloud state
//! - `missing-blobs` - Media entries without blobs
//! - `empty` - No media at all

pub mod generator;
pub mod scenarios;

#[cfg(test)]
mod integration;

pub use generator::{
    create_photo_store, file_id_for, BackupBuilder, BackupFixture, FixtureAsset, StoreLayout,
};
pub use scenarios::{BackupScenario, ExpectedResults, ScenarioLibrary};
