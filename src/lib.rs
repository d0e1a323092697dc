//! Backup Media Extractor Library
//!
//! Extracts photos and videos from an iTunes/Finder device backup and enriches
//! each exported file with metadata from the backup's Photos library
//! (`Photos.sqlite`), whose schema changes between iOS releases.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`core`] - Configuration, error handling, Manifest.db access, export and the
//!   extraction pipeline
//! - [`metadata`] - Schema probing, timestamp normalization, the metadata index,
//!   matching and the compatibility gate
//! - [`cli`] - Command-line interface (only used by the binary)
//! - [`testdb`] - Synthetic backup generator and scenarios for testing
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use backup_media_extractor::core::config::Config;
//! use backup_media_extractor::core::extractor::{BackupExtractor, RunOptions};
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut config = Config::load_default()?;
//!     config.apply_env_overrides();
//!     config.validate()?;
//!
//!     let extractor = BackupExtractor::new(config, Arc::new(AtomicBool::new(false)));
//!     let summary = extractor.run(&RunOptions {
//!         dry_run: true,
//!         ..Default::default()
//!     })?;
//!
//!     println!("{}", summary.export);
//!     Ok(())
//! }
//! ```
//!
//! # Metadata Is Optional
//!
//! A missing, unreadable or unrecognized Photos.sqlite never stops an extraction.
//! The [`metadata::MetadataGate`] goes `Unavailable` once, logs why, and every
//! exported file is written with empty metadata columns.

// Core modules - always available
pub mod cli;
pub mod core;
pub mod metadata;
pub mod testdb;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
