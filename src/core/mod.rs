//! Core functionality module
//!
//! This module contains the core business logic of the extractor: configuration
//! management, error handling, Manifest.db access, exporting and the run pipeline.
//!
//! # Submodules
//!
//! - `config` - Configuration loading, saving, and management
//! - `error` - Error types and result aliases
//! - `manifest` - Manifest.db reading and blob location
//! - `export` - Copying blobs out and writing the CSV file list
//! - `extractor` - The extraction pipeline

pub mod config;
pub mod error;
pub mod export;
pub mod extractor;
pub mod manifest;
