//! Error types for the backup media extractor
//!
//! Two families live here:
//!
//! - [`ExtractionError`] covers the extraction run itself (manifest, copying, CSV).
//!   These are real failures and are returned to the caller.
//! - [`MetadataError`] covers the optional Photos library metadata subsystem. Run-scoped
//!   variants switch metadata off for the run; they are reported once and never abort
//!   an extraction.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the extraction run
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The configured backup directory does not exist
    #[error("Backup directory not found: {0}")]
    BackupDirNotFound(PathBuf),

    /// The backup has no Manifest.db
    #[error("Manifest.db not found: {0}")]
    ManifestNotFound(PathBuf),

    /// A required setting is missing
    #[error("Configuration error: {0}")]
    Config(String),

    /// SQLite error while reading a backup database
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// General I/O error
    #[error("IO error: {0}")]
    IoError(String),

    /// Copying a single file out of the backup failed
    #[error("Export failed for '{filename}': {message}")]
    ExportError { filename: String, message: String },

    /// Writing the CSV file list failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ExtractionError>;

impl From<std::io::Error> for ExtractionError {
    fn from(err: std::io::Error) -> Self {
        ExtractionError::IoError(err.to_string())
    }
}

/// Errors raised by the Photos library metadata subsystem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetadataError {
    /// Photos.sqlite could not be located in the backup
    #[error("Photos.sqlite not found: {0}")]
    StoreNotFound(String),

    /// Photos.sqlite exists but could not be opened or queried (corrupt, locked, not SQLite)
    #[error("Photos.sqlite is unreadable: {0}")]
    StoreUnreadable(String),

    /// None of the known schema variants matched the store
    #[error("Unsupported Photos.sqlite schema: {0}")]
    SchemaUnsupported(String),

    /// A single row had a field that could not be interpreted
    #[error("Record anomaly in '{path}': {message}")]
    RecordAnomaly { path: String, message: String },

    /// Metadata enrichment was switched off by configuration
    #[error("Metadata enrichment disabled")]
    Disabled,
}

impl MetadataError {
    /// Whether this error switches metadata off for the whole run
    pub fn is_run_scoped(&self) -> bool {
        !matches!(self, MetadataError::RecordAnomaly { .. })
    }
}

impl From<rusqlite::Error> for MetadataError {
    fn from(err: rusqlite::Error) -> Self {
        MetadataError::StoreUnreadable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_anomaly_is_row_scoped() {
        let anomaly = MetadataError::RecordAnomaly {
            path: "DCIM/100APPLE/IMG_0001.HEIC".to_string(),
            message: "malformed timestamp".to_string(),
        };
        assert!(!anomaly.is_run_scoped());
        assert!(MetadataError::StoreNotFound("x".to_string()).is_run_scoped());
        assert!(MetadataError::SchemaUnsupported("x".to_string()).is_run_scoped());
        assert!(MetadataError::Disabled.is_run_scoped());
    }

    #[test]
    fn test_sqlite_error_maps_to_unreadable() {
        let err: MetadataError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, MetadataError::StoreUnreadable(_)));
    }

    #[test]
    fn test_error_messages() {
        let err = ExtractionError::ManifestNotFound(PathBuf::from("/backup/Manifest.db"));
        assert!(err.to_string().contains("Manifest.db not found"));

        let err = ExtractionError::ExportError {
            filename: "IMG_0001.HEIC".to_string(),
            message: "disk full".to_string(),
        };
        assert_eq!(err.to_string(), "Export failed for 'IMG_0001.HEIC': disk full");
    }
}
