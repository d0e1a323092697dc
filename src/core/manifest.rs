//! Manifest.db reader
//!
//! A device backup stores every file as a content-addressed blob at
//! `<backup>/<fileID[0..2]>/<fileID>`; `Manifest.db` maps each blob back to its
//! backup domain and domain-relative path.

use crate::core::config::ExtractionConfig;
use crate::core::error::{ExtractionError, Result};
use chrono::{DateTime, Local};
use log::{debug, info};
use rayon::prelude::*;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the manifest inside a backup directory
pub const MANIFEST_FILE: &str = "Manifest.db";

/// `flags` value of regular files in the manifest `Files` table
const FLAG_FILE: i64 = 1;

/// One file listed in the manifest
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub file_id: String,
    pub domain: String,
    pub relative_path: String,
    /// Size of the blob on disk, when present
    pub file_size: Option<u64>,
    /// Modification time of the blob on disk, when present
    pub modified_time: Option<DateTime<Local>>,
}

impl ManifestEntry {
    pub fn new(file_id: &str, domain: &str, relative_path: &str) -> Self {
        Self {
            file_id: file_id.to_string(),
            domain: domain.to_string(),
            relative_path: relative_path.to_string(),
            file_size: None,
            modified_time: None,
        }
    }

    /// Last path component
    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }

    /// Lowercase extension including the dot, or an empty string
    pub fn extension(&self) -> String {
        Path::new(self.file_name())
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default()
    }

    /// Whether the blob was found in the backup
    pub fn is_present(&self) -> bool {
        self.file_size.is_some()
    }
}

/// Location of a blob inside a backup, or `None` for a malformed file ID
pub fn blob_path(backup_dir: &Path, file_id: &str) -> Option<PathBuf> {
    if file_id.len() < 2 || !file_id.is_char_boundary(2) {
        return None;
    }
    Some(backup_dir.join(&file_id[..2]).join(file_id))
}

/// Fill in size and modification time from each entry's blob, in parallel.
///
/// Entries whose blob is missing keep `None` for both.
pub fn stat_blobs(backup_dir: &Path, entries: &mut [ManifestEntry]) {
    entries.par_iter_mut().for_each(|entry| {
        let metadata = blob_path(backup_dir, &entry.file_id)
            .and_then(|path| fs::metadata(path).ok())
            .filter(|m| m.is_file());

        match metadata {
            Some(metadata) => {
                entry.file_size = Some(metadata.len());
                entry.modified_time = metadata.modified().ok().map(DateTime::<Local>::from);
            }
            None => {
                entry.file_size = None;
                entry.modified_time = None;
            }
        }
    });
}

/// Read-only handle on a backup's Manifest.db
#[derive(Debug)]
pub struct ManifestDb {
    backup_dir: PathBuf,
    conn: Connection,
}

impl ManifestDb {
    /// Open the manifest of a backup directory
    pub fn open(backup_dir: &Path) -> Result<Self> {
        if !backup_dir.is_dir() {
            return Err(ExtractionError::BackupDirNotFound(backup_dir.to_path_buf()));
        }

        let manifest_path = backup_dir.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(ExtractionError::ManifestNotFound(manifest_path));
        }

        debug!("Opening manifest: {}", manifest_path.display());
        let conn = Connection::open_with_flags(
            &manifest_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        Ok(Self {
            backup_dir: backup_dir.to_path_buf(),
            conn,
        })
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// List media files matching the configured path pattern and extensions.
    ///
    /// Entries are ordered by relative path. Size and modification time come from
    /// the blob on disk and stay `None` when the blob is missing.
    pub fn media_entries(&self, config: &ExtractionConfig) -> Result<Vec<ManifestEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT fileID, domain, relativePath FROM Files \
             WHERE relativePath LIKE ?1 AND flags = ?2 \
             ORDER BY relativePath",
        )?;

        let rows = stmt
            .query_map(params![config.path_pattern, FLAG_FILE], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let total = rows.len();
        let mut entries: Vec<ManifestEntry> = rows
            .into_iter()
            .map(|(file_id, domain, path)| ManifestEntry::new(&file_id, &domain, &path))
            .filter(|entry| config.is_media_file(entry.file_name()))
            .collect();

        stat_blobs(&self.backup_dir, &mut entries);

        info!(
            "Manifest: {} media files ({} entries matched '{}')",
            entries.len(),
            total,
            config.path_pattern
        );

        Ok(entries)
    }

    /// Blob path of a manifest file ID within this backup
    pub fn blob_path(&self, file_id: &str) -> Option<PathBuf> {
        blob_path(&self.backup_dir, file_id)
    }

    /// Find the blob of a domain file, e.g. `CameraRollDomain` /
    /// `Media/PhotoData/Photos.sqlite`.
    ///
    /// Returns `Ok(None)` when the manifest does not list the file.
    pub fn locate_file(&self, domain: &str, relative_path: &str) -> Result<Option<PathBuf>> {
        let file_id: Option<String> = self
            .conn
            .query_row(
                "SELECT fileID FROM Files WHERE domain = ?1 AND relativePath = ?2 LIMIT 1",
                params![domain, relative_path],
                |row| row.get(0),
            )
            .optional()?;

        Ok(file_id.and_then(|id| self.blob_path(&id)))
    }

    /// Number of rows in the manifest `Files` table
    pub fn file_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM Files", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdb::generator::BackupBuilder;
    use tempfile::TempDir;

    #[test]
    fn test_blob_path() {
        let backup = Path::new("/backup");
        assert_eq!(
            blob_path(backup, "ab12cd"),
            Some(PathBuf::from("/backup/ab/ab12cd"))
        );
        assert_eq!(blob_path(backup, "a"), None);
        assert_eq!(blob_path(backup, ""), None);
    }

    #[test]
    fn test_entry_helpers() {
        let entry = ManifestEntry::new(
            "id",
            "CameraRollDomain",
            "Media/DCIM/100APPLE/IMG_0001.HEIC",
        );
        assert_eq!(entry.file_name(), "IMG_0001.HEIC");
        assert_eq!(entry.extension(), ".heic");
        assert!(!entry.is_present());

        let bare = ManifestEntry::new("id", "HomeDomain", "README");
        assert_eq!(bare.file_name(), "README");
        assert_eq!(bare.extension(), "");
    }

    #[test]
    fn test_open_missing_backup_dir() {
        let err = ManifestDb::open(Path::new("/nonexistent/backup")).unwrap_err();
        assert!(matches!(err, ExtractionError::BackupDirNotFound(_)));
    }

    #[test]
    fn test_open_missing_manifest() {
        let dir = TempDir::new().unwrap();
        let err = ManifestDb::open(dir.path()).unwrap_err();
        assert!(matches!(err, ExtractionError::ManifestNotFound(_)));
    }

    #[test]
    fn test_media_entries_filters_and_stats_blobs() {
        let dir = TempDir::new().unwrap();
        BackupBuilder::new()
            .media("DCIM/100APPLE/IMG_0002.HEIC", b"heic-bytes")
            .media("DCIM/100APPLE/IMG_0001.MOV", b"mov")
            .media("DCIM/100APPLE/notes.txt", b"text")
            .missing_blob("DCIM/101APPLE/IMG_0100.JPG")
            .other_file("HomeDomain", "Library/SMS/sms.db", b"sms")
            .build(dir.path())
            .unwrap();

        let manifest = ManifestDb::open(dir.path()).unwrap();
        let entries = manifest.media_entries(&ExtractionConfig::default()).unwrap();

        let paths: Vec<&str> = entries.iter().map(|e| e.relative_path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "Media/DCIM/100APPLE/IMG_0001.MOV",
                "Media/DCIM/100APPLE/IMG_0002.HEIC",
                "Media/DCIM/101APPLE/IMG_0100.JPG",
            ]
        );

        assert_eq!(entries[1].file_size, Some(10));
        assert!(entries[1].modified_time.is_some());
        assert!(!entries[2].is_present());
    }

    #[test]
    fn test_directories_are_not_listed() {
        let dir = TempDir::new().unwrap();
        BackupBuilder::new()
            .media("DCIM/100APPLE/IMG_0001.HEIC", b"x")
            .directory("CameraRollDomain", "Media/DCIM/100APPLE.JPG")
            .build(dir.path())
            .unwrap();

        let manifest = ManifestDb::open(dir.path()).unwrap();
        let entries = manifest.media_entries(&ExtractionConfig::default()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(manifest.file_count().unwrap(), 2);
    }

    #[test]
    fn test_locate_file() {
        let dir = TempDir::new().unwrap();
        let fixture = BackupBuilder::new()
            .media("DCIM/100APPLE/IMG_0001.HEIC", b"x")
            .with_photo_store(crate::testdb::generator::StoreLayout::Modern)
            .build(dir.path())
            .unwrap();

        let manifest = ManifestDb::open(dir.path()).unwrap();
        let located = manifest
            .locate_file("CameraRollDomain", "Media/PhotoData/Photos.sqlite")
            .unwrap();
        assert_eq!(located, fixture.photo_store_path);
        assert!(located.unwrap().is_file());

        assert_eq!(
            manifest.locate_file("HomeDomain", "Library/Nothing.db").unwrap(),
            None
        );
    }
}
