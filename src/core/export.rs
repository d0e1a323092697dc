//! Copying blobs out of the backup and writing the CSV file list

use crate::core::error::{ExtractionError, Result};
use crate::core::manifest::ManifestEntry;
use crate::metadata::MetadataColumns;
use chrono::{DateTime, Local};
use log::debug;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};

/// Format of `modified_time` in the CSV file (local time, no offset)
pub const MODIFIED_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A file that was (or in a dry run would have been) exported
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFile {
    pub original_path: String,
    pub file_name: String,
    pub file_size: u64,
    pub modified_time: Option<DateTime<Local>>,
    pub export_path: PathBuf,
    pub metadata: MetadataColumns,
}

/// One CSV row, in column order
#[derive(Debug, Serialize)]
pub struct ExportRow<'a> {
    pub original_path: &'a str,
    pub file_name: &'a str,
    pub file_size: u64,
    pub modified_time: String,
    pub export_path: String,
    pub capture_time: &'a str,
    pub latitude: &'a str,
    pub longitude: &'a str,
    pub timezone: &'a str,
    pub is_favorite: bool,
}

impl<'a> From<&'a ExportedFile> for ExportRow<'a> {
    fn from(file: &'a ExportedFile) -> Self {
        Self {
            original_path: &file.original_path,
            file_name: &file.file_name,
            file_size: file.file_size,
            modified_time: file
                .modified_time
                .map(|t| t.format(MODIFIED_TIME_FORMAT).to_string())
                .unwrap_or_default(),
            export_path: file.export_path.display().to_string(),
            capture_time: &file.metadata.capture_time,
            latitude: &file.metadata.latitude,
            longitude: &file.metadata.longitude,
            timezone: &file.metadata.timezone,
            is_favorite: file.metadata.is_favorite,
        }
    }
}

/// Directory an entry is exported into.
///
/// With `preserve_structure` the folders between the first two path components
/// (`Media/DCIM/`) and the file name are recreated under `export_dir`.
pub fn destination_dir(
    export_dir: &Path,
    entry: &ManifestEntry,
    preserve_structure: bool,
) -> PathBuf {
    if !preserve_structure {
        return export_dir.to_path_buf();
    }

    let components: Vec<&str> = Path::new(&entry.relative_path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();

    if components.len() <= 3 {
        return export_dir.to_path_buf();
    }

    components[2..components.len() - 1]
        .iter()
        .fold(export_dir.to_path_buf(), |dir, part| dir.join(part))
}

/// First of `name.ext`, `name_1.ext`, `name_2.ext`, ... that does not exist yet
pub fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let original = Path::new(file_name);
    let stem = original
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    let extension = original.extension().and_then(|s| s.to_str()).unwrap_or("");

    let mut counter = 1;
    loop {
        let new_name = if extension.is_empty() {
            format!("{}_{}", stem, counter)
        } else {
            format!("{}_{}.{}", stem, counter, extension)
        };
        let new_path = dir.join(new_name);
        if !new_path.exists() {
            return new_path;
        }
        counter += 1;
    }
}

/// Copy a blob to its destination, keeping the blob's modification time
pub fn copy_blob(source: &Path, dest: &Path, modified: Option<DateTime<Local>>) -> Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            ExtractionError::IoError(format!(
                "Failed to create directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let bytes = fs::copy(source, dest).map_err(|e| ExtractionError::ExportError {
        filename: dest.display().to_string(),
        message: e.to_string(),
    })?;

    if let Some(modified) = modified {
        File::options()
            .write(true)
            .open(dest)
            .and_then(|file| file.set_modified(modified.into()))
            .map_err(|e| ExtractionError::ExportError {
                filename: dest.display().to_string(),
                message: format!("failed to set modification time: {}", e),
            })?;
    }

    debug!("Copied {} -> {} ({} bytes)", source.display(), dest.display(), bytes);
    Ok(bytes)
}

/// Write the file list, one row per exported file
pub fn write_csv(path: &Path, files: &[ExportedFile]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for file in files {
        writer.serialize(ExportRow::from(file))?;
    }
    writer.flush()?;

    debug!("Wrote {} rows to {}", files.len(), path.display());
    Ok(())
}
