//! Synthetic backup generator
//!
//! Builds on-disk backups that look like the real thing: a `Manifest.db`, blobs
//! sharded under `<fileID[0..2]>/<fileID>`, and optionally a Photos.sqlite blob in
//! `CameraRollDomain` laid out like one of the known (or an unknown) schema variants.
//!
//! Blob content is kept small; only the leading magic bytes resemble real media.

use crate::core::error::Result;
use crate::core::manifest::{blob_path, MANIFEST_FILE};
use crate::metadata::schema::{LEGACY, MODERN};
use log::debug;
use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// Native timestamp used by fixture assets unless overridden (2022-03-21 02:19:30.78148 UTC)
pub const DEFAULT_DATE_CREATED: f64 = 669_521_970.781_48;

/// Domain holding the camera roll and Photos.sqlite
pub const CAMERA_ROLL_DOMAIN: &str = "CameraRollDomain";

/// Domain-relative location of Photos.sqlite
pub const PHOTO_STORE_PATH: &str = "Media/PhotoData/Photos.sqlite";

/// Default size of generated blob content
pub const TEST_BLOB_SIZE: usize = 1024;

/// Manifest `flags` for regular files and directories
const FLAG_FILE: i64 = 1;
const FLAG_DIRECTORY: i64 = 2;

/// Manifest file identifier for a domain path (40 hex characters, like real backups)
pub fn file_id_for(domain: &str, relative_path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(domain.as_bytes());
    hasher.update(b"-");
    hasher.update(relative_path.as_bytes());

    let mut id: String = hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();
    id.truncate(40);
    id
}

/// Deterministic blob content with a plausible header for the file's extension
pub fn media_bytes(file_name: &str, size: usize) -> Vec<u8> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let mut data = match extension.as_str() {
        "jpg" | "jpeg" => vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00],
        "heic" | "heif" => b"\x00\x00\x00\x18ftypheic".to_vec(),
        "mov" => b"\x00\x00\x00\x14ftypqt  ".to_vec(),
        "mp4" | "m4v" => b"\x00\x00\x00\x18ftypmp42".to_vec(),
        "png" => vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A],
        _ => Vec::new(),
    };

    let mut hasher = DefaultHasher::new();
    file_name.hash(&mut hasher);
    let mut current = hasher.finish();
    while data.len() < size {
        current = current.wrapping_mul(6364136223846793005).wrapping_add(1);
        data.push((current >> 33) as u8);
    }

    data.truncate(size);
    data
}

/// Table layout of a generated Photos.sqlite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreLayout {
    /// `ZASSET` with the additional attributes table (iOS 14+)
    Modern,
    /// `ZGENERICASSET` with the additional attributes table (iOS 11-13)
    Legacy,
    /// `ZASSET` with only pk, filename, directory and creation date
    Minimal,
    /// No known asset table at all
    Unrecognized,
}

/// One asset row of a generated Photos.sqlite
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureAsset {
    pub pk: Option<i64>,
    pub directory: String,
    pub filename: String,
    pub date_created: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone_name: Option<String>,
    pub timezone_offset: Option<i64>,
    pub exif_timestamp: Option<String>,
    pub favorite: bool,
    pub trashed: bool,
    pub cloud_state: Option<i64>,
}

impl FixtureAsset {
    /// A local, non-trashed asset without location
    pub fn new(directory: &str, filename: &str) -> Self {
        Self {
            pk: None,
            directory: directory.to_string(),
            filename: filename.to_string(),
            date_created: Some(DEFAULT_DATE_CREATED),
            latitude: Some(-180.0),
            longitude: Some(-180.0),
            timezone_name: None,
            timezone_offset: None,
            exif_timestamp: None,
            favorite: false,
            trashed: false,
            cloud_state: Some(1),
        }
    }

    pub fn with_pk(mut self, pk: i64) -> Self {
        self.pk = Some(pk);
        self
    }

    pub fn with_gps(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// NULL location columns instead of the sentinel
    pub fn without_gps(mut self) -> Self {
        self.latitude = None;
        self.longitude = None;
        self
    }

    pub fn with_timezone(mut self, name: &str, offset_seconds: Option<i64>) -> Self {
        self.timezone_name = Some(name.to_string());
        self.timezone_offset = offset_seconds;
        self
    }

    pub fn with_date(mut self, date_created: f64) -> Self {
        self.date_created = Some(date_created);
        self
    }

    pub fn without_date(mut self) -> Self {
        self.date_created = None;
        self
    }

    pub fn with_exif(mut self, timestamp: &str) -> Self {
        self.exif_timestamp = Some(timestamp.to_string());
        self
    }

    pub fn favorite(mut self) -> Self {
        self.favorite = true;
        self
    }

    pub fn trashed(mut self) -> Self {
        self.trashed = true;
        self
    }

    pub fn cloud_state(mut self, state: Option<i64>) -> Self {
        self.cloud_state = state;
        self
    }

    /// Domain-relative manifest path of this asset's file
    pub fn manifest_path(&self) -> String {
        format!("Media/{}/{}", self.directory.trim_end_matches('/'), self.filename)
    }
}

fn create_asset_tables(conn: &Connection, asset_table: &str) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE {asset} (
            Z_PK INTEGER PRIMARY KEY,
            Z_ENT INTEGER,
            Z_OPT INTEGER,
            ZFILENAME VARCHAR,
            ZDIRECTORY VARCHAR,
            ZDATECREATED TIMESTAMP,
            ZLATITUDE FLOAT,
            ZLONGITUDE FLOAT,
            ZADDITIONALATTRIBUTES INTEGER,
            ZTRASHEDSTATE INTEGER,
            ZCLOUDLOCALSTATE INTEGER,
            ZFAVORITE INTEGER,
            ZUUID VARCHAR
        );
        CREATE TABLE {attrs} (
            Z_PK INTEGER PRIMARY KEY,
            Z_ENT INTEGER,
            ZASSET INTEGER,
            ZEXIFTIMESTAMPSTRING VARCHAR,
            ZTIMEZONENAME VARCHAR,
            ZTIMEZONEOFFSET INTEGER,
            ZORIGINALFILENAME VARCHAR
        );
        CREATE TABLE ZMOMENT (
            Z_PK INTEGER PRIMARY KEY,
            ZTITLE VARCHAR,
            ZSTARTDATE TIMESTAMP
        );",
        asset = asset_table,
        attrs = MODERN.attributes_table,
    ))
}

fn insert_full_asset(
    conn: &Connection,
    asset_table: &str,
    pk: i64,
    asset: &FixtureAsset,
) -> rusqlite::Result<()> {
    let trashed = i64::from(asset.trashed);
    let favorite = i64::from(asset.favorite);
    let uuid = format!("{:08X}-FIXTURE-{:04}", pk, pk);

    conn.execute(
        &format!(
            "INSERT INTO {} (Z_PK, Z_ENT, Z_OPT, ZFILENAME, ZDIRECTORY, ZDATECREATED, ZLATITUDE, \
             ZLONGITUDE, ZADDITIONALATTRIBUTES, ZTRASHEDSTATE, ZCLOUDLOCALSTATE, ZFAVORITE, ZUUID) \
             VALUES (?1, 3, 1, ?2, ?3, ?4, ?5, ?6, ?1, ?7, ?8, ?9, ?10)",
            asset_table
        ),
        params![
            pk,
            asset.filename,
            asset.directory,
            asset.date_created,
            asset.latitude,
            asset.longitude,
            trashed,
            asset.cloud_state,
            favorite,
            uuid,
        ],
    )?;

    conn.execute(
        &format!(
            "INSERT INTO {} (Z_PK, Z_ENT, ZASSET, ZEXIFTIMESTAMPSTRING, ZTIMEZONENAME, \
             ZTIMEZONEOFFSET, ZORIGINALFILENAME) VALUES (?1, 1, ?1, ?2, ?3, ?4, ?5)",
            MODERN.attributes_table
        ),
        params![
            pk,
            asset.exif_timestamp,
            asset.timezone_name,
            asset.timezone_offset,
            asset.filename,
        ],
    )?;

    Ok(())
}

/// Create a Photos.sqlite with the given layout and asset rows.
///
/// Primary keys run from 1 in slice order unless an asset sets its own. The
/// additional attributes row of each asset shares the asset's primary key.
pub fn create_photo_store(
    conn: &Connection,
    layout: StoreLayout,
    assets: &[FixtureAsset],
) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE Z_METADATA (Z_VERSION INTEGER PRIMARY KEY, Z_UUID VARCHAR(255), Z_PLIST BLOB);",
    )?;

    let pks = assets
        .iter()
        .enumerate()
        .map(|(i, asset)| asset.pk.unwrap_or(i as i64 + 1));

    match layout {
        StoreLayout::Modern | StoreLayout::Legacy => {
            let table = if layout == StoreLayout::Modern {
                MODERN.asset_table
            } else {
                LEGACY.asset_table
            };
            create_asset_tables(conn, table)?;
            for (pk, asset) in pks.zip(assets) {
                insert_full_asset(conn, table, pk, asset)?;
            }
        }
        StoreLayout::Minimal => {
            conn.execute_batch(
                "CREATE TABLE ZASSET (
                    Z_PK INTEGER PRIMARY KEY,
                    ZFILENAME VARCHAR,
                    ZDIRECTORY VARCHAR,
                    ZDATECREATED TIMESTAMP
                );",
            )?;
            for (pk, asset) in pks.zip(assets) {
                conn.execute(
                    "INSERT INTO ZASSET (Z_PK, ZFILENAME, ZDIRECTORY, ZDATECREATED) VALUES (?1, ?2, ?3, ?4)",
                    params![pk, asset.filename, asset.directory, asset.date_created],
                )?;
            }
        }
        StoreLayout::Unrecognized => {
            conn.execute_batch(
                "CREATE TABLE ZMOMENT (Z_PK INTEGER PRIMARY KEY, ZTITLE VARCHAR, ZSTARTDATE TIMESTAMP);
                 CREATE TABLE ZPHOTO (Z_PK INTEGER PRIMARY KEY, ZNAME VARCHAR);",
            )?;
        }
    }

    debug!("Created {:?} photo store with {} assets", layout, assets.len());
    Ok(())
}

/// How Photos.sqlite appears in a generated backup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoStore {
    /// A valid store with the given layout
    Layout(StoreLayout),
    /// Listed in the manifest, blob is not a database
    Corrupt,
    /// Listed in the manifest, blob absent
    MissingBlob,
}

/// One `Files` row of a generated manifest
#[derive(Debug, Clone)]
struct ManifestFile {
    domain: String,
    relative_path: String,
    flags: i64,
    content: Option<Vec<u8>>,
}

/// A generated backup on disk
#[derive(Debug, Clone)]
pub struct BackupFixture {
    pub root: PathBuf,
    /// Blob path of Photos.sqlite, when the manifest lists one
    pub photo_store_path: Option<PathBuf>,
    /// Media files listed under `Media/DCIM/`
    pub media_files: usize,
    /// Media files whose blob was written
    pub media_blobs: usize,
    /// Total size of the written media blobs
    pub media_bytes: u64,
}

/// Builder for on-disk backups
#[derive(Debug, Clone, Default)]
pub struct BackupBuilder {
    files: Vec<ManifestFile>,
    assets: Vec<FixtureAsset>,
    photo_store: Option<PhotoStore>,
}

impl BackupBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Camera roll file at `Media/<path>` with the given content
    pub fn media(mut self, path: &str, content: &[u8]) -> Self {
        self.files.push(ManifestFile {
            domain: CAMERA_ROLL_DOMAIN.to_string(),
            relative_path: format!("Media/{}", path),
            flags: FLAG_FILE,
            content: Some(content.to_vec()),
        });
        self
    }

    /// Camera roll file listed in the manifest whose blob is absent
    pub fn missing_blob(mut self, path: &str) -> Self {
        self.files.push(ManifestFile {
            domain: CAMERA_ROLL_DOMAIN.to_string(),
            relative_path: format!("Media/{}", path),
            flags: FLAG_FILE,
            content: None,
        });
        self
    }

    /// Any other domain file
    pub fn other_file(mut self, domain: &str, relative_path: &str, content: &[u8]) -> Self {
        self.files.push(ManifestFile {
            domain: domain.to_string(),
            relative_path: relative_path.to_string(),
            flags: FLAG_FILE,
            content: Some(content.to_vec()),
        });
        self
    }

    /// A directory row (no blob)
    pub fn directory(mut self, domain: &str, relative_path: &str) -> Self {
        self.files.push(ManifestFile {
            domain: domain.to_string(),
            relative_path: relative_path.to_string(),
            flags: FLAG_DIRECTORY,
            content: None,
        });
        self
    }

    /// Asset row in Photos.sqlite only
    pub fn asset(mut self, asset: FixtureAsset) -> Self {
        self.assets.push(asset);
        self
    }

    /// Camera roll file plus its matching asset row
    pub fn photo(self, asset: FixtureAsset, size: usize) -> Self {
        let path = asset.manifest_path();
        let content = media_bytes(&asset.filename, size);
        self.other_file(CAMERA_ROLL_DOMAIN, &path, &content).asset(asset)
    }

    pub fn with_photo_store(mut self, layout: StoreLayout) -> Self {
        self.photo_store = Some(PhotoStore::Layout(layout));
        self
    }

    pub fn corrupt_photo_store(mut self) -> Self {
        self.photo_store = Some(PhotoStore::Corrupt);
        self
    }

    pub fn photo_store_without_blob(mut self) -> Self {
        self.photo_store = Some(PhotoStore::MissingBlob);
        self
    }

    /// Write the backup into `root` (created if needed)
    pub fn build(&self, root: &Path) -> Result<BackupFixture> {
        fs::create_dir_all(root)?;

        let manifest = Connection::open(root.join(MANIFEST_FILE))?;
        manifest.execute_batch(
            "CREATE TABLE Files (
                fileID TEXT PRIMARY KEY,
                domain TEXT,
                relativePath TEXT,
                flags INTEGER,
                file BLOB
            );
            CREATE INDEX FilesDomainIdx ON Files(domain);
            CREATE INDEX FilesRelativePathIdx ON Files(relativePath);
            CREATE TABLE Properties (key TEXT PRIMARY KEY, value BLOB);",
        )?;

        let mut fixture = BackupFixture {
            root: root.to_path_buf(),
            photo_store_path: None,
            media_files: 0,
            media_blobs: 0,
            media_bytes: 0,
        };

        for file in &self.files {
            let file_id = file_id_for(&file.domain, &file.relative_path);
            manifest.execute(
                "INSERT INTO Files (fileID, domain, relativePath, flags, file) VALUES (?1, ?2, ?3, ?4, NULL)",
                params![file_id, file.domain, file.relative_path, file.flags],
            )?;

            let is_media = file.flags == FLAG_FILE && file.relative_path.starts_with("Media/DCIM/");
            if is_media {
                fixture.media_files += 1;
            }

            if let (Some(content), Some(path)) = (&file.content, blob_path(root, &file_id)) {
                write_blob(&path, content)?;
                if is_media {
                    fixture.media_blobs += 1;
                    fixture.media_bytes += content.len() as u64;
                }
            }
        }

        if let Some(store) = self.photo_store {
            let file_id = file_id_for(CAMERA_ROLL_DOMAIN, PHOTO_STORE_PATH);
            manifest.execute(
                "INSERT INTO Files (fileID, domain, relativePath, flags, file) VALUES (?1, ?2, ?3, ?4, NULL)",
                params![file_id, CAMERA_ROLL_DOMAIN, PHOTO_STORE_PATH, FLAG_FILE],
            )?;

            if let Some(path) = blob_path(root, &file_id) {
                match store {
                    PhotoStore::Layout(layout) => {
                        if let Some(parent) = path.parent() {
                            fs::create_dir_all(parent)?;
                        }
                        let conn = Connection::open(&path)?;
                        create_photo_store(&conn, layout, &self.assets)?;
                    }
                    PhotoStore::Corrupt => write_blob(&path, &[0x42u8; 4096])?,
                    PhotoStore::MissingBlob => {}
                }
                fixture.photo_store_path = Some(path);
            }
        }

        debug!(
            "Generated backup at {} ({} media files, {} assets)",
            root.display(),
            fixture.media_files,
            self.assets.len()
        );

        Ok(fixture)
    }
}

fn write_blob(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_id_is_stable_hex() {
        let id = file_id_for(CAMERA_ROLL_DOMAIN, "Media/DCIM/100APPLE/IMG_0001.HEIC");
        assert_eq!(id.len(), 40);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, file_id_for(CAMERA_ROLL_DOMAIN, "Media/DCIM/100APPLE/IMG_0001.HEIC"));
        assert_ne!(id, file_id_for("HomeDomain", "Media/DCIM/100APPLE/IMG_0001.HEIC"));
    }

    #[test]
    fn test_media_bytes_headers() {
        let jpeg = media_bytes("IMG_0001.JPG", 64);
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(jpeg.len(), 64);

        let heic = media_bytes("IMG_0002.HEIC", 64);
        assert_eq!(&heic[4..12], b"ftypheic");
        assert_eq!(media_bytes("IMG_0002.HEIC", 64), heic);
    }

    #[test]
    fn test_create_unrecognized_store_has_no_asset_table() {
        let conn = Connection::open_in_memory().unwrap();
        create_photo_store(&conn, StoreLayout::Unrecognized, &[FixtureAsset::new("DCIM", "A.JPG")])
            .unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name IN ('ZASSET', 'ZGENERICASSET')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_explicit_and_sequential_pks() {
        let conn = Connection::open_in_memory().unwrap();
        create_photo_store(
            &conn,
            StoreLayout::Modern,
            &[
                FixtureAsset::new("DCIM/100APPLE", "A.HEIC"),
                FixtureAsset::new("DCIM/100APPLE", "B.HEIC").with_pk(40),
            ],
        )
        .unwrap();

        let pks: Vec<i64> = conn
            .prepare("SELECT Z_PK FROM ZASSET ORDER BY Z_PK")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(pks, vec![1, 40]);
    }

    #[test]
    fn test_build_backup_layout() {
        let dir = TempDir::new().unwrap();
        let fixture = BackupBuilder::new()
            .photo(FixtureAsset::new("DCIM/100APPLE", "IMG_0001.HEIC"), 128)
            .missing_blob("DCIM/100APPLE/IMG_0002.HEIC")
            .with_photo_store(StoreLayout::Modern)
            .build(dir.path())
            .unwrap();

        assert!(dir.path().join(MANIFEST_FILE).is_file());
        assert_eq!(fixture.media_files, 2);
        assert_eq!(fixture.media_blobs, 1);
        assert_eq!(fixture.media_bytes, 128);

        let id = file_id_for(CAMERA_ROLL_DOMAIN, "Media/DCIM/100APPLE/IMG_0001.HEIC");
        assert!(dir.path().join(&id[..2]).join(&id).is_file());
        assert!(fixture.photo_store_path.unwrap().is_file());
    }

    #[test]
    fn test_store_without_blob_is_listed_but_absent() {
        let dir = TempDir::new().unwrap();
        let fixture = BackupBuilder::new()
            .photo_store_without_blob()
            .build(dir.path())
            .unwrap();

        let path = fixture.photo_store_path.unwrap();
        assert!(!path.exists());
    }
}
