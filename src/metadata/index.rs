//! In-memory index of Photos.sqlite asset metadata keyed by canonical path
//!
//! The index is built once per run with a single query over the asset table
//! (left-joined to the additional attributes table) and is read-only afterwards.
//! Per-row problems never fail the build: the offending field is dropped and the
//! problem is counted in [`IndexStats`].

use crate::core::error::MetadataError;
use crate::metadata::path_key::PathKey;
use crate::metadata::schema::ResolvedSchema;
use crate::metadata::timestamp::{
    offset_from_seconds, offset_from_timezone_name, resolve_capture_time, CaptureTime,
};
use log::{debug, info, warn};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Latitude/longitude value Photos uses for "no location"
pub const GPS_SENTINEL: f64 = -180.0;

/// Options controlling which rows make it into the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOptions {
    /// Drop rows whose cloud state marks a cloud-only placeholder
    pub exclude_cloud_only: bool,
    /// Cloud state values meaning "original present on the device".
    /// `0` is "not synced to iCloud", which includes every asset when iCloud Photos is off.
    pub local_cloud_states: Vec<i64>,
    /// Cloud state values meaning "cloud-only placeholder"
    pub cloud_only_states: Vec<i64>,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            exclude_cloud_only: true,
            local_cloud_states: vec![0, 1],
            cloud_only_states: Vec::new(),
        }
    }
}

/// Where an asset's original lives, according to its cloud state column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locality {
    Local,
    CloudOnly,
    Unknown(i64),
}

impl IndexOptions {
    /// Classify a cloud state value. NULL means the store keeps no cloud information.
    pub fn classify(&self, cloud_state: Option<i64>) -> Locality {
        match cloud_state {
            None => Locality::Local,
            Some(v) if self.local_cloud_states.contains(&v) => Locality::Local,
            Some(v) if self.cloud_only_states.contains(&v) => Locality::CloudOnly,
            Some(v) => Locality::Unknown(v),
        }
    }
}

/// Metadata of one photo/video asset
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRecord {
    pub canonical_path: PathKey,
    pub asset_pk: i64,
    pub capture_time: Option<CaptureTime>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone_name: Option<String>,
    pub is_favorite: bool,
}

impl MetadataRecord {
    pub fn has_gps(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// Raw values of one asset row, as read from the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetRow {
    pub pk: i64,
    pub directory: Option<String>,
    pub filename: Option<String>,
    pub date_created: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub favorite: Option<i64>,
    pub cloud_state: Option<i64>,
    pub exif_timestamp: Option<String>,
    pub timezone_name: Option<String>,
    pub timezone_offset: Option<i64>,
}

/// Counters collected while building the index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub rows_scanned: usize,
    pub indexed: usize,
    pub missing_path: usize,
    pub cloud_only_excluded: usize,
    pub unknown_cloud_state: usize,
    pub malformed_timestamps: usize,
    pub duplicate_paths: usize,
}

impl IndexStats {
    /// Row-level anomalies worth reporting at the end of a run
    pub fn anomalies(&self) -> usize {
        self.unknown_cloud_state + self.malformed_timestamps + self.duplicate_paths
    }
}

/// Canonical path -> metadata record
#[derive(Debug, Clone, Default)]
pub struct MetadataIndex {
    schema_name: &'static str,
    records: HashMap<PathKey, MetadataRecord>,
    stats: IndexStats,
}

impl MetadataIndex {
    /// Exact-match lookup
    pub fn get(&self, key: &PathKey) -> Option<&MetadataRecord> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &MetadataRecord> {
        self.records.values()
    }

    /// Name of the schema variant the index was built from
    pub fn schema_name(&self) -> &'static str {
        self.schema_name
    }

    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }
}

/// Drop the `-180.0` sentinel and non-finite values
pub fn normalize_coordinate(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v != GPS_SENTINEL)
}

/// Build the SELECT that feeds the index, with NULL in place of absent columns
pub fn asset_query(schema: &ResolvedSchema) -> String {
    let v = &schema.variant;
    let a = |col: &str| schema.asset_expr("a", col);
    let aa = |col: &str| schema.attribute_expr("aa", col);

    let mut sql = format!(
        "SELECT a.{pk}, a.{dir}, a.{file}, {date}, {lat}, {lon}, {fav}, {cloud}, {exif}, {tzname}, {tzoffset} FROM {table} a",
        pk = v.pk_column,
        dir = v.directory_column,
        file = v.filename_column,
        date = a(v.date_column),
        lat = a(v.latitude_column),
        lon = a(v.longitude_column),
        fav = a(v.favorite_column),
        cloud = a(v.cloud_state_column),
        exif = aa(v.exif_timestamp_column),
        tzname = aa(v.timezone_name_column),
        tzoffset = aa(v.timezone_offset_column),
        table = v.asset_table,
    );

    if schema.attributes_joinable() {
        sql.push_str(&format!(
            " LEFT JOIN {} aa ON a.{} = aa.{}",
            v.attributes_table, v.attributes_foreign_key, v.attributes_pk_column
        ));
    }

    sql.push_str(&format!(" WHERE a.{} IS NOT NULL", v.filename_column));
    if schema.has_asset_column(v.trashed_column) {
        sql.push_str(&format!(" AND a.{} = 0", v.trashed_column));
    }
    sql.push_str(&format!(" ORDER BY a.{}", v.pk_column));

    sql
}

fn value_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

fn value_f64(value: ValueRef<'_>) -> Option<f64> {
    match value {
        ValueRef::Real(v) => Some(v),
        ValueRef::Integer(v) => Some(v as f64),
        _ => None,
    }
}

fn value_i64(value: ValueRef<'_>) -> Option<i64> {
    match value {
        ValueRef::Integer(v) => Some(v),
        ValueRef::Real(v) if v.is_finite() => Some(v as i64),
        _ => None,
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AssetRow> {
    Ok(AssetRow {
        pk: value_i64(row.get_ref(0)?).unwrap_or_default(),
        directory: value_text(row.get_ref(1)?),
        filename: value_text(row.get_ref(2)?),
        date_created: value_f64(row.get_ref(3)?),
        latitude: value_f64(row.get_ref(4)?),
        longitude: value_f64(row.get_ref(5)?),
        favorite: value_i64(row.get_ref(6)?),
        cloud_state: value_i64(row.get_ref(7)?),
        exif_timestamp: value_text(row.get_ref(8)?),
        timezone_name: value_text(row.get_ref(9)?),
        timezone_offset: value_i64(row.get_ref(10)?),
    })
}

/// Turn one raw row into a record, or `None` if the row does not belong in the index
fn normalize_row(
    row: AssetRow,
    options: &IndexOptions,
    stats: &mut IndexStats,
) -> Option<MetadataRecord> {
    let key = match (&row.directory, &row.filename) {
        (Some(dir), Some(file)) => PathKey::from_parts(dir, file),
        _ => None,
    };
    let Some(canonical_path) = key else {
        stats.missing_path += 1;
        return None;
    };

    match options.classify(row.cloud_state) {
        Locality::Local => {}
        Locality::CloudOnly => {
            if options.exclude_cloud_only {
                stats.cloud_only_excluded += 1;
                return None;
            }
        }
        Locality::Unknown(state) => {
            stats.unknown_cloud_state += 1;
            let anomaly = MetadataError::RecordAnomaly {
                path: canonical_path.to_string(),
                message: format!("unrecognized cloud state {}", state),
            };
            debug!("{}; excluding record", anomaly);
            return None;
        }
    }

    let offset = row
        .timezone_offset
        .and_then(offset_from_seconds)
        .or_else(|| row.timezone_name.as_deref().and_then(offset_from_timezone_name));

    let capture_time =
        match resolve_capture_time(row.date_created, row.exif_timestamp.as_deref(), offset) {
            Ok(time) => time,
            Err(message) => {
                stats.malformed_timestamps += 1;
                let anomaly = MetadataError::RecordAnomaly {
                    path: canonical_path.to_string(),
                    message,
                };
                debug!("{}", anomaly);
                None
            }
        };

    Some(MetadataRecord {
        canonical_path,
        asset_pk: row.pk,
        capture_time,
        latitude: normalize_coordinate(row.latitude),
        longitude: normalize_coordinate(row.longitude),
        timezone_name: row.timezone_name.filter(|tz| !tz.is_empty()),
        is_favorite: row.favorite.unwrap_or(0) != 0,
    })
}

/// Build an index from already-read rows.
///
/// When two rows share a canonical path the one with the larger primary key is
/// kept, regardless of input order.
pub fn index_rows<I>(schema_name: &'static str, rows: I, options: &IndexOptions) -> MetadataIndex
where
    I: IntoIterator<Item = AssetRow>,
{
    let mut stats = IndexStats::default();
    let mut records: HashMap<PathKey, MetadataRecord> = HashMap::new();

    for row in rows {
        stats.rows_scanned += 1;
        let Some(record) = normalize_row(row, options, &mut stats) else {
            continue;
        };

        match records.entry(record.canonical_path.clone()) {
            Entry::Occupied(mut existing) => {
                stats.duplicate_paths += 1;
                debug!(
                    "Duplicate canonical path '{}' (pk {} and pk {})",
                    record.canonical_path,
                    existing.get().asset_pk,
                    record.asset_pk
                );
                if record.asset_pk > existing.get().asset_pk {
                    existing.insert(record);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }
    }

    stats.indexed = records.len();

    MetadataIndex {
        schema_name,
        records,
        stats,
    }
}

/// Load every surviving asset row of the store into an index
pub fn build_index(
    conn: &Connection,
    schema: &ResolvedSchema,
    options: &IndexOptions,
) -> Result<MetadataIndex, MetadataError> {
    for missing in schema.missing_optional_columns() {
        debug!("Photos.sqlite has no {}; treating it as NULL", missing);
    }
    if !schema.has_asset_column(schema.variant.trashed_column) {
        warn!(
            "Photos.sqlite has no {} column; trashed assets cannot be filtered",
            schema.variant.trashed_column
        );
    }

    let sql = asset_query(schema);
    debug!("Index query: {}", sql);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], read_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let index = index_rows(schema.variant.name, rows, options);
    let stats = index.stats();
    info!(
        "Photos.sqlite index built: {} records from {} rows ({} cloud-only excluded, {} without path)",
        stats.indexed, stats.rows_scanned, stats.cloud_only_excluded, stats.missing_path
    );

    Ok(index)
}

/// Library-level counts, reported by the `stats` command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStatistics {
    pub schema: String,
    pub total_assets: i64,
    pub assets_with_gps: i64,
    pub favorite_assets: i64,
    pub trashed_assets: i64,
}

/// Count assets in the store; counters for absent columns are zero
pub fn store_statistics(
    conn: &Connection,
    schema: &ResolvedSchema,
) -> Result<StoreStatistics, MetadataError> {
    let v = &schema.variant;
    let count = |filter: &str| -> rusqlite::Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {}", v.asset_table, filter);
        conn.query_row(&sql, [], |row| row.get(0))
    };

    let live = if schema.has_asset_column(v.trashed_column) {
        format!("{} = 0", v.trashed_column)
    } else {
        "1".to_string()
    };

    let mut stats = StoreStatistics {
        schema: v.name.to_string(),
        total_assets: count(&live)?,
        ..Default::default()
    };

    if schema.has_asset_column(v.latitude_column) {
        stats.assets_with_gps = count(&format!(
            "{live} AND {lat} IS NOT NULL AND {lat} != {sentinel:.1}",
            live = live,
            lat = v.latitude_column,
            sentinel = GPS_SENTINEL
        ))?;
    }
    if schema.has_asset_column(v.favorite_column) {
        stats.favorite_assets = count(&format!("{} AND {} = 1", live, v.favorite_column))?;
    }
    if schema.has_asset_column(v.trashed_column) {
        stats.trashed_assets = count(&format!("{} != 0", v.trashed_column))?;
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::schema::probe_store;
    use crate::testdb::generator::{create_photo_store, FixtureAsset, StoreLayout};

    fn store(layout: StoreLayout, assets: &[FixtureAsset]) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_photo_store(&conn, layout, assets).unwrap();
        conn
    }

    fn build(conn: &Connection) -> MetadataIndex {
        let schema = probe_store(conn).unwrap();
        build_index(conn, &schema, &IndexOptions::default()).unwrap()
    }

    fn key(dir: &str, file: &str) -> PathKey {
        PathKey::from_parts(dir, file).unwrap()
    }

    #[test]
    fn test_build_index_modern() {
        let conn = store(
            StoreLayout::Modern,
            &[
                FixtureAsset::new("DCIM/100APPLE", "IMG_0001.HEIC")
                    .with_gps(35.6812, 139.7671)
                    .with_timezone("GMT+0900", Some(32400))
                    .favorite(),
                FixtureAsset::new("DCIM/100APPLE", "IMG_0002.MOV"),
            ],
        );

        let index = build(&conn);
        assert_eq!(index.len(), 2);
        assert_eq!(index.schema_name(), "modern");

        let record = index.get(&key("DCIM/100APPLE", "IMG_0001.HEIC")).unwrap();
        assert_eq!(record.latitude, Some(35.6812));
        assert_eq!(record.longitude, Some(139.7671));
        assert_eq!(record.timezone_name.as_deref(), Some("GMT+0900"));
        assert!(record.is_favorite);
        assert_eq!(
            record.capture_time.unwrap().to_iso_string(),
            "2022-03-21T11:19:30.781480"
        );

        let plain = index.get(&key("DCIM/100APPLE", "IMG_0002.MOV")).unwrap();
        assert!(!plain.is_favorite);
        assert!(!plain.has_gps());
    }

    #[test]
    fn test_trashed_rows_never_indexed() {
        let conn = store(
            StoreLayout::Modern,
            &[
                FixtureAsset::new("DCIM/100APPLE", "IMG_0001.HEIC"),
                FixtureAsset::new("DCIM/100APPLE", "IMG_0002.HEIC").trashed(),
            ],
        );

        let index = build(&conn);
        assert!(index.get(&key("DCIM/100APPLE", "IMG_0001.HEIC")).is_some());
        assert!(index.get(&key("DCIM/100APPLE", "IMG_0002.HEIC")).is_none());
        assert_eq!(index.stats().rows_scanned, 1);
    }

    #[test]
    fn test_cloud_state_filtering() {
        let conn = store(
            StoreLayout::Modern,
            &[
                FixtureAsset::new("DCIM/100APPLE", "SYNCED.HEIC").cloud_state(Some(1)),
                FixtureAsset::new("DCIM/100APPLE", "NOINFO.HEIC").cloud_state(None),
                FixtureAsset::new("DCIM/100APPLE", "UNSYNCED.HEIC").cloud_state(Some(0)),
                FixtureAsset::new("DCIM/100APPLE", "ODD.HEIC").cloud_state(Some(7)),
            ],
        );

        let index = build(&conn);
        assert!(index.get(&key("DCIM/100APPLE", "SYNCED.HEIC")).is_some());
        assert!(index.get(&key("DCIM/100APPLE", "NOINFO.HEIC")).is_some());
        assert!(index.get(&key("DCIM/100APPLE", "UNSYNCED.HEIC")).is_some());
        assert!(index.get(&key("DCIM/100APPLE", "ODD.HEIC")).is_none());
        assert_eq!(index.stats().cloud_only_excluded, 0);
        assert_eq!(index.stats().unknown_cloud_state, 1);
        assert_eq!(index.stats().anomalies(), 1);
    }

    #[test]
    fn test_library_without_icloud_is_fully_indexed() {
        let conn = store(
            StoreLayout::Modern,
            &[
                FixtureAsset::new("DCIM/100APPLE", "IMG_0001.HEIC")
                    .cloud_state(Some(0))
                    .favorite(),
                FixtureAsset::new("DCIM/100APPLE", "IMG_0002.HEIC").cloud_state(Some(0)),
                FixtureAsset::new("DCIM/100APPLE", "IMG_0003.MOV").cloud_state(Some(0)),
            ],
        );

        let index = build(&conn);
        assert_eq!(index.len(), 3);
        assert_eq!(index.stats().rows_scanned, 3);
        assert_eq!(index.stats().cloud_only_excluded, 0);
        assert_eq!(index.stats().anomalies(), 0);
        assert!(index.get(&key("DCIM/100APPLE", "IMG_0001.HEIC")).unwrap().is_favorite);
    }

    #[test]
    fn test_configured_cloud_only_states_are_excluded() {
        let conn = store(
            StoreLayout::Modern,
            &[
                FixtureAsset::new("DCIM/100APPLE", "LOCAL.HEIC").cloud_state(Some(1)),
                FixtureAsset::new("DCIM/100APPLE", "PLACEHOLDER.HEIC").cloud_state(Some(0)),
            ],
        );
        let options = IndexOptions {
            local_cloud_states: vec![1],
            cloud_only_states: vec![0],
            ..Default::default()
        };

        let schema = probe_store(&conn).unwrap();
        let index = build_index(&conn, &schema, &options).unwrap();
        assert!(index.get(&key("DCIM/100APPLE", "LOCAL.HEIC")).is_some());
        assert!(index.get(&key("DCIM/100APPLE", "PLACEHOLDER.HEIC")).is_none());
        assert_eq!(index.stats().cloud_only_excluded, 1);
        assert_eq!(index.stats().anomalies(), 0);
    }

    #[test]
    fn test_cloud_only_kept_when_not_excluded() {
        let options = IndexOptions {
            exclude_cloud_only: false,
            local_cloud_states: vec![1],
            cloud_only_states: vec![0],
        };
        let rows = vec![AssetRow {
            pk: 1,
            directory: Some("DCIM/100APPLE".to_string()),
            filename: Some("CLOUD.HEIC".to_string()),
            cloud_state: Some(0),
            ..Default::default()
        }];

        let index = index_rows("modern", rows, &options);
        assert_eq!(index.len(), 1);
        assert_eq!(index.stats().cloud_only_excluded, 0);
    }

    #[test]
    fn test_gps_sentinel_and_null_mean_no_gps() {
        let conn = store(
            StoreLayout::Modern,
            &[
                FixtureAsset::new("DCIM/100APPLE", "SENTINEL.HEIC").with_gps(-180.0, -180.0),
                FixtureAsset::new("DCIM/100APPLE", "NULL.HEIC").without_gps(),
            ],
        );

        let index = build(&conn);
        for file in ["SENTINEL.HEIC", "NULL.HEIC"] {
            let record = index.get(&key("DCIM/100APPLE", file)).unwrap();
            assert_eq!(record.latitude, None);
            assert_eq!(record.longitude, None);
        }
    }

    #[test]
    fn test_textual_fallback_and_malformed_timestamp() {
        let conn = store(
            StoreLayout::Modern,
            &[
                FixtureAsset::new("DCIM/100APPLE", "EXIF.HEIC")
                    .without_date()
                    .with_exif("2022:03:21 11:19:30"),
                FixtureAsset::new("DCIM/100APPLE", "BROKEN.HEIC")
                    .without_date()
                    .with_exif("2022-03-21")
                    .favorite(),
            ],
        );

        let index = build(&conn);
        let exif = index.get(&key("DCIM/100APPLE", "EXIF.HEIC")).unwrap();
        assert_eq!(
            exif.capture_time.unwrap().to_iso_string(),
            "2022-03-21T11:19:30"
        );

        let broken = index.get(&key("DCIM/100APPLE", "BROKEN.HEIC")).unwrap();
        assert!(broken.capture_time.is_none());
        assert!(broken.is_favorite);
        assert_eq!(index.stats().malformed_timestamps, 1);
    }

    #[test]
    fn test_duplicate_paths_prefer_larger_pk() {
        let row = |pk: i64, favorite: i64| AssetRow {
            pk,
            directory: Some("DCIM/100APPLE".to_string()),
            filename: Some("IMG_0001.HEIC".to_string()),
            favorite: Some(favorite),
            ..Default::default()
        };

        let forward = index_rows("modern", vec![row(3, 0), row(9, 1)], &IndexOptions::default());
        let reverse = index_rows("modern", vec![row(9, 1), row(3, 0)], &IndexOptions::default());

        for index in [&forward, &reverse] {
            let record = index.get(&key("DCIM/100APPLE", "IMG_0001.HEIC")).unwrap();
            assert_eq!(record.asset_pk, 9);
            assert!(record.is_favorite);
            assert_eq!(index.stats().duplicate_paths, 1);
            assert_eq!(index.len(), 1);
        }
    }

    #[test]
    fn test_rows_without_directory_skipped() {
        let rows = vec![AssetRow {
            pk: 1,
            directory: None,
            filename: Some("IMG_0001.HEIC".to_string()),
            ..Default::default()
        }];
        let index = index_rows("modern", rows, &IndexOptions::default());
        assert!(index.is_empty());
        assert_eq!(index.stats().missing_path, 1);
    }

    #[test]
    fn test_minimal_schema_reads_nulls() {
        let conn = store(
            StoreLayout::Minimal,
            &[FixtureAsset::new("DCIM/100APPLE", "IMG_0001.HEIC").favorite()],
        );

        let index = build(&conn);
        let record = index.get(&key("DCIM/100APPLE", "IMG_0001.HEIC")).unwrap();
        assert!(record.capture_time.is_some());
        assert!(!record.is_favorite);
        assert!(record.timezone_name.is_none());
    }

    #[test]
    fn test_legacy_store_indexed() {
        let conn = store(
            StoreLayout::Legacy,
            &[FixtureAsset::new("DCIM/100APPLE", "IMG_0001.JPG").favorite()],
        );

        let index = build(&conn);
        assert_eq!(index.schema_name(), "legacy");
        assert!(index.get(&key("DCIM/100APPLE", "IMG_0001.JPG")).unwrap().is_favorite);
    }

    #[test]
    fn test_build_is_idempotent() {
        let conn = store(
            StoreLayout::Modern,
            &[
                FixtureAsset::new("DCIM/100APPLE", "IMG_0001.HEIC").with_gps(1.5, 2.5),
                FixtureAsset::new("DCIM/101APPLE", "IMG_0100.MOV").favorite(),
                FixtureAsset::new("DCIM/101APPLE", "IMG_0101.HEIC").trashed(),
            ],
        );

        let first = build(&conn);
        let second = build(&conn);

        assert_eq!(first.len(), second.len());
        for record in first.records() {
            assert_eq!(second.get(&record.canonical_path), Some(record));
        }
        assert_eq!(first.stats(), second.stats());
    }

    #[test]
    fn test_store_statistics() {
        let conn = store(
            StoreLayout::Modern,
            &[
                FixtureAsset::new("DCIM/100APPLE", "A.HEIC").with_gps(1.0, 2.0).favorite(),
                FixtureAsset::new("DCIM/100APPLE", "B.HEIC").with_gps(-180.0, -180.0),
                FixtureAsset::new("DCIM/100APPLE", "C.HEIC").trashed().favorite(),
            ],
        );
        let schema = probe_store(&conn).unwrap();
        let stats = store_statistics(&conn, &schema).unwrap();

        assert_eq!(stats.schema, "modern");
        assert_eq!(stats.total_assets, 2);
        assert_eq!(stats.assets_with_gps, 1);
        assert_eq!(stats.favorite_assets, 1);
        assert_eq!(stats.trashed_assets, 1);
    }

    #[test]
    fn test_classify_cloud_state() {
        let options = IndexOptions::default();
        assert_eq!(options.classify(None), Locality::Local);
        assert_eq!(options.classify(Some(1)), Locality::Local);
        assert_eq!(options.classify(Some(0)), Locality::Local);
        assert_eq!(options.classify(Some(-1)), Locality::Unknown(-1));

        let strict = IndexOptions {
            local_cloud_states: vec![1],
            cloud_only_states: vec![0],
            ..Default::default()
        };
        assert_eq!(strict.classify(Some(0)), Locality::CloudOnly);
    }
}
